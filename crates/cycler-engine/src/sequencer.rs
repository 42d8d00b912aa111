//! Cycle sequencer.
//!
//! Walks a [`ProgramSpec`] through the phase machine, queuing
//! setpoint messages on the link and timing holds. All waits are poll
//! loops over shared atomic flags, so an operator stop lands within
//! one poll interval no matter which phase the run is in.
//!
//! Control semantics:
//!
//! - **stop**: honoured inside every wait; the run goes straight to
//!   `Stopped` and sends nothing further
//! - **pause**: freezes hold-timer accrual and the status text;
//!   messages already queued are unaffected
//! - **end**: checked at each step boundary, before the would-be
//!   send; the in-progress step always finishes, then the tail runs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_channel::mpsc;
use tokio::time::{sleep, Instant};

use cycler_protocol::{
    CyclePhase, CyclerError, ProgramSpec, StatusSnapshot, SystemEvent,
};

use crate::config::SequencerConfig;
use crate::engine::LinkHandle;
use crate::timer::IntervalTimer;
use crate::{link_info, link_warn};

/// Operator control flags shared between the sequencer task and handles
#[derive(Default)]
pub struct ControlFlags {
    pub stop: AtomicBool,
    pub pause: AtomicBool,
    pub end: AtomicBool,
}

/// Cheap, cloneable handle to a running sequencer
#[derive(Clone)]
pub struct SequencerHandle {
    flags: Arc<ControlFlags>,
}

impl SequencerHandle {
    /// Wrap an existing flag set (the controller shares one set
    /// across runs)
    pub fn from_flags(flags: Arc<ControlFlags>) -> Self {
        Self { flags }
    }

    pub fn stop(&self) {
        self.flags.stop.store(true, Ordering::Relaxed);
    }

    /// Flip the pause flag; returns the new state
    pub fn toggle_pause(&self) -> bool {
        !self.flags.pause.fetch_xor(true, Ordering::Relaxed)
    }

    pub fn is_paused(&self) -> bool {
        self.flags.pause.load(Ordering::Relaxed)
    }

    /// Finish the current cycle, then run the tail
    pub fn end_run(&self) {
        self.flags.end.store(true, Ordering::Relaxed);
    }

    pub fn end_armed(&self) -> bool {
        self.flags.end.load(Ordering::Relaxed)
    }
}

enum WaitOutcome {
    Finished,
    Stopped,
}

/// Executes one cycling run. Consumed by [`CycleSequencer::run`].
pub struct CycleSequencer {
    program: ProgramSpec,
    config: SequencerConfig,
    link: LinkHandle,
    flags: Arc<ControlFlags>,
    event_tx: mpsc::Sender<SystemEvent>,
    phase: CyclePhase,
    timer: IntervalTimer,
    last_message: Option<String>,
    current_cycle: u32,
}

impl CycleSequencer {
    pub fn new(
        program: ProgramSpec,
        config: SequencerConfig,
        link: LinkHandle,
        flags: Arc<ControlFlags>,
        event_tx: mpsc::Sender<SystemEvent>,
    ) -> Result<Self, CyclerError> {
        program.validate()?;
        Ok(Self {
            program,
            config,
            link,
            flags,
            event_tx,
            phase: CyclePhase::Idle,
            timer: IntervalTimer::new(),
            last_message: None,
            current_cycle: 1,
        })
    }

    pub fn handle(&self) -> SequencerHandle {
        SequencerHandle {
            flags: self.flags.clone(),
        }
    }

    /// Run the program to a terminal phase.
    pub async fn run(mut self) -> Result<CyclePhase, CyclerError> {
        if self.stop_requested() {
            return self.finish_stopped();
        }
        self.transition(CyclePhase::Startup)?;
        for message in self.program.startup_messages.clone() {
            if self.stop_requested() {
                return self.finish_stopped();
            }
            self.queue_message(&message);
            if let WaitOutcome::Stopped = self.sleep_checked(self.config.startup_gap).await {
                return self.finish_stopped();
            }
        }

        let step_count = self.program.steps.len() as u32; // validate() guarantees ≥ 1
        let mut index: u32 = 0;
        loop {
            self.current_cycle = index / step_count + 1;
            // Boundary checks come before the would-be send
            if self.current_cycle >= self.program.max_cycles || self.end_armed() {
                break;
            }
            let position = (index % step_count) as usize;
            let Some(step) = self.program.steps.get(position).cloned() else {
                break;
            };
            let next_message = self
                .program
                .steps
                .get(((index + 1) % step_count) as usize)
                .map(|s| s.message.clone());

            if self.stop_requested() {
                return self.finish_stopped();
            }
            self.transition(CyclePhase::Stepping)?;
            self.queue_message(&step.message);
            if let WaitOutcome::Stopped = self.sleep_checked(self.config.settle_delay).await {
                return self.finish_stopped();
            }

            if step.wait_for_target {
                self.transition(CyclePhase::WaitingTarget)?;
                if let WaitOutcome::Stopped = self.wait_for_target().await {
                    return self.finish_stopped();
                }
            }

            self.transition(CyclePhase::Holding)?;
            if let WaitOutcome::Stopped = self.hold_for(step.hold, next_message).await {
                return self.finish_stopped();
            }

            index += 1;
        }

        if self.stop_requested() {
            return self.finish_stopped();
        }
        let tail = self.program.tail.clone();
        self.transition(CyclePhase::TailExtension)?;
        self.queue_message(&tail.extension_message);
        if let WaitOutcome::Stopped = self.hold_for(tail.extension_hold, None).await {
            return self.finish_stopped();
        }

        self.transition(CyclePhase::TailCooldown)?;
        for message in &tail.cooldown_messages {
            self.link.enqueue(message);
        }
        self.last_message = tail.cooldown_messages.last().cloned();
        if let WaitOutcome::Stopped = self.hold_for(tail.cooldown_hold, None).await {
            return self.finish_stopped();
        }

        self.queue_message(&tail.shutdown_message);
        self.transition(CyclePhase::Completed)?;
        self.emit_status(Duration::ZERO, Duration::ZERO, None);
        Ok(CyclePhase::Completed)
    }

    fn transition(&mut self, next: CyclePhase) -> Result<(), CyclerError> {
        if !self.phase.can_transition_to(next) {
            return Err(CyclerError::InvalidTransition(format!(
                "{:?} → {:?}",
                self.phase, next
            )));
        }
        link_info!("CycleSequencer: {:?} → {:?}", self.phase, next);
        self.phase = next;
        self.send_event(SystemEvent::Phase { phase: next });
        Ok(())
    }

    fn finish_stopped(&mut self) -> Result<CyclePhase, CyclerError> {
        self.transition(CyclePhase::Stopped)?;
        self.emit_status(Duration::ZERO, Duration::ZERO, None);
        Ok(CyclePhase::Stopped)
    }

    fn queue_message(&mut self, message: &str) {
        self.link.enqueue(message);
        self.last_message = Some(message.to_string());
    }

    fn stop_requested(&self) -> bool {
        self.flags.stop.load(Ordering::Relaxed)
    }

    fn end_armed(&self) -> bool {
        self.flags.end.load(Ordering::Relaxed)
    }

    /// Hold for `duration` of pause-excluded time.
    async fn hold_for(&mut self, duration: Duration, next_message: Option<String>) -> WaitOutcome {
        self.timer.reset();
        loop {
            if self.stop_requested() {
                return WaitOutcome::Stopped;
            }
            self.timer.set_paused(self.flags.pause.load(Ordering::Relaxed));
            let elapsed = self.timer.elapsed();
            if elapsed >= duration {
                return WaitOutcome::Finished;
            }
            self.emit_status(elapsed, duration - elapsed, next_message.as_deref());
            sleep(self.config.poll_interval).await;
        }
    }

    /// Poll the target-reached signal. Blocks until the instrument
    /// reports the target or the operator stops; there is no timeout.
    async fn wait_for_target(&mut self) -> WaitOutcome {
        loop {
            if self.stop_requested() {
                return WaitOutcome::Stopped;
            }
            if self.link.target_reached() {
                return WaitOutcome::Finished;
            }
            self.emit_status(Duration::ZERO, Duration::ZERO, None);
            sleep(self.config.poll_interval).await;
        }
    }

    /// A stop-aware sleep for fixed gaps (startup, settle).
    async fn sleep_checked(&mut self, duration: Duration) -> WaitOutcome {
        let deadline = Instant::now() + duration;
        loop {
            if self.stop_requested() {
                return WaitOutcome::Stopped;
            }
            let now = Instant::now();
            if now >= deadline {
                return WaitOutcome::Finished;
            }
            sleep((deadline - now).min(self.config.poll_interval)).await;
        }
    }

    fn emit_status(&self, elapsed: Duration, remaining: Duration, next_message: Option<&str>) {
        let paused = self.flags.pause.load(Ordering::Relaxed);
        let mut status = if paused {
            "Paused".to_string()
        } else {
            self.phase.status_text().to_string()
        };
        if self.end_armed() && !self.phase.is_terminal() {
            status.push_str(" - Ending cycle set...");
        }
        let snapshot = StatusSnapshot {
            status,
            elapsed_secs: elapsed.as_secs(),
            remaining_secs: remaining.as_secs(),
            last_message: self.last_message.clone(),
            next_message: next_message.map(str::to_string),
            cycle: self.current_cycle.min(self.program.max_cycles),
            max_cycles: self.program.max_cycles,
            paused,
        };
        self.send_event(SystemEvent::Status { snapshot });
    }

    fn send_event(&self, event: SystemEvent) {
        if let Err(e) = self.event_tx.clone().try_send(event) {
            if e.is_full() {
                link_warn!("CycleSequencer: event channel full, dropping event");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use cycler_protocol::{CycleStep, TailSpec};
    use tokio::time::advance;

    fn tiny_program() -> ProgramSpec {
        ProgramSpec {
            startup_messages: vec!["heat_act=true".into(), "target_temp_cap=110".into()],
            steps: vec![
                CycleStep::new("target_temp_block=95", Duration::from_millis(200), false),
                CycleStep::new("target_temp_block=60", Duration::from_millis(200), false),
            ],
            max_cycles: 2,
            tail: TailSpec {
                extension_message: "target_temp_block=72".into(),
                extension_hold: Duration::from_millis(300),
                cooldown_messages: vec!["target_temp_block=0".into(), "target_temp_cap=0".into()],
                cooldown_hold: Duration::from_millis(300),
                shutdown_message: "heat_act=false".into(),
            },
        }
    }

    fn fast_config() -> SequencerConfig {
        SequencerConfig {
            poll_interval: Duration::from_millis(10),
            startup_gap: Duration::from_millis(20),
            settle_delay: Duration::from_millis(20),
        }
    }

    fn sequencer(program: ProgramSpec) -> (CycleSequencer, mpsc::Receiver<SystemEvent>) {
        let (event_tx, event_rx) = mpsc::channel(4096);
        let seq = CycleSequencer::new(
            program,
            fast_config(),
            LinkHandle::detached(),
            Arc::new(ControlFlags::default()),
            event_tx,
        )
        .unwrap();
        (seq, event_rx)
    }

    fn phases(rx: &mut mpsc::Receiver<SystemEvent>) -> Vec<CyclePhase> {
        let mut seen = Vec::new();
        while let Ok(Some(event)) = rx.try_next() {
            if let SystemEvent::Phase { phase } = event {
                seen.push(phase);
            }
        }
        seen
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_reaches_completed() {
        let (seq, mut rx) = sequencer(tiny_program());
        let link = seq.link.clone();

        let phase = seq.run().await.unwrap();
        assert_eq!(phase, CyclePhase::Completed);

        // Cycle arithmetic: budget of 2 leaves one full cycle of steps
        // before the tail
        assert_eq!(
            link.take_pending(),
            vec![
                "heat_act=true",
                "target_temp_cap=110",
                "target_temp_block=95",
                "target_temp_block=60",
                "target_temp_block=72",
                "target_temp_block=0",
                "target_temp_cap=0",
                "heat_act=false",
            ]
        );

        let seen = phases(&mut rx);
        assert_eq!(seen.first(), Some(&CyclePhase::Startup));
        assert_eq!(seen.last(), Some(&CyclePhase::Completed));
        assert!(seen.contains(&CyclePhase::TailExtension));
        assert!(!seen.contains(&CyclePhase::WaitingTarget));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_start_sends_nothing() {
        let (seq, _rx) = sequencer(tiny_program());
        let link = seq.link.clone();
        seq.handle().stop();

        let phase = seq.run().await.unwrap();
        assert_eq!(phase, CyclePhase::Stopped);
        assert_eq!(link.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_mid_hold_sends_no_tail() {
        let mut program = tiny_program();
        program.steps = vec![CycleStep::new(
            "target_temp_block=95",
            Duration::from_secs(60),
            false,
        )];
        let (seq, mut rx) = sequencer(program);
        let link = seq.link.clone();
        let handle = seq.handle();

        let task = tokio::spawn(seq.run());
        // Let startup and the step send go through, into the hold
        for _ in 0..20 {
            advance(Duration::from_millis(10)).await;
            tokio::task::yield_now().await;
        }
        assert_eq!(link.pending(), 3);

        handle.stop();
        for _ in 0..5 {
            advance(Duration::from_millis(10)).await;
            tokio::task::yield_now().await;
        }
        let phase = task.await.unwrap().unwrap();
        assert_eq!(phase, CyclePhase::Stopped);

        // Nothing after the step message: no extension, no cooldown
        assert_eq!(link.pending(), 3);
        assert_eq!(phases(&mut rx).last(), Some(&CyclePhase::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_armed_before_first_step_goes_straight_to_tail() {
        let (seq, mut rx) = sequencer(tiny_program());
        let link = seq.link.clone();
        seq.handle().end_run();

        let phase = seq.run().await.unwrap();
        assert_eq!(phase, CyclePhase::Completed);

        // Startup (2) + tail (4), no cycled steps
        assert_eq!(link.pending(), 6);
        let seen = phases(&mut rx);
        assert!(!seen.contains(&CyclePhase::Stepping));
        assert!(seen.contains(&CyclePhase::TailExtension));
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_takes_effect_at_next_step_boundary() {
        let mut program = tiny_program();
        program.max_cycles = 5;
        let (seq, _rx) = sequencer(program);
        let link = seq.link.clone();
        let handle = seq.handle();

        let task = tokio::spawn(seq.run());
        // Wait until the first step is queued and holding, then arm end
        for _ in 0..10 {
            advance(Duration::from_millis(10)).await;
            tokio::task::yield_now().await;
        }
        assert_eq!(link.pending(), 3);
        handle.end_run();

        let phase = task.await.unwrap().unwrap();
        assert_eq!(phase, CyclePhase::Completed);
        // The in-progress step finished its hold, the second step was
        // never sent: startup 2 + step 1 + tail 4
        let sent = link.take_pending();
        assert_eq!(sent.len(), 7);
        assert!(!sent.contains(&"target_temp_block=60".to_string()));
        assert_eq!(sent.last().map(String::as_str), Some("heat_act=false"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_extends_hold_by_pause_length() {
        let mut program = tiny_program();
        program.startup_messages.clear();
        program.steps = vec![CycleStep::new(
            "target_temp_block=95",
            Duration::from_millis(500),
            false,
        )];
        program.max_cycles = 2;
        let (seq, _rx) = sequencer(program);
        let handle = seq.handle();

        let task = tokio::spawn(seq.run());
        // Into the hold (settle is 20ms)
        for _ in 0..10 {
            advance(Duration::from_millis(10)).await;
            tokio::task::yield_now().await;
        }
        assert!(handle.toggle_pause());

        // A full hold's worth of paused time passes; the run must not
        // finish
        for _ in 0..100 {
            advance(Duration::from_millis(10)).await;
            tokio::task::yield_now().await;
        }
        assert!(!task.is_finished());

        assert!(!handle.toggle_pause());
        let phase = task.await.unwrap().unwrap();
        assert_eq!(phase, CyclePhase::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_target_blocks_until_signal() {
        let mut program = tiny_program();
        program.startup_messages.clear();
        program.steps = vec![CycleStep::new(
            "target_temp_block=95",
            Duration::from_millis(100),
            true,
        )];
        let (seq, mut rx) = sequencer(program);
        let link = seq.link.clone();

        let task = tokio::spawn(seq.run());
        for _ in 0..50 {
            advance(Duration::from_millis(10)).await;
            tokio::task::yield_now().await;
        }
        assert!(!task.is_finished());
        assert!(phases(&mut rx).contains(&CyclePhase::WaitingTarget));

        link.set_target_reached(true);
        let phase = task.await.unwrap().unwrap();
        assert_eq!(phase, CyclePhase::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_wins_over_missing_target() {
        let mut program = tiny_program();
        program.steps = vec![CycleStep::new(
            "target_temp_block=95",
            Duration::from_millis(100),
            true,
        )];
        let (seq, _rx) = sequencer(program);
        let handle = seq.handle();

        let task = tokio::spawn(seq.run());
        for _ in 0..30 {
            advance(Duration::from_millis(10)).await;
            tokio::task::yield_now().await;
        }
        handle.stop();

        let phase = task.await.unwrap().unwrap();
        assert_eq!(phase, CyclePhase::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_snapshots_carry_cycle_and_countdown() {
        let (seq, mut rx) = sequencer(tiny_program());
        seq.run().await.unwrap();

        let mut snapshots = Vec::new();
        while let Ok(Some(event)) = rx.try_next() {
            if let SystemEvent::Status { snapshot } = event {
                snapshots.push(snapshot);
            }
        }
        assert!(!snapshots.is_empty());
        assert!(snapshots.iter().all(|s| s.max_cycles == 2));
        assert!(snapshots
            .iter()
            .any(|s| s.status == "Holding..." && s.remaining_secs == 0));
        assert!(snapshots
            .iter()
            .any(|s| s.next_message.as_deref() == Some("target_temp_block=60")));
    }

    #[tokio::test]
    async fn test_invalid_program_rejected() {
        let mut program = tiny_program();
        program.max_cycles = 0;
        let (event_tx, _event_rx) = mpsc::channel(16);
        let result = CycleSequencer::new(
            program,
            fast_config(),
            LinkHandle::detached(),
            Arc::new(ControlFlags::default()),
            event_tx,
        );
        assert!(matches!(result, Err(CyclerError::Config(_))));
    }
}
