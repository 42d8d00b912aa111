//! Controller facade.
//!
//! Owns the link engine task, the shared control flags, and the event
//! channel to presentation sinks. One controller serves many runs: a
//! fresh sequencer is spawned per `start()`, with the flags cleared.
//!
//! If the engine task dies (link loss), the stop flag is raised so
//! any live run winds down to `Stopped`, and the failure is reported
//! on the event channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_channel::mpsc;

use core_types::Transport;
use cycler_protocol::{CyclerError, ProgramSpec, Severity, SystemEvent};

use crate::config::{LinkConfig, SequencerConfig};
use crate::constants::events;
use crate::engine::{LinkEngine, LinkHandle};
use crate::sequencer::{ControlFlags, CycleSequencer, SequencerHandle};
use crate::{link_error, link_info, link_warn};

/// Facade over the engine and sequencer tasks.
///
/// Must be created inside a tokio runtime; the engine task is spawned
/// immediately and ticks until `shutdown()` or link loss.
pub struct CyclerController {
    link: LinkHandle,
    flags: Arc<ControlFlags>,
    running: Arc<AtomicBool>,
    program: ProgramSpec,
    sequencer_config: SequencerConfig,
    event_tx: mpsc::Sender<SystemEvent>,
    // NOT cloned; take_event_receiver() hands it to the sink task
    event_rx: mpsc::Receiver<SystemEvent>,
}

impl CyclerController {
    pub fn new<T: Transport + 'static>(
        transport: T,
        link_config: LinkConfig,
        sequencer_config: SequencerConfig,
        program: ProgramSpec,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(events::CAPACITY);
        let engine = LinkEngine::new(transport, link_config, event_tx.clone());
        let link = engine.handle();
        let flags = Arc::new(ControlFlags::default());

        let engine_flags = flags.clone();
        let mut failure_tx = event_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.run().await {
                link_error!("CyclerController: link engine failed: {e}");
                engine_flags.stop.store(true, Ordering::Relaxed);
                let _ = failure_tx.try_send(SystemEvent::Transcript {
                    text: format!("Link failure: {e}"),
                    severity: Severity::Error,
                });
            }
        });

        Self {
            link,
            flags,
            running: Arc::new(AtomicBool::new(false)),
            program,
            sequencer_config,
            event_tx,
            event_rx,
        }
    }

    /// Begin a run. A no-op while one is already in progress.
    pub fn start(&mut self) -> Result<(), CyclerError> {
        if self.running.swap(true, Ordering::Relaxed) {
            link_warn!("CyclerController: start ignored, a run is already in progress");
            return Ok(());
        }

        // Fresh run, fresh controls
        self.flags.stop.store(false, Ordering::Relaxed);
        self.flags.pause.store(false, Ordering::Relaxed);
        self.flags.end.store(false, Ordering::Relaxed);

        let sequencer = match CycleSequencer::new(
            self.program.clone(),
            self.sequencer_config.clone(),
            self.link.clone(),
            self.flags.clone(),
            self.event_tx.clone(),
        ) {
            Ok(sequencer) => sequencer,
            Err(e) => {
                self.running.store(false, Ordering::Relaxed);
                return Err(e);
            }
        };

        let running = self.running.clone();
        let mut abort_tx = self.event_tx.clone();
        tokio::spawn(async move {
            match sequencer.run().await {
                Ok(phase) => link_info!("CyclerController: run finished in {:?}", phase),
                Err(e) => {
                    link_error!("CyclerController: run aborted: {e}");
                    let _ = abort_tx.try_send(SystemEvent::Transcript {
                        text: format!("Run aborted: {e}"),
                        severity: Severity::Error,
                    });
                }
            }
            running.store(false, Ordering::Relaxed);
        });
        Ok(())
    }

    /// Halt the current run; lands within one poll interval
    pub fn stop(&self) {
        self.flags.stop.store(true, Ordering::Relaxed);
    }

    /// Flip the pause flag; returns the new state
    pub fn toggle_pause(&self) -> bool {
        self.sequencer_handle().toggle_pause()
    }

    /// Finish the in-progress step, then run the tail
    pub fn end_run(&self) {
        self.flags.end.store(true, Ordering::Relaxed);
    }

    /// Queue an out-of-band message on the link
    pub fn enqueue(&self, text: &str) {
        self.link.enqueue(text);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn link(&self) -> LinkHandle {
        self.link.clone()
    }

    pub fn sequencer_handle(&self) -> SequencerHandle {
        SequencerHandle::from_flags(self.flags.clone())
    }

    /// Get mutable reference to the event receiver
    pub fn event_receiver(&mut self) -> &mut mpsc::Receiver<SystemEvent> {
        &mut self.event_rx
    }

    /// Take ownership of the event receiver.
    ///
    /// This allows a sink to move the receiver into its own task.
    /// Should only be taken once; afterwards the controller holds a
    /// disconnected stand-in.
    pub fn take_event_receiver(&mut self) -> mpsc::Receiver<SystemEvent> {
        let (_stand_in_tx, stand_in_rx) = mpsc::channel(1);
        std::mem::replace(&mut self.event_rx, stand_in_rx)
    }

    /// Stop the run and wind the engine task down
    pub fn shutdown(&self) {
        self.stop();
        self.link.shutdown();
    }
}
