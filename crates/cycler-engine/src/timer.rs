use std::time::Duration;

use tokio::time::Instant;

/// Hold timer with pause-excluded accounting.
///
/// `elapsed()` is wall time since the last reset minus every interval
/// spent paused. While paused the reading is frozen at the value it
/// had when the pause began, so a hold of N seconds paused for P
/// seconds completes after N + P on the wall clock.
///
/// Uses `tokio::time::Instant` so tests can drive it under a paused
/// clock.
#[derive(Debug)]
pub struct IntervalTimer {
    start: Instant,
    paused_duration: Duration,
    pause_start: Option<Instant>,
}

impl IntervalTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            paused_duration: Duration::ZERO,
            pause_start: None,
        }
    }

    /// Align the pause state with the operator's flag.
    ///
    /// Idempotent in both directions: only the edges matter. Paused
    /// time accrues into `paused_duration` on the resume edge.
    pub fn set_paused(&mut self, paused: bool) {
        match (paused, self.pause_start) {
            (true, None) => self.pause_start = Some(Instant::now()),
            (false, Some(since)) => {
                self.paused_duration += since.elapsed();
                self.pause_start = None;
            }
            _ => {}
        }
    }

    pub fn is_paused(&self) -> bool {
        self.pause_start.is_some()
    }

    /// Accrued time, excluding pauses. Frozen while paused.
    pub fn elapsed(&self) -> Duration {
        let now = self.pause_start.unwrap_or_else(Instant::now);
        now.duration_since(self.start)
            .checked_sub(self.paused_duration)
            .unwrap_or_default()
    }

    /// Restart accrual from zero. An active pause stays active.
    pub fn reset(&mut self) {
        self.start = Instant::now();
        self.paused_duration = Duration::ZERO;
        if self.pause_start.is_some() {
            self.pause_start = Some(self.start);
        }
    }
}

impl Default for IntervalTimer {
    fn default() -> Self {
        Self::new()
    }
}
