//! Centralized configuration constants for the control core
//!
//! All timeout, retry, and cadence values are defined here with the
//! rationale behind each value.
//!
//! **Before changing any constant:**
//! 1. Read its full documentation comment
//! 2. Understand the firmware/protocol basis for the value
//! 3. Test against the instrument firmware
//! 4. Update documentation with your findings

/// Link-level delivery timing
pub mod link {
    /// Engine tick cadence (milliseconds)
    ///
    /// **Value**: 100ms
    ///
    /// **Rationale**: One tick drains inbound bytes and advances the
    /// outbound slot. The firmware streams telemetry at 1-2 Hz and
    /// replies to commands within one of its own loop iterations, so
    /// 100ms keeps worst-case handshake latency well under the ACK
    /// timeout while staying negligible on a host CPU.
    ///
    /// **Trade-offs**:
    /// - Faster ticks: No protocol benefit, just wasted wakeups
    /// - Slower ticks: Sync replies lag, retry timing gets coarse
    ///
    /// **Used in**: config.rs (LinkConfig::default)
    pub const TICK_INTERVAL_MS: u64 = 100;

    /// How long to wait for an ACK before retransmitting (milliseconds)
    ///
    /// **Value**: 2000ms
    ///
    /// **Rationale**: The firmware normally ACKs within ~50ms, but its
    /// main loop stalls for up to a second while flushing the run log
    /// to SD. 2s covers the worst observed stall with margin, without
    /// making a genuinely lost line take long to recover.
    ///
    /// **Used in**: config.rs (LinkConfig::default)
    pub const ACK_TIMEOUT_MS: u64 = 2000;

    /// Total transmissions attempted per message, first send included
    ///
    /// **Value**: 3
    ///
    /// **Rationale**: A single missed ACK is common during SD flushes;
    /// two is rare; three consecutive misses means the link or the
    /// firmware is wedged and later messages would fare no better.
    /// Dropping the message keeps the queue moving so an operator
    /// stop command is not stuck behind a dead setpoint.
    ///
    /// **Used in**: config.rs (LinkConfig::default)
    pub const MAX_RETRIES: u32 = 3;
}

/// Sequencer timing
pub mod sequence {
    /// Poll cadence for every sequencer wait loop (milliseconds)
    ///
    /// **Value**: 100ms
    ///
    /// **Rationale**: Bounds how stale the stop/pause flags and the
    /// target-reached signal can be. Stop latency is at most one poll
    /// interval; hold timing error is at most one interval per hold.
    ///
    /// **Used in**: config.rs (SequencerConfig::default)
    pub const POLL_INTERVAL_MS: u64 = 100;

    /// Gap between startup messages (milliseconds)
    ///
    /// **Value**: 500ms
    ///
    /// **Rationale**: The firmware parses one command per loop
    /// iteration; queuing preheat commands back-to-back can overrun
    /// its line buffer before the heater task drains it.
    ///
    /// **Used in**: config.rs (SequencerConfig::default)
    pub const STARTUP_GAP_MS: u64 = 500;

    /// Settle delay after queuing a step setpoint (milliseconds)
    ///
    /// **Value**: 1000ms
    ///
    /// **Rationale**: After a new setpoint the firmware needs a beat
    /// to republish `temp_reached: false`. Polling the target signal
    /// sooner would see the stale `true` from the previous step and
    /// skip the wait entirely.
    ///
    /// **Used in**: config.rs (SequencerConfig::default)
    pub const SETTLE_DELAY_MS: u64 = 1000;
}

/// Event channel sizing
pub mod events {
    /// Bounded capacity of the SystemEvent channel
    ///
    /// **Value**: 1024 events
    ///
    /// **Rationale**: Steady-state traffic is ~20 events/s (telemetry
    /// at 2 Hz plus one status per sequencer poll). 1024 gives a slow
    /// presentation sink close to a minute of headroom; past that,
    /// dropping events is the correct failure mode - the core must
    /// never stall on a stuck UI.
    ///
    /// **Used in**: controller.rs
    pub const CAPACITY: usize = 1024;
}
