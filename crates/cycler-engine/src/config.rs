use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{link, sequence};

/// Tunables for the link protocol engine.
///
/// Defaults come from [`crate::constants::link`]; tests shrink them
/// freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Answer `syn` with `syn ack` (true) or `syn ack no_sd` (false),
    /// telling the firmware whether to log the run to SD
    pub sd_card: bool,
    pub ack_timeout: Duration,
    /// Total transmissions per message, first send included
    pub max_retries: u32,
    pub tick_interval: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            sd_card: true,
            ack_timeout: Duration::from_millis(link::ACK_TIMEOUT_MS),
            max_retries: link::MAX_RETRIES,
            tick_interval: Duration::from_millis(link::TICK_INTERVAL_MS),
        }
    }
}

/// Tunables for the cycle sequencer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// Cadence of every wait loop; bounds stop latency
    pub poll_interval: Duration,
    pub startup_gap: Duration,
    pub settle_delay: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(sequence::POLL_INTERVAL_MS),
            startup_gap: Duration::from_millis(sequence::STARTUP_GAP_MS),
            settle_delay: Duration::from_millis(sequence::SETTLE_DELAY_MS),
        }
    }
}
