use serde::{Deserialize, Serialize};

use crate::state::CyclePhase;
use crate::telemetry::{ChannelReadings, TelemetryRecord};

/// How a transcript line should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Point-in-time view of a cycling run for status displays.
///
/// Built by the sequencer on every poll; elapsed time excludes any
/// time spent paused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Human-readable status line (phase text plus pause/end markers)
    pub status: String,
    /// Seconds accrued in the current hold, pause-excluded
    pub elapsed_secs: u64,
    /// Seconds left in the current hold
    pub remaining_secs: u64,
    /// Most recent message handed to the link
    pub last_message: Option<String>,
    /// Message the next step will send
    pub next_message: Option<String>,
    /// Current cycle number (1-based)
    pub cycle: u32,
    /// Cycle budget for the run
    pub max_cycles: u32,
    pub paused: bool,
}

/// Messages from the control core → presentation sinks
///
/// Delivery is best-effort over a bounded channel; a slow or absent
/// sink never stalls the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SystemEvent {
    /// A line for the session transcript (sent data, received text,
    /// link warnings and failures)
    Transcript { text: String, severity: Severity },

    /// A decoded telemetry line, with the retained per-channel view
    Telemetry {
        record: TelemetryRecord,
        readings: ChannelReadings,
    },

    /// The run moved to a new phase
    Phase { phase: CyclePhase },

    /// Periodic status refresh from the sequencer
    Status { snapshot: StatusSnapshot },
}
