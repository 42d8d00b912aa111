//! # Cycler Protocol
//!
//! Type-safe data definitions for the thermolink control core.
//!
//! This crate defines the cycle phase state machine, the event types
//! published to presentation sinks, the cycling program description,
//! and the telemetry line format. It has no I/O and no async runtime
//! dependency, making it fully testable in native Rust environments.
//!
//! ## Layers
//!
//! - **CyclePhase**: FSM for a cycling run (pure logic, no side effects)
//! - **SystemEvent**: Messages from the control core → presentation sinks
//! - **ProgramSpec**: What to send and how long to hold, per run
//! - **TelemetryRecord**: One decoded JSON telemetry line

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod errors;
pub mod events;
pub mod program;
pub mod state;
pub mod telemetry;

pub use errors::CyclerError;
pub use events::{Severity, StatusSnapshot, SystemEvent};
pub use program::{CycleStep, ProgramSpec, TailSpec};
pub use state::CyclePhase;
pub use telemetry::{ChannelReadings, TelemetryRecord};
