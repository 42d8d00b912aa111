//! # Cycler Engine
//!
//! Behaviour for the thermolink control core.
//!
//! ## Components
//!
//! - **LinkEngine**: Drives the serial link on a fixed tick - queued
//!   outbound messages with ACK/retry delivery, sync handshake
//!   replies, and telemetry decoding
//! - **CycleSequencer**: Walks a [`cycler_protocol::ProgramSpec`]
//!   through the cycle phase machine with stop/pause/end controls
//! - **CyclerController**: Facade that owns both tasks and the event
//!   channel to presentation sinks
//!
//! ## Task Layout
//!
//! ```text
//! CyclerController ──spawn──► LinkEngine::run   (100 ms tick)
//!        │
//!        └──start()──► CycleSequencer::run      (one task per run)
//!
//! both ──SystemEvent──► bounded event channel ──► presentation sink
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod config;
pub mod constants;
pub mod controller;
pub mod decoder;
pub mod engine;
pub mod logging;
pub mod sequencer;
pub mod timer;

pub use config::{LinkConfig, SequencerConfig};
pub use controller::CyclerController;
pub use decoder::TelemetryDecoder;
pub use engine::{LinkEngine, LinkHandle};
pub use sequencer::{ControlFlags, CycleSequencer, SequencerHandle};
pub use timer::IntervalTimer;
