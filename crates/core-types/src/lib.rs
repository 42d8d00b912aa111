//! # Core Types
//!
//! Transport abstraction and line framing shared by the control core.
//!
//! This crate has no dependency on the engine or the async runtime,
//! making it fully testable in plain native Rust. The engine drives a
//! [`Transport`] on a fixed tick and feeds raw chunks through a
//! [`LineFramer`] to recover newline-terminated lines.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod framing;
pub mod transport;

pub use framing::LineFramer;
pub use transport::{Transport, TransportError};
