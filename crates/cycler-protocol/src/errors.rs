//! Error Handling Guidelines
//!
//! All error messages should follow this format:
//!
//! 1. **What failed**: Describe the operation that failed
//! 2. **Why it failed**: Provide the root cause if known
//! 3. **What to do**: Suggest user action when possible
//!
//! Expected link conditions (delivery timeout, malformed telemetry,
//! handshake noise) are events or silent branches, not errors. An
//! error here means the run cannot continue as-is.

use thiserror::Error;

/// Unified error type for the control core
#[derive(Error, Debug, Clone)]
pub enum CyclerError {
    /// Phase transition was rejected
    #[error("Invalid phase transition: {0}")]
    InvalidTransition(String),

    /// Communication channel closed
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Serial link lost or unusable
    #[error("Link unavailable: {0}")]
    LinkUnavailable(String),

    /// Invalid program or engine configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for CyclerError {
    fn from(s: String) -> Self {
        CyclerError::Other(s)
    }
}

impl From<&str> for CyclerError {
    fn from(s: &str) -> Self {
        CyclerError::Other(s.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CyclerError::InvalidTransition("Completed → Startup".into());
        assert_eq!(
            err.to_string(),
            "Invalid phase transition: Completed → Startup"
        );
    }

    #[test]
    fn test_error_from_string() {
        let err: CyclerError = "Test error".into();
        match err {
            CyclerError::Other(msg) => assert_eq!(msg, "Test error"),
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_link_unavailable_display() {
        let err = CyclerError::LinkUnavailable("write failed: device removed".into());
        assert!(err.to_string().contains("Link unavailable"));
    }
}
