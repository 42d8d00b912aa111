use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(String),
    #[error("Not connected")]
    NotConnected,
    #[error("Other: {0}")]
    Other(String),
}

/// A byte-oriented serial link (physical port, PTY, mock).
///
/// The engine polls on a fixed cadence, so reads are non-blocking:
/// `try_read` returns whatever bytes have arrived since the last call,
/// or `None` when the line is idle. Chunk boundaries carry no meaning;
/// line reassembly is the framer's job.
pub trait Transport: Send {
    /// Drain any bytes currently available.
    ///
    /// Returns `Ok(None)` when no data is waiting. An error means the
    /// link is gone, not that the read would block.
    fn try_read(&mut self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Write bytes to the link.
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;
}
