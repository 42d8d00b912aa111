/// Buffers input and emits a line whenever a newline is encountered.
///
/// NOTE: Dealing with mixed line endings (CRLF vs LF) in a streaming
/// fashion can be tricky. This implementation treats `\n` as the only
/// delimiter and leaves any `\r` in the emitted bytes; consumers trim.
#[derive(Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(256),
        }
    }

    /// Push a chunk of bytes, returning every complete line it closes.
    ///
    /// Emitted lines include their terminating `\n`. A partial line
    /// stays buffered until a later chunk completes it.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();
        for &b in bytes {
            self.buffer.push(b);
            if b == b'\n' {
                lines.push(std::mem::take(&mut self.buffer));
            }
        }
        lines
    }

    /// Discard any buffered partial line.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}
