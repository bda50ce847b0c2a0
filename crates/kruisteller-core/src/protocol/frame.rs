//! Line framing
//!
//! Serial reads arrive in arbitrary chunks. The assembler accumulates them and hands out
//! each newline-terminated line exactly once.

use super::LINE_TERMINATOR;

/// Accumulates raw serial bytes into complete lines
#[derive(Debug, Default)]
pub struct FrameAssembler {
    /// Bytes received since the last newline
    buffer: Vec<u8>,
}

impl FrameAssembler {
    /// Create an empty assembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completes, terminator included.
    ///
    /// Bytes after the last newline stay buffered for the next call. Decoding happens per
    /// completed line, so multi-byte characters split across reads survive intact. The
    /// buffer is unbounded: a controller that never sends a newline grows it indefinitely.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            self.buffer.push(byte);
            if byte == LINE_TERMINATOR {
                lines.push(String::from_utf8_lossy(&self.buffer).into_owned());
                self.buffer.clear();
            }
        }
        lines
    }

    /// Bytes waiting for a newline
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Whether a partial line is buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
