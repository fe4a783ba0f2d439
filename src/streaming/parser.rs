//! Incremental decoder for NUL-delimited JSON frames
//!
//! The streaming `/generate` body is a sequence of UTF-8 JSON documents,
//! each terminated by a single `0x00` byte. There is no length prefix, so
//! bytes are buffered until a delimiter arrives:
//!
//! ```text
//! {"text":["Hel"]}\0{"text":["Hello"]}\0{"text":["Hello wo
//! └──── frame 1 ───┘ └───── frame 2 ────┘ └── pending ──
//! ```
//!
//! The decoder works on raw bytes, so a delimiter (or a multi-byte UTF-8
//! sequence) may be split across any number of pushes.

use crate::errors::{ClientError, Result};
use crate::types::decode_text_bytes;

/// Frame terminator
pub const FRAME_DELIMITER: u8 = 0;

/// Maximum size of a single frame (16MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1_048_576;

/// Incremental frame decoder
#[derive(Debug)]
pub struct FrameDecoder {
    /// Accumulation buffer
    buffer: Vec<u8>,

    /// Prefix of `buffer` already known to hold no delimiter
    scanned: usize,

    /// Maximum frame size
    max_frame_size: usize,
}

impl FrameDecoder {
    /// Create a decoder with the default frame limit
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_FRAME_SIZE)
    }

    /// Create a decoder with a custom frame limit
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            scanned: 0,
            max_frame_size,
        }
    }

    /// Append bytes read from the connection
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(bytes);

        // Only the unterminated tail counts against the limit; complete
        // frames in the buffer are checked as they are taken.
        if self.delimiter_position().is_none() && self.buffer.len() > self.max_frame_size {
            return Err(ClientError::FrameTooLarge {
                size: self.buffer.len(),
                max: self.max_frame_size,
            });
        }

        Ok(())
    }

    /// Decode the next complete frame, if one is buffered
    ///
    /// Returns the frame's `text` array. The delimiter is consumed with the
    /// frame. A corrupt frame is an error; the decoder does not skip ahead.
    pub fn next_frame(&mut self) -> Result<Option<Vec<String>>> {
        let Some(end) = self.delimiter_position() else {
            self.scanned = self.buffer.len();
            return Ok(None);
        };

        if end > self.max_frame_size {
            return Err(ClientError::FrameTooLarge {
                size: end,
                max: self.max_frame_size,
            });
        }

        let text = decode_text_bytes(&self.buffer[..end]);
        self.buffer.drain(..=end);
        self.scanned = 0;

        text.map(Some)
    }

    /// Signal end of input
    ///
    /// Leftover bytes mean the connection dropped in the middle of a frame.
    pub fn finish(&self) -> Result<()> {
        if self.buffer.is_empty() {
            Ok(())
        } else {
            Err(ClientError::TruncatedStream {
                buffered: self.buffer.len(),
            })
        }
    }

    /// Get current buffer size
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }

    fn delimiter_position(&self) -> Option<usize> {
        self.buffer[self.scanned..]
            .iter()
            .position(|&b| b == FRAME_DELIMITER)
            .map(|pos| self.scanned + pos)
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
