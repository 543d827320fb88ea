use bytes::{Buf, BytesMut};
use tracing::warn;

use crate::codec::{decode_line, FrameConfig, StateObject, DELIMITER};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Turns arbitrary byte chunks into state objects.
///
/// Partial frames carry over between [`feed`](Self::feed) calls. A bad frame
/// yields one error and never affects the frames around it.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    /// Prefix of `buf` already known to hold no delimiter.
    scanned: usize,
    config: FrameConfig,
}

impl FrameDecoder {
    /// Create a decoder with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a decoder with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            scanned: 0,
            config,
        }
    }

    /// Append a chunk and iterate over every frame it completes.
    ///
    /// Frames left unread when the iterator is dropped stay buffered and are
    /// returned by the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Decoded<'_> {
        self.buf.extend_from_slice(chunk);
        Decoded { decoder: self }
    }

    /// Extract the next complete frame from the buffer, if any.
    pub fn next_frame(&mut self) -> Option<Result<StateObject>> {
        loop {
            let Some(offset) = self.buf[self.scanned..]
                .iter()
                .position(|&b| b == DELIMITER)
            else {
                self.scanned = self.buf.len();
                return self.check_overflow();
            };

            let line = self.buf.split_to(self.scanned + offset);
            self.buf.advance(1);
            self.scanned = 0;

            if line.is_empty() {
                continue;
            }
            return Some(decode_line(&line));
        }
    }

    fn check_overflow(&mut self) -> Option<Result<StateObject>> {
        let max = self.config.max_buffer_size;
        if self.buf.len() <= max {
            return None;
        }

        let size = self.buf.len();
        warn!(size, max, "decode buffer overflow, discarding");
        self.reset();
        Some(Err(FrameError::BufferOverflow { size, max }))
    }

    /// Discard any partially buffered frame.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.scanned = 0;
    }

    /// Bytes currently held waiting for a delimiter.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Current decoder configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Frames completed by one [`FrameDecoder::feed`] call.
#[derive(Debug)]
pub struct Decoded<'a> {
    decoder: &'a mut FrameDecoder,
}

impl Iterator for Decoded<'_> {
    type Item = Result<StateObject>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.next_frame()
    }
}
