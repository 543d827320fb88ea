use bytes::{BufMut, BytesMut};

use crate::error::Result;

/// Frame delimiter: one newline (0x0A) after every JSON value.
pub const DELIMITER: u8 = b'\n';

/// Default cap on bytes buffered without a delimiter: 1 MiB.
pub const DEFAULT_MAX_BUFFER: usize = 1024 * 1024;

/// One controller-state snapshot. The schema is opaque; only syntax is checked.
pub type StateObject = serde_json::Value;

/// Decode one frame (delimiter already stripped) into a state object.
///
/// Wire format:
/// ```text
/// ┌──────────────────────────────┬──────┐
/// │ UTF-8 JSON value (one line)  │ 0x0A │
/// └──────────────────────────────┴──────┘
/// ```
pub fn decode_line(line: &[u8]) -> Result<StateObject> {
    let text = std::str::from_utf8(line)?;
    Ok(serde_json::from_str(text)?)
}

/// Encode a state object as one frame, delimiter included.
///
/// Compact JSON escapes newlines inside strings, so the output never
/// contains a raw delimiter before the final one.
pub fn encode_line(state: &StateObject, dst: &mut BytesMut) -> Result<()> {
    serde_json::to_writer(dst.writer(), state)?;
    dst.put_u8(DELIMITER);
    Ok(())
}

/// Configuration for the frame decoder.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum bytes held without a delimiter. Default: 1 MiB.
    pub max_buffer_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: DEFAULT_MAX_BUFFER,
        }
    }
}
