/// Errors that can occur while decoding the state stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame is not valid UTF-8.
    #[error("frame is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// The frame is not a valid JSON value.
    #[error("frame is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    /// The decode buffer grew past its cap without seeing a delimiter.
    #[error("decode buffer overflow ({size} bytes without a delimiter, max {max})")]
    BufferOverflow { size: usize, max: usize },
}

impl FrameError {
    /// True when the error concerns a single frame and decoding can go on.
    ///
    /// `BufferOverflow` means the stream lost synchronization; the caller
    /// should drop the connection.
    pub fn is_frame_scoped(&self) -> bool {
        !matches!(self, FrameError::BufferOverflow { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
