/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint does not exist yet (producer not started, device not advertising).
    #[error("endpoint {endpoint} not available yet: {reason}")]
    NotYetAvailable { endpoint: String, reason: String },

    /// Failed to open the specified endpoint.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },

    /// The endpoint was reached but refused to serve the expected channel.
    #[error("handshake with {endpoint} failed: {reason}")]
    Handshake { endpoint: String, reason: String },

    /// An I/O error occurred on an established stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: std::path::PathBuf,
        len: usize,
        max: usize,
    },

    /// The producer closed its end of the stream.
    #[error("stream closed by peer")]
    Closed,

    /// `read_chunk` was called without a live connection.
    #[error("transport not connected")]
    NotConnected,

    /// A Bluetooth LE operation failed.
    #[cfg(feature = "ble")]
    #[error("BLE error: {0}")]
    Ble(#[from] btleplug::Error),

    /// A Bluetooth LE operation did not complete in time.
    #[cfg(feature = "ble")]
    #[error("BLE operation timed out after {0:?}")]
    BleTimeout(std::time::Duration),
}

impl TransportError {
    /// True for the expected "endpoint not there yet" condition.
    ///
    /// Callers retry every transport error, but only this one is quiet.
    pub fn is_not_yet_available(&self) -> bool {
        matches!(self, TransportError::NotYetAvailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
