use padwire_frame::FrameError;
use padwire_transport::TransportError;

/// Errors that end a driver run.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// `RetryPolicy::max_attempts` connect attempts failed in a row.
    #[error("gave up after {attempts} connect attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: TransportError,
    },
}

/// Why an established connection was dropped.
#[derive(Debug, thiserror::Error)]
pub enum DisconnectReason {
    /// The transport reported a read failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The stream lost framing synchronization.
    #[error("framing lost: {0}")]
    Framing(#[from] FrameError),

    /// The transport stopped reporting a live link.
    #[error("link lost")]
    LinkLost,
}

pub type Result<T> = std::result::Result<T, DriverError>;
