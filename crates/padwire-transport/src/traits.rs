use bytes::Bytes;

use crate::error::Result;

/// Default size of one bounded read.
pub const DEFAULT_READ_SIZE: usize = 4096;

/// A read-only byte-stream endpoint carrying controller state.
///
/// Implementations own their connection resource exclusively. None of the
/// methods retry internally: every call reports a single outcome and the
/// caller decides whether to try again.
pub trait Transport {
    /// Open the endpoint.
    ///
    /// Returns [`TransportError::NotYetAvailable`](crate::TransportError::NotYetAvailable)
    /// while the producer has not created it yet. Must not block past the
    /// transport's own bounded timeouts.
    fn connect(&mut self) -> Result<()>;

    /// Release the endpoint. Idempotent, never fails; teardown errors are logged.
    fn disconnect(&mut self);

    /// Perform one bounded read.
    ///
    /// An empty chunk means "no data right now", not end of stream. On error
    /// the transport is already disconnected when this returns.
    fn read_chunk(&mut self) -> Result<Bytes>;

    /// Live link state.
    fn is_connected(&self) -> bool;

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str;

    /// Human-readable endpoint identifier (path, UUID pair).
    fn endpoint(&self) -> String;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }

    fn read_chunk(&mut self) -> Result<Bytes> {
        (**self).read_chunk()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn transport_name(&self) -> &'static str {
        (**self).transport_name()
    }

    fn endpoint(&self) -> String {
        (**self).endpoint()
    }
}
