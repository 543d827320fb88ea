//! Read-only byte-stream transports for controller state.
//!
//! Every backend implements the same [`Transport`] capability:
//! - Named pipes (Windows pipe instances, Unix FIFOs)
//! - Unix domain sockets (Linux/macOS)
//! - Bluetooth LE characteristics (behind the `ble` feature)
//!
//! This is the lowest layer of padwire. Framing and reconnect policy live
//! above it and are written once against the trait.

pub mod error;
pub mod pipe;
pub mod traits;

#[cfg(unix)]
pub mod socket;

#[cfg(feature = "ble")]
pub mod ble;

pub use error::{Result, TransportError};
pub use pipe::{PipeConfig, PipeTransport, DEFAULT_PIPE_PATH};
pub use traits::{Transport, DEFAULT_READ_SIZE};

#[cfg(unix)]
pub use socket::{SocketConfig, SocketTransport};

#[cfg(feature = "ble")]
pub use ble::{BleConfig, BleFraming, BleTransport};
#[cfg(feature = "ble")]
pub use uuid::Uuid;
