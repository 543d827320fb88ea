//! Reliable controller-state streaming over pipes, sockets and BLE.
//!
//! padwire reads newline-delimited JSON snapshots written by a controller
//! reader process and hands them to your code one at a time, waiting for the
//! producer to appear and reconnecting when the stream breaks.
//!
//! # Crate Structure
//!
//! - [`transport`] — Read-only transports (named pipes, Unix sockets, BLE behind `ble`)
//! - [`frame`] — Newline-delimited JSON decoding
//! - [`driver`] — Connect/read/decode/reconnect loop
//!
//! ```no_run
//! use padwire::driver::{Driver, Flow};
//! use padwire::transport::{PipeTransport, DEFAULT_PIPE_PATH};
//!
//! let transport = PipeTransport::new(DEFAULT_PIPE_PATH);
//! let mut driver = Driver::new(transport, |state| {
//!     println!("Controller state: {state}");
//!     Flow::Continue
//! });
//! driver.run()?;
//! # Ok::<(), padwire::driver::DriverError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use padwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use padwire_frame::*;
}

/// Re-export driver types.
pub mod driver {
    pub use padwire_driver::*;
}
