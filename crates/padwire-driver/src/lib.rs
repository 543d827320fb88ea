//! Connect/read/decode/reconnect loop for controller state streams.
//!
//! This is the "just works" layer. Hand a [`Driver`] any transport and a
//! consumer; it waits for the producer, decodes the stream, and survives
//! disconnects until told to stop.

pub mod driver;
pub mod error;
pub mod observer;
pub mod policy;
pub mod stop;

pub use driver::{Driver, DriverState, RunSummary};
pub use error::{DisconnectReason, DriverError, Result};
pub use observer::{Consumer, Flow, Observer, TracingObserver};
pub use policy::RetryPolicy;
pub use stop::StopHandle;
