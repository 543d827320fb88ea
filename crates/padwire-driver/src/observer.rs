use padwire_frame::{FrameError, StateObject};
use padwire_transport::TransportError;
use tracing::{debug, info, warn};

use crate::driver::DriverState;
use crate::error::DisconnectReason;

/// What the driver should do after handing over a state object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Receives decoded state objects in receipt order.
///
/// Runs on the read path; keep it short.
pub trait Consumer {
    fn on_state(&mut self, state: StateObject) -> Flow;
}

impl<F> Consumer for F
where
    F: FnMut(StateObject) -> Flow,
{
    fn on_state(&mut self, state: StateObject) -> Flow {
        self(state)
    }
}

/// Hooks for everything the driver tolerates instead of failing on.
pub trait Observer {
    fn on_state_change(&mut self, _from: DriverState, _to: DriverState) {}

    /// `attempt` counts failures since the last successful connect.
    fn on_connect_failed(&mut self, _err: &TransportError, _attempt: u32) {}

    fn on_frame_error(&mut self, _err: &FrameError) {}

    fn on_disconnect(&mut self, _reason: &DisconnectReason) {}
}

/// Silent observer.
impl Observer for () {}

/// Default observer: structured logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_state_change(&mut self, from: DriverState, to: DriverState) {
        match to {
            DriverState::Connecting if from == DriverState::Connected => {
                info!("reconnecting");
            }
            DriverState::Connecting => info!("waiting for producer"),
            DriverState::Connected => info!("connected"),
            DriverState::Stopped => info!("stopped"),
        }
    }

    fn on_connect_failed(&mut self, err: &TransportError, attempt: u32) {
        if err.is_not_yet_available() {
            debug!(attempt, error = %err, "endpoint not available yet");
        } else {
            warn!(attempt, error = %err, "connect failed");
        }
    }

    fn on_frame_error(&mut self, err: &FrameError) {
        warn!(error = %err, "dropping malformed frame");
    }

    fn on_disconnect(&mut self, reason: &DisconnectReason) {
        warn!(reason = %reason, "connection dropped");
    }
}
