use padwire_frame::{FrameConfig, FrameDecoder};
use padwire_transport::Transport;
use tracing::debug;

use crate::error::{DisconnectReason, DriverError, Result};
use crate::observer::{Consumer, Flow, Observer, TracingObserver};
use crate::policy::RetryPolicy;
use crate::stop::StopHandle;

/// Driver lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Connecting,
    Connected,
    Stopped,
}

/// Counters for one driver run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// State objects handed to the consumer.
    pub states: u64,
    /// Frames dropped for bad UTF-8 or JSON.
    pub frame_errors: u64,
    /// Established connections that were dropped and retried.
    pub reconnects: u64,
    /// Calls to `Transport::connect`, successful or not.
    pub connect_attempts: u64,
}

/// Owns one transport and one decoder and moves state objects from the
/// first to the consumer, reconnecting whenever the stream breaks.
///
/// The transport is disconnected on every exit from [`run`](Self::run) and
/// again when the driver is dropped.
pub struct Driver<T: Transport, C: Consumer, O: Observer = TracingObserver> {
    transport: T,
    decoder: FrameDecoder,
    consumer: C,
    observer: O,
    policy: RetryPolicy,
    stop: StopHandle,
    state: DriverState,
    summary: RunSummary,
}

impl<T: Transport, C: Consumer> Driver<T, C, TracingObserver> {
    /// Create a driver that logs through `tracing`.
    pub fn new(transport: T, consumer: C) -> Self {
        Self::with_observer(transport, consumer, TracingObserver)
    }
}

impl<T: Transport, C: Consumer, O: Observer> Driver<T, C, O> {
    /// Create a driver reporting to a custom observer.
    pub fn with_observer(transport: T, consumer: C, observer: O) -> Self {
        Self {
            transport,
            decoder: FrameDecoder::new(),
            consumer,
            observer,
            policy: RetryPolicy::default(),
            stop: StopHandle::new(),
            state: DriverState::Connecting,
            summary: RunSummary::default(),
        }
    }

    /// Override connect/idle timing.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override decoder limits.
    pub fn with_frame_config(mut self, config: FrameConfig) -> Self {
        self.decoder = FrameDecoder::with_config(config);
        self
    }

    /// Share an existing stop flag (e.g. one wired to Ctrl+C).
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// A handle that stops this driver from any thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    /// Run until stopped by the stop handle or the consumer.
    ///
    /// Transport trouble never ends the run; only an exhausted
    /// `max_attempts` budget does.
    pub fn run(&mut self) -> Result<RunSummary> {
        let result = self.run_inner();
        self.transport.disconnect();
        self.decoder.reset();
        self.set_state(DriverState::Stopped);
        result.map(|()| self.summary.clone())
    }

    fn run_inner(&mut self) -> Result<()> {
        if self.state == DriverState::Stopped {
            self.set_state(DriverState::Connecting);
        }
        let mut failed_attempts = 0u32;

        while !self.stop.is_stopped() {
            match self.state {
                DriverState::Connecting => {
                    self.summary.connect_attempts += 1;
                    match self.transport.connect() {
                        Ok(()) => {
                            failed_attempts = 0;
                            self.decoder.reset();
                            self.set_state(DriverState::Connected);
                        }
                        Err(err) => {
                            failed_attempts = failed_attempts.saturating_add(1);
                            self.observer.on_connect_failed(&err, failed_attempts);
                            if self.policy.is_exhausted(failed_attempts) {
                                return Err(DriverError::RetriesExhausted {
                                    attempts: failed_attempts,
                                    last: err,
                                });
                            }
                            let delay = self.policy.delay_for(failed_attempts);
                            debug!(?delay, attempt = failed_attempts, "retrying connect");
                            self.stop.sleep(delay);
                        }
                    }
                }
                DriverState::Connected => match self.pump() {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Stop) => return Ok(()),
                    Err(reason) => self.drop_connection(reason),
                },
                DriverState::Stopped => return Ok(()),
            }
        }

        Ok(())
    }

    /// One read, fully decoded and delivered.
    fn pump(&mut self) -> std::result::Result<Flow, DisconnectReason> {
        let chunk = self.transport.read_chunk()?;

        if chunk.is_empty() {
            if !self.transport.is_connected() {
                return Err(DisconnectReason::LinkLost);
            }
            self.stop.sleep(self.policy.idle_interval);
            return Ok(Flow::Continue);
        }

        for result in self.decoder.feed(&chunk) {
            match result {
                Ok(state) => {
                    self.summary.states += 1;
                    if self.consumer.on_state(state) == Flow::Stop {
                        return Ok(Flow::Stop);
                    }
                }
                Err(err) if err.is_frame_scoped() => {
                    self.summary.frame_errors += 1;
                    self.observer.on_frame_error(&err);
                }
                Err(err) => return Err(DisconnectReason::Framing(err)),
            }
        }

        if !self.transport.is_connected() {
            return Err(DisconnectReason::LinkLost);
        }
        Ok(Flow::Continue)
    }

    fn drop_connection(&mut self, reason: DisconnectReason) {
        self.observer.on_disconnect(&reason);
        self.transport.disconnect();
        self.decoder.reset();
        self.summary.reconnects += 1;
        self.set_state(DriverState::Connecting);
    }

    fn set_state(&mut self, to: DriverState) {
        let from = self.state;
        if from != to {
            self.state = to;
            self.observer.on_state_change(from, to);
        }
    }
}

impl<T: Transport, C: Consumer, O: Observer> Drop for Driver<T, C, O> {
    fn drop(&mut self) {
        self.transport.disconnect();
    }
}
