use std::future::Future;
use std::time::{Duration, Instant};

use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// How characteristic values map onto the newline-framed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BleFraming {
    /// Each value is one complete snapshot; a delimiter is appended if missing.
    #[default]
    Value,
    /// Values are raw stream bytes that already carry delimiters.
    Stream,
}

/// BLE transport settings.
#[derive(Debug, Clone)]
pub struct BleConfig {
    /// Service advertised by the producer, used to filter discovery.
    pub service: Uuid,
    /// Characteristic carrying the state stream.
    pub characteristic: Uuid,
    /// Upper bound for one discovery pass.
    pub scan_timeout: Duration,
    /// Upper bound for every other BLE round trip.
    pub op_timeout: Duration,
    /// Minimum spacing between two characteristic reads.
    pub poll_interval: Duration,
    pub framing: BleFraming,
}

impl BleConfig {
    pub fn new(service: Uuid, characteristic: Uuid) -> Self {
        Self {
            service,
            characteristic,
            scan_timeout: Duration::from_secs(5),
            op_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(50),
            framing: BleFraming::default(),
        }
    }
}

const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(200);

struct Link {
    peripheral: Peripheral,
    characteristic: Characteristic,
}

/// Reads controller state from a GATT characteristic.
///
/// btleplug is async; every call is driven to completion on a private
/// current-thread runtime, so this transport is blocking like the others.
pub struct BleTransport {
    config: BleConfig,
    runtime: tokio::runtime::Runtime,
    link: Option<Link>,
    last_read: Option<Instant>,
}

impl BleTransport {
    pub fn new(config: BleConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            config,
            runtime,
            link: None,
            last_read: None,
        })
    }

    pub fn config(&self) -> &BleConfig {
        &self.config
    }

    fn block_on<F, T>(&self, timeout: Duration, fut: F) -> Result<T>
    where
        F: Future<Output = btleplug::Result<T>>,
    {
        self.runtime.block_on(async move {
            match tokio::time::timeout(timeout, fut).await {
                Ok(res) => res.map_err(TransportError::from),
                Err(_) => Err(TransportError::BleTimeout(timeout)),
            }
        })
    }

    fn first_adapter(&self) -> Result<Adapter> {
        let timeout = self.config.op_timeout;
        let adapters = self.block_on(timeout, async {
            let manager = Manager::new().await?;
            manager.adapters().await
        })?;
        adapters
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::NotYetAvailable {
                endpoint: self.endpoint(),
                reason: "no bluetooth adapter present".to_string(),
            })
    }

    fn discover(&self, adapter: &Adapter) -> Result<Option<Peripheral>> {
        let op_timeout = self.config.op_timeout;
        let filter = ScanFilter {
            services: vec![self.config.service],
        };
        scoped(
            || self.block_on(op_timeout, adapter.start_scan(filter)),
            || self.poll_advertisers(adapter),
            || {
                if let Err(err) = self.block_on(op_timeout, adapter.stop_scan()) {
                    debug!(error = %err, "failed to stop BLE scan");
                }
            },
        )
    }

    fn poll_advertisers(&self, adapter: &Adapter) -> Result<Option<Peripheral>> {
        let deadline = Instant::now() + self.config.scan_timeout;
        loop {
            let peripherals = self.block_on(self.config.op_timeout, adapter.peripherals())?;
            if let Some(peripheral) = self.find_advertising(peripherals)? {
                return Ok(Some(peripheral));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            self.runtime
                .block_on(tokio::time::sleep(SCAN_POLL_INTERVAL));
        }
    }

    fn find_advertising(&self, peripherals: Vec<Peripheral>) -> Result<Option<Peripheral>> {
        for peripheral in peripherals {
            let properties = self.block_on(self.config.op_timeout, peripheral.properties())?;
            let advertises = properties
                .map(|p| p.services.contains(&self.config.service))
                .unwrap_or(false);
            if advertises {
                return Ok(Some(peripheral));
            }
        }
        Ok(None)
    }

    fn bind(&self, peripheral: Peripheral) -> Result<Link> {
        self.block_on(self.config.op_timeout, peripheral.connect())?;
        let characteristic = release_on_error(self.find_characteristic(&peripheral), || {
            self.release(&peripheral)
        })?;
        Ok(Link {
            peripheral,
            characteristic,
        })
    }

    fn find_characteristic(&self, peripheral: &Peripheral) -> Result<Characteristic> {
        self.block_on(self.config.op_timeout, peripheral.discover_services())?;
        peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == self.config.characteristic)
            .ok_or_else(|| TransportError::Handshake {
                endpoint: self.endpoint(),
                reason: format!(
                    "characteristic {} not offered by device",
                    self.config.characteristic
                ),
            })
    }

    fn release(&self, peripheral: &Peripheral) {
        if let Err(err) = self.block_on(self.config.op_timeout, peripheral.disconnect()) {
            warn!(endpoint = %self.endpoint(), error = %err, "BLE disconnect failed");
        }
    }
}

/// Map one characteristic value onto stream bytes.
pub fn frame_value(value: Vec<u8>, framing: BleFraming) -> Bytes {
    if framing == BleFraming::Stream || value.is_empty() || value.ends_with(b"\n") {
        return Bytes::from(value);
    }
    let mut buf = BytesMut::with_capacity(value.len() + 1);
    buf.put_slice(&value);
    buf.put_u8(b'\n');
    buf.freeze()
}

/// Run `body` between `start` and `stop`. `stop` runs whenever `start` succeeded.
fn scoped<T>(
    start: impl FnOnce() -> Result<()>,
    body: impl FnOnce() -> Result<T>,
    stop: impl FnOnce(),
) -> Result<T> {
    start()?;
    let result = body();
    stop();
    result
}

/// Run `release` when `result` failed, then hand `result` back.
fn release_on_error<T>(result: Result<T>, release: impl FnOnce()) -> Result<T> {
    if result.is_err() {
        release();
    }
    result
}

/// Time left before the next read may start.
fn pacing_delay(last_read: Option<Instant>, interval: Duration, now: Instant) -> Duration {
    match last_read {
        Some(last) => (last + interval).saturating_duration_since(now),
        None => Duration::ZERO,
    }
}

impl Transport for BleTransport {
    fn connect(&mut self) -> Result<()> {
        if self.link.is_some() {
            return Ok(());
        }

        let adapter = self.first_adapter()?;
        let Some(peripheral) = self.discover(&adapter)? else {
            return Err(TransportError::NotYetAvailable {
                endpoint: self.endpoint(),
                reason: "no device advertising the service".to_string(),
            });
        };

        let link = self.bind(peripheral)?;
        info!(endpoint = %self.endpoint(), "connected to BLE characteristic");
        self.link = Some(link);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.last_read = None;
        if let Some(link) = self.link.take() {
            self.release(&link.peripheral);
            info!(endpoint = %self.endpoint(), "disconnected from BLE device");
        }
    }

    fn read_chunk(&mut self) -> Result<Bytes> {
        let Some(link) = self.link.as_ref() else {
            return Err(TransportError::NotConnected);
        };

        // Every poll returns a value, so the caller never sees an idle read.
        let wait = pacing_delay(self.last_read, self.config.poll_interval, Instant::now());
        if !wait.is_zero() {
            self.runtime.block_on(tokio::time::sleep(wait));
        }

        let read = self.block_on(
            self.config.op_timeout,
            link.peripheral.read(&link.characteristic),
        );
        self.last_read = Some(Instant::now());

        match read {
            Ok(value) => Ok(frame_value(value, self.config.framing)),
            Err(err) => {
                warn!(endpoint = %self.endpoint(), error = %err, "BLE read failed");
                self.disconnect();
                Err(err)
            }
        }
    }

    fn is_connected(&self) -> bool {
        match &self.link {
            Some(link) => self
                .block_on(self.config.op_timeout, link.peripheral.is_connected())
                .unwrap_or(false),
            None => false,
        }
    }

    fn transport_name(&self) -> &'static str {
        "ble-characteristic"
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", self.config.service, self.config.characteristic)
    }
}

impl Drop for BleTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for BleTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleTransport")
            .field("service", &self.config.service)
            .field("characteristic", &self.config.characteristic)
            .field("connected", &self.link.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    const SERVICE: Uuid = Uuid::from_u128(0x6e40_0001_b5a3_f393_e0a9_e50e_24dc_ca9e);
    const CHARACTERISTIC: Uuid = Uuid::from_u128(0x6e40_0003_b5a3_f393_e0a9_e50e_24dc_ca9e);

    #[test]
    fn value_framing_appends_delimiter() {
        let framed = frame_value(b"{\"a\":1}".to_vec(), BleFraming::Value);
        assert_eq!(framed.as_ref(), b"{\"a\":1}\n");

        let already = frame_value(b"{\"a\":1}\n".to_vec(), BleFraming::Value);
        assert_eq!(already.as_ref(), b"{\"a\":1}\n");
    }

    #[test]
    fn empty_value_stays_empty() {
        assert!(frame_value(Vec::new(), BleFraming::Value).is_empty());
    }

    #[test]
    fn stream_framing_passes_bytes_through() {
        let framed = frame_value(b"{\"a\":".to_vec(), BleFraming::Stream);
        assert_eq!(framed.as_ref(), b"{\"a\":");
    }

    #[test]
    fn scoped_stops_after_failed_body() {
        let stopped = Cell::new(0);
        let result: Result<()> = scoped(
            || Ok(()),
            || Err(TransportError::BleTimeout(Duration::from_secs(2))),
            || stopped.set(stopped.get() + 1),
        );

        assert!(matches!(result, Err(TransportError::BleTimeout(_))));
        assert_eq!(stopped.get(), 1);
    }

    #[test]
    fn scoped_stops_after_successful_body() {
        let stopped = Cell::new(0);
        let result = scoped(|| Ok(()), || Ok(7), || stopped.set(stopped.get() + 1));

        assert_eq!(result.unwrap(), 7);
        assert_eq!(stopped.get(), 1);
    }

    #[test]
    fn scoped_skips_stop_when_start_fails() {
        let ran_body = Cell::new(false);
        let stopped = Cell::new(false);
        let result: Result<()> = scoped(
            || Err(TransportError::NotConnected),
            || {
                ran_body.set(true);
                Ok(())
            },
            || stopped.set(true),
        );

        assert!(result.is_err());
        assert!(!ran_body.get());
        assert!(!stopped.get());
    }

    #[test]
    fn failed_bind_releases_the_link() {
        let released = Cell::new(false);
        let result: Result<()> = release_on_error(
            Err(TransportError::BleTimeout(Duration::from_secs(2))),
            || released.set(true),
        );

        assert!(result.is_err());
        assert!(released.get());
    }

    #[test]
    fn successful_bind_keeps_the_link() {
        let released = Cell::new(false);
        let result = release_on_error(Ok(3), || released.set(true));

        assert_eq!(result.unwrap(), 3);
        assert!(!released.get());
    }

    #[test]
    fn reads_are_spaced_by_poll_interval() {
        let interval = Duration::from_millis(50);
        let now = Instant::now();

        assert_eq!(pacing_delay(None, interval, now), Duration::ZERO);
        assert_eq!(
            pacing_delay(Some(now), interval, now + Duration::from_millis(20)),
            Duration::from_millis(30)
        );
        assert_eq!(
            pacing_delay(Some(now), interval, now + Duration::from_millis(80)),
            Duration::ZERO
        );
    }

    #[test]
    fn unconnected_transport_reports_state_without_touching_the_radio() {
        let mut transport = BleTransport::new(BleConfig::new(SERVICE, CHARACTERISTIC)).unwrap();

        assert!(!transport.is_connected());
        assert!(matches!(
            transport.read_chunk(),
            Err(TransportError::NotConnected)
        ));
        transport.disconnect();
        transport.disconnect();
        assert!(transport.endpoint().contains(&SERVICE.to_string()));
        assert_eq!(transport.transport_name(), "ble-characteristic");
    }
}
