use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::exit::{parse_duration, CliResult};
use crate::output::OutputFormat;

pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stream controller states from a producer until stopped.
    Watch(WatchArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Watch(args) => watch::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(subcommand)]
    pub endpoint: Endpoint,

    /// Delay after the first failed connect (e.g. 300ms, 1s).
    #[arg(long, global = true, default_value = "300ms", value_parser = parse_duration)]
    pub connect_interval: Duration,

    /// Upper bound for the connect delay.
    #[arg(long, global = true, default_value = "2s", value_parser = parse_duration)]
    pub max_connect_interval: Duration,

    /// Give up after N failed connects in a row. Default: retry forever.
    #[arg(long, global = true, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Pause after a read that returned no data.
    #[arg(long, global = true, default_value = "50ms", value_parser = parse_duration)]
    pub idle_interval: Duration,

    /// Maximum bytes buffered without a newline.
    #[arg(long, global = true, value_name = "BYTES")]
    pub max_buffer: Option<usize>,

    /// Exit after receiving N states.
    #[arg(long, global = true, value_name = "N")]
    pub count: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Endpoint {
    /// Read from a named pipe (Windows pipe instance or Unix FIFO).
    Pipe(PipeArgs),
    /// Read from a Unix domain socket.
    #[cfg(unix)]
    Socket(SocketArgs),
    /// Read from a Bluetooth LE characteristic.
    #[cfg(feature = "ble")]
    Ble(BleArgs),
}

#[derive(Args, Debug)]
pub struct PipeArgs {
    /// Pipe path. Default: the platform pipe used by the controller reader.
    #[arg(env = "PADWIRE_PIPE")]
    pub path: Option<PathBuf>,
}

#[cfg(unix)]
#[derive(Args, Debug)]
pub struct SocketArgs {
    /// Socket path to connect to.
    #[arg(env = "PADWIRE_SOCKET")]
    pub path: PathBuf,
}

#[cfg(feature = "ble")]
#[derive(Args, Debug)]
pub struct BleArgs {
    /// Service UUID advertised by the producer.
    #[arg(long, env = "PADWIRE_BLE_SERVICE")]
    pub service: padwire_transport::Uuid,
    /// Characteristic UUID carrying the state stream.
    #[arg(long, env = "PADWIRE_BLE_CHARACTERISTIC")]
    pub characteristic: padwire_transport::Uuid,
    /// How characteristic values map onto lines.
    #[arg(long, value_enum, default_value = "value")]
    pub framing: BleFramingArg,
    /// Upper bound for one discovery pass.
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    pub scan_timeout: Duration,
    /// Minimum spacing between characteristic reads.
    #[arg(long, default_value = "50ms", value_parser = parse_duration)]
    pub poll_interval: Duration,
}

#[cfg(feature = "ble")]
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum BleFramingArg {
    /// Each value is one complete state.
    Value,
    /// Values are raw newline-delimited stream bytes.
    Stream,
}

#[cfg(feature = "ble")]
impl From<BleFramingArg> for padwire_transport::BleFraming {
    fn from(arg: BleFramingArg) -> Self {
        match arg {
            BleFramingArg::Value => Self::Value,
            BleFramingArg::Stream => Self::Stream,
        }
    }
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
