use std::io;

use padwire_driver::{Driver, Flow, RetryPolicy, StopHandle};
use padwire_frame::{FrameConfig, StateObject};
use padwire_transport::{PipeTransport, Transport, DEFAULT_PIPE_PATH};
use tracing::{info, warn};

use crate::cmd::{Endpoint, WatchArgs};
use crate::exit::{driver_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_state, OutputFormat};

pub fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let policy = retry_policy(&args)?;
    let frame_config = frame_config(&args)?;
    let transport = open_endpoint(args.endpoint)?;
    let transport_name = transport.transport_name();
    let endpoint = transport.endpoint();

    let stop = StopHandle::new();
    install_ctrlc_handler(stop.clone())?;

    info!(transport = transport_name, %endpoint, "watching for controller state");

    let mut stdout = io::stdout().lock();
    let mut printed = 0u64;
    let mut write_error: Option<io::Error> = None;

    let consumer = |state: StateObject| {
        printed = printed.saturating_add(1);
        if let Err(err) = print_state(&mut stdout, printed, transport_name, &state, format) {
            write_error = Some(err);
            return Flow::Stop;
        }
        match args.count {
            Some(count) if printed >= count => Flow::Stop,
            _ => Flow::Continue,
        }
    };

    let mut driver = Driver::new(transport, consumer)
        .with_retry_policy(policy)
        .with_frame_config(frame_config)
        .with_stop_handle(stop);

    let result = driver.run();
    drop(driver);

    let summary = result.map_err(|err| driver_error("watch failed", err))?;
    info!(
        states = summary.states,
        frame_errors = summary.frame_errors,
        reconnects = summary.reconnects,
        connect_attempts = summary.connect_attempts,
        "watch finished"
    );

    match write_error {
        Some(err) if err.kind() == io::ErrorKind::BrokenPipe => {
            warn!("stdout closed");
            Ok(SUCCESS)
        }
        Some(err) => Err(CliError::new(FAILURE, format!("write failed: {err}"))),
        None => Ok(SUCCESS),
    }
}

fn retry_policy(args: &WatchArgs) -> CliResult<RetryPolicy> {
    if args.max_connect_interval < args.connect_interval {
        return Err(CliError::new(
            USAGE,
            "--max-connect-interval must not be shorter than --connect-interval",
        ));
    }

    let mut policy = RetryPolicy {
        connect_interval: args.connect_interval,
        max_connect_interval: args.max_connect_interval,
        idle_interval: args.idle_interval,
        ..RetryPolicy::default()
    };
    if let Some(attempts) = args.max_attempts {
        if attempts == 0 {
            return Err(CliError::new(USAGE, "--max-attempts must be at least 1"));
        }
        policy = policy.with_max_attempts(attempts);
    }
    Ok(policy)
}

fn frame_config(args: &WatchArgs) -> CliResult<FrameConfig> {
    match args.max_buffer {
        Some(0) => Err(CliError::new(USAGE, "--max-buffer must be at least 1")),
        Some(max_buffer_size) => Ok(FrameConfig { max_buffer_size }),
        None => Ok(FrameConfig::default()),
    }
}

fn open_endpoint(endpoint: Endpoint) -> CliResult<Box<dyn Transport>> {
    match endpoint {
        Endpoint::Pipe(args) => {
            let path = args.path.unwrap_or_else(|| DEFAULT_PIPE_PATH.into());
            Ok(Box::new(PipeTransport::new(path)))
        }
        #[cfg(unix)]
        Endpoint::Socket(args) => Ok(Box::new(padwire_transport::SocketTransport::new(
            args.path,
        ))),
        #[cfg(feature = "ble")]
        Endpoint::Ble(args) => {
            let mut config = padwire_transport::BleConfig::new(args.service, args.characteristic);
            config.framing = args.framing.into();
            config.scan_timeout = args.scan_timeout;
            config.poll_interval = args.poll_interval;
            let transport = padwire_transport::BleTransport::new(config)
                .map_err(|err| crate::exit::transport_error("BLE setup failed", err))?;
            Ok(Box::new(transport))
        }
    }
}

fn install_ctrlc_handler(stop: StopHandle) -> CliResult<()> {
    ctrlc::set_handler(move || {
        stop.stop();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;

    use super::*;

    fn parse(args: &[&str]) -> WatchArgs {
        let mut argv = vec!["padwire", "watch"];
        argv.extend_from_slice(args);
        match crate::Cli::try_parse_from(argv).unwrap().command {
            crate::cmd::Command::Watch(watch) => watch,
            other => panic!("expected watch, got {other:?}"),
        }
    }

    #[test]
    fn defaults_match_library_policy() {
        let args = parse(&["pipe", "/tmp/x.pipe"]);
        assert_eq!(retry_policy(&args).unwrap(), RetryPolicy::default());
        assert_eq!(
            frame_config(&args).unwrap().max_buffer_size,
            FrameConfig::default().max_buffer_size
        );
    }

    #[test]
    fn flags_fill_policy() {
        let args = parse(&[
            "pipe",
            "--connect-interval",
            "10ms",
            "--max-connect-interval",
            "40ms",
            "--max-attempts",
            "3",
            "--max-buffer",
            "64",
        ]);
        let policy = retry_policy(&args).unwrap();
        assert_eq!(policy.connect_interval, Duration::from_millis(10));
        assert_eq!(policy.max_connect_interval, Duration::from_millis(40));
        assert_eq!(policy.max_attempts, Some(3));
        assert_eq!(frame_config(&args).unwrap().max_buffer_size, 64);
    }

    #[test]
    fn rejects_zero_budgets() {
        let args = parse(&["pipe", "--max-attempts", "0"]);
        assert_eq!(retry_policy(&args).unwrap_err().code, USAGE);

        let args = parse(&["pipe", "--max-buffer", "0"]);
        assert_eq!(frame_config(&args).unwrap_err().code, USAGE);
    }

    #[test]
    fn rejects_inverted_intervals() {
        let args = parse(&[
            "pipe",
            "--connect-interval",
            "2s",
            "--max-connect-interval",
            "1s",
        ]);
        assert_eq!(retry_policy(&args).unwrap_err().code, USAGE);
    }

    #[test]
    fn pipe_endpoint_defaults_to_platform_path() {
        if std::env::var_os("PADWIRE_PIPE").is_some() {
            return;
        }
        let args = parse(&["pipe"]);
        let transport = open_endpoint(args.endpoint).unwrap();
        assert_eq!(transport.transport_name(), "named-pipe");
        assert_eq!(transport.endpoint(), DEFAULT_PIPE_PATH);
    }

    #[cfg(unix)]
    #[test]
    fn socket_endpoint_takes_path() {
        let args = parse(&["socket", "/tmp/pad.sock", "--count", "2"]);
        assert_eq!(args.count, Some(2));
        let transport = open_endpoint(args.endpoint).unwrap();
        assert_eq!(transport.transport_name(), "unix-domain-socket");
        assert_eq!(transport.endpoint(), "/tmp/pad.sock");
    }
}
