//! Print every controller state streamed through a named pipe.
//!
//! Run with:
//!   cargo run --example print-states -- /tmp/xbox-reader.pipe
//!
//! Without an argument the platform default pipe is used. The example waits
//! until the producer creates the pipe and keeps reading across producer
//! restarts. Stop it with Ctrl+C (the process exits; the pipe handle is
//! released by the OS) or let it stop itself after 100 states.

use padwire::driver::{Driver, Flow, RetryPolicy};
use padwire::transport::{PipeTransport, DEFAULT_PIPE_PATH};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_PIPE_PATH.to_string());

    eprintln!("Waiting for controller stream on {path}...");

    let mut remaining = 100usize;
    let mut driver = Driver::new(PipeTransport::new(&path), move |state| {
        println!("Controller state: {state}");
        remaining -= 1;
        if remaining == 0 {
            Flow::Stop
        } else {
            Flow::Continue
        }
    })
    .with_retry_policy(RetryPolicy::default());

    let summary = driver.run()?;
    eprintln!(
        "Received {} states ({} malformed frames, {} reconnects)",
        summary.states, summary.frame_errors, summary.reconnects
    );
    Ok(())
}
