#![cfg(all(unix, feature = "cli"))]

use std::io::{Read, Write};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/padwire-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn make_fifo(path: &Path) {
    let status = Command::new("mkfifo")
        .arg(path)
        .status()
        .expect("mkfifo should run");
    assert!(status.success(), "mkfifo failed for {}", path.display());
}

fn padwire(args: &[&str]) -> Child {
    Command::new(env!("CARGO_BIN_EXE_padwire"))
        .args(["--log-level", "error"])
        .args(args)
        .env_remove("PADWIRE_PIPE")
        .env_remove("PADWIRE_SOCKET")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("padwire should start")
}

fn wait_with_timeout(mut child: Child, timeout: Duration) -> Output {
    let start = Instant::now();
    loop {
        match child.try_wait().expect("child status should be readable") {
            Some(_) => return child.wait_with_output().expect("output should be readable"),
            None if start.elapsed() >= timeout => {
                let _ = child.kill();
                let output = child.wait_with_output().expect("output should be readable");
                panic!(
                    "padwire did not exit in time; stderr: {}",
                    String::from_utf8_lossy(&output.stderr)
                );
            }
            None => thread::sleep(Duration::from_millis(20)),
        }
    }
}

#[test]
fn watch_pipe_prints_states_and_skips_bad_lines() {
    let dir = unique_temp_dir("pipe");
    let fifo = dir.join("pad.pipe");
    make_fifo(&fifo);
    let fifo_arg = fifo.to_str().expect("utf-8 path");

    let child = padwire(&["--format", "raw", "watch", "pipe", fifo_arg, "--count", "2"]);

    // Blocks until padwire opens the read end.
    let mut writer = std::fs::OpenOptions::new()
        .write(true)
        .open(&fifo)
        .expect("fifo should open for writing");
    writer
        .write_all(b"{\"A\":1}\nnot json\n\n{\"B\":2}\n")
        .expect("states should be written");

    let output = wait_with_timeout(child, Duration::from_secs(10));
    drop(writer);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "{\"A\":1}\n{\"B\":2}\n"
    );

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn watch_pipe_survives_producer_restart() {
    let dir = unique_temp_dir("restart");
    let fifo = dir.join("pad.pipe");
    make_fifo(&fifo);
    let fifo_arg = fifo.to_str().expect("utf-8 path");

    let child = padwire(&[
        "--format",
        "raw",
        "watch",
        "pipe",
        fifo_arg,
        "--count",
        "2",
        "--connect-interval",
        "10ms",
        "--max-connect-interval",
        "10ms",
    ]);

    for line in [&b"{\"seq\":1}\n"[..], &b"{\"seq\":2}\n"[..]] {
        let mut writer = std::fs::OpenOptions::new()
            .write(true)
            .open(&fifo)
            .expect("fifo should open for writing");
        writer.write_all(line).expect("state should be written");
        thread::sleep(Duration::from_millis(100));
    }

    let output = wait_with_timeout(child, Duration::from_secs(10));
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "{\"seq\":1}\n{\"seq\":2}\n"
    );

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn watch_socket_prints_json_envelopes() {
    let dir = unique_temp_dir("socket");
    let sock = dir.join("pad.sock");
    let listener = UnixListener::bind(&sock).expect("socket should bind");
    let sock_arg = sock.to_str().expect("utf-8 path");

    let child = padwire(&["--format", "json", "watch", "socket", sock_arg, "--count", "1"]);

    let (mut stream, _) = listener.accept().expect("padwire should connect");
    stream
        .write_all(b"{\"buttons\":{\"A\":1},\"connected\":true}\n")
        .expect("state should be written");

    let output = wait_with_timeout(child, Duration::from_secs(10));
    assert_eq!(output.status.code(), Some(0));

    let line: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be one JSON envelope");
    assert_eq!(line["sequence"], 1);
    assert_eq!(line["transport"], "unix-domain-socket");
    assert_eq!(line["state"]["buttons"]["A"], 1);
    assert_eq!(line["state"]["connected"], true);

    // padwire released the connection on exit.
    let mut rest = Vec::new();
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("timeout should apply");
    assert_eq!(stream.read_to_end(&mut rest).expect("read should end"), 0);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn watch_gives_up_after_max_attempts() {
    let dir = unique_temp_dir("missing");
    let fifo = dir.join("absent.pipe");
    let fifo_arg = fifo.to_str().expect("utf-8 path");

    let child = padwire(&[
        "watch",
        "pipe",
        fifo_arg,
        "--max-attempts",
        "2",
        "--connect-interval",
        "10ms",
        "--max-connect-interval",
        "10ms",
    ]);

    let output = wait_with_timeout(child, Duration::from_secs(10));
    assert_eq!(output.status.code(), Some(3));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("gave up after 2 attempts"),
        "unexpected stderr: {stderr}"
    );

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn watch_rejects_zero_max_buffer() {
    let child = padwire(&["watch", "pipe", "/tmp/unused.pipe", "--max-buffer", "0"]);
    let output = wait_with_timeout(child, Duration::from_secs(10));
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn version_prints_package_version() {
    let child = padwire(&["version"]);
    let output = wait_with_timeout(child, Duration::from_secs(10));
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("padwire {}", env!("CARGO_PKG_VERSION"))
    );
}
