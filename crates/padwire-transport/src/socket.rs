use std::io::{ErrorKind, Read};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::traits::{Transport, DEFAULT_READ_SIZE};

/// Socket transport settings.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Upper bound for one read.
    pub read_size: usize,
    /// How long one read may wait for data before reporting an empty chunk.
    pub read_timeout: Duration,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            read_size: DEFAULT_READ_SIZE,
            read_timeout: Duration::from_millis(50),
        }
    }
}

/// Read-only client of a Unix domain socket served by the producer.
pub struct SocketTransport {
    path: PathBuf,
    config: SocketConfig,
    stream: Option<UnixStream>,
}

impl SocketTransport {
    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_config(path, SocketConfig::default())
    }

    pub fn with_config(path: impl AsRef<Path>, config: SocketConfig) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config,
            stream: None,
        }
    }

    /// The socket path this transport connects to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Transport for SocketTransport {
    fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let path_bytes = self.path.as_os_str().len();
        if path_bytes >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path: self.path.clone(),
                len: path_bytes,
                max: Self::MAX_PATH_LEN,
            });
        }

        let stream = UnixStream::connect(&self.path).map_err(|err| match err.kind() {
            ErrorKind::NotFound | ErrorKind::ConnectionRefused => TransportError::NotYetAvailable {
                endpoint: self.endpoint(),
                reason: err.to_string(),
            },
            _ => TransportError::Connect {
                endpoint: self.endpoint(),
                source: err,
            },
        })?;

        // A zero timeout is rejected by std; fall back to the smallest useful wait.
        let timeout = self.config.read_timeout.max(Duration::from_millis(1));
        stream
            .set_read_timeout(Some(timeout))
            .map_err(|err| TransportError::Connect {
                endpoint: self.endpoint(),
                source: err,
            })?;

        info!(path = ?self.path, "connected to unix domain socket");
        self.stream = Some(stream);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(err) = stream.shutdown(std::net::Shutdown::Both) {
                // The peer may already be gone; the descriptor is closed on drop regardless.
                debug!(path = ?self.path, error = %err, "socket shutdown failed");
            }
            info!(path = ?self.path, "disconnected from unix domain socket");
        }
    }

    fn read_chunk(&mut self) -> Result<Bytes> {
        let read_size = self.config.read_size;
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::NotConnected);
        };

        let mut chunk = vec![0u8; read_size];
        match stream.read(&mut chunk) {
            Ok(0) => {
                self.disconnect();
                Err(TransportError::Closed)
            }
            Ok(n) => {
                chunk.truncate(n);
                Ok(Bytes::from(chunk))
            }
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                Ok(Bytes::new())
            }
            Err(err) => {
                warn!(path = ?self.path, error = %err, "socket read failed");
                self.disconnect();
                Err(TransportError::Io(err))
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn transport_name(&self) -> &'static str {
        "unix-domain-socket"
    }

    fn endpoint(&self) -> String {
        self.path.display().to_string()
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for SocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketTransport")
            .field("path", &self.path)
            .field("connected", &self.stream.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::os::unix::net::UnixListener;

    use super::*;

    fn unique_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("padwire-sock-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_socket_is_not_yet_available() {
        let dir = unique_dir("missing");
        let mut transport = SocketTransport::new(dir.join("absent.sock"));

        let err = transport.connect().unwrap_err();
        assert!(err.is_not_yet_available());
        assert!(!transport.is_connected());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn path_too_long() {
        let long_path = "/tmp/".to_string() + &"a".repeat(200) + ".sock";
        let mut transport = SocketTransport::new(long_path);
        assert!(matches!(
            transport.connect(),
            Err(TransportError::PathTooLong { .. })
        ));
    }

    #[test]
    fn reads_chunks_until_peer_closes() {
        let dir = unique_dir("read");
        let sock_path = dir.join("state.sock");
        let listener = UnixListener::bind(&sock_path).unwrap();

        let producer = std::thread::spawn(move || {
            let (mut stream, _addr) = listener.accept().unwrap();
            stream.write_all(b"{\"a\":1}\n").unwrap();
        });

        let mut transport = SocketTransport::new(&sock_path);
        transport.connect().unwrap();
        producer.join().unwrap();

        let mut received = Vec::new();
        loop {
            match transport.read_chunk() {
                Ok(chunk) => received.extend_from_slice(&chunk),
                Err(TransportError::Closed) => break,
                Err(err) => panic!("unexpected error: {err}"),
            }
        }

        assert_eq!(received, b"{\"a\":1}\n");
        assert!(!transport.is_connected());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn idle_socket_yields_empty_chunk() {
        let dir = unique_dir("idle");
        let sock_path = dir.join("idle.sock");
        let listener = UnixListener::bind(&sock_path).unwrap();

        let mut transport = SocketTransport::with_config(
            &sock_path,
            SocketConfig {
                read_timeout: Duration::from_millis(10),
                ..SocketConfig::default()
            },
        );
        transport.connect().unwrap();
        let (_server, _addr) = listener.accept().unwrap();

        assert!(transport.read_chunk().unwrap().is_empty());
        assert!(transport.is_connected());

        transport.disconnect();
        transport.disconnect();
        assert!(!transport.is_connected());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
