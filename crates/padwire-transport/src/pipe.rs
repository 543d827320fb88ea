use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{info, warn};

use crate::error::{Result, TransportError};
use crate::traits::{Transport, DEFAULT_READ_SIZE};

/// Pipe the reference producer creates.
#[cfg(windows)]
pub const DEFAULT_PIPE_PATH: &str = r"\\.\pipe\XboxReaderPipe";
/// FIFO path used when no pipe is configured.
#[cfg(not(windows))]
pub const DEFAULT_PIPE_PATH: &str = "/tmp/xbox-reader.pipe";

/// Pipe transport settings.
#[derive(Debug, Clone)]
pub struct PipeConfig {
    /// Upper bound for one read.
    pub read_size: usize,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            read_size: DEFAULT_READ_SIZE,
        }
    }
}

/// Read-only client of a local named pipe.
///
/// On Windows the path names a pipe instance (`\\.\pipe\NAME`). On Unix it
/// names a FIFO, opened non-blocking so neither `connect` nor `read_chunk`
/// waits for the producer.
pub struct PipeTransport {
    path: PathBuf,
    config: PipeConfig,
    file: Option<File>,
    saw_data: bool,
}

impl PipeTransport {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_config(path, PipeConfig::default())
    }

    pub fn with_config(path: impl AsRef<Path>, config: PipeConfig) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config,
            file: None,
            saw_data: false,
        }
    }

    /// The pipe path this transport opens.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> std::io::Result<File> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;

            std::fs::OpenOptions::new()
                .read(true)
                .custom_flags(libc::O_NONBLOCK)
                .open(&self.path)
        }

        #[cfg(not(unix))]
        {
            File::open(&self.path)
        }
    }

    fn classify_open_error(&self, err: std::io::Error) -> TransportError {
        if is_not_yet_available(&err) {
            return TransportError::NotYetAvailable {
                endpoint: self.endpoint(),
                reason: err.to_string(),
            };
        }
        TransportError::Connect {
            endpoint: self.endpoint(),
            source: err,
        }
    }

    /// End of stream on a pipe we have already read from means the producer
    /// went away. Before the first byte it only means no writer has opened the
    /// FIFO yet.
    fn on_eof(&mut self) -> Result<Bytes> {
        if cfg!(windows) || self.saw_data {
            self.disconnect();
            return Err(TransportError::Closed);
        }
        Ok(Bytes::new())
    }
}

fn is_not_yet_available(err: &std::io::Error) -> bool {
    if err.kind() == ErrorKind::NotFound {
        return true;
    }

    #[cfg(windows)]
    {
        // All pipe instances are busy serving another client.
        if err.raw_os_error() == Some(windows_sys::Win32::Foundation::ERROR_PIPE_BUSY as i32) {
            return true;
        }
    }

    false
}

impl Transport for PipeTransport {
    fn connect(&mut self) -> Result<()> {
        if self.file.is_some() {
            return Ok(());
        }

        let file = self.open().map_err(|err| self.classify_open_error(err))?;
        self.file = Some(file);
        self.saw_data = false;
        info!(path = ?self.path, "connected to pipe");
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.file.take().is_some() {
            info!(path = ?self.path, "disconnected from pipe");
        }
        self.saw_data = false;
    }

    fn read_chunk(&mut self) -> Result<Bytes> {
        let read_size = self.config.read_size;
        let Some(file) = self.file.as_mut() else {
            return Err(TransportError::NotConnected);
        };

        let mut chunk = vec![0u8; read_size];
        match file.read(&mut chunk) {
            Ok(0) => self.on_eof(),
            Ok(n) => {
                self.saw_data = true;
                chunk.truncate(n);
                Ok(Bytes::from(chunk))
            }
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                Ok(Bytes::new())
            }
            Err(err) => {
                warn!(path = ?self.path, error = %err, "pipe read failed");
                self.disconnect();
                Err(TransportError::Io(err))
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.file.is_some()
    }

    fn transport_name(&self) -> &'static str {
        "named-pipe"
    }

    fn endpoint(&self) -> String {
        self.path.display().to_string()
    }
}

impl Drop for PipeTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for PipeTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeTransport")
            .field("path", &self.path)
            .field("connected", &self.file.is_some())
            .finish()
    }
}
