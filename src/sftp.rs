//! SFTP channel for bulk file exchange with the Navigate data warehouse.
mod session;
mod sftp_like;

pub use sftp_like::{SftpLike, Ssh2Adapter};

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::SftpError;

pub const DEFAULT_PORT: u16 = 22;

const COPY_BUF_SIZE: usize = 256 * 1024;

/// Connection settings for the SFTP host.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SftpSettings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    pub private_key_path: PathBuf,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl SftpSettings {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        private_key_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            private_key_path: private_key_path.into(),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub struct NavigateSftp {
    settings: SftpSettings,
    session: Option<ssh2::Session>,
    sftp: Option<Box<dyn SftpLike>>,
}

impl NavigateSftp {
    /// Unconnected client; call `connect` before any transfer.
    pub fn new(settings: SftpSettings) -> Self {
        Self { settings, session: None, sftp: None }
    }

    /// Client already bound to an SFTP backend (no SSH session of its own).
    pub fn with_backend(settings: SftpSettings, backend: Box<dyn SftpLike>) -> Self {
        Self { settings, session: None, sftp: Some(backend) }
    }

    pub fn settings(&self) -> &SftpSettings {
        &self.settings
    }

    pub fn is_connected(&self) -> bool {
        self.sftp.is_some()
    }

    /// Connects, authenticates with the private key and opens the SFTP
    /// subsystem. Reconnecting closes the previous connection first.
    pub fn connect(&mut self) -> Result<(), SftpError> {
        if self.is_connected() {
            self.close();
        }
        let sess = session::connect_session(&self.settings)?;
        let sftp = sess.sftp().map_err(|e| SftpError::SubsystemFailed(e.to_string()))?;
        self.sftp = Some(Box::new(Ssh2Adapter(sftp)));
        self.session = Some(sess);
        info!(host = %self.settings.host, user = %self.settings.username, "Connection successfully established.");
        Ok(())
    }

    fn backend(&self) -> Result<&dyn SftpLike, SftpError> {
        self.sftp.as_deref().ok_or(SftpError::NotConnected)
    }

    /// Sorted entry names of a remote directory (`.` for the login directory).
    pub fn list_files(&self, remote_path: &str) -> Result<Vec<String>, SftpError> {
        let backend = self.backend()?;
        let path = if remote_path.is_empty() { "." } else { remote_path };
        let mut names = backend
            .read_dir_names(Path::new(path))
            .map_err(|message| SftpError::List { path: path.to_string(), message })?;
        names.sort();
        debug!(path, count = names.len(), "listed remote directory");
        Ok(names)
    }

    /// Size of a remote file, when known.
    pub fn remote_size(&self, remote_file: &str) -> Result<Option<u64>, SftpError> {
        self.backend()?
            .file_size(Path::new(remote_file))
            .map_err(|message| SftpError::List { path: remote_file.to_string(), message })
    }

    /// Copies a remote file to `local_file`; returns bytes copied.
    pub fn download_file(&self, remote_file: &str, local_file: &Path) -> Result<u64, SftpError> {
        self.download_file_with_progress(remote_file, local_file, |_| {})
    }

    /// Like `download_file`, calling `on_chunk` with each chunk's length.
    /// A partially written local file is removed on failure.
    pub fn download_file_with_progress<F: FnMut(u64)>(
        &self,
        remote_file: &str,
        local_file: &Path,
        on_chunk: F,
    ) -> Result<u64, SftpError> {
        let backend = self.backend()?;
        let fail = |message: String| SftpError::Download {
            remote: remote_file.to_string(),
            local: local_file.to_path_buf(),
            message,
        };
        let reader = backend.open_read(Path::new(remote_file)).map_err(fail)?;
        let file = File::create(local_file).map_err(|e| fail(e.to_string()))?;
        let result = copy_with_progress(reader, BufWriter::new(file), on_chunk);
        match result {
            Ok(bytes) => {
                info!("Successfully downloaded {} to {}.", remote_file, local_file.display());
                Ok(bytes)
            }
            Err(e) => {
                if let Err(rm) = std::fs::remove_file(local_file) {
                    warn!("could not remove partial download {}: {}", local_file.display(), rm);
                }
                Err(fail(e.to_string()))
            }
        }
    }

    /// Copies `local_file` to the remote path; returns bytes copied.
    pub fn upload_file(&self, local_file: &Path, remote_file: &str) -> Result<u64, SftpError> {
        self.upload_file_with_progress(local_file, remote_file, |_| {})
    }

    pub fn upload_file_with_progress<F: FnMut(u64)>(
        &self,
        local_file: &Path,
        remote_file: &str,
        on_chunk: F,
    ) -> Result<u64, SftpError> {
        let backend = self.backend()?;
        let fail = |message: String| SftpError::Upload {
            local: local_file.to_path_buf(),
            remote: remote_file.to_string(),
            message,
        };
        let file = File::open(local_file).map_err(|e| fail(e.to_string()))?;
        let writer = backend.create_write(Path::new(remote_file)).map_err(fail)?;
        let bytes = copy_with_progress(BufReader::new(file), writer, on_chunk)
            .map_err(|e| fail(e.to_string()))?;
        info!("Successfully uploaded {} to {}.", local_file.display(), remote_file);
        Ok(bytes)
    }

    /// Drops the SFTP channel, then disconnects the SSH session. Safe to call
    /// more than once.
    pub fn close(&mut self) {
        let was_open = self.sftp.is_some() || self.session.is_some();
        self.sftp = None;
        if let Some(sess) = self.session.take()
            && let Err(e) = sess.disconnect(None, "closing", None)
        {
            debug!("SSH disconnect returned error: {}", e);
        }
        if was_open {
            info!("Connection closed.");
        }
    }
}

impl Drop for NavigateSftp {
    fn drop(&mut self) {
        self.close();
    }
}

fn copy_with_progress<R: Read, W: Write, F: FnMut(u64)>(
    mut reader: R,
    mut writer: W,
    mut on_chunk: F,
) -> std::io::Result<u64> {
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
        on_chunk(n as u64);
    }
    writer.flush()?;
    Ok(total)
}
