use std::path::Path;

/// SFTP operations used by `NavigateSftp`. Returns boxed readers/writers so
/// tests can inject in-memory file objects.
pub trait SftpLike: Send {
    /// Entry names of a remote directory, without `.` and `..`.
    fn read_dir_names(&self, p: &Path) -> Result<Vec<String>, String>;
    /// Size of a remote file when the server reports one.
    fn file_size(&self, p: &Path) -> Result<Option<u64>, String>;
    fn open_read(&self, p: &Path) -> Result<Box<dyn std::io::Read + Send>, String>;
    fn create_write(&self, p: &Path) -> Result<Box<dyn std::io::Write + Send>, String>;
}

/// Adapter that owns an `ssh2::Sftp` and implements `SftpLike`.
pub struct Ssh2Adapter(pub ssh2::Sftp);

impl SftpLike for Ssh2Adapter {
    fn read_dir_names(&self, p: &Path) -> Result<Vec<String>, String> {
        let entries = self.0.readdir(p).map_err(|e| e.to_string())?;
        Ok(entries
            .into_iter()
            .filter_map(|(path, _)| path.file_name().map(|n| n.to_string_lossy().to_string()))
            .filter(|n| n != "." && n != "..")
            .collect())
    }

    fn file_size(&self, p: &Path) -> Result<Option<u64>, String> {
        self.0.stat(p).map(|st| st.size).map_err(|e| e.to_string())
    }

    fn open_read(&self, p: &Path) -> Result<Box<dyn std::io::Read + Send>, String> {
        match self.0.open(p) {
            Ok(f) => Ok(Box::new(f)),
            Err(e) => Err(e.to_string()),
        }
    }

    fn create_write(&self, p: &Path) -> Result<Box<dyn std::io::Write + Send>, String> {
        match self.0.create(p) {
            Ok(f) => Ok(Box::new(f)),
            Err(e) => Err(e.to_string()),
        }
    }
}
