use crate::error::{Result, SupervisorError};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The pid file held open by a running launch loop.
///
/// The file is created on [`create`](PidFile::create) and removed either by
/// [`release`](PidFile::release) or, on any other exit path, when dropped.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    file: Option<File>,
}

impl PidFile {
    /// Creates the file, failing with [`SupervisorError::AlreadyRunning`] if
    /// it already exists.
    pub fn create(path: &Path, service: &str) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|source| match source.kind() {
                io::ErrorKind::AlreadyExists => SupervisorError::AlreadyRunning {
                    service: service.to_string(),
                    path: path.to_path_buf(),
                },
                _ => SupervisorError::PidFileIo {
                    path: path.to_path_buf(),
                    source,
                },
            })?;
        debug!(?path, "created pid file");

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the file content with `pid`, leaving no bytes of a longer
    /// previous value behind.
    pub fn rewrite(&mut self, pid: u32) -> Result<()> {
        let path = &self.path;
        let file = self.file.as_mut().ok_or_else(|| SupervisorError::PidFileIo {
            path: path.clone(),
            source: io::Error::new(io::ErrorKind::Other, "pid file already released"),
        })?;

        write_pid(file, pid).map_err(|source| SupervisorError::PidFileIo {
            path: path.clone(),
            source,
        })?;
        debug!(?path, pid, "wrote pid file");
        Ok(())
    }

    /// Closes and removes the file.
    pub fn release(mut self) -> Result<()> {
        self.remove().map_err(|source| SupervisorError::PidFileIo {
            path: self.path.clone(),
            source,
        })
    }

    fn remove(&mut self) -> io::Result<()> {
        // Closed first, an open file cannot be removed on Windows.
        if self.file.take().is_some() {
            fs::remove_file(&self.path)?;
            debug!(path = ?self.path, "removed pid file");
        }
        Ok(())
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(err) = self.remove() {
            warn!(?err, path = ?self.path, "Failed to remove pid file");
        }
    }
}

fn write_pid(file: &mut File, pid: u32) -> io::Result<()> {
    let content = pid.to_string();
    file.seek(SeekFrom::Start(0))?;
    file.write_all(content.as_bytes())?;
    file.set_len(content.len() as u64)?;
    file.flush()
}

/// Reads the process id recorded at `path`.
///
/// A missing, unreadable, or malformed file is a lookup failure; whether the
/// recorded process is alive is not checked here.
pub fn read_pid(path: &Path, service: &str) -> Result<u32> {
    let content = fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => SupervisorError::PidFileMissing {
            service: service.to_string(),
            path: path.to_path_buf(),
        },
        _ => SupervisorError::PidFileUnreadable {
            path: path.to_path_buf(),
            source,
        },
    })?;

    match content.trim().parse::<u32>() {
        Ok(pid) if pid > 0 => Ok(pid),
        _ => Err(SupervisorError::PidFileInvalid {
            path: path.to_path_buf(),
            content,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("svc.pid")
    }

    // -- create --

    #[test]
    fn test_create_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = pid_path(&dir);

        let pid_file = PidFile::create(&path, "svc").unwrap();
        assert!(path.exists());
        pid_file.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_create_existing_is_already_running() {
        let dir = tempfile::tempdir().unwrap();
        let path = pid_path(&dir);
        fs::write(&path, "123").unwrap();

        let err = PidFile::create(&path, "svc").unwrap_err();
        assert!(matches!(err, SupervisorError::AlreadyRunning { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "123");
    }

    #[test]
    fn test_create_in_missing_dir() {
        let err = PidFile::create(Path::new("/nonexistent/dir/svc.pid"), "svc").unwrap_err();
        assert!(matches!(err, SupervisorError::PidFileIo { .. }));
    }

    #[test]
    fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = pid_path(&dir);
        {
            let mut pid_file = PidFile::create(&path, "svc").unwrap();
            pid_file.rewrite(42).unwrap();
        }
        assert!(!path.exists());
    }

    // -- rewrite --

    #[test]
    fn test_rewrite_shorter_pid_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = pid_path(&dir);
        let mut pid_file = PidFile::create(&path, "svc").unwrap();

        pid_file.rewrite(4821).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "4821");
        pid_file.rewrite(17).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "17");
        pid_file.rewrite(90210).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "90210");
    }

    // -- read_pid --

    #[test]
    fn test_read_pid() {
        let dir = tempfile::tempdir().unwrap();
        let path = pid_path(&dir);
        fs::write(&path, "4821").unwrap();
        assert_eq!(read_pid(&path, "svc").unwrap(), 4821);

        fs::write(&path, "17\n").unwrap();
        assert_eq!(read_pid(&path, "svc").unwrap(), 17);
    }

    #[test]
    fn test_read_pid_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_pid(&pid_path(&dir), "svc").unwrap_err();
        assert!(matches!(err, SupervisorError::PidFileMissing { .. }));
    }

    #[test]
    fn test_read_pid_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = pid_path(&dir);

        for content in ["", "abc", "-5", "0", "12 34"] {
            fs::write(&path, content).unwrap();
            let err = read_pid(&path, "svc").unwrap_err();
            assert!(
                matches!(err, SupervisorError::PidFileInvalid { .. }),
                "{content:?} should be invalid"
            );
        }
    }
}
