//! Filesystem helpers
//!
//! Thin wrappers around `stat` that turn the outcome into a
//! [`ConfigError`] naming the offending path.

use std::fs::{self, Metadata};
use std::os::unix::fs::FileTypeExt;
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::config::error::{ConfigError, Result};

/// Stat `path` and require a regular file
///
/// `what` names the role of the file in error messages
/// (e.g. "x509 certificate PEM file").
pub fn check_regular_file(path: &Path, what: &'static str) -> Result<Metadata> {
    let meta = fs::metadata(path).map_err(|e| ConfigError::io(what, path, e))?;

    if !meta.is_file() {
        return Err(ConfigError::NotAFile {
            what,
            path: path.to_path_buf(),
        });
    }

    Ok(meta)
}

/// Stat `path` and require a UNIX-domain socket
pub fn check_socket(path: &Path) -> Result<()> {
    let meta = fs::metadata(path).map_err(|e| ConfigError::io("path", path, e))?;

    if !meta.file_type().is_socket() {
        return Err(ConfigError::NotASocket {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

/// Stat `path` and require a directory
pub fn check_directory(path: &Path, what: &'static str) -> Result<()> {
    let meta = fs::metadata(path).map_err(|e| ConfigError::io(what, path, e))?;

    if !meta.is_dir() {
        return Err(ConfigError::NotADirectory {
            what,
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

/// Modification time as fractional seconds since the epoch
///
/// Timestamps before the epoch (or platforms without mtime) yield `0.0`.
pub fn mtime_secs(meta: &Metadata) -> f64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::error::ErrorKind;
    use std::os::unix::net::UnixListener;
    use std::time::Duration;

    #[test]
    fn test_check_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("server.pem");
        fs::write(&file, b"pem").unwrap();

        assert!(check_regular_file(&file, "x509 certificate PEM file").is_ok());

        let err = check_regular_file(dir.path(), "x509 certificate PEM file").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAFile);

        let err = check_regular_file(&dir.path().join("missing.pem"), "x509 certificate PEM file")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("missing.pem"));
    }

    #[test]
    fn test_check_socket() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("backend.sock");
        let _listener = UnixListener::bind(&sock).unwrap();

        assert!(check_socket(&sock).is_ok());

        let file = dir.path().join("plain");
        fs::write(&file, b"").unwrap();
        assert_eq!(check_socket(&file).unwrap_err().kind(), ErrorKind::NotASocket);
    }

    #[test]
    fn test_check_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_directory(dir.path(), "chroot directory").is_ok());

        let file = dir.path().join("plain");
        fs::write(&file, b"").unwrap();
        assert_eq!(
            check_directory(&file, "chroot directory").unwrap_err().kind(),
            ErrorKind::NotADirectory
        );
    }

    #[test]
    fn test_mtime_secs_tracks_set_modified() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stamp");
        let file = fs::File::create(&path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_millis(1_600_000_000_500)).unwrap();
        drop(file);

        let meta = fs::metadata(&path).unwrap();
        assert!((mtime_secs(&meta) - 1_600_000_000.5).abs() < 1e-3);
    }
}
