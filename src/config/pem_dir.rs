//! PEM directory scan
//!
//! Walks `pem-dir` in sorted filename order so the elected default
//! certificate does not depend on directory iteration order.

use glob::Pattern;
use log::{debug, warn};
use std::fs;
use std::path::Path;

use crate::config::cert::{CertFile, CertificateRegistry};
use crate::config::error::{ConfigError, Result};

/// Compile a `pem-dir-glob` value
pub fn compile_glob(glob: &str) -> Result<Pattern> {
    Pattern::new(glob)
        .map_err(|e| ConfigError::InvalidValue("pem-dir-glob".to_string(), e.to_string()))
}

/// Scan `dir` and hand every usable certificate to `certs`
///
/// Only regular files are considered (symlinks are not followed). When
/// `glob` is set, names not matching it are skipped. The first verified
/// file becomes the default if none is set yet; the rest become
/// secondaries. Files failing verification are skipped with a warning.
///
/// Returns the number of certificates added.
pub fn scan_pem_dir(
    dir: &Path,
    glob: Option<&Pattern>,
    certs: &mut CertificateRegistry,
) -> Result<usize> {
    let reader = fs::read_dir(dir).map_err(|e| ConfigError::io("PEM directory", dir, e))?;

    let mut entries = Vec::new();
    for entry in reader {
        match entry {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!("Unable to read entry in '{}': {}. Skipping.", dir.display(), e),
        }
    }
    entries.sort_by_key(|e| e.file_name());

    let mut added = 0;
    for entry in entries {
        let name = entry.file_name();

        if let Some(pattern) = glob {
            if !pattern.matches(&name.to_string_lossy()) {
                continue;
            }
        }

        let path = entry.path();
        match entry.file_type() {
            Ok(ft) if ft.is_file() => {}
            Ok(_) => continue,
            Err(e) => {
                warn!("Unable to stat '{}': {}. Skipping.", path.display(), e);
                continue;
            }
        }

        match CertFile::verified(&path) {
            Ok(cert) => {
                debug!("Found certificate {}", path.display());
                certs.offer(cert);
                added += 1;
            }
            Err(e) => warn!("{}. Skipping.", e),
        }
    }

    Ok(added)
}
