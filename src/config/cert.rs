//! Certificate registry
//!
//! A [`CertFile`] describes one PEM file on disk (certificate chain, with an
//! optional separate private key and OCSP staple). Entries are verified the
//! moment they are created and carry the modification times a reload
//! watcher compares against later.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::common::fs::{check_regular_file, mtime_secs};
use crate::config::error::{ConfigError, Result};
use crate::config::types::Toggle;

/// One certificate on disk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CertFile {
    pub filename: PathBuf,
    pub private_key: Option<PathBuf>,
    pub ocsp_file: Option<PathBuf>,
    pub ocsp_verify: Toggle,
    /// Newest mtime of the certificate and private key files
    pub mtim: f64,
    pub ocsp_mtim: f64,
}

impl CertFile {
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            private_key: None,
            ocsp_file: None,
            ocsp_verify: Toggle::Unset,
            mtim: 0.0,
            ocsp_mtim: 0.0,
        }
    }

    /// Create and verify in one step
    pub fn verified(filename: impl Into<PathBuf>) -> Result<Self> {
        let mut cert = Self::new(filename);
        cert.verify()?;
        Ok(cert)
    }

    /// Stat every referenced file and refresh the timestamps
    ///
    /// The certificate, OCSP staple and private key are checked in that
    /// order; the first failure aborts and names the offending path.
    pub fn verify(&mut self) -> Result<()> {
        if self.filename.as_os_str().is_empty() {
            return Err(ConfigError::MissingValue(
                "x509 certificate PEM file name".to_string(),
            ));
        }

        let meta = check_regular_file(&self.filename, "x509 certificate PEM file")?;
        let mut mtim = mtime_secs(&meta);

        if let Some(ocsp) = &self.ocsp_file {
            let meta = check_regular_file(ocsp, "OCSP stapling file")?;
            self.ocsp_mtim = mtime_secs(&meta);
        }

        if let Some(key) = self.private_key.as_deref().filter(|k| !k.as_os_str().is_empty()) {
            let meta = check_regular_file(key, "private keyfile")?;
            mtim = mtim.max(mtime_secs(&meta));
        }

        self.mtim = mtim;
        Ok(())
    }
}

/// Certificates keyed by filename, in insertion order
///
/// Inserting a filename that is already present replaces the earlier entry
/// in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CertSet {
    entries: Vec<CertFile>,
}

impl CertSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `cert`, returning the entry it replaced
    pub fn insert(&mut self, cert: CertFile) -> Option<CertFile> {
        match self.entries.iter_mut().find(|c| c.filename == cert.filename) {
            Some(slot) => Some(std::mem::replace(slot, cert)),
            None => {
                self.entries.push(cert);
                None
            }
        }
    }

    pub fn get(&self, filename: &Path) -> Option<&CertFile> {
        self.entries.iter().find(|c| c.filename == filename)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CertFile> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a CertSet {
    type Item = &'a CertFile;
    type IntoIter = std::slice::Iter<'a, CertFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Process-wide certificates: one default plus secondaries
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CertificateRegistry {
    pub default: Option<CertFile>,
    pub secondary: CertSet,
}

impl CertificateRegistry {
    /// Make `cert` the default, demoting the previous default
    ///
    /// Used for `pem-file`: the last one given serves connections without
    /// a matching SNI name.
    pub fn promote(&mut self, cert: CertFile) {
        if let Some(previous) = self.default.replace(cert) {
            self.secondary.insert(previous);
        }
    }

    /// Use `cert` as the default if none is set yet, else add a secondary
    ///
    /// Used by the PEM directory scan.
    pub fn offer(&mut self, cert: CertFile) {
        if self.default.is_none() {
            self.default = Some(cert);
        } else {
            self.secondary.insert(cert);
        }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Total number of global certificates
    pub fn len(&self) -> usize {
        usize::from(self.default.is_some()) + self.secondary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Default first, then secondaries
    pub fn iter(&self) -> impl Iterator<Item = &CertFile> {
        self.default.iter().chain(self.secondary.iter())
    }
}
