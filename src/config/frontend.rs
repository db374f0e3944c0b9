//! Frontend registry
//!
//! Every listening address gets a [`Frontend`], keyed by its canonical
//! `[addr]:port` string. A freshly built registry holds a single synthetic
//! frontend on port 8443 which is dropped as soon as a real one is added.

use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::cert::{CertFile, CertSet};
use crate::config::defaults::{DEFAULT_FRONTEND_KEY, DEFAULT_FRONTEND_PORT};
use crate::config::endpoint::HostPort;
use crate::config::error::{ConfigError, Result};
use crate::config::types::{ClientCertMode, TlsProtocols, Toggle};

/// One listener specification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frontend {
    /// Canonical key, assigned when added to a registry
    pub pspec: String,
    /// Bound address; `None` is the wildcard
    pub host: Option<String>,
    pub port: Option<u16>,
    pub certs: CertSet,
    pub match_global_certs: Toggle,
    pub sni_nomatch_abort: Toggle,
    pub prefer_server_ciphers: Toggle,
    pub tls_protos: Option<TlsProtocols>,
    pub ciphers: Option<String>,
    pub ciphersuites: Option<String>,
    /// `None` inherits the global mode
    pub client_verify: Option<ClientCertMode>,
    pub client_verify_ca: Option<PathBuf>,
}

impl Default for Frontend {
    fn default() -> Self {
        Self {
            pspec: String::new(),
            host: None,
            port: None,
            certs: CertSet::new(),
            match_global_certs: Toggle::Unset,
            sni_nomatch_abort: Toggle::Unset,
            prefer_server_ciphers: Toggle::Unset,
            tls_protos: None,
            ciphers: None,
            ciphersuites: None,
            client_verify: None,
            client_verify_ca: None,
        }
    }
}

impl Frontend {
    pub fn new(host: Option<&str>, port: Option<u16>) -> Self {
        Self {
            host: host.map(str::to_string),
            port,
            ..Self::default()
        }
    }

    pub fn from_host_port(hp: HostPort) -> Self {
        Self {
            host: hp.host,
            port: Some(hp.port),
            ..Self::default()
        }
    }

    /// Attach a verified certificate owned by this frontend
    pub fn add_cert(&mut self, cert: CertFile) {
        self.certs.insert(cert);
    }

    /// Canonical `[addr]:port` key; the wildcard renders as an empty address
    pub fn canonical_pspec(&self) -> String {
        format!(
            "[{}]:{}",
            self.host.as_deref().unwrap_or(""),
            self.port.map(|p| p.to_string()).unwrap_or_default()
        )
    }

    /// Whether this frontend may fall back to the global certificates
    pub fn uses_global_certs(&self) -> bool {
        self.match_global_certs.resolve(true)
    }

    fn binds_same_address(&self, other: &Frontend) -> bool {
        self.port == other.port && self.host == other.host
    }
}

/// Frontends keyed by pspec
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FrontendRegistry {
    entries: BTreeMap<String, Frontend>,
    #[serde(skip)]
    synthetic_default: bool,
}

impl Default for FrontendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FrontendRegistry {
    /// Registry holding only the synthetic default frontend
    pub fn new() -> Self {
        let mut default = Frontend::new(None, Some(DEFAULT_FRONTEND_PORT));
        default.pspec = DEFAULT_FRONTEND_KEY.to_string();

        let mut entries = BTreeMap::new();
        entries.insert(default.pspec.clone(), default);

        Self {
            entries,
            synthetic_default: true,
        }
    }

    /// Register an explicit frontend
    ///
    /// The first call evicts the synthetic default. Fails when the port is
    /// missing, when the address and port are already taken, or when the
    /// frontend opts out of the global certificates without owning any.
    pub fn add(&mut self, mut frontend: Frontend) -> Result<()> {
        if self.synthetic_default {
            self.entries.remove(DEFAULT_FRONTEND_KEY);
            self.synthetic_default = false;
        }

        frontend.pspec = frontend.canonical_pspec();

        if frontend.port.is_none() {
            return Err(ConfigError::MissingPort(frontend.pspec));
        }

        if let Some(existing) = self.entries.values().find(|f| f.binds_same_address(&frontend)) {
            return Err(ConfigError::DuplicateFrontend(existing.pspec.clone()));
        }

        match frontend.match_global_certs {
            Toggle::Unset => {
                frontend.match_global_certs = Toggle::from(frontend.certs.is_empty());
            }
            Toggle::Disabled if frontend.certs.is_empty() => {
                return Err(ConfigError::NoCertificateConfigured(frontend.pspec));
            }
            _ => {}
        }

        debug!(
            "Adding frontend {} ({} certificates, match-global-certs {})",
            frontend.pspec,
            frontend.certs.len(),
            frontend.match_global_certs
        );

        self.entries.insert(frontend.pspec.clone(), frontend);
        Ok(())
    }

    /// True until the first explicit frontend is added
    pub fn is_synthetic_default(&self) -> bool {
        self.synthetic_default
    }

    pub fn get(&self, pspec: &str) -> Option<&Frontend> {
        self.entries.get(pspec)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frontend> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_synthetic_default() {
        let reg = FrontendRegistry::new();
        assert!(reg.is_synthetic_default());
        assert_eq!(reg.len(), 1);

        let fe = reg.get(DEFAULT_FRONTEND_KEY).unwrap();
        assert_eq!(fe.port, Some(8443));
        assert!(fe.host.is_none());
    }

    #[test]
    fn test_first_add_evicts_default() {
        let mut reg = FrontendRegistry::new();
        reg.add(Frontend::new(Some("10.0.0.1"), Some(443))).unwrap();

        assert!(!reg.is_synthetic_default());
        assert!(reg.get(DEFAULT_FRONTEND_KEY).is_none());
        assert_eq!(reg.len(), 1);
        assert!(reg.get("[10.0.0.1]:443").is_some());
    }

    #[test]
    fn test_wildcard_duplicate_rejected() {
        let mut reg = FrontendRegistry::new();
        reg.add(Frontend::new(None, Some(443))).unwrap();

        let err = reg.add(Frontend::new(None, Some(443))).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateFrontend(ref p) if p == "[]:443"));
    }

    #[test]
    fn test_explicit_duplicate_rejected() {
        let mut reg = FrontendRegistry::new();
        reg.add(Frontend::new(Some("10.0.0.1"), Some(443))).unwrap();
        assert!(matches!(
            reg.add(Frontend::new(Some("10.0.0.1"), Some(443))),
            Err(ConfigError::DuplicateFrontend(_))
        ));
    }

    #[test]
    fn test_wildcard_and_explicit_coexist() {
        let mut reg = FrontendRegistry::new();
        reg.add(Frontend::new(None, Some(443))).unwrap();
        reg.add(Frontend::new(Some("10.0.0.1"), Some(443))).unwrap();
        reg.add(Frontend::new(None, Some(8443))).unwrap();
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn test_missing_port() {
        let mut reg = FrontendRegistry::new();
        assert!(matches!(
            reg.add(Frontend::new(Some("10.0.0.1"), None)),
            Err(ConfigError::MissingPort(_))
        ));
    }

    #[test]
    fn test_match_global_certs_resolution() {
        let mut reg = FrontendRegistry::new();

        reg.add(Frontend::new(None, Some(1))).unwrap();
        assert_eq!(reg.get("[]:1").unwrap().match_global_certs, Toggle::Enabled);

        let mut own = Frontend::new(None, Some(2));
        own.add_cert(CertFile::new("/site.pem"));
        reg.add(own).unwrap();
        assert_eq!(reg.get("[]:2").unwrap().match_global_certs, Toggle::Disabled);

        let mut explicit = Frontend::new(None, Some(3));
        explicit.add_cert(CertFile::new("/site.pem"));
        explicit.match_global_certs = Toggle::Enabled;
        reg.add(explicit).unwrap();
        assert_eq!(reg.get("[]:3").unwrap().match_global_certs, Toggle::Enabled);

        let mut bare = Frontend::new(None, Some(4));
        bare.match_global_certs = Toggle::Disabled;
        assert!(matches!(
            reg.add(bare),
            Err(ConfigError::NoCertificateConfigured(ref p)) if p == "[]:4"
        ));
    }
}
