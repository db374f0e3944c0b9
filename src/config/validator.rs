//! Configuration validator
//!
//! Every key, whether read from the configuration file or given on the
//! command line, goes through [`Configuration::validate`]. The same key
//! therefore gets the same parsing and the same error text from both
//! sources. The cross-field checks that run once both passes are done
//! live here as well.

use log::{debug, warn};
use nix::unistd::{Group, User};
use std::path::PathBuf;

use crate::common::fs::check_directory;
use crate::config::cert::CertFile;
use crate::config::endpoint::{parse_endpoint, Endpoint, EndpointRules};
use crate::config::error::{ConfigError, Result};
use crate::config::frontend::Frontend;
use crate::config::pem_dir::compile_glob;
use crate::config::scalar::{parse_bool, parse_int, parse_long, parse_seconds, parse_u32};
use crate::config::types::{ClientCertMode, Configuration, Origin, ProxyMode, TlsProtocols};

/// Applies one value to the configuration
pub type Setter = fn(&mut Configuration, &str) -> Result<()>;

macro_rules! bool_setter {
    ($name:ident, $($field:ident).+) => {
        fn $name(config: &mut Configuration, value: &str) -> Result<()> {
            config.$($field).+ = parse_bool(value)?;
            Ok(())
        }
    };
}

macro_rules! u32_setter {
    ($name:ident, $($field:ident).+) => {
        fn $name(config: &mut Configuration, value: &str) -> Result<()> {
            config.$($field).+ = parse_u32(value)?;
            Ok(())
        }
    };
}

/// Empty values leave the current setting untouched
macro_rules! path_setter {
    ($name:ident, $($field:ident).+) => {
        fn $name(config: &mut Configuration, value: &str) -> Result<()> {
            if !value.is_empty() {
                config.$($field).+ = Some(PathBuf::from(value));
            }
            Ok(())
        }
    };
}

const KEYS: &[(&str, Setter)] = &[
    ("tls", set_tls),
    ("ssl", set_ssl),
    ("tls-protos", set_tls_protos),
    ("ciphers", set_ciphers),
    ("ciphersuites", set_ciphersuites),
    ("ssl-engine", set_engine),
    ("prefer-server-ciphers", set_prefer_server_ciphers),
    ("frontend", set_frontend),
    ("backend", set_backend),
    ("workers", set_workers),
    ("backlog", set_backlog),
    ("keepalive", set_keepalive),
    ("backend-refresh", set_backend_refresh),
    ("backendrefresh", set_backend_refresh),
    ("chroot", set_chroot),
    ("user", set_user),
    ("group", set_group),
    ("quiet", set_quiet),
    ("log-level", set_log_level),
    ("log-filename", set_log_filename),
    ("syslog", set_syslog),
    ("syslog-facility", set_syslog_facility),
    ("daemon", set_daemon),
    ("write-ip", set_write_ip),
    ("write-proxy", set_write_proxy_v2),
    ("write-proxy-v1", set_write_proxy_v1),
    ("write-proxy-v2", set_write_proxy_v2),
    ("proxy-proxy", set_proxy_proxy),
    ("proxy-tlv", set_proxy_tlv),
    ("proxy-authority", set_proxy_authority),
    ("proxy-client-cert", set_proxy_client_cert),
    ("alpn-protos", set_alpn_protos),
    ("pem-file", set_pem_file),
    ("pem-dir", set_pem_dir),
    ("pem-dir-glob", set_pem_dir_glob),
    ("backend-connect-timeout", set_backend_connect_timeout),
    ("ssl-handshake-timeout", set_ssl_handshake_timeout),
    ("recv-bufsize", set_recv_bufsize),
    ("send-bufsize", set_send_bufsize),
    ("pidfile", set_pidfile),
    ("ring-slots", set_ring_slots),
    ("ring-data-len", set_ring_data_len),
    ("sni-nomatch-abort", set_sni_nomatch_abort),
    ("ocsp-dir", set_ocsp_dir),
    ("ocsp-verify-staple", set_ocsp_verify),
    ("ocsp-connect-tmo", set_ocsp_conn_tmo),
    ("ocsp-resp-tmo", set_ocsp_resp_tmo),
    ("ocsp-refresh-interval", set_ocsp_refresh_interval),
    ("client-verify", set_client_verify),
    ("client-verify-ca", set_client_verify_ca),
    ("dbg-listen", set_dbg_listen),
    ("enable-tcp-fastopen", set_tfo),
];

#[cfg(feature = "shared-cache")]
const SHARED_CACHE_KEYS: &[(&str, Setter)] = &[
    ("shared-cache", set_shared_cache),
    ("shared-cache-listen", set_shared_cache_listen),
    ("shared-cache-peer", set_shared_cache_peer),
    ("shared-cache-if", set_shared_cache_if),
];

#[cfg(not(feature = "shared-cache"))]
const SHARED_CACHE_KEYS: &[(&str, Setter)] = &[];

/// Find the setter for `key`, returning the key's static spelling
fn lookup(key: &str) -> Option<(&'static str, Setter)> {
    KEYS.iter()
        .chain(SHARED_CACHE_KEYS.iter())
        .find(|(k, _)| *k == key)
        .copied()
}

/// Whether `key` is a recognised configuration key
pub fn is_known_key(key: &str) -> bool {
    lookup(key).is_some()
}

impl Configuration {
    /// Apply a single `key = value` pair
    ///
    /// Unknown keys are logged and ignored. Failures are wrapped with the
    /// file and line, or the parameter name, depending on `origin`.
    pub fn validate(&mut self, key: &str, value: &str, origin: Origin<'_>) -> Result<()> {
        let Some((name, setter)) = lookup(key) else {
            match origin {
                Origin::File { file, line } => warn!(
                    "Ignoring unknown configuration key '{}' in configuration file '{}', line {}",
                    key, file, line
                ),
                Origin::CommandLine => warn!("Ignoring unknown configuration key '{}'", key),
            }
            return Ok(());
        };

        debug!("Applying {} = '{}' (from {})", name, value, origin.source());
        setter(self, value).map_err(|e| origin.wrap(key, e))?;
        self.sources.insert(name, origin.source());
        Ok(())
    }
}

fn set_tls(config: &mut Configuration, value: &str) -> Result<()> {
    if parse_bool(value)? {
        config.tls_protos = Some(TlsProtocols::TLS_OPTION);
    }
    Ok(())
}

fn set_ssl(config: &mut Configuration, value: &str) -> Result<()> {
    if parse_bool(value)? {
        config.tls_protos = Some(TlsProtocols::SSL_OPTION);
    }
    Ok(())
}

fn set_tls_protos(config: &mut Configuration, value: &str) -> Result<()> {
    config.tls_protos = Some(value.parse()?);
    Ok(())
}

fn set_ciphers(config: &mut Configuration, value: &str) -> Result<()> {
    if !value.is_empty() {
        config.ciphers = value.to_string();
    }
    Ok(())
}

fn set_ciphersuites(config: &mut Configuration, value: &str) -> Result<()> {
    if !value.is_empty() {
        config.ciphersuites = Some(value.to_string());
    }
    Ok(())
}

fn set_engine(config: &mut Configuration, value: &str) -> Result<()> {
    if !value.is_empty() {
        config.engine = Some(value.to_string());
    }
    Ok(())
}

bool_setter!(set_prefer_server_ciphers, prefer_server_ciphers);

fn set_frontend(config: &mut Configuration, value: &str) -> Result<()> {
    let parsed = parse_endpoint(value, EndpointRules::FRONTEND)?;
    let hp = match parsed.endpoint {
        Endpoint::Tcp(hp) => hp,
        Endpoint::Unix(_) => return Err(ConfigError::InvalidAddress(value.to_string())),
    };

    let mut frontend = Frontend::from_host_port(hp);
    if let Some(cert) = parsed.cert {
        frontend.add_cert(CertFile::verified(cert)?);
    }

    config.frontends.add(frontend)
}

fn set_backend(config: &mut Configuration, value: &str) -> Result<()> {
    config.backend = parse_endpoint(value, EndpointRules::BACKEND)?.endpoint;
    Ok(())
}

fn set_workers(config: &mut Configuration, value: &str) -> Result<()> {
    let workers = parse_long(value, true)?;
    config.workers =
        u64::try_from(workers).map_err(|_| ConfigError::OutOfRange(value.to_string()))?;
    Ok(())
}

fn set_backlog(config: &mut Configuration, value: &str) -> Result<()> {
    config.backlog = parse_int(value, false)?;
    Ok(())
}

u32_setter!(set_keepalive, keepalive);
u32_setter!(set_backend_refresh, backend_refresh);

fn set_chroot(config: &mut Configuration, value: &str) -> Result<()> {
    if !value.is_empty() {
        let path = PathBuf::from(value);
        check_directory(&path, "chroot directory")?;
        config.chroot = Some(path);
    }
    Ok(())
}

fn set_user(config: &mut Configuration, value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }

    match User::from_name(value) {
        Ok(Some(user)) => {
            config.uid = Some(user.uid.as_raw());
            config.gid = Some(user.gid.as_raw());
            Ok(())
        }
        Ok(None) => Err(ConfigError::InvalidValue(
            "user".to_string(),
            format!("Invalid user '{}'", value),
        )),
        Err(e) => Err(ConfigError::InvalidValue(
            "user".to_string(),
            format!("Invalid user '{}': {}", value, e),
        )),
    }
}

fn set_group(config: &mut Configuration, value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }

    match Group::from_name(value) {
        Ok(Some(group)) => {
            config.gid = Some(group.gid.as_raw());
            Ok(())
        }
        Ok(None) => Err(ConfigError::InvalidValue(
            "group".to_string(),
            format!("Invalid group '{}'", value),
        )),
        Err(e) => Err(ConfigError::InvalidValue(
            "group".to_string(),
            format!("Invalid group '{}': {}", value, e),
        )),
    }
}

fn set_quiet(config: &mut Configuration, value: &str) -> Result<()> {
    config.logging.level = if parse_bool(value)? { 0 } else { 1 };
    Ok(())
}

u32_setter!(set_log_level, logging.level);
path_setter!(set_log_filename, logging.filename);
bool_setter!(set_syslog, logging.syslog);

fn set_syslog_facility(config: &mut Configuration, value: &str) -> Result<()> {
    config.logging.syslog_facility = value.parse()?;
    Ok(())
}

bool_setter!(set_daemon, daemonize);
bool_setter!(set_write_ip, proxy.write_ip);
bool_setter!(set_write_proxy_v1, proxy.write_proxy_v1);
bool_setter!(set_write_proxy_v2, proxy.write_proxy_v2);
bool_setter!(set_proxy_proxy, proxy.proxy_proxy);
bool_setter!(set_proxy_tlv, proxy.proxy_tlv);
bool_setter!(set_proxy_authority, proxy.proxy_authority);
bool_setter!(set_proxy_client_cert, proxy.proxy_client_cert);

fn set_alpn_protos(config: &mut Configuration, value: &str) -> Result<()> {
    if !value.is_empty() {
        config.alpn.set(value);
    }
    Ok(())
}

/// Each `pem-file` becomes the new default; the previous default moves
/// to the secondary set
fn set_pem_file(config: &mut Configuration, value: &str) -> Result<()> {
    let cert = CertFile::verified(value)?;
    config.certs.promote(cert);
    Ok(())
}

path_setter!(set_pem_dir, pem_dir);

fn set_pem_dir_glob(config: &mut Configuration, value: &str) -> Result<()> {
    if !value.is_empty() {
        compile_glob(value)?;
        config.pem_dir_glob = Some(value.to_string());
    }
    Ok(())
}

u32_setter!(set_backend_connect_timeout, backend_connect_timeout);
u32_setter!(set_ssl_handshake_timeout, ssl_handshake_timeout);

fn set_recv_bufsize(config: &mut Configuration, value: &str) -> Result<()> {
    config.recv_bufsize = Some(parse_u32(value)?);
    Ok(())
}

fn set_send_bufsize(config: &mut Configuration, value: &str) -> Result<()> {
    config.send_bufsize = Some(parse_u32(value)?);
    Ok(())
}

path_setter!(set_pidfile, pidfile);
u32_setter!(set_ring_slots, ring_slots);
u32_setter!(set_ring_data_len, ring_data_len);
bool_setter!(set_sni_nomatch_abort, sni_nomatch_abort);

/// An empty value disables OCSP stapling
fn set_ocsp_dir(config: &mut Configuration, value: &str) -> Result<()> {
    config.ocsp.dir = if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    };
    Ok(())
}

bool_setter!(set_ocsp_verify, ocsp.verify);

fn set_ocsp_conn_tmo(config: &mut Configuration, value: &str) -> Result<()> {
    config.ocsp.conn_tmo = parse_seconds(value)?;
    Ok(())
}

fn set_ocsp_resp_tmo(config: &mut Configuration, value: &str) -> Result<()> {
    config.ocsp.resp_tmo = parse_seconds(value)?;
    Ok(())
}

u32_setter!(set_ocsp_refresh_interval, ocsp.refresh_interval);

fn set_client_verify(config: &mut Configuration, value: &str) -> Result<()> {
    config.client_verify = value.parse()?;
    Ok(())
}

path_setter!(set_client_verify_ca, client_verify_ca);

fn set_dbg_listen(config: &mut Configuration, value: &str) -> Result<()> {
    if !value.is_empty() {
        config.dbg_listen = Some(value.to_string());
    }
    Ok(())
}

bool_setter!(set_tfo, tfo);

#[cfg(feature = "shared-cache")]
u32_setter!(set_shared_cache, shared_cache.size);

#[cfg(feature = "shared-cache")]
fn set_shared_cache_listen(config: &mut Configuration, value: &str) -> Result<()> {
    use crate::config::endpoint::parse_host_port;

    if !value.is_empty() {
        config.shared_cache.listen = Some(parse_host_port(value, true)?);
    }
    Ok(())
}

#[cfg(feature = "shared-cache")]
fn set_shared_cache_peer(config: &mut Configuration, value: &str) -> Result<()> {
    config.shared_cache.peers.add_peer(value)
}

#[cfg(feature = "shared-cache")]
fn set_shared_cache_if(config: &mut Configuration, value: &str) -> Result<()> {
    use crate::config::shared_cache::parse_mcast_if;

    config.shared_cache.mcast_if = Some(parse_mcast_if(value)?);
    Ok(())
}

/// Check options that must not be combined, or that depend on each other
pub fn check_option_conflicts(config: &Configuration) -> Result<()> {
    if config.proxy.active_modes() >= 2 {
        return Err(ConfigError::InvalidCombination(
            "Options --write-ip, --proxy-proxy, --write-proxy-v1 and --write-proxy-v2 are mutually exclusive."
                .to_string(),
        ));
    }

    check_client_verify(config)?;

    #[cfg(feature = "shared-cache")]
    if config.shared_cache.listen.is_some() && !config.shared_cache.is_enabled() {
        return Err(ConfigError::InvalidCombination(
            "Shared cache update listener is defined, but shared cache is disabled.".to_string(),
        ));
    }

    Ok(())
}

/// Client certificate verification needs a CA, globally or per frontend
fn check_client_verify(config: &Configuration) -> Result<()> {
    if config.client_verify.requires_ca() && config.client_verify_ca.is_none() {
        return Err(ConfigError::InvalidCombination(
            "Setting 'client-verify-ca' is required when configuring client-verify".to_string(),
        ));
    }

    for frontend in config.frontends.iter() {
        let requires_ca = frontend
            .client_verify
            .is_some_and(ClientCertMode::requires_ca);

        if requires_ca && frontend.client_verify_ca.is_none() && config.client_verify_ca.is_none() {
            return Err(ConfigError::InvalidCombination(format!(
                "No 'client-verify-ca' configured for frontend '{}'",
                frontend.pspec
            )));
        }
    }

    Ok(())
}

/// In server mode every frontend must end up with a certificate
pub fn check_certificate_coverage(config: &Configuration) -> Result<()> {
    if config.mode != ProxyMode::Server {
        return Ok(());
    }

    let has_global = config.certs.has_default();
    for frontend in config.frontends.iter() {
        let covered =
            !frontend.certs.is_empty() || (has_global && frontend.uses_global_certs());
        if !covered {
            return Err(ConfigError::MissingCertificate(frontend.pspec.clone()));
        }
    }

    Ok(())
}
