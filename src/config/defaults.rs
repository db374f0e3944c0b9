//! Default configuration values
//!
//! This module provides default values for configuration options.
//! It is designed to be a single source of truth for defaults,
//! making it easier to maintain consistent defaults across the application.

use std::path::PathBuf;

use super::types::{ClientCertMode, SyslogFacility};

/// Pseudo key of the synthetic frontend that exists until a real one is added
pub const DEFAULT_FRONTEND_KEY: &str = "default";

/// Port of the synthetic default frontend
pub const DEFAULT_FRONTEND_PORT: u16 = 8443;

/// Default backend host
pub const BACKEND_HOST_STR: &str = "127.0.0.1";

/// Default backend port
pub const BACKEND_PORT: u16 = 8000;

/// Default TLS 1.2 cipher list
pub const CIPHERS_STR: &str = "EECDH+AESGCM:EDH+AESGCM:AES256+EECDH:AES256+EDH";

/// Default OCSP staple cache directory
pub const OCSP_DIR_STR: &str = "/var/lib/tlsfront/";

/// Maximum length of a UNIX-domain socket path (`sockaddr_un.sun_path` on BSD)
pub const MAX_UNIX_PATH_LEN: usize = 104;

/// Maximum length of the host part of an endpoint
pub const MAX_HOST_LEN: usize = 150;

/// Maximum length of a `shared-cache-if` argument
pub const MAX_MCASTIF_LEN: usize = 150;

/// Maximum number of shared cache update peers
pub const MAX_SHCUPD_PEERS: usize = 15;

/// Boolean value a bare switch flag stands for
pub const BOOL_ON: &str = "on";

/// Default number of worker processes
pub fn workers() -> u64 {
    1
}

/// Default listen backlog
pub fn backlog() -> i32 {
    100
}

/// Default TCP keepalive time in seconds
pub fn keepalive() -> u32 {
    3600
}

/// Default backend refresh interval (0 disables periodic lookups)
pub fn backend_refresh() -> u32 {
    0
}

/// Default backend connect timeout in seconds
pub fn backend_connect_timeout() -> u32 {
    30
}

/// Default TLS handshake timeout in seconds
pub fn ssl_handshake_timeout() -> u32 {
    30
}

/// Default log level (0 = errors only, 1 = normal, 2 = debug)
pub fn log_level() -> u32 {
    1
}

/// Default syslog facility
pub fn syslog_facility() -> SyslogFacility {
    SyslogFacility::Daemon
}

/// Default global client certificate verification
pub fn client_verify() -> ClientCertMode {
    ClientCertMode::None
}

/// Default OCSP staple directory
pub fn ocsp_dir() -> Option<PathBuf> {
    Some(PathBuf::from(OCSP_DIR_STR))
}

/// Default OCSP responder response timeout in seconds
pub fn ocsp_resp_tmo() -> f64 {
    10.0
}

/// Default OCSP responder connect timeout in seconds
pub fn ocsp_conn_tmo() -> f64 {
    4.0
}

/// Default OCSP refresh interval in seconds
pub fn ocsp_refresh_interval() -> u32 {
    1800
}

/// Default cipher list
pub fn ciphers() -> String {
    CIPHERS_STR.to_string()
}
