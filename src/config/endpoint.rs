//! Endpoint grammar
//!
//! Listener and backend endpoints are written as `[HOST]:PORT`, optionally
//! followed by `+CERT` for frontends. The brackets are mandatory, which keeps
//! IPv6 literals unambiguous. `*` as host means "any address" where the caller
//! allows it, and a leading `/` selects a UNIX-domain socket for backends.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::common::fs::check_socket;
use crate::config::defaults::{MAX_HOST_LEN, MAX_UNIX_PATH_LEN};
use crate::config::error::{ConfigError, Result};

/// TCP endpoint; `host == None` is the wildcard address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct HostPort {
    pub host: Option<String>,
    pub port: u16,
}

impl HostPort {
    pub fn new(host: Option<&str>, port: u16) -> Self {
        Self {
            host: host.map(str::to_string),
            port,
        }
    }

    /// True when bound to every local address
    pub fn is_wildcard(&self) -> bool {
        self.host.is_none()
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]:{}", self.host.as_deref().unwrap_or("*"), self.port)
    }
}

/// Either a TCP address or a UNIX-domain socket path, never both
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Tcp(HostPort),
    Unix(PathBuf),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(hp) => hp.fmt(f),
            Endpoint::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}

/// What a caller accepts from the grammar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointRules {
    /// `[*]` accepted as the wildcard host
    pub wildcard: bool,
    /// A leading `/` is a UNIX-domain socket path
    pub unix: bool,
    /// `+CERT` suffix accepted after the port
    pub inline_cert: bool,
}

impl EndpointRules {
    /// `backend`: concrete host or UNIX socket
    pub const BACKEND: Self = Self {
        wildcard: false,
        unix: true,
        inline_cert: false,
    };

    /// `frontend`: wildcard allowed, optional inline certificate
    pub const FRONTEND: Self = Self {
        wildcard: true,
        unix: false,
        inline_cert: true,
    };

    /// `shared-cache-listen`
    pub const LISTENER: Self = Self {
        wildcard: true,
        unix: false,
        inline_cert: false,
    };

    /// `shared-cache-peer`: concrete TCP address only
    pub const PEER: Self = Self {
        wildcard: false,
        unix: false,
        inline_cert: false,
    };
}

/// Result of parsing one endpoint string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEndpoint {
    pub endpoint: Endpoint,
    /// Certificate path given after `+`
    pub cert: Option<PathBuf>,
}

/// Parse an endpoint specification according to `rules`
pub fn parse_endpoint(spec: &str, rules: EndpointRules) -> Result<ParsedEndpoint> {
    if rules.unix && spec.starts_with('/') {
        return parse_unix_path(spec).map(|path| ParsedEndpoint {
            endpoint: Endpoint::Unix(path),
            cert: None,
        });
    }

    let invalid = || ConfigError::InvalidAddress(spec.to_string());

    let rest = spec.strip_prefix('[').ok_or_else(invalid)?;
    let close = rest.rfind(']').ok_or_else(invalid)?;
    let host = &rest[..close];
    if host.len() > MAX_HOST_LEN {
        return Err(invalid());
    }

    let port_part = rest[close + 1..]
        .strip_prefix(':')
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ConfigError::InvalidPort(spec.to_string()))?;

    let (port_str, cert) = match port_part.split_once('+') {
        Some((port, cert)) if rules.inline_cert => (port, Some(cert)),
        _ => (port_part, None),
    };

    let port = parse_port(port_str)?;

    let host = match host {
        "*" if rules.wildcard => None,
        "*" => return Err(ConfigError::WildcardNotAllowed),
        "" => return Err(invalid()),
        h => Some(h.to_string()),
    };

    let cert = match cert {
        Some("") => {
            return Err(ConfigError::MissingValue(format!(
                "certificate path after '+' in '{}'",
                spec
            )))
        }
        Some(c) => Some(PathBuf::from(c)),
        None => None,
    };

    Ok(ParsedEndpoint {
        endpoint: Endpoint::Tcp(HostPort { host, port }),
        cert,
    })
}

/// Parse a TCP-only endpoint
pub fn parse_host_port(spec: &str, wildcard: bool) -> Result<HostPort> {
    let rules = EndpointRules {
        wildcard,
        ..EndpointRules::default()
    };

    match parse_endpoint(spec, rules)?.endpoint {
        Endpoint::Tcp(hp) => Ok(hp),
        Endpoint::Unix(_) => Err(ConfigError::InvalidAddress(spec.to_string())),
    }
}

/// Parse a decimal port number in `0..=65535`
pub fn parse_port(value: &str) -> Result<u16> {
    let invalid = || ConfigError::InvalidPort(value.to_string());

    let digits = value.strip_prefix('-').unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let port = value.parse::<i64>().map_err(|_| invalid())?;
    u16::try_from(port).map_err(|_| invalid())
}

fn parse_unix_path(spec: &str) -> Result<PathBuf> {
    if spec.len() > MAX_UNIX_PATH_LEN {
        return Err(ConfigError::InvalidPath(spec.to_string()));
    }

    let path = Path::new(spec);
    check_socket(path)?;
    Ok(path.to_path_buf())
}
