//! Configuration types
//!
//! This module contains the resolved configuration aggregate and the small
//! enumerations its fields are made of.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::alpn::Alpn;
use crate::config::cert::CertificateRegistry;
use crate::config::defaults;
use crate::config::endpoint::{Endpoint, HostPort};
use crate::config::error::ConfigError;
use crate::config::frontend::FrontendRegistry;
#[cfg(feature = "shared-cache")]
use crate::config::shared_cache::SharedCacheOptions;

/// Tri-state option: not configured, explicitly on, explicitly off
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Toggle {
    #[default]
    Unset,
    Enabled,
    Disabled,
}

impl Toggle {
    pub fn is_set(self) -> bool {
        self != Toggle::Unset
    }

    pub fn is_enabled(self) -> bool {
        self == Toggle::Enabled
    }

    /// Collapse to a boolean, using `default` when unset
    pub fn resolve(self, default: bool) -> bool {
        match self {
            Toggle::Unset => default,
            Toggle::Enabled => true,
            Toggle::Disabled => false,
        }
    }
}

impl From<bool> for Toggle {
    fn from(value: bool) -> Self {
        if value {
            Toggle::Enabled
        } else {
            Toggle::Disabled
        }
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Toggle::Unset => write!(f, "unset"),
            Toggle::Enabled => write!(f, "on"),
            Toggle::Disabled => write!(f, "off"),
        }
    }
}

/// Client certificate verification mode
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ClientCertMode {
    /// Require client certificate, handshake fails if not provided
    Required,
    /// Verify the client certificate if provided but don't require it
    Optional,
    /// Don't request client certificates
    #[default]
    None,
}

impl ClientCertMode {
    /// True when a verification CA is needed
    pub fn requires_ca(self) -> bool {
        self != ClientCertMode::None
    }
}

impl fmt::Display for ClientCertMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientCertMode::Required => write!(f, "required"),
            ClientCertMode::Optional => write!(f, "optional"),
            ClientCertMode::None => write!(f, "none"),
        }
    }
}

impl FromStr for ClientCertMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "required" => Ok(Self::Required),
            "optional" => Ok(Self::Optional),
            "none" => Ok(Self::None),
            _ => Err(ConfigError::InvalidValue(
                "client-verify".to_string(),
                format!(
                    "Invalid client certificate mode: {}. Valid values are: required, optional, none",
                    s
                ),
            )),
        }
    }
}

/// Server or client side TLS termination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    #[default]
    Server,
    Client,
}

impl fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyMode::Server => write!(f, "server"),
            ProxyMode::Client => write!(f, "client"),
        }
    }
}

/// Set of enabled TLS protocol versions
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TlsProtocols(u8);

impl TlsProtocols {
    pub const SSLV3: Self = Self(0x01);
    pub const TLSV1_0: Self = Self(0x02);
    pub const TLSV1_1: Self = Self(0x04);
    pub const TLSV1_2: Self = Self(0x08);
    pub const TLSV1_3: Self = Self(0x10);

    /// Versions enabled when nothing is configured
    pub const DEFAULT: Self = Self(Self::TLSV1_2.0 | Self::TLSV1_3.0);
    /// `--tls` preset
    pub const TLS_OPTION: Self = Self(Self::TLSV1_0.0 | Self::TLSV1_1.0 | Self::DEFAULT.0);
    /// `--ssl` preset
    pub const SSL_OPTION: Self = Self(Self::SSLV3.0 | Self::TLS_OPTION.0);

    const NAMES: [(&'static str, TlsProtocols); 5] = [
        ("SSLv3", Self::SSLV3),
        ("TLSv1.0", Self::TLSV1_0),
        ("TLSv1.1", Self::TLSV1_1),
        ("TLSv1.2", Self::TLSV1_2),
        ("TLSv1.3", Self::TLSV1_3),
    ];

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Names of the enabled versions, oldest first
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(_, p)| self.contains(*p))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl BitOr for TlsProtocols {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for TlsProtocols {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Every known version name found anywhere in the value is enabled,
/// case-insensitively; separators are irrelevant.
impl FromStr for TlsProtocols {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let haystack = s.to_ascii_lowercase();
        let mut protos = TlsProtocols::default();

        for (name, proto) in Self::NAMES {
            if haystack.contains(&name.to_ascii_lowercase()) {
                protos |= proto;
            }
        }

        if protos.is_empty() {
            return Err(ConfigError::InvalidValue(
                "tls-protos".to_string(),
                format!("Invalid 'tls-protos' option '{}'", s),
            ));
        }

        Ok(protos)
    }
}

impl fmt::Display for TlsProtocols {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join(" "))
    }
}

impl fmt::Debug for TlsProtocols {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TlsProtocols({:#04x}: {})", self.0, self)
    }
}

impl Serialize for TlsProtocols {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.names())
    }
}

/// Syslog facility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyslogFacility {
    Auth,
    Authpriv,
    Cron,
    Daemon,
    Ftp,
    Local0,
    Local1,
    Local2,
    Local3,
    Local4,
    Local5,
    Local6,
    Local7,
    Lpr,
    Mail,
    News,
    User,
    Uucp,
}

impl SyslogFacility {
    const ALL: [(&'static str, SyslogFacility); 18] = [
        ("auth", Self::Auth),
        ("authpriv", Self::Authpriv),
        ("cron", Self::Cron),
        ("daemon", Self::Daemon),
        ("ftp", Self::Ftp),
        ("local0", Self::Local0),
        ("local1", Self::Local1),
        ("local2", Self::Local2),
        ("local3", Self::Local3),
        ("local4", Self::Local4),
        ("local5", Self::Local5),
        ("local6", Self::Local6),
        ("local7", Self::Local7),
        ("lpr", Self::Lpr),
        ("mail", Self::Mail),
        ("news", Self::News),
        ("user", Self::User),
        ("uucp", Self::Uucp),
    ];

    pub fn as_str(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(_, f)| *f == self)
            .map(|(name, _)| *name)
            .unwrap_or("daemon")
    }
}

impl fmt::Display for SyslogFacility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyslogFacility {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, f)| *f)
            .ok_or_else(|| {
                ConfigError::InvalidValue("syslog-facility".to_string(), format!("Invalid facility '{}'", s))
            })
    }
}

/// Source of a configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// Compiled-in default
    Default,
    /// From configuration file
    File,
    /// From command line argument
    CommandLine,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::Default => write!(f, "default"),
            ValueSource::File => write!(f, "file"),
            ValueSource::CommandLine => write!(f, "command line"),
        }
    }
}

/// Where a key/value pair handed to `validate` came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin<'a> {
    File { file: &'a str, line: usize },
    CommandLine,
}

impl Origin<'_> {
    pub fn source(&self) -> ValueSource {
        match self {
            Origin::File { .. } => ValueSource::File,
            Origin::CommandLine => ValueSource::CommandLine,
        }
    }

    /// Attach file/line or parameter context to a component failure
    pub fn wrap(&self, key: &str, err: ConfigError) -> ConfigError {
        match *self {
            Origin::File { file, line } => ConfigError::InFile {
                file: file.to_string(),
                line,
                source: Box::new(err),
            },
            Origin::CommandLine => ConfigError::InParam {
                key: key.to_string(),
                source: Box::new(err),
            },
        }
    }
}

/// Logging options
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggingOptions {
    /// 0 = errors only, 1 = normal, 2 and above = debug
    pub level: u32,
    pub syslog: bool,
    pub syslog_facility: SyslogFacility,
    pub filename: Option<PathBuf>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            syslog: false,
            syslog_facility: defaults::syslog_facility(),
            filename: None,
        }
    }
}

/// What gets prepended to the backend stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProxyProtocolOptions {
    pub write_ip: bool,
    pub write_proxy_v1: bool,
    pub write_proxy_v2: bool,
    pub proxy_proxy: bool,
    pub proxy_tlv: bool,
    pub proxy_authority: bool,
    pub proxy_client_cert: bool,
}

impl ProxyProtocolOptions {
    /// Number of mutually exclusive header modes switched on
    pub fn active_modes(&self) -> usize {
        [self.write_ip, self.proxy_proxy, self.write_proxy_v1, self.write_proxy_v2]
            .iter()
            .filter(|on| **on)
            .count()
    }
}

/// OCSP stapling options
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcspOptions {
    /// Staple cache directory; `None` disables stapling
    pub dir: Option<PathBuf>,
    pub verify: bool,
    pub resp_tmo: f64,
    pub conn_tmo: f64,
    pub refresh_interval: u32,
}

impl Default for OcspOptions {
    fn default() -> Self {
        Self {
            dir: defaults::ocsp_dir(),
            verify: false,
            resp_tmo: defaults::ocsp_resp_tmo(),
            conn_tmo: defaults::ocsp_conn_tmo(),
            refresh_interval: defaults::ocsp_refresh_interval(),
        }
    }
}

/// Resolved configuration
///
/// Built from compiled-in defaults, then mutated by the configuration file
/// pass and the command-line pass. Once resolution succeeds it is handed
/// out behind an `Arc` and never mutated again.
#[derive(Debug, Clone, Serialize)]
pub struct Configuration {
    pub mode: ProxyMode,

    // --- TLS settings ---
    /// TLS 1.2 and older cipher list
    pub ciphers: String,
    /// TLS 1.3 cipher suites
    pub ciphersuites: Option<String>,
    pub engine: Option<String>,
    /// Enabled versions; `None` until resolution picks the default
    pub tls_protos: Option<TlsProtocols>,
    pub prefer_server_ciphers: bool,
    pub sni_nomatch_abort: bool,
    pub client_verify: ClientCertMode,
    pub client_verify_ca: Option<PathBuf>,
    pub alpn: Alpn,

    // --- Endpoints and certificates ---
    pub backend: Endpoint,
    pub frontends: FrontendRegistry,
    pub certs: CertificateRegistry,
    pub pem_dir: Option<PathBuf>,
    pub pem_dir_glob: Option<String>,
    pub ocsp: OcspOptions,

    // --- Operational settings ---
    pub workers: u64,
    pub backlog: i32,
    pub keepalive: u32,
    pub backend_refresh: u32,
    pub backend_connect_timeout: u32,
    pub ssl_handshake_timeout: u32,
    pub recv_bufsize: Option<u32>,
    pub send_bufsize: Option<u32>,
    pub ring_slots: u32,
    pub ring_data_len: u32,
    pub tfo: bool,
    pub dbg_listen: Option<String>,
    pub proxy: ProxyProtocolOptions,

    // --- Process settings ---
    pub chroot: Option<PathBuf>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub daemonize: bool,
    pub pidfile: Option<PathBuf>,
    pub logging: LoggingOptions,
    pub test_only: bool,

    #[cfg(feature = "shared-cache")]
    pub shared_cache: SharedCacheOptions,

    /// Which pass last assigned each key
    #[serde(skip)]
    pub sources: BTreeMap<&'static str, ValueSource>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            mode: ProxyMode::default(),
            ciphers: defaults::ciphers(),
            ciphersuites: None,
            engine: None,
            tls_protos: None,
            prefer_server_ciphers: false,
            sni_nomatch_abort: false,
            client_verify: defaults::client_verify(),
            client_verify_ca: None,
            alpn: Alpn::default(),
            backend: Endpoint::Tcp(HostPort::new(
                Some(defaults::BACKEND_HOST_STR),
                defaults::BACKEND_PORT,
            )),
            frontends: FrontendRegistry::new(),
            certs: CertificateRegistry::default(),
            pem_dir: None,
            pem_dir_glob: None,
            ocsp: OcspOptions::default(),
            workers: defaults::workers(),
            backlog: defaults::backlog(),
            keepalive: defaults::keepalive(),
            backend_refresh: defaults::backend_refresh(),
            backend_connect_timeout: defaults::backend_connect_timeout(),
            ssl_handshake_timeout: defaults::ssl_handshake_timeout(),
            recv_bufsize: None,
            send_bufsize: None,
            ring_slots: 0,
            ring_data_len: 0,
            tfo: false,
            dbg_listen: None,
            proxy: ProxyProtocolOptions {
                proxy_tlv: true,
                proxy_authority: true,
                ..ProxyProtocolOptions::default()
            },
            chroot: None,
            uid: None,
            gid: None,
            daemonize: false,
            pidfile: None,
            logging: LoggingOptions::default(),
            test_only: false,
            #[cfg(feature = "shared-cache")]
            shared_cache: SharedCacheOptions::default(),
            sources: BTreeMap::new(),
        }
    }
}

impl Configuration {
    /// Configuration holding only compiled-in defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the source of a configuration value
    pub fn source(&self, key: &str) -> ValueSource {
        self.sources.get(key).copied().unwrap_or(ValueSource::Default)
    }
}
