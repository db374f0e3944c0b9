//! Configuration sources
//!
//! A source applies its values to a [`Configuration`] in place. The file
//! source runs first and the command line second, so command-line values
//! override the file.

use clap::{Arg, ArgAction, ArgMatches, Command};
use log::debug;
use std::path::{Path, PathBuf};

use crate::config::defaults::BOOL_ON;
use crate::config::error::{ConfigError, Result};
use crate::config::parser::parse_file;
use crate::config::types::{Configuration, Origin, ValueSource};
use crate::APP_NAME;

/// Configuration source trait
pub trait ConfigSource {
    /// Apply this source's values on top of `config`
    fn apply(&self, config: &mut Configuration) -> Result<()>;

    /// Get the source type
    fn source_type(&self) -> ValueSource;
}

/// Configuration file source
pub struct FileSource {
    pub path: PathBuf,
}

impl FileSource {
    /// Create a new file source
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ConfigSource for FileSource {
    fn apply(&self, config: &mut Configuration) -> Result<()> {
        debug!("Loading configuration from file: {}", self.path.display());
        parse_file(&self.path, config)
    }

    fn source_type(&self) -> ValueSource {
        ValueSource::File
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    /// Takes exactly one value
    Value,
    /// Optional `=on` / `=off`, bare means on
    Switch,
}

struct Flag {
    key: &'static str,
    short: Option<char>,
    kind: Kind,
    help: &'static str,
}

const fn value(key: &'static str, short: Option<char>, help: &'static str) -> Flag {
    Flag {
        key,
        short,
        kind: Kind::Value,
        help,
    }
}

const fn switch(key: &'static str, short: Option<char>, help: &'static str) -> Flag {
    Flag {
        key,
        short,
        kind: Kind::Switch,
        help,
    }
}

/// Command-line flags that map 1:1 onto configuration keys
const FLAGS: &[Flag] = &[
    value("ciphers", Some('c'), "TLS 1.2 cipher list"),
    value("ciphersuites", None, "TLS 1.3 cipher suites"),
    value("ssl-engine", Some('e'), "Crypto engine to use"),
    switch("prefer-server-ciphers", Some('O'), "Prefer server list order"),
    value("tls-protos", None, "Enabled protocols, e.g. \"TLSv1.2 TLSv1.3\""),
    value("client-verify", None, "Client certificate verification: none, optional, required"),
    value("client-verify-ca", None, "CA bundle for client certificate verification"),
    value("alpn-protos", None, "Comma separated ALPN protocol list"),
    value("frontend", Some('f'), "Listen on [HOST]:PORT[+CERT] (repeatable)"),
    value("backend", Some('b'), "Backend [HOST]:PORT or UNIX socket path"),
    value("workers", Some('n'), "Number of worker processes"),
    value("backlog", Some('B'), "Listen backlog size"),
    value("keepalive", Some('k'), "TCP keepalive in seconds"),
    value("backend-refresh", Some('R'), "Backend address refresh interval in seconds"),
    value("backend-connect-timeout", None, "Backend connect timeout in seconds"),
    value("ssl-handshake-timeout", None, "TLS handshake timeout in seconds"),
    value("recv-bufsize", None, "Socket receive buffer size"),
    value("send-bufsize", None, "Socket send buffer size"),
    value("ring-slots", None, "Number of ring buffer slots"),
    value("ring-data-len", None, "Ring buffer slot size"),
    value("chroot", Some('r'), "Chroot directory"),
    value("user", Some('u'), "Drop privileges to this user"),
    value("group", Some('g'), "Drop privileges to this group"),
    switch("quiet", Some('q'), "Log errors only"),
    value("log-filename", Some('l'), "Append log output to this file"),
    value("log-level", Some('L'), "Log level: 0 errors, 1 normal, 2 debug"),
    switch("syslog", Some('s'), "Also log to syslog"),
    value("syslog-facility", None, "Syslog facility"),
    switch("daemon", None, "Run as a daemon"),
    value("pidfile", Some('p'), "PID file"),
    switch("write-ip", None, "Prepend the client IP to the backend stream"),
    switch("write-proxy", None, "Alias of --write-proxy-v2"),
    switch("write-proxy-v1", None, "Prepend a PROXY v1 header"),
    switch("write-proxy-v2", None, "Prepend a PROXY v2 header"),
    switch("proxy-proxy", None, "Forward a PROXY header received from the client"),
    switch("proxy-tlv", None, "Add TLS details to PROXY v2 headers"),
    switch("proxy-authority", None, "Add the SNI name to PROXY v2 headers"),
    switch("proxy-client-cert", None, "Add the client certificate to PROXY v2 headers"),
    switch("sni-nomatch-abort", None, "Abort handshakes without a matching SNI name"),
    value("pem-dir", None, "Directory of PEM files to load"),
    value("pem-dir-glob", None, "Only load PEM files matching this glob"),
    value("ocsp-dir", Some('o'), "OCSP staple cache directory"),
    switch("ocsp-verify-staple", None, "Verify OCSP staples"),
    value("ocsp-connect-tmo", None, "OCSP responder connect timeout in seconds"),
    value("ocsp-resp-tmo", None, "OCSP responder response timeout in seconds"),
    value("ocsp-refresh-interval", None, "OCSP refresh interval in seconds"),
    value("dbg-listen", None, "Debug listener address"),
    switch("enable-tcp-fastopen", None, "Enable TCP Fast Open"),
];

#[cfg(feature = "shared-cache")]
const SHARED_CACHE_FLAGS: &[Flag] = &[
    value("shared-cache", Some('C'), "Shared session cache size in entries"),
    value("shared-cache-listen", Some('U'), "Listen for cache updates on [HOST]:PORT"),
    value("shared-cache-peer", Some('P'), "Send cache updates to [HOST]:PORT (repeatable)"),
    value("shared-cache-if", Some('M'), "Multicast IFACE[,TTL] for cache updates"),
];

#[cfg(not(feature = "shared-cache"))]
const SHARED_CACHE_FLAGS: &[Flag] = &[];

fn flags() -> impl Iterator<Item = &'static Flag> {
    FLAGS.iter().chain(SHARED_CACHE_FLAGS.iter())
}

/// Build the command-line definition
pub fn command() -> Command {
    let mut cmd = Command::new(APP_NAME)
        .about("TLS-terminating proxy")
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .action(ArgAction::Append)
                .help("Load configuration from FILE (- for stdin)"),
        )
        .arg(
            Arg::new("tls")
                .long("tls")
                .action(ArgAction::SetTrue)
                .help("Enable TLSv1.0 and newer"),
        )
        .arg(
            Arg::new("ssl")
                .long("ssl")
                .action(ArgAction::SetTrue)
                .help("Enable SSLv3 and newer"),
        )
        .arg(
            Arg::new("client")
                .long("client")
                .action(ArgAction::SetTrue)
                .help("Encrypt towards the backend instead of terminating"),
        )
        .arg(
            Arg::new("test")
                .short('t')
                .long("test")
                .action(ArgAction::SetTrue)
                .help("Check the configuration and exit"),
        )
        .arg(
            Arg::new("version")
                .short('V')
                .long("version")
                .action(ArgAction::SetTrue)
                .help("Print version and exit"),
        )
        .arg(
            Arg::new("help")
                .short('h')
                .long("help")
                .action(ArgAction::SetTrue)
                .help("Print help and exit"),
        )
        .arg(
            Arg::new("pem")
                .value_name("PEM")
                .num_args(0..)
                .action(ArgAction::Append)
                .help("Certificate files, same as --pem-file"),
        );

    for flag in flags() {
        let mut arg = Arg::new(flag.key)
            .long(flag.key)
            .help(flag.help)
            .action(ArgAction::Append);

        if let Some(short) = flag.short {
            arg = arg.short(short);
        }

        arg = match flag.kind {
            Kind::Value => arg.num_args(1).allow_negative_numbers(true),
            Kind::Switch => arg
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value(BOOL_ON)
                .value_name("on|off"),
        };

        cmd = cmd.arg(arg);
    }

    cmd
}

/// Rendered `--help` text
pub fn help_text() -> String {
    command().render_help().to_string()
}

/// Parsed command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub config_files: Vec<PathBuf>,
    /// `(key, value)` pairs in argv order
    pub params: Vec<(&'static str, String)>,
    /// Trailing positional certificate files
    pub pem_files: Vec<String>,
    pub tls: bool,
    pub ssl: bool,
    pub client: bool,
    pub test_only: bool,
    pub version: bool,
    pub help: bool,
}

/// Command line argument configuration source
pub struct CliSource {
    pub args: Vec<String>,
}

impl CliSource {
    /// Create a new command line source
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }

    /// Parse argv into flags ordered by position
    pub fn parse(&self) -> Result<CliArgs> {
        debug!("Parsing command line arguments");

        let matches = command()
            .try_get_matches_from(&self.args)
            .map_err(|e| ConfigError::Cli(e.to_string().trim_end().to_string()))?;

        let mut params = Vec::new();
        for flag in flags() {
            for (index, value) in ordered_values(&matches, flag.key) {
                if flag.kind == Kind::Switch && value != "on" && value != "off" {
                    return Err(ConfigError::Cli(format!(
                        "Invalid argument '{}' for option '{}': expected one of 'on' or 'off'",
                        value, flag.key
                    )));
                }
                params.push((index, flag.key, value));
            }
        }
        params.sort_by_key(|(index, _, _)| *index);

        let strings = |id: &str| -> Vec<String> {
            matches
                .get_many::<String>(id)
                .map(|values| values.cloned().collect())
                .unwrap_or_default()
        };

        Ok(CliArgs {
            config_files: strings("config").into_iter().map(PathBuf::from).collect(),
            params: params.into_iter().map(|(_, key, value)| (key, value)).collect(),
            pem_files: strings("pem"),
            tls: matches.get_flag("tls"),
            ssl: matches.get_flag("ssl"),
            client: matches.get_flag("client"),
            test_only: matches.get_flag("test"),
            version: matches.get_flag("version"),
            help: matches.get_flag("help"),
        })
    }
}

/// Values of `id` paired with their argv index
fn ordered_values(matches: &ArgMatches, id: &str) -> Vec<(usize, String)> {
    let Some(values) = matches.get_many::<String>(id) else {
        return Vec::new();
    };
    let indices: Vec<usize> = matches
        .indices_of(id)
        .map(|indices| indices.collect())
        .unwrap_or_default();

    // A value without a recorded index keeps its position after the last known one
    let mut last = 0;
    values
        .enumerate()
        .map(|(i, value)| {
            last = indices.get(i).copied().unwrap_or(last);
            (last, value.clone())
        })
        .collect()
}

impl ConfigSource for CliArgs {
    fn apply(&self, config: &mut Configuration) -> Result<()> {
        for (key, value) in &self.params {
            config.validate(key, value, Origin::CommandLine)?;
        }
        Ok(())
    }

    fn source_type(&self) -> ValueSource {
        ValueSource::CommandLine
    }
}
