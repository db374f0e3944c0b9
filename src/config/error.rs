//! Configuration errors
//!
//! This module defines the error type returned by every step of the
//! resolve phase, from endpoint parsing up to the final cross-field checks.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of a [`ConfigError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed address or port string
    Grammar,
    /// A filesystem call failed
    Io,
    /// Path exists but is not a regular file
    NotAFile,
    /// Path exists but is not a UNIX-domain socket
    NotASocket,
    /// Path exists but is not a directory
    NotADirectory,
    /// Semantic violation (duplicates, ranges, exclusive options, ...)
    Validation,
    /// Unparsable configuration file or command line
    Syntax,
}

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Address string does not follow `[HOST]:PORT`
    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    /// Port is not a number in `0..=65535`
    #[error("Invalid port number '{0}'")]
    InvalidPort(String),

    /// `*` used where a concrete host is required
    #[error("Invalid address: wildcards are not allowed")]
    WildcardNotAllowed,

    /// UNIX-domain socket path is too long
    #[error("UNIX domain socket path too long: '{0}'")]
    InvalidPath(String),

    /// A filesystem call failed
    #[error("Unable to stat {what} '{}': {source}", .path.display())]
    Io {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid {what} '{}': Not a file", .path.display())]
    NotAFile { what: &'static str, path: PathBuf },

    #[error("Invalid path '{}': Not a socket", .path.display())]
    NotASocket { path: PathBuf },

    #[error("Bad {what} '{}': Not a directory", .path.display())]
    NotADirectory { what: &'static str, path: PathBuf },

    /// Two frontends bind the same address and port
    #[error("Redundant frontend (matching IP and port) definition: '{0}'")]
    DuplicateFrontend(String),

    #[error("No port number specified for frontend '{0}'")]
    MissingPort(String),

    /// Frontend opted out of the global certificates without owning any
    #[error("No certificate configured for frontend '{0}'")]
    NoCertificateConfigured(String),

    /// Frontend resolves to no certificate at all in server mode
    #[error("No x509 certificate PEM file specified for frontend '{0}'!")]
    MissingCertificate(String),

    #[error("Reached maximum number of shared cache update peers ({0})")]
    CapacityExceeded(usize),

    #[error("alpn-protos has empty proto in list")]
    EmptyProtocolToken,

    #[error("alpn protocol too long")]
    ProtocolTooLong,

    #[error("Not a number: '{0}'")]
    NotANumber(String),

    #[error("Number out of range: '{0}'")]
    OutOfRange(String),

    #[error("Negative number: '{0}'")]
    Negative(String),

    #[error("Invalid boolean '{0}': expected one of on/off, yes/no, true/false, 1/0")]
    InvalidBool(String),

    /// Invalid value for a configuration option
    #[error("Invalid value for '{0}': {1}")]
    InvalidValue(String, String),

    /// Required value absent
    #[error("Missing required configuration value: {0}")]
    MissingValue(String),

    /// Mutually exclusive or dependent options disagree
    #[error("{0}")]
    InvalidCombination(String),

    /// Configuration file text could not be parsed
    #[error("Syntax error in configuration file '{file}', line {line}: {message}")]
    Syntax {
        file: String,
        line: usize,
        message: String,
    },

    /// Command line could not be parsed
    #[error("Invalid command line parameters: {0}")]
    Cli(String),

    #[error("Unable to open configuration file '{}': {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failure raised while applying a key read from a configuration file
    #[error("Error in configuration file '{file}', line {line}: {source}")]
    InFile {
        file: String,
        line: usize,
        #[source]
        source: Box<ConfigError>,
    },

    /// Failure raised while applying a command-line parameter
    #[error("Invalid parameter '{key}': {source}")]
    InParam {
        key: String,
        #[source]
        source: Box<ConfigError>,
    },
}

impl ConfigError {
    /// Build an [`ConfigError::Io`] for `path`
    pub fn io(what: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        ConfigError::Io {
            what,
            path: path.into(),
            source,
        }
    }

    /// Strip the file/line and parameter context wrappers
    pub fn root_cause(&self) -> &ConfigError {
        match self {
            ConfigError::InFile { source, .. } | ConfigError::InParam { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    /// Classify the underlying failure
    pub fn kind(&self) -> ErrorKind {
        match self.root_cause() {
            ConfigError::InvalidAddress(_)
            | ConfigError::InvalidPort(_)
            | ConfigError::WildcardNotAllowed
            | ConfigError::InvalidPath(_) => ErrorKind::Grammar,
            ConfigError::Io { .. } | ConfigError::FileRead { .. } => ErrorKind::Io,
            ConfigError::NotAFile { .. } => ErrorKind::NotAFile,
            ConfigError::NotASocket { .. } => ErrorKind::NotASocket,
            ConfigError::NotADirectory { .. } => ErrorKind::NotADirectory,
            ConfigError::Syntax { .. } | ConfigError::Cli(_) => ErrorKind::Syntax,
            _ => ErrorKind::Validation,
        }
    }
}

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
