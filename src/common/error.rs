//! Error handling module
//!
//! Process-level errors. Everything that can go wrong while resolving the
//! configuration is a [`ConfigError`]; this type adds the failures of the
//! binary around it.

use std::io;
use thiserror::Error;

use crate::config::error::ConfigError;

/// Process error type
#[derive(Error, Debug)]
pub enum ProxyError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Logger could not be installed
    #[error("Logger error: {0}")]
    Logger(String),

    /// Configuration snapshot could not be rendered
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `ProxyError`.
pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let proxy_err: ProxyError = io_err.into();
        assert!(matches!(proxy_err, ProxyError::Io(_)));

        let proxy_err: ProxyError = ConfigError::MissingPort("[]:".to_string()).into();
        assert!(matches!(proxy_err, ProxyError::Config(_)));
    }

    #[test]
    fn test_config_error_display_is_unchanged() {
        let err = ProxyError::from(ConfigError::DuplicateFrontend("[]:443".to_string()));
        assert_eq!(
            err.to_string(),
            "Redundant frontend (matching IP and port) definition: '[]:443'"
        );
    }
}
