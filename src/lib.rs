//! tlsfront: configuration core of a TLS-terminating proxy
//!
//! Turns a configuration file plus command-line arguments into a validated,
//! immutable [`Configuration`] that the networking layers consume. Nothing
//! here opens sockets or performs handshakes.
//!
//! # Main Features
//!
//! - `[HOST]:PORT[+CERT]` endpoint grammar with wildcard and UNIX socket support
//! - Frontend registry keyed by address, with per-listener overrides
//! - Certificate entries with staleness tracking, PEM directory scanning
//! - ALPN list encoding into the TLS `ProtocolNameList` wire form
//! - Shared session cache peer table (feature `shared-cache`)
//!
//! # Example
//!
//! ```no_run
//! use tlsfront::config::{resolve, Outcome};
//!
//! fn main() -> tlsfront::Result<()> {
//!     let args = vec![
//!         "tlsfront".to_string(),
//!         "--frontend=[*]:443".to_string(),
//!         "--backend=[127.0.0.1]:8080".to_string(),
//!         "/etc/tlsfront/site.pem".to_string(),
//!     ];
//!
//!     if let Outcome::Run(config) = resolve(args)? {
//!         let config = tlsfront::config::install(config);
//!         println!("{} frontend(s)", config.frontends.len());
//!     }
//!     Ok(())
//! }
//! ```

// Public modules
pub mod common;
pub mod config;

// Re-export commonly used structures and functions for convenience
pub use common::{ProxyError, Result};
pub use config::{ConfigError, Configuration};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
