//! Configuration module
//!
//! Resolves the proxy configuration from a configuration file and the
//! command line, validates it, and holds the resolved snapshot.

// Submodules
pub mod alpn;
pub mod builder;
pub mod cert;
pub mod defaults;
pub mod endpoint;
pub mod error;
pub mod frontend;
pub mod manager;
pub mod parser;
pub mod pem_dir;
pub mod scalar;
#[cfg(feature = "shared-cache")]
pub mod shared_cache;
pub mod source;
pub mod types;
pub mod validator;

// Re-export types and functions
pub use self::builder::{resolve, ConfigBuilder, Outcome};
pub use self::cert::{CertFile, CertSet, CertificateRegistry};
pub use self::endpoint::{parse_endpoint, Endpoint, EndpointRules, HostPort};
pub use self::error::{ConfigError, ErrorKind, Result};
pub use self::frontend::{Frontend, FrontendRegistry};
pub use self::manager::{current, install, reload};
pub use self::types::{
    ClientCertMode, Configuration, Origin, ProxyMode, SyslogFacility, TlsProtocols, Toggle,
    ValueSource,
};

use log::info;

/// Log the configuration with source information
pub fn log_config(config: &Configuration) {
    // Only log in info level or below
    if !log::log_enabled!(log::Level::Info) {
        return;
    }

    info!("=== Final Configuration ===");

    info!("Endpoints:");
    info!("  Mode: {}", config.mode);
    info!("  Backend: {} ({})", config.backend, config.source("backend"));
    for frontend in config.frontends.iter() {
        info!(
            "  Frontend {}: {} certificate(s), match-global-certs {}",
            frontend.pspec,
            frontend.certs.len(),
            frontend.match_global_certs
        );
    }

    info!("TLS Settings:");
    if let Some(protos) = config.tls_protos {
        info!("  Protocols: {} ({})", protos, config.source("tls-protos"));
    }
    info!("  Ciphers: {} ({})", config.ciphers, config.source("ciphers"));
    if let Some(ref suites) = config.ciphersuites {
        info!("  Ciphersuites: {}", suites);
    }
    info!("  Prefer server ciphers: {}", config.prefer_server_ciphers);
    info!("  Client verify: {}", config.client_verify);
    if let Some(ref ca) = config.client_verify_ca {
        info!("  Client verify CA: {}", ca.display());
    }
    if let Some(ref protos) = config.alpn.protos {
        info!("  ALPN: {} ({} bytes encoded)", protos, config.alpn.wire_len());
    }

    info!("Certificates:");
    if let Some(ref cert) = config.certs.default {
        info!("  Default: {}", cert.filename.display());
    }
    for cert in config.certs.secondary.iter() {
        info!("  Secondary: {}", cert.filename.display());
    }
    if let Some(ref dir) = config.pem_dir {
        info!("  PEM directory: {}", dir.display());
    }
    match config.ocsp.dir {
        Some(ref dir) => info!("  OCSP directory: {}", dir.display()),
        None => info!("  OCSP stapling: disabled"),
    }

    info!("Process Settings:");
    info!("  Workers: {} ({})", config.workers, config.source("workers"));
    info!("  Backlog: {}", config.backlog);
    info!("  Keepalive: {} seconds", config.keepalive);
    info!("  Daemonize: {}", config.daemonize);
    info!("  Log level: {}", config.logging.level);

    #[cfg(feature = "shared-cache")]
    if config.shared_cache.is_enabled() {
        info!("Shared Cache:");
        info!("  Size: {}", config.shared_cache.size);
        if let Some(ref listen) = config.shared_cache.listen {
            info!("  Listen: {}", listen);
        }
        for peer in config.shared_cache.peers.iter() {
            info!("  Peer: {}", peer);
        }
    }

    info!("=========================");
}
