//! Configuration builder
//!
//! Resolves a [`Configuration`] in two passes: configuration files first,
//! then command-line parameters in argv order. Cross-field checks run once
//! both passes are done.

use log::{debug, info, warn};
use std::path::Path;

use crate::common::fs::check_directory;
use crate::config::error::{ConfigError, Result};
use crate::config::pem_dir::{compile_glob, scan_pem_dir};
use crate::config::source::{help_text, CliArgs, CliSource, ConfigSource, FileSource};
use crate::config::types::{Configuration, Origin, ProxyMode, TlsProtocols, ValueSource};
use crate::config::validator::{check_certificate_coverage, check_option_conflicts};

/// What the caller should do after resolving argv
#[derive(Debug)]
pub enum Outcome {
    /// Start with this configuration
    Run(Configuration),
    /// Print this usage text and exit
    Help(String),
    /// Print the version and exit
    Version,
}

/// Configuration builder
///
/// Sources are applied in the order they were added; later values override
/// earlier ones.
pub struct ConfigBuilder {
    files: Vec<FileSource>,
    cli: CliArgs,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            cli: CliArgs::default(),
        }
    }

    /// Add file source
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        let path = path.as_ref();
        debug!("Adding file configuration source: {}", path.display());
        self.files.push(FileSource::new(path));
        self
    }

    /// Add command line source
    ///
    /// Every `--config` named on the command line becomes a file source.
    pub fn with_cli(mut self, cli: CliArgs) -> Self {
        debug!("Adding command line configuration source");
        for path in &cli.config_files {
            self.files.push(FileSource::new(path));
        }
        self.cli = cli;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<Configuration> {
        let mut config = Configuration::new();

        debug!(
            "Building configuration from {} file(s) and {} parameter(s)",
            self.files.len(),
            self.cli.params.len()
        );

        // Apply sources in order (lowest to highest priority)
        for file in &self.files {
            debug!("Loading configuration from source: {}", file.source_type());
            file.apply(&mut config)?;
        }
        let file_protos = config.tls_protos;

        debug!("Loading configuration from source: {}", self.cli.source_type());
        self.cli.apply(&mut config)?;
        if self.cli.test_only {
            config.test_only = true;
        }

        finalize(&mut config, &self.cli, file_protos)?;

        info!(
            "Configuration resolved: {} frontend(s), {} certificate(s)",
            config.frontends.len(),
            config.certs.len()
        );

        Ok(config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Cross-field checks and derived state, run after both passes
fn finalize(
    config: &mut Configuration,
    cli: &CliArgs,
    file_protos: Option<TlsProtocols>,
) -> Result<()> {
    resolve_tls_protos(config, cli, file_protos)?;

    if cli.client {
        config.mode = ProxyMode::Client;
    }

    check_option_conflicts(config)?;

    if let Err(e) = config.alpn.encode() {
        return Err(ConfigError::InParam {
            key: "alpn-protos".to_string(),
            source: Box::new(e),
        });
    }

    for pem in &cli.pem_files {
        config.validate("pem-file", pem, Origin::CommandLine)?;
    }

    if let Some(dir) = config.pem_dir.clone() {
        let pattern = config.pem_dir_glob.as_deref().map(compile_glob).transpose()?;
        let added = scan_pem_dir(&dir, pattern.as_ref(), &mut config.certs)?;
        info!("Loaded {} certificate(s) from {}", added, dir.display());
    }

    check_certificate_coverage(config)?;

    if let Some(dir) = &config.ocsp.dir {
        if let Err(e) = check_directory(dir, "ocsp-dir") {
            warn!("{}. Disabling OCSP stapling.", e);
            config.ocsp.dir = None;
        }
    }

    Ok(())
}

/// Apply `--tls` / `--ssl` and fall back to the default protocol set
fn resolve_tls_protos(
    config: &mut Configuration,
    cli: &CliArgs,
    file_protos: Option<TlsProtocols>,
) -> Result<()> {
    if cli.tls && cli.ssl {
        return Err(ConfigError::InvalidCombination(
            "Options --tls and --ssl are mutually exclusive.".to_string(),
        ));
    }

    if cli.tls || cli.ssl {
        if file_protos.is_some() {
            return Err(ConfigError::InvalidCombination(
                "Deprecated options --tls and --ssl cannot be used to override tls-protos in a config file."
                    .to_string(),
            ));
        }

        config.tls_protos = Some(if cli.ssl {
            TlsProtocols::SSL_OPTION
        } else {
            TlsProtocols::TLS_OPTION
        });
        config.sources.insert("tls-protos", ValueSource::CommandLine);
    }

    if config.tls_protos.is_none() {
        config.tls_protos = Some(TlsProtocols::DEFAULT);
    }

    Ok(())
}

/// Resolve argv (including the program name) into an [`Outcome`]
///
/// An argv without any arguments asks for help.
pub fn resolve(args: Vec<String>) -> Result<Outcome> {
    if args.len() <= 1 {
        return Ok(Outcome::Help(help_text()));
    }

    let cli = CliSource::new(args).parse()?;

    if cli.help {
        return Ok(Outcome::Help(help_text()));
    }
    if cli.version {
        return Ok(Outcome::Version);
    }

    ConfigBuilder::new().with_cli(cli).build().map(Outcome::Run)
}
