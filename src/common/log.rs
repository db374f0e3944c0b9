//! Logger setup
//!
//! A logger is installed before the configuration is resolved, so warnings
//! raised while resolving reach stderr. Once the configuration is known it
//! is swapped for one honouring `log-level` and `log-filename`. `RUST_LOG`,
//! when set, takes precedence in both stages.

use log::{LevelFilter, Log, Metadata, Record};
use std::fs::OpenOptions;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::common::error::{ProxyError, Result};
use crate::config::types::LoggingOptions;

/// Level used until the configuration is resolved
const EARLY_LEVEL: LevelFilter = LevelFilter::Warn;

/// Forwards to whichever `env_logger` is current
struct SwitchableLogger {
    inner: RwLock<Option<env_logger::Logger>>,
}

impl Log for SwitchableLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.as_ref().is_some_and(|l| l.enabled(metadata))
    }

    fn log(&self, record: &Record<'_>) {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(logger) = inner.as_ref() {
            logger.log(record);
        }
    }

    fn flush(&self) {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(logger) = inner.as_ref() {
            logger.flush();
        }
    }
}

static LOGGER: SwitchableLogger = SwitchableLogger {
    inner: RwLock::new(None),
};

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Level filter for a numeric `log-level`
pub fn level_filter(level: u32) -> LevelFilter {
    match level {
        0 => LevelFilter::Error,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

fn env_builder(default: LevelFilter) -> env_logger::Builder {
    let env = env_logger::Env::default().filter_or("RUST_LOG", default.as_str());
    env_logger::Builder::from_env(env)
}

/// Build a logger for `options` without installing it
pub fn build_logger(options: &LoggingOptions) -> Result<env_logger::Logger> {
    let mut builder = env_builder(level_filter(options.level));

    if let Some(ref path) = options.filename {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    Ok(builder.build())
}

fn install(logger: env_logger::Logger) -> Result<()> {
    let max_level = logger.filter();

    if let Some(previous) = LOGGER
        .inner
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(logger)
    {
        previous.flush();
    }

    if !INSTALLED.swap(true, Ordering::SeqCst) {
        log::set_logger(&LOGGER).map_err(|e| ProxyError::Logger(e.to_string()))?;
    }
    log::set_max_level(max_level);
    Ok(())
}

/// Log warnings and errors to stderr until [`init_logger`] runs
pub fn init_early_logger() -> Result<()> {
    install(env_builder(EARLY_LEVEL).build())
}

/// Initialize the logger for the resolved configuration
///
/// Replaces the early logger when one is installed.
pub fn init_logger(options: &LoggingOptions) -> Result<()> {
    install(build_logger(options)?)
}
