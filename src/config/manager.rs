//! Configuration manager
//!
//! Holds the process-wide configuration snapshot. Snapshots are immutable
//! once installed; a reload resolves a brand-new [`Configuration`] and swaps
//! it in only when resolution succeeded.

use log::info;
use once_cell::sync::Lazy;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::builder::{resolve, Outcome};
use crate::config::error::{ConfigError, Result};
use crate::config::types::Configuration;

/// Configuration change event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigChangeEvent {
    /// A snapshot was installed directly
    Installed,
    /// A snapshot was installed by [`reload`]
    Reloaded,
}

/// Configuration change listener type
pub type ConfigChangeListener = Box<dyn Fn(ConfigChangeEvent, &Configuration) + Send + Sync>;

/// Global configuration manager
struct ConfigManager {
    current: RwLock<Option<Arc<Configuration>>>,
    listeners: RwLock<Vec<ConfigChangeListener>>,
}

impl ConfigManager {
    fn new() -> Self {
        Self {
            current: RwLock::new(None),
            listeners: RwLock::new(Vec::new()),
        }
    }

    fn current(&self) -> Option<Arc<Configuration>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn swap(&self, config: Configuration, event: ConfigChangeEvent) -> Arc<Configuration> {
        let config = Arc::new(config);
        {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            *current = Some(Arc::clone(&config));
        }

        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener(event, &config);
        }

        config
    }

    fn add_listener(&self, listener: ConfigChangeListener) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

// Global instance
static CONFIG_MANAGER: Lazy<ConfigManager> = Lazy::new(ConfigManager::new);

/// Install `config` as the process-wide snapshot
pub fn install(config: Configuration) -> Arc<Configuration> {
    info!(
        "Installing configuration ({} frontend(s), backend {})",
        config.frontends.len(),
        config.backend
    );
    CONFIG_MANAGER.swap(config, ConfigChangeEvent::Installed)
}

/// The snapshot currently in use, if any was installed
pub fn current() -> Option<Arc<Configuration>> {
    CONFIG_MANAGER.current()
}

/// Resolve `args` from scratch and install the result
///
/// On failure the previous snapshot stays in place and the error is
/// returned. Help and version requests are not configurations and are
/// rejected.
pub fn reload(args: Vec<String>) -> Result<Arc<Configuration>> {
    info!("Reloading configuration");

    match resolve(args)? {
        Outcome::Run(config) => Ok(CONFIG_MANAGER.swap(config, ConfigChangeEvent::Reloaded)),
        Outcome::Help(_) | Outcome::Version => Err(ConfigError::Cli(
            "reload needs a configuration, not a help or version request".to_string(),
        )),
    }
}

/// Add a configuration change listener
///
/// Listeners run after every successful install or reload.
pub fn add_listener<F>(listener: F)
where
    F: Fn(ConfigChangeEvent, &Configuration) + Send + Sync + 'static,
{
    CONFIG_MANAGER.add_listener(Box::new(listener));
}

/// Drop the installed snapshot and all listeners
pub fn reset() {
    CONFIG_MANAGER.clear();
}
