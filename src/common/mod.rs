//! Common module
//!
//! Shared errors, logging and filesystem helpers.

pub mod error;
pub mod fs;
pub mod log;

// Re-export commonly used types and functions
pub use self::error::{ProxyError, Result};
pub use self::log::init_logger;
