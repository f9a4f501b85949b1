//! Shared configuration and logging for the jedi crates

pub mod config;
pub mod error;
pub mod logging;

pub use crate::config::{ConfigLoader, JediConfig, LoggingConfig, ResolverSettings};
pub use error::{ConfigError, Result};
pub use logging::{format_error, LogLevel};
