//! Tabula Configuration System
//!
//! Provides configuration management for the tabula bridge:
//! - Bridge configuration (tabula.toml)
//! - Environment variable overrides (TABULA_*)
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Project config (./tabula.toml, searched upwards)
//! 3. Environment variables (TABULA_*)
//!
//! # Example
//!
//! ```no_run
//! use tabula_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("max depth: {}", config.bridge.max_depth());
//! ```

pub mod bridge;
pub mod loader;

use std::path::PathBuf;
use thiserror::Error;

/// Name of the configuration file searched for by [`ConfigLoader`]
pub const CONFIG_FILE_NAME: &str = "tabula.toml";

/// Failure to load or validate bridge settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no bridge configuration at {0}")]
    NotFound(PathBuf),

    #[error("cannot read bridge configuration: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{file} is not valid TOML: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("bad value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

pub use bridge::{BridgeConfig, MarshalConfig, DEFAULT_MAX_DEPTH};
pub use loader::{Config, ConfigLoader};
