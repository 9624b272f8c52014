//! Configuration Loader
//!
//! Handles loading configuration from multiple sources with proper precedence.

use crate::bridge::{validate_max_depth, BridgeConfig};
use crate::{ConfigError, ConfigResult, CONFIG_FILE_NAME};
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable overriding `marshal.max_depth`
pub const ENV_MAX_DEPTH: &str = "TABULA_MAX_DEPTH";

/// Configuration loader
///
/// Loads configuration and merges it with proper precedence:
/// 1. Built-in defaults - lowest priority
/// 2. Project config (./tabula.toml) - overrides defaults
/// 3. Environment variables (TABULA_*) - overrides project
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Skip environment overrides (useful for reproducible embedding)
    ignore_env: bool,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Bridge configuration
    pub bridge: BridgeConfig,

    /// Directory where tabula.toml was found
    pub config_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { ignore_env: false }
    }

    /// Create a loader that does not consult environment variables
    pub fn without_env() -> Self {
        Self { ignore_env: true }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find tabula.toml, then applies
    /// environment variable overrides.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let (config_root, bridge) = self.find_config(start_dir)?;
        let bridge = self.apply_env_overrides(bridge)?;

        Ok(Config {
            bridge,
            config_root,
        })
    }

    /// Load configuration from a specific config file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        let bridge = BridgeConfig::load_from_file(config_path)?;
        let bridge = self.apply_env_overrides(bridge)?;

        Ok(Config {
            bridge,
            config_root: config_path.parent().map(|p| p.to_path_buf()),
        })
    }

    /// Find configuration by walking up the directory tree
    ///
    /// Returns (config_root, config); defaults when nothing is found
    fn find_config(&self, start_dir: &Path) -> ConfigResult<(Option<PathBuf>, BridgeConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.exists() {
                let config = BridgeConfig::load_from_file(&config_path)?;
                return Ok((Some(current), config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, BridgeConfig::default())),
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Environment variables follow the pattern: TABULA_<KEY>
    /// Example: TABULA_MAX_DEPTH=32
    fn apply_env_overrides(&self, mut config: BridgeConfig) -> ConfigResult<BridgeConfig> {
        if self.ignore_env {
            return Ok(config);
        }

        if let Ok(raw) = env::var(ENV_MAX_DEPTH) {
            let depth = raw
                .trim()
                .parse::<usize>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: ENV_MAX_DEPTH.to_string(),
                    reason: format!("'{}' is not a positive integer: {}", raw, e),
                })?;
            validate_max_depth(ENV_MAX_DEPTH, depth)?;
            config.set_max_depth(depth);
        }

        Ok(config)
    }
}

impl Config {
    /// Directory containing the tabula.toml that was loaded
    pub fn config_root(&self) -> Option<&Path> {
        self.config_root.as_deref()
    }

    /// Check whether a tabula.toml was found
    pub fn is_configured(&self) -> bool {
        self.config_root.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join(CONFIG_FILE_NAME);
        fs::write(&config_path, content).unwrap();
        config_path
    }

    #[test]
    fn test_load_config() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[marshal]\nmax_depth = 9\n");

        let config = ConfigLoader::without_env()
            .load_from_directory(temp_dir.path())
            .unwrap();

        assert_eq!(config.bridge.max_depth(), 9);
        assert!(config.is_configured());
    }

    #[test]
    fn test_find_config_in_parent() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[marshal]\nmax_depth = 5\n");

        let sub_dir = temp_dir.path().join("subdir");
        fs::create_dir(&sub_dir).unwrap();

        let config = ConfigLoader::without_env()
            .load_from_directory(&sub_dir)
            .unwrap();

        assert_eq!(config.bridge.max_depth(), 5);
        assert_eq!(config.config_root(), Some(temp_dir.path()));
    }

    #[test]
    #[serial]
    fn test_env_override_max_depth() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[marshal]\nmax_depth = 5\n");

        env::set_var(ENV_MAX_DEPTH, "40");

        let config = ConfigLoader::new()
            .load_from_directory(temp_dir.path())
            .unwrap();

        assert_eq!(config.bridge.max_depth(), 40);

        env::remove_var(ENV_MAX_DEPTH);
    }

    #[test]
    #[serial]
    fn test_env_override_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var(ENV_MAX_DEPTH, "deep");

        let result = ConfigLoader::new().load_from_directory(temp_dir.path());
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        env::remove_var(ENV_MAX_DEPTH);
    }
}
