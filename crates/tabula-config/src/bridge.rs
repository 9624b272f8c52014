//! Bridge Configuration (tabula.toml)
//!
//! Handles the settings that shape how values cross the script boundary.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Nesting limit used when no configuration overrides it
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Bridge configuration from tabula.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Value marshalling settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marshal: Option<MarshalConfig>,
}

/// Value marshalling settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct MarshalConfig {
    /// Maximum table nesting followed when reading or writing values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
}

impl BridgeConfig {
    /// Load bridge configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration text; `origin` is only used for error reporting
    pub fn parse(content: &str, origin: &Path) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
            file: origin.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the bridge configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(depth) = self.marshal.as_ref().and_then(|m| m.max_depth) {
            validate_max_depth("marshal.max_depth", depth)?;
        }
        Ok(())
    }

    /// Effective nesting limit (configured value or [`DEFAULT_MAX_DEPTH`])
    pub fn max_depth(&self) -> usize {
        self.marshal
            .as_ref()
            .and_then(|m| m.max_depth)
            .unwrap_or(DEFAULT_MAX_DEPTH)
    }

    /// Set the nesting limit, creating the `[marshal]` section if needed
    pub fn set_max_depth(&mut self, depth: usize) {
        self.marshal.get_or_insert_with(MarshalConfig::default).max_depth = Some(depth);
    }

    /// Merge another config into this one
    /// Other config takes precedence for non-None values
    pub fn merge(&mut self, other: &BridgeConfig) {
        if let Some(depth) = other.marshal.as_ref().and_then(|m| m.max_depth) {
            self.set_max_depth(depth);
        }
    }
}

pub(crate) fn validate_max_depth(field: &str, depth: usize) -> ConfigResult<()> {
    if depth == 0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}
