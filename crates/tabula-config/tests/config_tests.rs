//! Configuration loading and precedence tests

use pretty_assertions::assert_eq;
use rstest::rstest;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::Path;
use tabula_config::loader::ENV_MAX_DEPTH;
use tabula_config::{BridgeConfig, ConfigError, ConfigLoader, DEFAULT_MAX_DEPTH};
use tempfile::TempDir;

fn create_config_file(dir: &Path, content: &str) -> std::path::PathBuf {
    let config_path = dir.join("tabula.toml");
    fs::write(&config_path, content).unwrap();
    config_path
}

// ============================================================================
// Config Loading Tests
// ============================================================================

#[test]
#[serial]
fn test_load_when_no_config_exists() {
    let temp_dir = TempDir::new().unwrap();

    let config = ConfigLoader::new()
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert!(!config.is_configured());
    assert_eq!(config.bridge.max_depth(), DEFAULT_MAX_DEPTH);
}

#[test]
#[serial]
fn test_load_from_nested_subdirectory() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[marshal]\nmax_depth = 16\n");

    let nested = temp_dir.path().join("a").join("b");
    fs::create_dir_all(&nested).unwrap();

    let config = ConfigLoader::new().load_from_directory(&nested).unwrap();

    assert_eq!(config.bridge.max_depth(), 16);
    assert_eq!(config.config_root(), Some(temp_dir.path()));
}

#[test]
#[serial]
fn test_load_from_specific_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "[marshal]\nmax_depth = 3\n");

    let config = ConfigLoader::new().load_from_file(&path).unwrap();

    assert_eq!(config.bridge.max_depth(), 3);
}

#[test]
fn test_missing_file_reports_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let result = BridgeConfig::load_from_file(&temp_dir.path().join("tabula.toml"));

    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

// ============================================================================
// Invalid Config Tests
// ============================================================================

#[rstest]
#[case::broken_syntax("[marshal\nmax_depth = ")]
#[case::unknown_section("[reader]\nstrict = true\n")]
#[case::wrong_type("[marshal]\nmax_depth = \"deep\"\n")]
#[case::zero_depth("[marshal]\nmax_depth = 0\n")]
fn test_invalid_config_rejected(#[case] content: &str) {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), content);

    let result = ConfigLoader::without_env().load_from_directory(temp_dir.path());
    assert!(result.is_err());
}

// ============================================================================
// Precedence Tests
// ============================================================================

#[test]
#[serial]
fn test_env_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[marshal]\nmax_depth = 8\n");

    env::set_var(ENV_MAX_DEPTH, "128");
    let config = ConfigLoader::new()
        .load_from_directory(temp_dir.path())
        .unwrap();
    env::remove_var(ENV_MAX_DEPTH);

    assert_eq!(config.bridge.max_depth(), 128);
}

#[test]
#[serial]
fn test_env_zero_depth_rejected() {
    let temp_dir = TempDir::new().unwrap();

    env::set_var(ENV_MAX_DEPTH, "0");
    let result = ConfigLoader::new().load_from_directory(temp_dir.path());
    env::remove_var(ENV_MAX_DEPTH);

    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
#[serial]
fn test_without_env_ignores_override() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[marshal]\nmax_depth = 8\n");

    env::set_var(ENV_MAX_DEPTH, "128");
    let config = ConfigLoader::without_env()
        .load_from_directory(temp_dir.path())
        .unwrap();
    env::remove_var(ENV_MAX_DEPTH);

    assert_eq!(config.bridge.max_depth(), 8);
}
