//! Unit tests for configuration and graceful degradation
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate ECGAI_DATA_FOLDER are marked with #[serial]
//! to ensure they run sequentially, not in parallel.

use ecgai_common::config::{
    ensure_directory_exists, load_toml_config, CompiledDefaults, DataFolderResolver, TomlConfig,
    DATA_FOLDER_ENV,
};
use ecgai_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.data_folder.as_os_str().is_empty());
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(DATA_FOLDER_ENV);

    let data_folder = DataFolderResolver::new().resolve();

    let defaults = CompiledDefaults::for_current_platform();
    assert_eq!(data_folder, defaults.data_folder);
}

#[test]
#[serial]
fn test_resolver_env_var_overrides_toml() {
    env::set_var(DATA_FOLDER_ENV, "/tmp/ecgai-test-env-folder");

    let config = TomlConfig {
        data_location: Some(PathBuf::from("/tmp/ecgai-from-toml")),
        ..TomlConfig::default()
    };
    let data_folder = DataFolderResolver::new().with_toml_config(&config).resolve();

    assert_eq!(data_folder, PathBuf::from("/tmp/ecgai-test-env-folder"));

    env::remove_var(DATA_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_toml_used_without_env() {
    env::remove_var(DATA_FOLDER_ENV);

    let config = TomlConfig {
        data_location: Some(PathBuf::from("/tmp/ecgai-from-toml")),
        ..TomlConfig::default()
    };
    let data_folder = DataFolderResolver::new().with_toml_config(&config).resolve();

    assert_eq!(data_folder, PathBuf::from("/tmp/ecgai-from-toml"));
}

#[test]
fn test_missing_config_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_toml_config(&temp_dir.path().join("absent.toml")).unwrap();

    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_config_file_overrides_filenames() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ptbxl.toml");
    std::fs::write(
        &path,
        r#"
data_location = "/srv/ptbxl"
database_metadata_filename = "meta.csv"
default_sample_rate = 500

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();

    assert_eq!(config.data_location, Some(PathBuf::from("/srv/ptbxl")));
    assert_eq!(config.database_metadata_filename, "meta.csv");
    assert_eq!(config.scp_code_filename, "scp_statements.csv");
    assert_eq!(config.default_sample_rate, 500);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_malformed_config_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "port = \"not a number\"").unwrap();

    let result = load_toml_config(&path);

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_directory_creation_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let data_folder = temp_dir.path().join("nested").join("data");

    ensure_directory_exists(&data_folder).unwrap();
    ensure_directory_exists(&data_folder).unwrap();

    assert!(data_folder.is_dir());
}
