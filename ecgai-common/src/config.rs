//! Configuration loading and data folder resolution
//!
//! Bootstrap settings come from an optional TOML file. Every field has a
//! compiled default, so a missing file is never fatal.
//!
//! # Data folder priority
//!
//! 1. Command-line argument (highest priority)
//! 2. `ECGAI_DATA_FOLDER` environment variable
//! 3. `data_location` in the TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the data folder
pub const DATA_FOLDER_ENV: &str = "ECGAI_DATA_FOLDER";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Directory holding the cached reference tables
    pub data_location: Option<PathBuf>,

    /// Filename of the per-record metadata table
    pub database_metadata_filename: String,

    /// Filename of the SCP statement (diagnostic code) table
    pub scp_code_filename: String,

    /// HTTP server port
    pub port: u16,

    /// Sample rate used when a request does not name one
    pub default_sample_rate: u32,

    /// Base URL of the signal archive (without dataset or version)
    pub archive_base_url: String,

    /// Archive version segment inserted after the dataset name
    pub archive_version: String,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            data_location: None,
            database_metadata_filename: "ptbxl_database.csv".to_string(),
            scp_code_filename: "scp_statements.csv".to_string(),
            port: 5780,
            default_sample_rate: 100,
            archive_base_url: "https://physionet.org/files".to_string(),
            archive_version: "1.0.1".to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Load bootstrap configuration from a TOML file
///
/// A missing file yields defaults with a warning. A file that exists but
/// cannot be read or parsed is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Default configuration file location (`~/.config/ecgai/ptbxl.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ecgai").join("ptbxl.toml"))
}

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub data_folder: PathBuf,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let data_folder = dirs::data_local_dir()
            .map(|d| d.join("ecgai").join("ptb-xl"))
            .unwrap_or_else(|| PathBuf::from("./data"));

        Self { data_folder }
    }
}

/// Resolves the data folder from CLI, environment, TOML and defaults
#[derive(Debug, Clone, Default)]
pub struct DataFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl DataFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml_config(mut self, config: &TomlConfig) -> Self {
        self.toml_value = config.data_location.clone();
        self
    }

    /// Resolve the data folder; never fails
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(DATA_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_value {
            return path.clone();
        }

        CompiledDefaults::for_current_platform().data_folder
    }
}

/// Create the data folder if it does not exist yet
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        info!("Created data folder: {}", path.display());
    }
    Ok(())
}
