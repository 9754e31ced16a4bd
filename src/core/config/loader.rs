#![allow(clippy::result_large_err)]

use super::{ConfigValidator, RulegraphConfig};
use crate::core::error::AppError;
use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "rulegraph.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from workspace root (workspace/rulegraph.toml)
    /// Environment variables override config file values
    /// A missing file means defaults + env vars
    pub fn load_from_workspace(workspace_path: &Path) -> Result<RulegraphConfig, AppError> {
        let config_path = workspace_path.join(CONFIG_FILE_NAME);
        let config_file = Self::load_from_file(&config_path)?;

        let mut config = config_file.unwrap_or_default();

        Self::apply_env_overrides(&mut config);
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<RulegraphConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                crate::core::types::ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: RulegraphConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                crate::core::types::ErrorCategory::Configuration,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
            .with_code("RG-CONFIG-001")
        })?;

        Ok(Some(config))
    }

    /// Environment variables take precedence over config file values
    fn apply_env_overrides(config: &mut RulegraphConfig) {
        if let Ok(backend) = env::var("RULEGRAPH_BACKEND") {
            if !backend.trim().is_empty() {
                config.engine.default_backend = backend;
            }
        }

        if let Ok(data_dir) = env::var("RULEGRAPH_DATA_DIR") {
            if !data_dir.trim().is_empty() {
                config.io.data_dir = PathBuf::from(data_dir);
            }
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "RULEGRAPH_BACKEND - Override engine.default_backend (default: memory)",
            "RULEGRAPH_DATA_DIR - Override io.data_dir (default: .)",
            "RULEGRAPH_LOG_LEVEL - Override logging.default_level",
        ]
    }
}
