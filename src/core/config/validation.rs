#![allow(clippy::result_large_err)]

use super::RulegraphConfig;
use crate::core::error::AppError;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &RulegraphConfig) -> Result<(), AppError> {
        if config.engine.default_backend.trim().is_empty() {
            return Err(AppError::new(
                crate::core::types::ErrorCategory::Configuration,
                "engine.default_backend cannot be empty",
            )
            .with_code("RG-CONFIG-002"));
        }

        if config.io.data_dir.as_os_str().is_empty() {
            return Err(AppError::new(
                crate::core::types::ErrorCategory::Configuration,
                "io.data_dir cannot be empty",
            )
            .with_code("RG-CONFIG-002"));
        }

        Ok(())
    }
}
