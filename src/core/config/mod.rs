use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Rulegraph configuration loaded from rulegraph.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RulegraphConfig {
    /// Engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Input/output configuration
    #[serde(default)]
    pub io: IoConfig,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Backend used to resolve rule kinds when the command line names none
    #[serde(default = "default_backend")]
    pub default_backend: String,
}

/// Input/output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoConfig {
    /// Directory relative input and output paths are resolved against
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_backend() -> String {
    crate::core::backends::memory::BACKEND.to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            default_backend: default_backend(),
        }
    }
}

impl Default for IoConfig {
    fn default() -> Self {
        IoConfig {
            data_dir: default_data_dir(),
        }
    }
}

impl RulegraphConfig {
    /// Resolve `path` against `io.data_dir` (absolute paths are kept),
    /// itself relative to `workspace`.
    pub fn resolve_data_path(&self, workspace: &std::path::Path, path: &std::path::Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        let base = if self.io.data_dir.is_absolute() {
            self.io.data_dir.clone()
        } else {
            workspace.join(&self.io.data_dir)
        };
        base.join(path)
    }
}


pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;
