//! Project and global configuration layers (spec §6.2), mirroring the
//! host's `GlobalConfig`/`ProjectConfig` split: a process-wide defaults
//! file plus a per-project override, with the project always winning.

use crate::error::{ConfigError, ConfigResult};
use crate::options::{AskMode, EngineOptions};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// `~/.config/recipe-engine/config.yaml` — process-wide defaults applied
/// underneath every project unless overridden there.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalEngineConfig {
    #[serde(default)]
    pub defaults: EngineOptions,
}

impl GlobalEngineConfig {
    /// Load the global config, falling back to defaults if the file is
    /// absent. A present-but-malformed file is still an error — silently
    /// ignoring a typo'd config is worse than failing loudly.
    pub fn load() -> ConfigResult<Self> {
        let Some(path) = paths::global_config_path() else {
            return Ok(Self::default());
        };
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// `<project_root>/.recipe/config.yaml` — per-project overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default)]
    pub options: EngineOptions,

    #[serde(default)]
    pub ask_mode: AskMode,
}

impl EngineConfig {
    /// Load the project config from `<project_root>/.recipe/config.yaml`,
    /// defaulting if absent.
    pub fn load(project_root: &Path) -> ConfigResult<Self> {
        let path = paths::project_config_path(project_root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Resolve the effective options for a run: this project's own
    /// settings layered over the process-wide global defaults.
    pub fn resolve_options(&self, global: &GlobalEngineConfig) -> EngineOptions {
        self.options.clone().merged_over(global.defaults.clone())
    }
}
