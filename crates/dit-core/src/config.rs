use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ErrorCode;

/// Name of the per-repository data directory.
pub const DIT_DIR: &str = ".dit";

/// Prior mean of a fresh skill estimate.
pub const DEFAULT_MU: f64 = 25.0;

/// Prior uncertainty of a fresh skill estimate.
pub const DEFAULT_SIGMA: f64 = DEFAULT_MU / 3.0;

/// Per-comparison performance noise.
pub const DEFAULT_BETA: f64 = DEFAULT_SIGMA / 2.0;

/// Floor on the variance shrink factor of a single update.
pub const DEFAULT_KAPPA: f64 = 0.0001;

/// Number of standard deviations subtracted from the mean for the ordinal.
pub const DEFAULT_Z: f64 = 3.0;

/// Directory entries per level before new issues spill into a date level.
pub const DEFAULT_SHARD_THRESHOLD: usize = 128;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub rating: RatingConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_shard_threshold")]
    pub shard_threshold: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            shard_threshold: default_shard_threshold(),
        }
    }
}

/// Parameters of the ranked-comparison skill model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingConfig {
    #[serde(default = "default_mu")]
    pub mu: f64,
    #[serde(default = "default_sigma")]
    pub sigma: f64,
    #[serde(default = "default_beta")]
    pub beta: f64,
    #[serde(default = "default_kappa")]
    pub kappa: f64,
    #[serde(default = "default_z")]
    pub z: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            mu: DEFAULT_MU,
            sigma: DEFAULT_SIGMA,
            beta: DEFAULT_BETA,
            kappa: DEFAULT_KAPPA,
            z: DEFAULT_Z,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Label written into each imported issue's import stamp.
    #[serde(default = "default_import_source")]
    pub source: String,
    #[serde(default = "default_tool_version")]
    pub tool_version: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            source: default_import_source(),
            tool_version: default_tool_version(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    /// Name recorded as the author of rankings.
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub dit_dir: PathBuf,
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(DIT_DIR).join("config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    parse_toml(&path, &content)
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };
    load_user_config_from(&config_dir.join("dit/config.toml"))
}

fn load_user_config_from(path: &Path) -> Result<UserConfig> {
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    parse_toml(path, &content)
}

fn parse_toml<T: DeserializeOwned>(path: &Path, content: &str) -> Result<T> {
    toml::from_str(content).with_context(|| {
        format!(
            "{}: Failed to parse {}",
            ErrorCode::ConfigParseError.code(),
            path.display()
        )
    })
}

pub fn resolve_config(project_root: &Path) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    Ok(EffectiveConfig {
        project,
        user,
        dit_dir: project_root.join(DIT_DIR),
    })
}

const fn default_shard_threshold() -> usize {
    DEFAULT_SHARD_THRESHOLD
}

const fn default_mu() -> f64 {
    DEFAULT_MU
}

const fn default_sigma() -> f64 {
    DEFAULT_SIGMA
}

const fn default_beta() -> f64 {
    DEFAULT_BETA
}

const fn default_kappa() -> f64 {
    DEFAULT_KAPPA
}

const fn default_z() -> f64 {
    DEFAULT_Z
}

fn default_import_source() -> String {
    "github.com".to_string()
}

fn default_tool_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
