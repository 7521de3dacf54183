//! TOML settings shared by the training and labeling tools.
//!
//! Settings live in `config.toml` under the app root (see [`app_dirs`]). A
//! missing file means defaults; every section and key is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;
use crate::labeling::LabelOptions;
use crate::pipeline::DEFAULT_MIN_DF;

/// Default filename used to store the settings.
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriageConfig {
    #[serde(default)]
    pub training: TrainingSettings,
    #[serde(default)]
    pub labels: LabelOptions,
    #[serde(default)]
    pub text: TextSettings,
}

/// Booster, split and sampler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSettings {
    #[serde(default = "default_rounds")]
    pub rounds: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    #[serde(default = "default_bins")]
    pub bins: usize,
    /// Fraction of each class held out for evaluation.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Seed mixed into the train/test split hash.
    #[serde(default = "default_split_seed")]
    pub split_seed: String,
    #[serde(default)]
    pub sampler_seed: u64,
    /// Worker threads; defaults to the physical core count.
    #[serde(default)]
    pub n_jobs: Option<usize>,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
            learning_rate: default_learning_rate(),
            bins: default_bins(),
            test_fraction: default_test_fraction(),
            split_seed: default_split_seed(),
            sampler_seed: 0,
            n_jobs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSettings {
    #[serde(default = "default_min_df")]
    pub min_df: f64,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            min_df: default_min_df(),
        }
    }
}

fn default_rounds() -> usize {
    100
}

fn default_learning_rate() -> f32 {
    0.1
}

fn default_bins() -> usize {
    32
}

fn default_test_fraction() -> f64 {
    0.1
}

fn default_split_seed() -> String {
    "devdocneeded".to_string()
}

fn default_min_df() -> f64 {
    DEFAULT_MIN_DF
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config directory unavailable: {0}")]
    AppDir(#[from] app_dirs::AppDirError),
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    #[error("Invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Resolve the settings path under the app root.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

/// Load settings from the app root, returning defaults if the file is missing.
pub fn load_or_default() -> Result<TriageConfig, ConfigError> {
    load_from(&config_path()?)
}

/// Load settings from `path`, returning defaults if the file is missing.
pub fn load_from(path: &Path) -> Result<TriageConfig, ConfigError> {
    if !path.exists() {
        return Ok(TriageConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: TriageConfig = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Save settings to `path`, creating parent directories as needed.
pub fn save_to_path(config: &TriageConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let text = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

impl TriageConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let training = &self.training;
        if training.rounds == 0 {
            return Err(invalid("training.rounds", "must be at least 1"));
        }
        if !(training.learning_rate.is_finite() && training.learning_rate > 0.0) {
            return Err(invalid("training.learning_rate", "must be a positive number"));
        }
        if !(2..=256).contains(&training.bins) {
            return Err(invalid("training.bins", "must be between 2 and 256"));
        }
        if !(0.0..1.0).contains(&training.test_fraction) {
            return Err(invalid("training.test_fraction", "must be in [0, 1)"));
        }
        if training.n_jobs == Some(0) {
            return Err(invalid("training.n_jobs", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.text.min_df) {
            return Err(invalid("text.min_df", "must be in [0, 1]"));
        }
        Ok(())
    }
}

fn invalid(key: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.to_string(),
    }
}
