use std::path::PathBuf;
use thiserror::Error;

use crate::thresholds::ThresholdParseError;

/// Problems detected before a run starts. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one stage is required")]
    NoStages,

    #[error("stage {index} has zero duration")]
    ZeroDurationStage { index: usize },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid setting '{key}': {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    #[error("invalid threshold: {0}")]
    Threshold(#[from] ThresholdParseError),

    #[error("config file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
}
