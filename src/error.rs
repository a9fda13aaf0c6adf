use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KubePolicyError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Git error: {0}")]
    Git(String),

    #[error("GitHub error: {0}")]
    GitHub(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Runtime(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to parse configuration: {0}")]
    ParsingFailed(String),

    #[error("Invalid value for {field}: '{value}'")]
    InvalidValue { field: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, KubePolicyError>;
