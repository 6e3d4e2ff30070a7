use std::path::PathBuf;

use thiserror::Error;

/// Errors loading configuration or program files.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("unsupported file extension for {path} (expected .json, .yaml or .yml)")]
  UnsupportedFormat { path: PathBuf },

  #[error("failed to parse JSON in {path}")]
  Json {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to parse YAML in {path}")]
  Yaml {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("invalid cluster config: {message}")]
  InvalidClusterConfig { message: String },
}
