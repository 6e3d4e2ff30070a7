use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::ConfigError;

/// File formats accepted for configuration and programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
  Json,
  Yaml,
}

impl Format {
  pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
    match path.extension().and_then(|ext| ext.to_str()) {
      Some("json") => Ok(Format::Json),
      Some("yaml") | Some("yml") => Ok(Format::Yaml),
      _ => Err(ConfigError::UnsupportedFormat {
        path: path.to_path_buf(),
      }),
    }
  }
}

/// Read and deserialize a JSON or YAML file.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
  let format = Format::from_path(path)?;
  let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
    path: path.to_path_buf(),
    source,
  })?;

  match format {
    Format::Json => serde_json::from_str(&content).map_err(|source| ConfigError::Json {
      path: path.to_path_buf(),
      source,
    }),
    Format::Yaml => serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
      path: path.to_path_buf(),
      source,
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_format_from_extension() {
    assert_eq!(Format::from_path(Path::new("a.json")).unwrap(), Format::Json);
    assert_eq!(Format::from_path(Path::new("a.yml")).unwrap(), Format::Yaml);
    assert_eq!(Format::from_path(Path::new("a.yaml")).unwrap(), Format::Yaml);
    assert!(matches!(
      Format::from_path(Path::new("a.toml")),
      Err(ConfigError::UnsupportedFormat { .. })
    ));
  }
}
