/// Errors that can occur while rendering a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
  /// A template or document could not be converted to JSON.
  #[error("failed to convert {what} to JSON")]
  Json {
    what: String,
    #[source]
    source: serde_json::Error,
  },

  /// A document could not be written as YAML.
  #[error("failed to write {what} as YAML")]
  Yaml {
    what: String,
    #[source]
    source: serde_yaml::Error,
  },

  /// The cluster config turned the workflow spec into something other than an object.
  #[error("cluster config returned a non-object workflow spec")]
  InvalidSpec,
}
