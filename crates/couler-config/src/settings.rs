use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cluster::OverlayClusterConfig;
use crate::error::ConfigError;

/// Environment variable naming the workflow.
pub const WORKFLOW_NAME_ENV: &str = "workflow_name";

/// Environment variable pointing at a cluster config file.
pub const CLUSTER_CONFIG_ENV: &str = "couler_cluster_config";

/// Workflow name used when none is configured.
pub const DEFAULT_WORKFLOW_NAME: &str = "couler";

/// Settings for one compile pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
  /// Name of the workflow; becomes the entrypoint and the `generateName` prefix.
  #[serde(default = "default_workflow_name")]
  pub workflow_name: String,

  /// Optional cluster config overlay file.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cluster_config: Option<PathBuf>,

  /// Seconds the engine keeps the workflow after it finished.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ttl_seconds_after_finished: Option<u64>,
}

fn default_workflow_name() -> String {
  DEFAULT_WORKFLOW_NAME.to_string()
}

impl Default for CompilerConfig {
  fn default() -> Self {
    Self::new(DEFAULT_WORKFLOW_NAME)
  }
}

impl CompilerConfig {
  pub fn new(workflow_name: impl Into<String>) -> Self {
    Self {
      workflow_name: workflow_name.into(),
      cluster_config: None,
      ttl_seconds_after_finished: None,
    }
  }

  /// Read settings from the process environment.
  pub fn from_env() -> Self {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Read settings through `lookup`; empty values count as unset.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    Self {
      workflow_name: get(WORKFLOW_NAME_ENV).unwrap_or_else(default_workflow_name),
      cluster_config: get(CLUSTER_CONFIG_ENV).map(PathBuf::from),
      ttl_seconds_after_finished: None,
    }
  }

  pub fn with_cluster_config(mut self, path: impl Into<PathBuf>) -> Self {
    self.cluster_config = Some(path.into());
    self
  }

  pub fn with_ttl_seconds_after_finished(mut self, seconds: u64) -> Self {
    self.ttl_seconds_after_finished = Some(seconds);
    self
  }

  /// Load the configured cluster overlay, if any.
  pub fn load_cluster_config(&self) -> Result<Option<OverlayClusterConfig>, ConfigError> {
    self
      .cluster_config
      .as_deref()
      .map(OverlayClusterConfig::from_path)
      .transpose()
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  #[test]
  fn test_from_lookup_reads_both_variables() {
    let vars = HashMap::from([
      (WORKFLOW_NAME_ENV, "sqlflow_job"),
      (CLUSTER_CONFIG_ENV, "/etc/couler/cluster.yaml"),
    ]);
    let config = CompilerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

    assert_eq!(config.workflow_name, "sqlflow_job");
    assert_eq!(
      config.cluster_config,
      Some(PathBuf::from("/etc/couler/cluster.yaml"))
    );
  }

  #[test]
  fn test_from_lookup_defaults_when_unset_or_empty() {
    let config = CompilerConfig::from_lookup(|key| {
      (key == WORKFLOW_NAME_ENV).then(|| "  ".to_string())
    });
    assert_eq!(config.workflow_name, DEFAULT_WORKFLOW_NAME);
    assert!(config.cluster_config.is_none());
  }

  #[test]
  fn test_deserialize_with_defaults() {
    let config: CompilerConfig =
      serde_json::from_str(r#"{"ttl_seconds_after_finished": 86400}"#).unwrap();
    assert_eq!(config.workflow_name, DEFAULT_WORKFLOW_NAME);
    assert_eq!(config.ttl_seconds_after_finished, Some(86400));
  }

  #[test]
  fn test_no_cluster_config_loads_nothing() {
    assert!(CompilerConfig::default().load_cluster_config().unwrap().is_none());
  }
}
