//! Cluster-specific adjustments.
//!
//! A cluster config gets to rewrite every container and script template (to
//! add node selectors, tolerations, image pull secrets and the like) and the
//! workflow spec (service account, pod GC, ...). Hooks work on plain JSON so
//! that any engine field can be set without this crate modelling it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::load::load_file;

/// Hooks applied while rendering the manifest.
pub trait ClusterConfig: Send + Sync {
  /// Adjust a container or script template.
  fn with_pod(&self, template: Value) -> Value;

  /// Adjust the workflow `spec` before entrypoint and templates are set.
  fn with_workflow_spec(&self, spec: Value) -> Value {
    spec
  }
}

/// A cluster config read from a file with `pod` and `workflow_spec` objects
/// that are deep-merged into templates and the workflow spec.
///
/// ```yaml
/// pod:
///   nodeSelector:
///     pool: batch
/// workflow_spec:
///   serviceAccountName: argo
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayClusterConfig {
  #[serde(default)]
  pub pod: Map<String, Value>,
  #[serde(default)]
  pub workflow_spec: Map<String, Value>,
}

impl OverlayClusterConfig {
  pub fn new(
    pod: Map<String, Value>,
    workflow_spec: Map<String, Value>,
  ) -> Result<Self, ConfigError> {
    let config = Self { pod, workflow_spec };
    config.validate()?;
    Ok(config)
  }

  pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
    let config: Self = load_file(path)?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<(), ConfigError> {
    // Templates are referenced by name from steps.
    if self.pod.contains_key("name") {
      return Err(ConfigError::InvalidClusterConfig {
        message: "pod overlay must not set the template name".to_string(),
      });
    }
    for key in ["entrypoint", "templates"] {
      if self.workflow_spec.contains_key(key) {
        return Err(ConfigError::InvalidClusterConfig {
          message: format!("workflow_spec overlay must not set '{key}'"),
        });
      }
    }
    Ok(())
  }
}

impl ClusterConfig for OverlayClusterConfig {
  fn with_pod(&self, mut template: Value) -> Value {
    merge(&mut template, &Value::Object(self.pod.clone()));
    template
  }

  fn with_workflow_spec(&self, mut spec: Value) -> Value {
    merge(&mut spec, &Value::Object(self.workflow_spec.clone()));
    spec
  }
}

/// Deep-merge `overlay` into `base`. Objects merge key by key, anything else
/// in the overlay replaces the base value.
pub fn merge(base: &mut Value, overlay: &Value) {
  match (base, overlay) {
    (Value::Object(base), Value::Object(overlay)) => {
      for (key, value) in overlay {
        match base.get_mut(key) {
          Some(existing) => merge(existing, value),
          None => {
            base.insert(key.clone(), value.clone());
          }
        }
      }
    }
    (base, overlay) => *base = overlay.clone(),
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn object(value: Value) -> Map<String, Value> {
    match value {
      Value::Object(map) => map,
      _ => panic!("expected an object"),
    }
  }

  #[test]
  fn test_merge_is_deep() {
    let mut base = json!({"container": {"image": "a", "env": []}, "name": "t"});
    merge(
      &mut base,
      &json!({"container": {"imagePullPolicy": "Always"}, "nodeSelector": {"pool": "x"}}),
    );
    assert_eq!(
      base,
      json!({
        "container": {"image": "a", "env": [], "imagePullPolicy": "Always"},
        "name": "t",
        "nodeSelector": {"pool": "x"}
      })
    );
  }

  #[test]
  fn test_overlay_applies_pod_and_spec() {
    let config = OverlayClusterConfig::new(
      object(json!({"tolerations": [{"key": "gpu"}]})),
      object(json!({"serviceAccountName": "argo"})),
    )
    .unwrap();

    let template = config.with_pod(json!({"name": "t", "script": {}}));
    assert_eq!(template["tolerations"], json!([{"key": "gpu"}]));

    let spec = config.with_workflow_spec(json!({}));
    assert_eq!(spec, json!({"serviceAccountName": "argo"}));
  }

  #[test]
  fn test_overlay_rejects_reserved_keys() {
    assert!(matches!(
      OverlayClusterConfig::new(object(json!({"name": "x"})), Map::new()),
      Err(ConfigError::InvalidClusterConfig { .. })
    ));
    assert!(OverlayClusterConfig::new(Map::new(), object(json!({"entrypoint": "x"}))).is_err());
  }
}
