use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ManifestError;

pub const ARGO_API_VERSION: &str = "argoproj.io/v1alpha1";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub generate_name: Option<String>,
}

/// The Argo `Workflow` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDocument {
  pub api_version: String,
  pub kind: String,
  pub metadata: ObjectMeta,
  /// Kept as JSON so cluster overlays can set any engine field.
  pub spec: Map<String, Value>,
}

impl WorkflowDocument {
  pub fn entrypoint(&self) -> Option<&str> {
    self.spec.get("entrypoint").and_then(Value::as_str)
  }

  /// Rendered templates, entrypoint first.
  pub fn templates(&self) -> &[Value] {
    self
      .spec
      .get("templates")
      .and_then(Value::as_array)
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  /// The outer step list of the entrypoint template.
  pub fn steps(&self) -> &[Value] {
    self
      .templates()
      .first()
      .and_then(|entrypoint| entrypoint.get("steps"))
      .and_then(Value::as_array)
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }
}

/// A Kubernetes `Secret` document with base64-encoded data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretDocument {
  pub api_version: String,
  pub kind: String,
  pub metadata: ObjectMeta,
  #[serde(rename = "type")]
  pub secret_type: String,
  pub data: IndexMap<String, String>,
}

/// Rendered output of one compile pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
  pub(crate) secrets: Vec<SecretDocument>,
  pub(crate) workflow: Option<WorkflowDocument>,
}

impl Manifest {
  pub fn secrets(&self) -> &[SecretDocument] {
    &self.secrets
  }

  /// `None` when no step was recorded.
  pub fn workflow(&self) -> Option<&WorkflowDocument> {
    self.workflow.as_ref()
  }

  /// All documents as YAML, secrets first, separated by `---`.
  pub fn to_yaml(&self) -> Result<String, ManifestError> {
    let mut out = String::new();
    for secret in &self.secrets {
      out.push_str(&to_yaml(secret, "secret")?);
      out.push_str("---\n");
    }
    if let Some(workflow) = &self.workflow {
      out.push_str(&to_yaml(workflow, "workflow")?);
    }
    Ok(out)
  }

  /// All documents as JSON values, in the same order as [`Manifest::to_yaml`].
  pub fn documents(&self) -> Result<Vec<Value>, ManifestError> {
    let mut documents = Vec::with_capacity(self.secrets.len() + 1);
    for secret in &self.secrets {
      documents.push(to_json(secret, "secret")?);
    }
    if let Some(workflow) = &self.workflow {
      documents.push(to_json(workflow, "workflow")?);
    }
    Ok(documents)
  }
}

fn to_yaml<T: Serialize>(document: &T, what: &str) -> Result<String, ManifestError> {
  serde_yaml::to_string(document).map_err(|source| ManifestError::Yaml {
    what: what.to_string(),
    source,
  })
}

fn to_json<T: Serialize>(document: &T, what: &str) -> Result<Value, ManifestError> {
  serde_json::to_value(document).map_err(|source| ManifestError::Json {
    what: what.to_string(),
    source,
  })
}
