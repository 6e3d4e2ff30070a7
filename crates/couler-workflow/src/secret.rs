use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A Kubernetes Secret emitted alongside the workflow.
///
/// Values are held in plaintext here and only ever leave the compiler
/// base64-encoded inside the Secret document. Steps see them through
/// [`SecretRef`] env entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
  name: String,
  data: IndexMap<String, String>,
}

impl Secret {
  pub fn new(name: impl Into<String>, data: IndexMap<String, String>) -> Self {
    Self {
      name: name.into(),
      data,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn data(&self) -> &IndexMap<String, String> {
    &self.data
  }

  /// A reference exposing every key of this secret.
  pub fn reference(&self) -> SecretRef {
    SecretRef {
      name: self.name.clone(),
      keys: self.data.keys().cloned().collect(),
    }
  }
}

/// Names a registered secret and the keys a step may read from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRef {
  name: String,
  keys: Vec<String>,
}

impl SecretRef {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn keys(&self) -> &[String] {
    &self.keys
  }
}
