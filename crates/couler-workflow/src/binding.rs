//! Argument and environment binding.
//!
//! Turns user-facing values into the strings and structures embedded in the
//! manifest. Binding happens when the step is added, so an unsupported value
//! fails at the call that introduced it rather than at render time.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::output::OutputRef;
use crate::secret::SecretRef;

/// A step argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Arg {
  /// A value known at compile time.
  Literal(serde_json::Value),
  /// Another step's output, resolved by the engine.
  Output(OutputRef),
  /// The current fan-out item's parameter.
  Item(String),
}

impl Arg {
  /// Render the argument as a parameter value for `template`.
  ///
  /// Strings pass through unchanged, numbers and booleans use their canonical
  /// text and objects become compact JSON. References are wrapped in double
  /// quotes so they survive the `bash -c` command line of container steps.
  pub fn render(&self, template: &str, position: usize) -> Result<String, CompileError> {
    let unsupported = |kind: &'static str| CompileError::UnsupportedValue {
      template: template.to_string(),
      position,
      kind,
    };

    match self {
      Arg::Literal(value) => match value {
        serde_json::Value::String(s) => Ok(s.clone()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        serde_json::Value::Object(_) => {
          serde_json::to_string(value).map_err(|_| unsupported("object"))
        }
        serde_json::Value::Null => Err(unsupported("null")),
        serde_json::Value::Array(_) => Err(unsupported("array")),
      },
      Arg::Output(out) => Ok(format!("\"{}\"", out.expression())),
      Arg::Item(param) => Ok(format!("\"{{{{item.{param}}}}}\"")),
    }
  }
}

impl From<&str> for Arg {
  fn from(value: &str) -> Self {
    Arg::Literal(value.into())
  }
}

impl From<String> for Arg {
  fn from(value: String) -> Self {
    Arg::Literal(value.into())
  }
}

impl From<i64> for Arg {
  fn from(value: i64) -> Self {
    Arg::Literal(value.into())
  }
}

impl From<f64> for Arg {
  fn from(value: f64) -> Self {
    Arg::Literal(value.into())
  }
}

impl From<bool> for Arg {
  fn from(value: bool) -> Self {
    Arg::Literal(value.into())
  }
}

impl From<serde_json::Value> for Arg {
  fn from(value: serde_json::Value) -> Self {
    Arg::Literal(value)
  }
}

impl From<OutputRef> for Arg {
  fn from(out: OutputRef) -> Self {
    Arg::Output(out)
  }
}

impl From<&OutputRef> for Arg {
  fn from(out: &OutputRef) -> Self {
    Arg::Output(out.clone())
  }
}

/// Value of one environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvValue {
  Plain(String),
  Secret { secret: String, key: String },
}

/// Ordered environment for a container or script step.
///
/// Insertion order is preserved so that rendering is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Env {
  vars: IndexMap<String, EnvValue>,
}

impl Env {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a plain variable.
  pub fn var(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
    self
      .vars
      .insert(name.into(), EnvValue::Plain(value.to_string()));
    self
  }

  /// Expose every key of a secret as a variable of the same name.
  pub fn secret(mut self, secret: &SecretRef) -> Self {
    for key in secret.keys() {
      self.vars.insert(
        key.clone(),
        EnvValue::Secret {
          secret: secret.name().to_string(),
          key: key.clone(),
        },
      );
    }
    self
  }

  /// Zip parallel name and value lists.
  pub fn from_pairs<N, V>(names: &[N], values: &[V]) -> Result<Self, CompileError>
  where
    N: AsRef<str>,
    V: fmt::Display,
  {
    if names.len() != values.len() {
      return Err(CompileError::EnvCountMismatch {
        names: names.len(),
        values: values.len(),
      });
    }
    Ok(
      names
        .iter()
        .zip(values)
        .fold(Env::new(), |env, (name, value)| env.var(name.as_ref(), value)),
    )
  }

  pub fn is_empty(&self) -> bool {
    self.vars.is_empty()
  }

  pub fn len(&self) -> usize {
    self.vars.len()
  }

  pub fn get(&self, name: &str) -> Option<&EnvValue> {
    self.vars.get(name)
  }

  /// Append all variables of `other`, later entries replacing earlier ones.
  pub fn extend(&mut self, other: Env) {
    self.vars.extend(other.vars);
  }

  /// Render as the manifest's `env` list. Plain values are single-quoted so
  /// the container shell receives them verbatim.
  pub fn render(&self) -> Vec<EnvVar> {
    self
      .vars
      .iter()
      .map(|(name, value)| match value {
        EnvValue::Plain(value) => EnvVar {
          name: name.clone(),
          value: Some(format!("'{value}'")),
          value_from: None,
        },
        EnvValue::Secret { secret, key } => EnvVar {
          name: name.clone(),
          value: None,
          value_from: Some(EnvSource {
            secret_key_ref: SecretKeyRef {
              name: secret.clone(),
              key: key.clone(),
            },
          }),
        },
      })
      .collect()
  }
}

impl<K: Into<String>, V: fmt::Display> FromIterator<(K, V)> for Env {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    iter
      .into_iter()
      .fold(Env::new(), |env, (name, value)| env.var(name, value))
  }
}

/// One entry of a rendered `env` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub value: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub value_from: Option<EnvSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvSource {
  pub secret_key_ref: SecretKeyRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKeyRef {
  pub name: String,
  pub key: String,
}
