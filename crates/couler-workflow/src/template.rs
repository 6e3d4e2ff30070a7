use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::binding::EnvVar;
use crate::step::StepGroup;

/// A reusable step definition.
///
/// One template exists per logical step function, however many times the
/// function is invoked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub inputs: Option<Inputs>,
  #[serde(flatten)]
  pub body: TemplateBody,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub outputs: Option<Outputs>,
}

impl Template {
  pub fn new(name: impl Into<String>, body: TemplateBody) -> Self {
    Self {
      name: name.into(),
      inputs: None,
      body,
      outputs: None,
    }
  }

  pub fn kind(&self) -> TemplateKind {
    match self.body {
      TemplateBody::Container(_) => TemplateKind::Container,
      TemplateBody::Script(_) => TemplateKind::Script,
      TemplateBody::Resource(_) => TemplateKind::Resource,
      TemplateBody::Steps(_) => TemplateKind::Steps,
    }
  }

  /// Names of the declared input parameters, in declaration order.
  pub fn input_names(&self) -> Vec<&str> {
    self
      .inputs
      .iter()
      .flat_map(|inputs| inputs.parameters.iter().map(|p| p.name.as_str()))
      .collect()
  }

  /// Name of the first declared output parameter, if any.
  pub fn output_parameter(&self) -> Option<&str> {
    self
      .outputs
      .as_ref()
      .and_then(|outputs| outputs.parameters.first())
      .map(|p| p.name.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
  Container,
  Script,
  Resource,
  Steps,
}

/// What a template runs. Serialized under its engine key (`container`,
/// `script`, `resource` or `steps`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateBody {
  Container(ContainerBody),
  Script(ScriptBody),
  Resource(ResourceBody),
  Steps(Vec<StepGroup>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerBody {
  pub image: String,
  pub command: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub args: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub env: Vec<EnvVar>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub resources: Option<Resources>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptBody {
  pub image: String,
  pub command: Vec<String>,
  pub source: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub env: Vec<EnvVar>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub resources: Option<Resources>,
}

/// A raw Kubernetes resource the engine creates, e.g. a batch Job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceBody {
  pub action: String,
  pub set_owner_reference: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub success_condition: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub failure_condition: Option<String>,
  pub manifest: String,
}

/// Container resource requests and limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resources {
  pub requests: IndexMap<String, serde_json::Value>,
  pub limits: IndexMap<String, serde_json::Value>,
}

impl Resources {
  /// Request and limit the same amounts.
  pub fn uniform(amounts: IndexMap<String, serde_json::Value>) -> Self {
    Self {
      requests: amounts.clone(),
      limits: amounts,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inputs {
  pub parameters: Vec<InputParameter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputParameter {
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outputs {
  pub parameters: Vec<OutputParameter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputParameter {
  pub name: String,
  pub value_from: ValueFrom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueFrom {
  pub path: String,
}
