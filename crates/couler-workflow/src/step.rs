use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One row of a fan-out: input parameter name to its value for that iteration.
pub type WithItem = IndexMap<String, serde_json::Value>;

/// One use of a template at a position in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInvocation {
  /// Unique within the whole graph.
  pub name: String,
  pub template: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub when: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub arguments: Option<Arguments>,
  #[serde(rename = "withItems", skip_serializing_if = "Option::is_none")]
  pub with_items: Option<Vec<WithItem>>,
}

impl StepInvocation {
  pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      template: template.into(),
      when: None,
      arguments: None,
      with_items: None,
    }
  }

  /// Value bound to parameter `name`, if any.
  pub fn argument(&self, name: &str) -> Option<&str> {
    self
      .arguments
      .as_ref()?
      .parameters
      .iter()
      .find(|p| p.name == name)
      .map(|p| p.value.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arguments {
  pub parameters: Vec<Parameter>,
}

impl Arguments {
  /// `None` when there is nothing to pass, so the key is omitted entirely.
  pub fn from_parameters(parameters: Vec<Parameter>) -> Option<Self> {
    if parameters.is_empty() {
      None
    } else {
      Some(Self { parameters })
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
  pub name: String,
  pub value: String,
}

/// Steps the engine runs in parallel once the previous group has finished.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepGroup {
  steps: Vec<StepInvocation>,
}

impl StepGroup {
  pub fn push(&mut self, step: StepInvocation) {
    self.steps.push(step);
  }

  pub fn steps(&self) -> &[StepInvocation] {
    &self.steps
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }
}

impl From<Vec<StepInvocation>> for StepGroup {
  fn from(steps: Vec<StepInvocation>) -> Self {
    Self { steps }
  }
}
