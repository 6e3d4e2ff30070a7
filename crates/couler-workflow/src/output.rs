use std::fmt;

use serde::{Deserialize, Serialize};

/// Which output of a step a reference points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
  /// Standard output of a script step.
  Result,
  /// A named output parameter.
  Parameter(String),
}

/// Symbolic handle to a step's eventual output.
///
/// The compiler never knows the value. The engine substitutes it at run time
/// from the `{{steps.<step>.outputs...}}` expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputRef {
  template: String,
  step: String,
  kind: OutputKind,
}

impl OutputRef {
  pub fn result(template: impl Into<String>, step: impl Into<String>) -> Self {
    Self {
      template: template.into(),
      step: step.into(),
      kind: OutputKind::Result,
    }
  }

  pub fn parameter(
    template: impl Into<String>,
    step: impl Into<String>,
    name: impl Into<String>,
  ) -> Self {
    Self {
      template: template.into(),
      step: step.into(),
      kind: OutputKind::Parameter(name.into()),
    }
  }

  /// Template the producing step invokes.
  pub fn template(&self) -> &str {
    &self.template
  }

  /// Name of the producing step.
  pub fn step(&self) -> &str {
    &self.step
  }

  pub fn kind(&self) -> &OutputKind {
    &self.kind
  }

  /// Path below the step, e.g. `outputs.result`.
  pub fn path(&self) -> String {
    match &self.kind {
      OutputKind::Result => "outputs.result".to_string(),
      OutputKind::Parameter(name) => format!("outputs.parameters.{name}"),
    }
  }

  /// `<step>.<path>`, used to group conditional siblings keyed off this output.
  pub fn key(&self) -> String {
    format!("{}.{}", self.step, self.path())
  }

  /// Engine expression, e.g. `{{steps.flip-coin-53.outputs.result}}`.
  pub fn expression(&self) -> String {
    format!("{{{{steps.{}}}}}", self.key())
  }
}

impl fmt::Display for OutputRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.expression())
  }
}

/// A file a container step publishes as an output parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
  id: String,
  path: String,
}

impl Artifact {
  /// Artifact declared at `line`; its parameter is named `output-id-<line>`.
  pub fn new(line: u32, path: impl Into<String>) -> Self {
    Self {
      id: format!("output-id-{line}"),
      path: path.into(),
    }
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn path(&self) -> &str {
    &self.path
  }
}
