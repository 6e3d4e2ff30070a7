use thiserror::Error;

/// Errors raised while compiling builder calls into a step graph.
///
/// All of these are user configuration mistakes detected synchronously at
/// the offending call. Nothing is retried and no partial graph is repaired.
#[derive(Debug, Error)]
pub enum CompileError {
  #[error("script step '{template}' has no source")]
  MissingSource { template: String },

  #[error("step '{template}' has no container image")]
  MissingImage { template: String },

  #[error("job step '{template}' has no manifest")]
  MissingManifest { template: String },

  #[error("invalid name '{name}': {reason}")]
  InvalidName { name: String, reason: String },

  #[error("step '{step}' uses a secret but none is defined")]
  MissingSecret { step: String },

  #[error("env has {names} names but {values} values")]
  EnvCountMismatch { names: usize, values: usize },

  #[error("argument {position} of '{template}' cannot be rendered: unsupported {kind} value")]
  UnsupportedValue {
    template: String,
    position: usize,
    kind: &'static str,
  },

  #[error("concurrent requires at least one branch")]
  EmptyConcurrent,

  #[error("map requires at least one item")]
  EmptyMap,

  #[error("template '{template}' declares no input parameters to map over")]
  MapWithoutInputs { template: String },

  #[error("map item {index} has {actual} values, template '{template}' expects {expected}")]
  ItemArity {
    template: String,
    index: usize,
    expected: usize,
    actual: usize,
  },

  #[error("recursive template '{template}' is already defined")]
  DuplicateRecursion { template: String },

  #[error("template not found: {0}")]
  UnknownTemplate(String),

  #[error("step not found: {0}")]
  UnknownStep(String),

  #[error("unknown comparison operator: {0}")]
  InvalidOperator(String),
}
