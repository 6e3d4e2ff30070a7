//! Call-site identity.
//!
//! Argo needs a name for every template and every step, but a builder call
//! has neither. A step is named after the logical function that issued it and
//! the source line that called that function, e.g. `flip-coin-53`.
//!
//! ```ignore
//! #[track_caller]
//! fn flip_coin(c: &mut Compiler) -> Result<OutputRef, CompileError> {
//!   c.run_script(CallSite::caller("flip_coin"), spec)
//! }
//!
//! let out = flip_coin(&mut c)?; // step "flip-coin-<this line>"
//! ```

use std::fmt;
use std::panic::Location;

use serde::{Deserialize, Serialize};

use crate::error::CompileError;

/// Make a name usable as a Kubernetes/Argo identifier.
///
/// Argo rejects `_` and `.` in template and step names, both become `-`.
/// Applying it twice yields the same string.
pub fn sanitize(name: &str) -> String {
  name.replace(['_', '.'], "-")
}

/// The name of one invocation of `name`, issued from `line`.
pub fn invocation_name(name: &str, line: u32) -> String {
  format!("{name}-{line}")
}

/// Input parameter name for the argument at `position` of `template`.
pub fn input_parameter(template: &str, position: usize) -> String {
  format!("para-{template}-{position}")
}

/// A logical function name paired with the line it was called from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSite {
  name: String,
  line: u32,
}

impl CallSite {
  /// Build a call site from an explicit name and line. The name is sanitized.
  pub fn new(name: impl AsRef<str>, line: u32) -> Self {
    Self {
      name: sanitize(name.as_ref()),
      line,
    }
  }

  /// Build a call site for `name` at the line of the current caller.
  ///
  /// Inside a `#[track_caller]` step function this resolves to the line
  /// where the step function itself was called.
  #[track_caller]
  pub fn caller(name: impl AsRef<str>) -> Self {
    Self::new(name, Location::caller().line())
  }

  /// The sanitized logical name; also the template name.
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn line(&self) -> u32 {
    self.line
  }

  /// Default step name for this site.
  pub fn invocation_name(&self) -> String {
    invocation_name(&self.name, self.line)
  }

  /// Check that the name is a usable identifier.
  pub fn validate(&self) -> Result<(), CompileError> {
    validate_name(&self.name)
  }
}

impl fmt::Display for CallSite {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.name, self.line)
  }
}

/// Check that `name` is usable as a template, step or secret name.
pub fn validate_name(name: &str) -> Result<(), CompileError> {
  let invalid = |reason: &str| CompileError::InvalidName {
    name: name.to_string(),
    reason: reason.to_string(),
  };

  let Some(first) = name.chars().next() else {
    return Err(invalid("name is empty"));
  };
  if !first.is_ascii_alphanumeric() {
    return Err(invalid("must start with an alphanumeric character"));
  }
  if let Some(c) = name
    .chars()
    .find(|c| !(c.is_ascii_alphanumeric() || *c == '-'))
  {
    return Err(invalid(&format!("contains '{c}'")));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sanitize_replaces_underscores_and_dots() {
    assert_eq!(sanitize("flip_coin"), "flip-coin");
    assert_eq!(sanitize("workflow_basic_test.py"), "workflow-basic-test-py");
  }

  #[test]
  fn test_sanitize_is_idempotent() {
    let once = sanitize("a_b.c__d");
    assert_eq!(sanitize(&once), once);
  }

  #[test]
  fn test_invocation_name_joins_with_line() {
    let site = CallSite::new("flip_coin", 53);
    assert_eq!(site.name(), "flip-coin");
    assert_eq!(site.invocation_name(), "flip-coin-53");
  }

  #[test]
  fn test_caller_records_current_line() {
    let expected = line!() + 1;
    let site = CallSite::caller("step");
    assert_eq!(site.line(), expected);
  }

  #[test]
  fn test_caller_propagates_through_track_caller() {
    #[track_caller]
    fn whalesay() -> CallSite {
      CallSite::caller("whalesay")
    }

    let expected = line!() + 1;
    let site = whalesay();
    assert_eq!(site.line(), expected);
  }

  #[test]
  fn test_validate_rejects_bad_names() {
    assert!(CallSite::new("ok-name-1", 1).validate().is_ok());
    assert!(matches!(
      CallSite::new("", 1).validate(),
      Err(CompileError::InvalidName { .. })
    ));
    assert!(CallSite::new("-leading", 1).validate().is_err());
    assert!(CallSite::new("has space", 1).validate().is_err());
  }
}
