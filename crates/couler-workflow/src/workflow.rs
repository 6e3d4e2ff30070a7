use serde::{Deserialize, Serialize};

use crate::secret::Secret;
use crate::step::StepGroup;
use crate::template::{Template, TemplateBody};

/// Everything a compile pass produced, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledWorkflow {
  /// Sanitized workflow name; also the entrypoint template name.
  pub name: String,
  /// Top-level step groups in dependency order.
  pub groups: Vec<StepGroup>,
  /// Registered templates in registration order.
  pub templates: Vec<Template>,
  /// Registered secrets in registration order.
  pub secrets: Vec<Secret>,
  pub ttl_seconds_after_finished: Option<u64>,
}

impl CompiledWorkflow {
  /// The synthetic steps template holding the top-level groups.
  pub fn entrypoint(&self) -> Template {
    Template::new(self.name.clone(), TemplateBody::Steps(self.groups.clone()))
  }

  pub fn template(&self, name: &str) -> Option<&Template> {
    self.templates.iter().find(|t| t.name == name)
  }

  /// True when no step was recorded.
  pub fn is_empty(&self) -> bool {
    self.groups.is_empty()
  }
}
