//! Declarative step programs.
//!
//! A program is the file form of a sequence of builder calls, for callers that
//! produce steps as data (for example a SQL front end emitting one container
//! step per statement). Items run in order; a `concurrent` item groups its
//! steps so that the engine runs them in parallel.
//!
//! ```yaml
//! ttl_seconds_after_finished: 3600
//! steps:
//!   - name: flip_coin
//!     kind: script
//!     image: python:alpine3.6
//!     source: |
//!       import random
//!       print("heads" if random.randint(0, 1) == 0 else "tails")
//!   - name: heads
//!     kind: container
//!     image: alpine:3.6
//!     command: ['echo "it was heads"']
//!     when: { step: flip_coin, op: "==", value: heads }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramDef {
  /// Overrides the configured workflow name.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ttl_seconds_after_finished: Option<u64>,

  /// Secret made available to steps with `use_secret: true`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub secret: Option<SecretDef>,

  pub steps: Vec<ProgramItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgramItem {
  Concurrent(ConcurrentDef),
  Step(StepDef),
}

/// Steps the engine runs in parallel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcurrentDef {
  pub concurrent: Vec<StepDef>,
  /// Call line; defaults to the item's 1-based position.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDef {
  /// Logical step name; becomes the template name once sanitized.
  pub name: String,

  /// Call line; defaults to the item's 1-based position.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub line: Option<u32>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub when: Option<WhenDef>,

  #[serde(flatten)]
  pub body: StepBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepBody {
  Container {
    image: String,
    #[serde(default)]
    command: Vec<String>,
    #[serde(default)]
    args: Vec<ArgDef>,
    #[serde(default)]
    env: EnvDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resources: Option<IndexMap<String, serde_json::Value>>,
    #[serde(default)]
    use_secret: bool,
    /// Path of a file published as the step's output parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output: Option<String>,
  },
  Script {
    image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    source: String,
    #[serde(default)]
    env: EnvDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resources: Option<IndexMap<String, serde_json::Value>>,
  },
  Job {
    manifest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    success_condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure_condition: Option<String>,
  },
}

/// Step environment: a map, or parallel name and value lists as emitted by
/// code generators.
///
/// ```yaml
/// env: { MYSQL_HOST: db }
/// env: { names: [MYSQL_HOST, MYSQL_PORT], values: [db, 3306] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvDef {
  Lists {
    names: Vec<String>,
    values: Vec<serde_json::Value>,
  },
  Map(IndexMap<String, serde_json::Value>),
}

impl Default for EnvDef {
  fn default() -> Self {
    EnvDef::Map(IndexMap::new())
  }
}

/// Guard on the output of an earlier step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhenDef {
  /// Name of an earlier step in the program.
  pub step: String,
  /// One of `==`, `!=`, `>`, `<`, `>=`, `<=`.
  pub op: String,
  pub value: serde_json::Value,
}

/// A container argument: a literal or the output of an earlier step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgDef {
  From { from: String },
  Value(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretDef {
  pub name: String,
  pub data: IndexMap<String, String>,
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_parse_program_yaml() {
    let yaml = r#"
ttl_seconds_after_finished: 60
secret:
  name: db
  data:
    user: root
steps:
  - name: flip_coin
    kind: script
    image: python:alpine3.6
    source: print("heads")
  - concurrent:
      - name: job_a
        kind: container
        image: alpine
        command: ["echo a"]
        args: ["x", 2, { from: flip_coin }]
        use_secret: true
      - name: job_b
        kind: job
        manifest: "kind: Job"
  - name: heads
    kind: container
    image: alpine
    when: { step: flip_coin, op: "==", value: heads }
"#;
    let program: ProgramDef = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(program.ttl_seconds_after_finished, Some(60));
    assert_eq!(program.secret.as_ref().unwrap().data["user"], "root");
    assert_eq!(program.steps.len(), 3);

    let ProgramItem::Concurrent(block) = &program.steps[1] else {
      panic!("expected a concurrent block");
    };
    assert_eq!(block.concurrent.len(), 2);
    let StepBody::Container { args, use_secret, .. } = &block.concurrent[0].body else {
      panic!("expected a container step");
    };
    assert!(use_secret);
    assert_eq!(
      args,
      &vec![
        ArgDef::Value(json!("x")),
        ArgDef::Value(json!(2)),
        ArgDef::From {
          from: "flip_coin".to_string()
        },
      ]
    );

    let ProgramItem::Step(heads) = &program.steps[2] else {
      panic!("expected a step");
    };
    let when = heads.when.as_ref().unwrap();
    assert_eq!(when.step, "flip_coin");
    assert_eq!(when.value, json!("heads"));
  }
}
