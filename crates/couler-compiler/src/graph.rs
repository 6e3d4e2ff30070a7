//! The step graph under construction.
//!
//! Groups are keyed so that later steps can join an earlier group: a
//! conditional step joins the group of every other step guarded on the same
//! output, a concurrent branch joins the group of its siblings. Any other
//! step opens a new group keyed by its own name. Keys never reach the
//! manifest; only the order of the groups does.

use std::collections::{HashMap, HashSet};

use couler_workflow::{StepGroup, StepInvocation, invocation_name};
use indexmap::IndexMap;
use tracing::warn;

pub(crate) type Groups = IndexMap<String, StepGroup>;

/// A builder context entered by `when`, `concurrent`, `map` or `exec_while`.
#[derive(Debug)]
pub(crate) enum Scope {
  /// Steps carry `when` and join the group at `key`.
  Conditional { when: String, key: String },
  /// Steps are named after `line` and join the group at `key`.
  Concurrent { key: String, line: u32 },
  /// Templates are registered but no step is recorded.
  Symbolic,
  /// Steps go to a separate group list, e.g. the body of a loop.
  Recording { groups: Groups },
}

/// Where the next step goes.
#[derive(Debug, Default)]
pub(crate) struct Placement {
  pub when: Option<String>,
  pub key: Option<String>,
  pub concurrent_line: Option<u32>,
  pub symbolic: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Graph {
  groups: Groups,
  scopes: Vec<Scope>,
  names: HashSet<String>,
  suffixes: HashMap<String, u32>,
}

impl Graph {
  pub fn groups(&self) -> impl Iterator<Item = &StepGroup> {
    self.groups.values()
  }

  pub fn enter(&mut self, scope: Scope) {
    self.scopes.push(scope);
  }

  pub fn exit(&mut self) -> Option<Scope> {
    self.scopes.pop()
  }

  /// Resolve the innermost scopes into a placement. Scopes outside the
  /// nearest recording do not apply to the steps it records.
  ///
  /// The innermost condition guards the step. The group is that of the
  /// innermost concurrent block if there is one, so a guarded branch stays
  /// with its siblings.
  pub fn placement(&self) -> Placement {
    let mut placement = Placement {
      symbolic: self.scopes.iter().any(|s| matches!(s, Scope::Symbolic)),
      ..Placement::default()
    };

    for scope in self.scopes.iter().rev() {
      match scope {
        Scope::Recording { .. } => break,
        Scope::Symbolic => {}
        Scope::Conditional { when, key } => {
          if placement.when.is_none() {
            placement.when = Some(when.clone());
          }
          if placement.key.is_none() {
            placement.key = Some(key.clone());
          }
        }
        Scope::Concurrent { key, line } => {
          if placement.concurrent_line.is_none() {
            placement.key = Some(key.clone());
            placement.concurrent_line = Some(*line);
          }
        }
      }
    }
    placement
  }

  /// Claim `base` as a step name, or the first free `base-N` if it is taken.
  pub fn reserve(&mut self, base: &str) -> String {
    if self.names.insert(base.to_string()) {
      return base.to_string();
    }

    let counter = self.suffixes.entry(base.to_string()).or_insert(1);
    loop {
      *counter += 1;
      let candidate = invocation_name(base, *counter);
      if self.names.insert(candidate.clone()) {
        warn!(step = %base, renamed = %candidate, "step name already taken");
        return candidate;
      }
    }
  }

  /// A group key not yet used in the current group list.
  pub fn fresh_key(&self, base: &str) -> String {
    let groups = self.current();
    if !groups.contains_key(base) {
      return base.to_string();
    }
    (2..)
      .map(|n| invocation_name(base, n))
      .find(|key| !groups.contains_key(key))
      .unwrap_or_else(|| base.to_string())
  }

  /// Append `step` to the group at `key`, opening it at the end if new.
  pub fn push(&mut self, key: String, step: StepInvocation) {
    self.current_mut().entry(key).or_default().push(step);
  }

  fn current(&self) -> &Groups {
    self
      .scopes
      .iter()
      .rev()
      .find_map(|scope| match scope {
        Scope::Recording { groups } => Some(groups),
        _ => None,
      })
      .unwrap_or(&self.groups)
  }

  fn current_mut(&mut self) -> &mut Groups {
    let recording = self.scopes.iter_mut().rev().find_map(|scope| match scope {
      Scope::Recording { groups } => Some(groups),
      _ => None,
    });
    match recording {
      Some(groups) => groups,
      None => &mut self.groups,
    }
  }
}
