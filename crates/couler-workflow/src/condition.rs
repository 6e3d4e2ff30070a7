//! Guards attached to conditional steps.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::output::OutputRef;

/// Comparison operator understood by the engine's `when` expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
  #[serde(rename = "==")]
  Eq,
  #[serde(rename = "!=")]
  Ne,
  #[serde(rename = ">")]
  Gt,
  #[serde(rename = "<")]
  Lt,
  #[serde(rename = ">=")]
  Ge,
  #[serde(rename = "<=")]
  Le,
}

impl CompareOp {
  pub fn as_str(&self) -> &'static str {
    match self {
      CompareOp::Eq => "==",
      CompareOp::Ne => "!=",
      CompareOp::Gt => ">",
      CompareOp::Lt => "<",
      CompareOp::Ge => ">=",
      CompareOp::Le => "<=",
    }
  }
}

impl fmt::Display for CompareOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for CompareOp {
  type Err = CompileError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "==" => Ok(CompareOp::Eq),
      "!=" => Ok(CompareOp::Ne),
      ">" => Ok(CompareOp::Gt),
      "<" => Ok(CompareOp::Lt),
      ">=" => Ok(CompareOp::Ge),
      "<=" => Ok(CompareOp::Le),
      other => Err(CompileError::InvalidOperator(other.to_string())),
    }
  }
}

/// Left-hand side of a condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
  Output(OutputRef),
  Literal(String),
}

impl Operand {
  fn render(&self) -> String {
    match self {
      Operand::Output(out) => out.expression(),
      Operand::Literal(value) => value.clone(),
    }
  }
}

impl From<OutputRef> for Operand {
  fn from(out: OutputRef) -> Self {
    Operand::Output(out)
  }
}

impl From<&OutputRef> for Operand {
  fn from(out: &OutputRef) -> Self {
    Operand::Output(out.clone())
  }
}

impl From<&str> for Operand {
  fn from(value: &str) -> Self {
    Operand::Literal(value.to_string())
  }
}

impl From<String> for Operand {
  fn from(value: String) -> Self {
    Operand::Literal(value)
  }
}

/// A binary comparison the engine evaluates before running a guarded step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
  lhs: Operand,
  op: CompareOp,
  rhs: String,
}

impl Condition {
  pub fn new(lhs: impl Into<Operand>, op: CompareOp, rhs: impl fmt::Display) -> Self {
    Self {
      lhs: lhs.into(),
      op,
      rhs: rhs.to_string(),
    }
  }

  pub fn lhs(&self) -> &Operand {
    &self.lhs
  }

  pub fn op(&self) -> CompareOp {
    self.op
  }

  pub fn rhs(&self) -> &str {
    &self.rhs
  }

  /// Render as an engine expression, e.g. `{{steps.x.outputs.result}} == heads`.
  pub fn render(&self) -> String {
    format!("{} {} {}", self.lhs.render(), self.op, self.rhs)
  }

  /// Conditions keyed off the same output share a step group.
  pub fn group_key(&self) -> Option<String> {
    match &self.lhs {
      Operand::Output(out) => Some(out.key()),
      Operand::Literal(_) => None,
    }
  }
}

impl fmt::Display for Condition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.render())
  }
}

pub fn equal(lhs: impl Into<Operand>, rhs: impl fmt::Display) -> Condition {
  Condition::new(lhs, CompareOp::Eq, rhs)
}

pub fn not_equal(lhs: impl Into<Operand>, rhs: impl fmt::Display) -> Condition {
  Condition::new(lhs, CompareOp::Ne, rhs)
}

pub fn bigger(lhs: impl Into<Operand>, rhs: impl fmt::Display) -> Condition {
  Condition::new(lhs, CompareOp::Gt, rhs)
}

pub fn smaller(lhs: impl Into<Operand>, rhs: impl fmt::Display) -> Condition {
  Condition::new(lhs, CompareOp::Lt, rhs)
}

pub fn bigger_equal(lhs: impl Into<Operand>, rhs: impl fmt::Display) -> Condition {
  Condition::new(lhs, CompareOp::Ge, rhs)
}

pub fn smaller_equal(lhs: impl Into<Operand>, rhs: impl fmt::Display) -> Condition {
  Condition::new(lhs, CompareOp::Le, rhs)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_equal_renders_step_result() {
    let out = OutputRef::result("flip-coin", "flip-coin-53");
    let cond = equal(&out, "heads");
    assert_eq!(cond.render(), "{{steps.flip-coin-53.outputs.result}} == heads");
    assert_eq!(
      cond.group_key().as_deref(),
      Some("flip-coin-53.outputs.result")
    );
  }

  #[test]
  fn test_operators() {
    let out = OutputRef::result("f", "f-1");
    assert_eq!(bigger(&out, 0.2).render(), "{{steps.f-1.outputs.result}} > 0.2");
    assert_eq!(smaller(&out, 3).op(), CompareOp::Lt);
    assert_eq!(bigger_equal(&out, 3).op(), CompareOp::Ge);
    assert_eq!(smaller_equal(&out, 3).op(), CompareOp::Le);
    assert_eq!(not_equal(&out, "x").op(), CompareOp::Ne);
  }

  #[test]
  fn test_literal_operand_has_no_group_key() {
    let cond = equal("1", 1);
    assert_eq!(cond.render(), "1 == 1");
    assert!(cond.group_key().is_none());
  }

  #[test]
  fn test_parse_operator() {
    assert_eq!(">=".parse::<CompareOp>().unwrap(), CompareOp::Ge);
    assert!(matches!(
      "=~".parse::<CompareOp>(),
      Err(CompileError::InvalidOperator(op)) if op == "=~"
    ));
  }
}
