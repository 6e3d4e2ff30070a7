//! Couler Workflow
//!
//! This crate provides the compiled representation of a couler workflow: the
//! reusable step definitions (templates), the ordered step groups that invoke
//! them, and the symbolic handles that wire one step's output into another.
//!
//! Nothing here runs a step. Every value is a description that the Argo
//! engine resolves later:
//! - [`Template`] is what to run (container, script, raw resource or steps)
//! - [`StepInvocation`] is one use of a template at a position in the graph
//! - [`StepGroup`] is a set of invocations the engine runs in parallel
//! - [`OutputRef`] points at a step's eventual result or output parameter
//!
//! The [`CompiledWorkflow`] snapshot ties them together and is the input of
//! the manifest serializer.

mod binding;
mod condition;
mod error;
mod identity;
mod output;
mod secret;
mod step;
mod template;
mod workflow;

pub use binding::{Arg, Env, EnvSource, EnvValue, EnvVar, SecretKeyRef};
pub use condition::{
  CompareOp, Condition, Operand, bigger, bigger_equal, equal, not_equal, smaller, smaller_equal,
};
pub use error::CompileError;
pub use identity::{CallSite, input_parameter, invocation_name, sanitize, validate_name};
pub use output::{Artifact, OutputKind, OutputRef};
pub use secret::{Secret, SecretRef};
pub use step::{Arguments, Parameter, StepGroup, StepInvocation, WithItem};
pub use template::{
  ContainerBody, InputParameter, Inputs, OutputParameter, Outputs, Resources, ResourceBody,
  ScriptBody, Template, TemplateBody, TemplateKind, ValueFrom,
};
pub use workflow::CompiledWorkflow;
