//! Couler Compiler
//!
//! Compiles ordinary function calls into an Argo step graph. A step function
//! issues one builder call and is named after itself and the line it was
//! called from:
//!
//! ```ignore
//! #[track_caller]
//! fn flip_coin(c: &mut Compiler) -> Result<OutputRef, CompileError> {
//!   c.run_script(
//!     CallSite::caller("flip_coin"),
//!     ScriptSpec::new("python:alpine3.6").source("print('heads')"),
//!   )
//! }
//!
//! #[track_caller]
//! fn heads(c: &mut Compiler) -> Result<OutputRef, CompileError> {
//!   c.run_container(
//!     CallSite::caller("heads"),
//!     ContainerSpec::new("alpine:3.6").command(r#"echo "it was heads""#),
//!   )
//! }
//!
//! let mut c = Compiler::new(CompilerConfig::from_env());
//! let coin = flip_coin(&mut c)?;
//! c.when(equal(&coin, "heads"), |c| heads(c))?;
//! println!("{}", c.to_yaml()?);
//! ```
//!
//! Control flow maps onto step groups:
//! - each plain call opens a new group, so groups follow call order
//! - [`Compiler::when`] guards steps and groups them by the output they test
//! - [`Compiler::concurrent`] puts every branch in one group
//! - [`Compiler::map`] invokes one template over a list of items
//! - [`Compiler::exec_while`] records a body that repeats while a condition holds

mod compiler;
mod graph;
mod program;
mod spec;

pub use compiler::{Branch, Compiler};
pub use program::compile_program;
pub use spec::{ContainerSpec, JobSpec, ScriptSource, ScriptSpec};
