//! Couler Config
//!
//! This crate contains the serializable inputs of the couler compiler:
//! - [`CompilerConfig`]: workflow name, cluster config location and TTL,
//!   usually taken from the `workflow_name` and `couler_cluster_config`
//!   environment variables
//! - [`ClusterConfig`]: hooks that adapt templates and the workflow spec to a
//!   particular cluster, with [`OverlayClusterConfig`] reading them from a file
//! - [`ProgramDef`]: a declarative step program, the file format of the CLI
//!
//! Files are loaded as JSON or YAML depending on their extension.

mod cluster;
mod error;
mod load;
mod program;
mod settings;

pub use cluster::{ClusterConfig, OverlayClusterConfig, merge};
pub use error::ConfigError;
pub use load::{Format, load_file};
pub use program::{
  ArgDef, ConcurrentDef, EnvDef, ProgramDef, ProgramItem, SecretDef, StepBody, StepDef, WhenDef,
};
pub use settings::{CLUSTER_CONFIG_ENV, CompilerConfig, DEFAULT_WORKFLOW_NAME, WORKFLOW_NAME_ENV};
