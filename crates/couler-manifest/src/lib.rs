//! Couler Manifest
//!
//! Renders a [`CompiledWorkflow`](couler_workflow::CompiledWorkflow) into the
//! documents the Argo engine consumes:
//!
//! ```text
//! <Secret document>            one per registered secret, in order
//! ---
//! <Secret document>
//! ---
//! apiVersion: argoproj.io/v1alpha1
//! kind: Workflow
//! metadata:
//!   generateName: <workflow>-
//! spec:
//!   entrypoint: <workflow>
//!   templates:
//!   - name: <workflow>         synthetic steps template
//!     steps: [[...], [...]]    one inner list per step group
//!   - name: <template>         every registered template, in order
//! ```
//!
//! Rendering is deterministic: the same compiled workflow always produces
//! byte-identical YAML.

mod document;
mod error;
mod render;

pub use document::{
  ARGO_API_VERSION, Manifest, ObjectMeta, SecretDocument, WorkflowDocument,
};
pub use error::ManifestError;
pub use render::{encode_base64, render};
