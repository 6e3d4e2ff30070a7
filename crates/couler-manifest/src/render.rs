use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use couler_config::ClusterConfig;
use couler_workflow::{CompiledWorkflow, Secret, Template, TemplateKind};
use serde_json::{Map, Value};
use tracing::debug;

use crate::document::{ARGO_API_VERSION, Manifest, ObjectMeta, SecretDocument, WorkflowDocument};
use crate::error::ManifestError;

/// Render a compiled workflow.
///
/// Container and script templates pass through `cluster.with_pod`, the
/// workflow spec through `cluster.with_workflow_spec`. An empty graph yields
/// no workflow document, only secrets.
pub fn render(
  workflow: &CompiledWorkflow,
  cluster: Option<&dyn ClusterConfig>,
) -> Result<Manifest, ManifestError> {
  let secrets: Vec<SecretDocument> = workflow.secrets.iter().map(secret_document).collect();

  let document = if workflow.is_empty() {
    None
  } else {
    Some(workflow_document(workflow, cluster)?)
  };

  debug!(
    workflow = %workflow.name,
    groups = workflow.groups.len(),
    templates = workflow.templates.len(),
    secrets = secrets.len(),
    "rendered manifest"
  );

  Ok(Manifest {
    secrets,
    workflow: document,
  })
}

/// Standard base64 of the UTF-8 bytes of `value`.
pub fn encode_base64(value: &str) -> String {
  STANDARD.encode(value.as_bytes())
}

fn secret_document(secret: &Secret) -> SecretDocument {
  SecretDocument {
    api_version: "v1".to_string(),
    kind: "Secret".to_string(),
    metadata: ObjectMeta {
      name: Some(secret.name().to_string()),
      generate_name: None,
    },
    secret_type: "Opaque".to_string(),
    data: secret
      .data()
      .iter()
      .map(|(key, value)| (key.clone(), encode_base64(value)))
      .collect(),
  }
}

fn workflow_document(
  workflow: &CompiledWorkflow,
  cluster: Option<&dyn ClusterConfig>,
) -> Result<WorkflowDocument, ManifestError> {
  let mut templates = Vec::with_capacity(workflow.templates.len() + 1);
  templates.push(template_value(&workflow.entrypoint())?);

  for template in &workflow.templates {
    let value = template_value(template)?;
    let value = match (template.kind(), cluster) {
      (TemplateKind::Container | TemplateKind::Script, Some(cluster)) => cluster.with_pod(value),
      _ => value,
    };
    templates.push(value);
  }

  let spec = match cluster {
    Some(cluster) => cluster.with_workflow_spec(Value::Object(Map::new())),
    None => Value::Object(Map::new()),
  };
  let Value::Object(mut spec) = spec else {
    return Err(ManifestError::InvalidSpec);
  };

  spec.insert(
    "entrypoint".to_string(),
    Value::String(workflow.name.clone()),
  );
  spec.insert("templates".to_string(), Value::Array(templates));
  if let Some(ttl) = workflow.ttl_seconds_after_finished {
    spec.insert("ttlSecondsAfterFinished".to_string(), Value::from(ttl));
  }

  Ok(WorkflowDocument {
    api_version: ARGO_API_VERSION.to_string(),
    kind: "Workflow".to_string(),
    metadata: ObjectMeta {
      name: None,
      generate_name: Some(format!("{}-", workflow.name)),
    },
    spec,
  })
}

fn template_value(template: &Template) -> Result<Value, ManifestError> {
  serde_json::to_value(template).map_err(|source| ManifestError::Json {
    what: format!("template '{}'", template.name),
    source,
  })
}

#[cfg(test)]
mod tests {
  use couler_workflow::{
    ContainerBody, StepGroup, StepInvocation, Template, TemplateBody,
  };
  use indexmap::IndexMap;
  use serde_json::json;

  use super::*;

  fn echo_template(name: &str) -> Template {
    Template::new(
      name,
      TemplateBody::Container(ContainerBody {
        image: "alpine:3.6".to_string(),
        command: vec!["bash".to_string(), "-c".to_string(), "echo".to_string()],
        args: Vec::new(),
        env: Vec::new(),
        resources: None,
      }),
    )
  }

  fn single_step_workflow() -> CompiledWorkflow {
    CompiledWorkflow {
      name: "pytest".to_string(),
      groups: vec![StepGroup::from(vec![StepInvocation::new("echo-3", "echo")])],
      templates: vec![echo_template("echo")],
      secrets: Vec::new(),
      ttl_seconds_after_finished: None,
    }
  }

  #[test]
  fn test_encode_base64() {
    assert_eq!(encode_base64("abc"), "YWJj");
    assert_eq!(encode_base64("def"), "ZGVm");
  }

  #[test]
  fn test_workflow_document_shape() {
    let manifest = render(&single_step_workflow(), None).unwrap();
    let documents = manifest.documents().unwrap();
    assert_eq!(
      documents,
      vec![json!({
        "apiVersion": "argoproj.io/v1alpha1",
        "kind": "Workflow",
        "metadata": {"generateName": "pytest-"},
        "spec": {
          "entrypoint": "pytest",
          "templates": [
            {"name": "pytest", "steps": [[{"name": "echo-3", "template": "echo"}]]},
            {
              "name": "echo",
              "container": {"image": "alpine:3.6", "command": ["bash", "-c", "echo"]},
            }
          ]
        }
      })]
    );
  }

  #[test]
  fn test_empty_workflow_renders_only_secrets() {
    let mut data = IndexMap::new();
    data.insert("passwd".to_string(), "def".to_string());
    let workflow = CompiledWorkflow {
      name: "pytest".to_string(),
      groups: Vec::new(),
      templates: Vec::new(),
      secrets: vec![Secret::new("pytest-9", data)],
      ttl_seconds_after_finished: None,
    };

    let manifest = render(&workflow, None).unwrap();
    assert!(manifest.workflow().is_none());
    assert_eq!(manifest.secrets()[0].data["passwd"], "ZGVm");
    assert_eq!(
      manifest.to_yaml().unwrap(),
      concat!(
        "apiVersion: v1\nkind: Secret\nmetadata:\n  name: pytest-9\n",
        "type: Opaque\ndata:\n  passwd: ZGVm\n---\n",
      )
    );
  }

  #[test]
  fn test_ttl_is_rendered() {
    let mut workflow = single_step_workflow();
    workflow.ttl_seconds_after_finished = Some(86400);
    let manifest = render(&workflow, None).unwrap();
    let spec = &manifest.workflow().unwrap().spec;
    assert_eq!(spec["ttlSecondsAfterFinished"], json!(86400));
  }
}
