use couler_config::{ClusterConfig, OverlayClusterConfig};
use couler_manifest::{ManifestError, render};
use couler_workflow::{
  CompiledWorkflow, ResourceBody, ScriptBody, Secret, StepGroup, StepInvocation, Template,
  TemplateBody,
};
use indexmap::IndexMap;
use serde_json::{Map, Value, json};

fn workflow() -> CompiledWorkflow {
  let mut data = IndexMap::new();
  data.insert("uname".to_string(), "abc".to_string());

  CompiledWorkflow {
    name: "pytest".to_string(),
    groups: vec![
      StepGroup::from(vec![StepInvocation::new("flip-coin-12", "flip-coin")]),
      StepGroup::from(vec![StepInvocation::new("submit-13", "submit")]),
    ],
    templates: vec![
      Template::new(
        "flip-coin",
        TemplateBody::Script(ScriptBody {
          image: "python:alpine3.6".to_string(),
          command: vec!["python".to_string()],
          source: "print('heads')".to_string(),
          env: Vec::new(),
          resources: None,
        }),
      ),
      Template::new(
        "submit",
        TemplateBody::Resource(ResourceBody {
          action: "create".to_string(),
          set_owner_reference: "true".to_string(),
          success_condition: None,
          failure_condition: None,
          manifest: "kind: Job".to_string(),
        }),
      ),
    ],
    secrets: vec![Secret::new("pytest-9", data)],
    ttl_seconds_after_finished: None,
  }
}

fn object(value: Value) -> Map<String, Value> {
  match value {
    Value::Object(map) => map,
    _ => panic!("expected an object"),
  }
}

#[test]
fn test_secrets_precede_workflow() {
  let manifest = render(&workflow(), None).unwrap();

  let documents = manifest.documents().unwrap();
  assert_eq!(documents.len(), 2);
  assert_eq!(documents[0]["kind"], "Secret");
  assert_eq!(documents[0]["data"]["uname"], "YWJj");
  assert_eq!(documents[1]["kind"], "Workflow");

  let yaml = manifest.to_yaml().unwrap();
  let (secret, rest) = yaml.split_once("---\n").unwrap();
  assert!(secret.contains("name: pytest-9"));
  assert!(rest.starts_with("apiVersion: argoproj.io/v1alpha1\nkind: Workflow\n"));
}

#[test]
fn test_overlay_touches_only_pod_templates() {
  let overlay = OverlayClusterConfig::new(
    object(json!({"nodeSelector": {"pool": "batch"}})),
    object(json!({"serviceAccountName": "argo"})),
  )
  .unwrap();

  let manifest = render(&workflow(), Some(&overlay)).unwrap();
  let document = manifest.workflow().unwrap();
  assert_eq!(document.spec["serviceAccountName"], "argo");
  assert_eq!(document.entrypoint(), Some("pytest"));
  assert_eq!(document.steps().len(), 2);

  let templates = document.templates();
  assert_eq!(templates[0]["name"], "pytest");
  assert!(templates[0].get("nodeSelector").is_none());
  assert_eq!(templates[1]["nodeSelector"]["pool"], "batch");
  assert!(templates[2].get("nodeSelector").is_none());
}

struct BrokenSpec;

impl ClusterConfig for BrokenSpec {
  fn with_pod(&self, template: Value) -> Value {
    template
  }

  fn with_workflow_spec(&self, _spec: Value) -> Value {
    Value::Null
  }
}

#[test]
fn test_non_object_spec_is_rejected() {
  let err = render(&workflow(), Some(&BrokenSpec)).unwrap_err();
  assert!(matches!(err, ManifestError::InvalidSpec));
}
