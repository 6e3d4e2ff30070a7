//! Loading configuration and programs from disk.

use std::fs;

use couler_config::{
  ClusterConfig, CompilerConfig, ConfigError, OverlayClusterConfig, ProgramDef, ProgramItem,
  StepBody, load_file,
};
use serde_json::json;

#[test]
fn test_load_program_json() {
  let dir = tempfile::tempdir().expect("failed to create temp dir");
  let path = dir.path().join("program.json");
  fs::write(
    &path,
    json!({
      "name": "iris_train",
      "steps": [
        {
          "name": "select",
          "kind": "container",
          "image": "sqlflow/sqlflow",
          "command": ["repl -e \"SELECT 1\""],
          "env": {"SQLFLOW_DATASOURCE": "mysql://root@127.0.0.1"}
        }
      ]
    })
    .to_string(),
  )
  .expect("failed to write program");

  let program: ProgramDef = load_file(&path).unwrap();
  assert_eq!(program.name.as_deref(), Some("iris_train"));
  let ProgramItem::Step(step) = &program.steps[0] else {
    panic!("expected a step");
  };
  let StepBody::Container { image, env, .. } = &step.body else {
    panic!("expected a container step");
  };
  assert_eq!(image, "sqlflow/sqlflow");
  assert_eq!(env["SQLFLOW_DATASOURCE"], "mysql://root@127.0.0.1");
}

#[test]
fn test_load_cluster_config_yaml() {
  let dir = tempfile::tempdir().expect("failed to create temp dir");
  let path = dir.path().join("cluster.yaml");
  fs::write(
    &path,
    "pod:\n  nodeSelector:\n    pool: batch\nworkflow_spec:\n  serviceAccountName: argo\n",
  )
  .expect("failed to write cluster config");

  let config = CompilerConfig::new("wf").with_cluster_config(&path);
  let cluster: OverlayClusterConfig = config.load_cluster_config().unwrap().unwrap();

  let template = cluster.with_pod(json!({"name": "step", "container": {"image": "a"}}));
  assert_eq!(template["nodeSelector"], json!({"pool": "batch"}));
  assert_eq!(
    cluster.with_workflow_spec(json!({"ttlSecondsAfterFinished": 5})),
    json!({"ttlSecondsAfterFinished": 5, "serviceAccountName": "argo"})
  );
}

#[test]
fn test_load_errors() {
  let dir = tempfile::tempdir().expect("failed to create temp dir");

  let missing = dir.path().join("missing.yaml");
  assert!(matches!(
    load_file::<ProgramDef>(&missing),
    Err(ConfigError::Read { .. })
  ));

  let broken = dir.path().join("broken.json");
  fs::write(&broken, "{not json").expect("failed to write file");
  assert!(matches!(
    load_file::<ProgramDef>(&broken),
    Err(ConfigError::Json { .. })
  ));

  let wrong_ext = dir.path().join("program.toml");
  fs::write(&wrong_ext, "").expect("failed to write file");
  assert!(matches!(
    load_file::<ProgramDef>(&wrong_ext),
    Err(ConfigError::UnsupportedFormat { .. })
  ));
}
