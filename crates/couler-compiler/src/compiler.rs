use std::fmt;
use std::panic::Location;

use couler_config::{ClusterConfig, CompilerConfig, ConfigError, DEFAULT_WORKFLOW_NAME};
use couler_manifest::{Manifest, ManifestError};
use couler_workflow::{
  Arg, Arguments, Artifact, CallSite, CompareOp, CompileError, CompiledWorkflow, Condition,
  ContainerBody, InputParameter, Inputs, OutputKind, OutputParameter, OutputRef, Outputs,
  Parameter, ResourceBody, ScriptBody, Secret, SecretRef, StepGroup, StepInvocation, Template,
  TemplateBody, ValueFrom, WithItem, input_parameter, invocation_name, sanitize, validate_name,
};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::graph::{Graph, Groups, Scope};
use crate::spec::{ContainerSpec, JobSpec, ScriptSpec};

/// One branch of [`Compiler::concurrent`].
pub type Branch<'a, T> = Box<dyn FnOnce(&mut Compiler) -> Result<T, CompileError> + 'a>;

/// State of one compile pass.
///
/// Builder calls mutate the compiler in program order. Nothing runs: every
/// call registers a template (once per logical name) and records a step
/// invoking it. [`Compiler::render`] turns the result into manifests.
pub struct Compiler {
  config: CompilerConfig,
  workflow_name: String,
  cluster: Option<Box<dyn ClusterConfig>>,
  templates: IndexMap<String, Template>,
  graph: Graph,
  secrets: Vec<Secret>,
  ttl_seconds_after_finished: Option<u64>,
}

impl Compiler {
  pub fn new(config: CompilerConfig) -> Self {
    let mut workflow_name = sanitize(config.workflow_name.trim());
    if workflow_name.is_empty() {
      workflow_name = DEFAULT_WORKFLOW_NAME.to_string();
    }

    Self {
      ttl_seconds_after_finished: config.ttl_seconds_after_finished,
      config,
      workflow_name,
      cluster: None,
      templates: IndexMap::new(),
      graph: Graph::default(),
      secrets: Vec::new(),
    }
  }

  /// Build a compiler and attach the cluster config file named in `config`.
  pub fn load(config: CompilerConfig) -> Result<Self, ConfigError> {
    let cluster = config.load_cluster_config()?;
    let compiler = Self::new(config);
    Ok(match cluster {
      Some(cluster) => compiler.with_cluster_config(cluster),
      None => compiler,
    })
  }

  pub fn with_cluster_config(mut self, cluster: impl ClusterConfig + 'static) -> Self {
    self.cluster = Some(Box::new(cluster));
    self
  }

  pub fn workflow_name(&self) -> &str {
    &self.workflow_name
  }

  /// Call site for a builder call made outside any step function.
  ///
  /// Named after the workflow and the calling line, so a step issued from
  /// line 12 of workflow `pytest` is `pytest-12-12`.
  #[track_caller]
  pub fn top_level(&self) -> CallSite {
    let line = Location::caller().line();
    CallSite::new(invocation_name(&self.workflow_name, line), line)
  }

  /// File at `path` published as an output parameter named after the
  /// calling line.
  #[track_caller]
  pub fn artifact(&self, path: impl Into<String>) -> Artifact {
    Artifact::new(Location::caller().line(), path)
  }

  pub fn set_ttl_seconds_after_finished(&mut self, seconds: u64) {
    self.ttl_seconds_after_finished = Some(seconds);
  }

  /// Add a container step.
  ///
  /// The returned reference names the step's output parameter: the declared
  /// artifact if there is one, `output-id-<line>` otherwise.
  pub fn run_container(
    &mut self,
    site: CallSite,
    spec: ContainerSpec,
  ) -> Result<OutputRef, CompileError> {
    site.validate()?;
    let name = site.name().to_string();
    if spec.image.trim().is_empty() {
      return Err(CompileError::MissingImage { template: name });
    }

    let values = spec
      .args
      .iter()
      .enumerate()
      .map(|(position, arg)| arg.render(&name, position))
      .collect::<Result<Vec<_>, _>>()?;

    let template = self.register(&name, || container_template(&name, &spec));
    let output_id = template
      .output_parameter()
      .map(str::to_string)
      .unwrap_or_else(|| format!("output-id-{}", site.line()));

    let parameters = values
      .into_iter()
      .enumerate()
      .map(|(position, value)| Parameter {
        name: input_parameter(&name, position),
        value,
      })
      .collect();

    let mut step = StepInvocation::new(site.invocation_name(), name.as_str());
    step.arguments = Arguments::from_parameters(parameters);
    let step = self.record(step);

    Ok(OutputRef::parameter(name, step, output_id))
  }

  /// Add a script step. Its standard output is the step's result.
  pub fn run_script(
    &mut self,
    site: CallSite,
    spec: ScriptSpec,
  ) -> Result<OutputRef, CompileError> {
    site.validate()?;
    let name = site.name().to_string();
    let Some(source) = spec.rendered_source() else {
      return Err(CompileError::MissingSource { template: name });
    };
    if spec.image.trim().is_empty() {
      return Err(CompileError::MissingImage { template: name });
    }

    self.register(&name, || {
      Template::new(
        name.as_str(),
        TemplateBody::Script(ScriptBody {
          image: spec.image.clone(),
          command: vec![spec.command_or_default().to_string()],
          source,
          env: spec.env.render(),
          resources: spec.resources.clone(),
        }),
      )
    });

    let step = self.record(StepInvocation::new(site.invocation_name(), name.as_str()));
    Ok(OutputRef::result(name, step))
  }

  /// Add a step that creates a Kubernetes resource, typically a batch Job.
  pub fn run_job(&mut self, site: CallSite, spec: JobSpec) -> Result<(), CompileError> {
    site.validate()?;
    let name = site.name().to_string();
    if spec.manifest.trim().is_empty() {
      return Err(CompileError::MissingManifest { template: name });
    }

    self.register(&name, || {
      Template::new(
        name.as_str(),
        TemplateBody::Resource(ResourceBody {
          action: "create".to_string(),
          set_owner_reference: "true".to_string(),
          success_condition: spec.success_condition.clone(),
          failure_condition: spec.failure_condition.clone(),
          manifest: spec.manifest.clone(),
        }),
      )
    });

    self.record(StepInvocation::new(site.invocation_name(), name.as_str()));
    Ok(())
  }

  /// Run `body`, guarding every step it adds with `condition`.
  ///
  /// Steps guarded on the same output share one group, so consecutive
  /// `when` calls on one result become alternative branches. Inside a
  /// `concurrent` block the steps stay in the block's group.
  #[track_caller]
  pub fn when<T, F>(&mut self, condition: Condition, body: F) -> Result<T, CompileError>
  where
    F: FnOnce(&mut Compiler) -> Result<T, CompileError>,
  {
    let line = Location::caller().line();
    let key = condition
      .group_key()
      .unwrap_or_else(|| format!("when-{line}"));

    self.graph.enter(Scope::Conditional {
      when: condition.render(),
      key,
    });
    let result = body(self);
    self.graph.exit();
    result
  }

  /// Run every branch, placing all their steps in one group the engine runs
  /// in parallel. Returns the branch results in order.
  #[track_caller]
  pub fn concurrent<T>(&mut self, branches: Vec<Branch<'_, T>>) -> Result<Vec<T>, CompileError> {
    let line = Location::caller().line();
    self.concurrent_at(line, branches)
  }

  /// [`Compiler::concurrent`] with an explicit call line. Steps are named
  /// `<template>-<line>`.
  pub fn concurrent_at<T>(
    &mut self,
    line: u32,
    branches: Vec<Branch<'_, T>>,
  ) -> Result<Vec<T>, CompileError> {
    if branches.is_empty() {
      return Err(CompileError::EmptyConcurrent);
    }

    let key = self.graph.fresh_key(&format!("concurrent-{line}"));
    self.graph.enter(Scope::Concurrent { key, line });
    let results = branches
      .into_iter()
      .map(|branch| branch(self))
      .collect::<Result<Vec<_>, _>>();
    self.graph.exit();
    results
  }

  /// Fan `f` out over `items`.
  ///
  /// `f` is called once, with the first item, only to learn which template
  /// it registers. A single step then invokes that template with one
  /// `withItems` row per item; an array item supplies one value per input
  /// parameter.
  pub fn map<F>(&mut self, items: Vec<Value>, f: F) -> Result<OutputRef, CompileError>
  where
    F: FnOnce(&mut Compiler, &Value) -> Result<OutputRef, CompileError>,
  {
    let Some(first) = items.first() else {
      return Err(CompileError::EmptyMap);
    };

    self.graph.enter(Scope::Symbolic);
    let inner = f(self, first);
    self.graph.exit();
    let inner = inner?;

    let template_name = inner.template().to_string();
    let params: Vec<String> = self
      .templates
      .get(&template_name)
      .ok_or_else(|| CompileError::UnknownTemplate(template_name.clone()))?
      .input_names()
      .into_iter()
      .map(str::to_string)
      .collect();
    if params.is_empty() {
      return Err(CompileError::MapWithoutInputs {
        template: template_name,
      });
    }

    let rows = items
      .iter()
      .enumerate()
      .map(|(index, item)| {
        let values = match item {
          Value::Array(values) => values.clone(),
          other => vec![other.clone()],
        };
        if values.len() != params.len() {
          return Err(CompileError::ItemArity {
            template: template_name.clone(),
            index,
            expected: params.len(),
            actual: values.len(),
          });
        }
        Ok(params.iter().cloned().zip(values).collect::<WithItem>())
      })
      .collect::<Result<Vec<_>, _>>()?;

    let parameters = params
      .iter()
      .enumerate()
      .map(|(position, param)| {
        Ok(Parameter {
          name: param.clone(),
          value: Arg::Item(param.clone()).render(&template_name, position)?,
        })
      })
      .collect::<Result<Vec<_>, CompileError>>()?;

    let mut step = StepInvocation::new(inner.step(), template_name.as_str());
    step.arguments = Arguments::from_parameters(parameters);
    step.with_items = Some(rows);
    let step = self.record(step);

    Ok(match inner.kind() {
      OutputKind::Result => OutputRef::result(template_name, step),
      OutputKind::Parameter(param) => OutputRef::parameter(template_name, step, param.clone()),
    })
  }

  /// Repeat the steps of `body` until the result of the step it returns no
  /// longer satisfies `<result> <op> <value>`.
  ///
  /// The body is recorded into a steps template `exec-while-<template>` that
  /// ends with a guarded call to itself.
  pub fn exec_while<F>(
    &mut self,
    op: CompareOp,
    value: impl fmt::Display,
    body: F,
  ) -> Result<(), CompileError>
  where
    F: FnOnce(&mut Compiler) -> Result<OutputRef, CompileError>,
  {
    self.graph.enter(Scope::Recording {
      groups: Groups::new(),
    });
    let result = body(self);
    let recorded = match self.graph.exit() {
      Some(Scope::Recording { groups }) => groups,
      _ => Groups::new(),
    };
    let out = result?;

    let name = format!("exec-while-{}", out.template());
    if self.templates.contains_key(&name) {
      return Err(CompileError::DuplicateRecursion { template: name });
    }

    let mut exit = StepInvocation::new(format!("{name}-exit"), name.as_str());
    exit.when = Some(Condition::new(&out, op, value).render());

    let mut groups: Vec<StepGroup> = recorded.into_values().collect();
    groups.push(StepGroup::from(vec![exit]));
    self.register(&name, || Template::new(name.as_str(), TemplateBody::Steps(groups)));

    self.record(StepInvocation::new(
      format!("exec-while-{}", out.step()),
      name.as_str(),
    ));
    Ok(())
  }

  /// Register a secret named after `site`.
  pub fn secret(
    &mut self,
    site: CallSite,
    data: IndexMap<String, String>,
  ) -> Result<SecretRef, CompileError> {
    self.secret_named(site.invocation_name(), data)
  }

  /// Register a secret under an explicit name. A taken name gets a numeric
  /// suffix.
  pub fn secret_named(
    &mut self,
    name: impl AsRef<str>,
    data: IndexMap<String, String>,
  ) -> Result<SecretRef, CompileError> {
    let base = sanitize(name.as_ref());
    validate_name(&base)?;

    let mut name = base.clone();
    let mut suffix = 1;
    while self.secrets.iter().any(|secret| secret.name() == name) {
      suffix += 1;
      name = invocation_name(&base, suffix);
    }
    if name != base {
      warn!(secret = %base, renamed = %name, "secret name already taken");
    }

    let secret = Secret::new(name, data);
    debug!(secret = %secret.name(), keys = secret.data().len(), "registered secret");
    let reference = secret.reference();
    self.secrets.push(secret);
    Ok(reference)
  }

  /// Clear everything recorded so far.
  pub fn reset(&mut self) {
    self.templates.clear();
    self.graph = Graph::default();
    self.secrets.clear();
    self.ttl_seconds_after_finished = self.config.ttl_seconds_after_finished;
  }

  pub fn templates(&self) -> impl ExactSizeIterator<Item = &Template> {
    self.templates.values()
  }

  pub fn template(&self, name: &str) -> Option<&Template> {
    self.templates.get(name)
  }

  /// Top-level step groups in order.
  pub fn groups(&self) -> Vec<&StepGroup> {
    self.graph.groups().collect()
  }

  pub fn secrets(&self) -> &[Secret] {
    &self.secrets
  }

  pub fn snapshot(&self) -> CompiledWorkflow {
    CompiledWorkflow {
      name: self.workflow_name.clone(),
      groups: self.graph.groups().cloned().collect(),
      templates: self.templates.values().cloned().collect(),
      secrets: self.secrets.clone(),
      ttl_seconds_after_finished: self.ttl_seconds_after_finished,
    }
  }

  pub fn render(&self) -> Result<Manifest, ManifestError> {
    couler_manifest::render(&self.snapshot(), self.cluster.as_deref())
  }

  pub fn to_yaml(&self) -> Result<String, ManifestError> {
    self.render()?.to_yaml()
  }

  fn register(&mut self, name: &str, build: impl FnOnce() -> Template) -> &Template {
    self.templates.entry(name.to_string()).or_insert_with(|| {
      let template = build();
      debug!(template = %name, kind = ?template.kind(), "registered template");
      template
    })
  }

  /// Record `step` where the current scopes place it and return its final
  /// name. Symbolic scopes record nothing and reserve no name.
  fn record(&mut self, mut step: StepInvocation) -> String {
    let placement = self.graph.placement();
    if let Some(line) = placement.concurrent_line {
      step.name = invocation_name(&step.template, line);
    }
    if placement.symbolic {
      return step.name;
    }

    step.name = self.graph.reserve(&step.name);
    step.when = placement.when;
    let key = placement
      .key
      .unwrap_or_else(|| self.graph.fresh_key(&step.name));

    debug!(step = %step.name, template = %step.template, group = %key, "recorded step");
    let name = step.name.clone();
    self.graph.push(key, step);
    name
  }
}

fn container_template(name: &str, spec: &ContainerSpec) -> Template {
  let inputs: Vec<InputParameter> = (0..spec.args.len())
    .map(|position| InputParameter {
      name: input_parameter(name, position),
    })
    .collect();

  let mut command = vec!["bash".to_string(), "-c".to_string()];
  command.extend(spec.command.iter().cloned());

  let args = inputs
    .iter()
    .map(|param| format!("\"{{{{inputs.parameters.{}}}}}\"", param.name))
    .collect();

  let env = match &spec.secret {
    Some(secret) => spec.env.clone().secret(secret),
    None => spec.env.clone(),
  };

  let mut template = Template::new(
    name,
    TemplateBody::Container(ContainerBody {
      image: spec.image.clone(),
      command,
      args,
      env: env.render(),
      resources: spec.resources.clone(),
    }),
  );
  if !inputs.is_empty() {
    template.inputs = Some(Inputs { parameters: inputs });
  }
  if let Some(artifact) = &spec.output {
    template.outputs = Some(Outputs {
      parameters: vec![OutputParameter {
        name: artifact.id().to_string(),
        value_from: ValueFrom {
          path: artifact.path().to_string(),
        },
      }],
    });
  }
  template
}

#[cfg(test)]
mod tests {
  use couler_workflow::TemplateKind;

  use super::*;

  fn compiler() -> Compiler {
    Compiler::new(CompilerConfig::new("pytest"))
  }

  #[test]
  fn test_workflow_name_is_sanitized() {
    assert_eq!(
      Compiler::new(CompilerConfig::new("sqlflow_job.v1")).workflow_name(),
      "sqlflow-job-v1"
    );
    assert_eq!(Compiler::new(CompilerConfig::new("  ")).workflow_name(), "couler");
  }

  #[test]
  fn test_top_level_site() {
    let c = compiler();
    let line = line!() + 1;
    let site = c.top_level();
    assert_eq!(site.name(), format!("pytest-{line}"));
    assert_eq!(site.line(), line);
  }

  #[test]
  fn test_container_template_shape() {
    let mut c = compiler();
    let spec = ContainerSpec::new("docker/whalesay")
      .command("cowsay")
      .arg("hello")
      .output(Artifact::new(7, "/tmp/out"));
    let out = c.run_container(CallSite::new("whalesay", 9), spec).unwrap();

    assert_eq!(out.step(), "whalesay-9");
    assert_eq!(
      out.expression(),
      "{{steps.whalesay-9.outputs.parameters.output-id-7}}"
    );

    let template = c.template("whalesay").unwrap();
    assert_eq!(template.kind(), TemplateKind::Container);
    assert_eq!(template.input_names(), vec!["para-whalesay-0"]);
    let TemplateBody::Container(body) = &template.body else {
      panic!("expected a container body");
    };
    assert_eq!(body.command, vec!["bash", "-c", "cowsay"]);
    assert_eq!(body.args, vec!["\"{{inputs.parameters.para-whalesay-0}}\""]);
  }

  #[test]
  fn test_default_output_id_uses_call_line() {
    let mut c = compiler();
    let out = c
      .run_container(CallSite::new("echo", 12), ContainerSpec::new("alpine"))
      .unwrap();
    assert_eq!(out.key(), "echo-12.outputs.parameters.output-id-12");
  }

  #[test]
  fn test_missing_bodies_are_errors() {
    let mut c = compiler();
    assert!(matches!(
      c.run_container(CallSite::new("a", 1), ContainerSpec::new("")),
      Err(CompileError::MissingImage { .. })
    ));
    assert!(matches!(
      c.run_script(CallSite::new("b", 2), ScriptSpec::new("python")),
      Err(CompileError::MissingSource { .. })
    ));
    assert!(matches!(
      c.run_job(CallSite::new("c", 3), JobSpec::new("")),
      Err(CompileError::MissingManifest { .. })
    ));
    assert!(c.groups().is_empty());
    assert_eq!(c.templates().len(), 0);
  }

  #[test]
  fn test_unsupported_argument_fails_at_call() {
    let mut c = compiler();
    let spec = ContainerSpec::new("alpine").arg(Value::Null);
    let err = c.run_container(CallSite::new("echo", 1), spec).unwrap_err();
    assert!(matches!(
      err,
      CompileError::UnsupportedValue {
        position: 0,
        kind: "null",
        ..
      }
    ));
    assert_eq!(c.templates().len(), 0);
  }

  #[test]
  fn test_reset_clears_state() {
    let mut c = Compiler::new(CompilerConfig::new("pytest").with_ttl_seconds_after_finished(30));
    c.set_ttl_seconds_after_finished(60);
    c.run_script(CallSite::new("gen", 1), ScriptSpec::new("python").source("print(1)"))
      .unwrap();
    c.secret_named("creds", IndexMap::new()).unwrap();

    c.reset();
    assert!(c.groups().is_empty());
    assert_eq!(c.templates().len(), 0);
    assert!(c.secrets().is_empty());
    assert_eq!(c.snapshot().ttl_seconds_after_finished, Some(30));

    // Names are free again after a reset.
    let out = c
      .run_script(CallSite::new("gen", 1), ScriptSpec::new("python").source("print(1)"))
      .unwrap();
    assert_eq!(out.step(), "gen-1");
  }

  #[test]
  fn test_secret_names_are_unique() {
    let mut c = compiler();
    let a = c.secret_named("db_creds", IndexMap::new()).unwrap();
    let b = c.secret_named("db_creds", IndexMap::new()).unwrap();
    assert_eq!(a.name(), "db-creds");
    assert_eq!(b.name(), "db-creds-2");
    assert!(matches!(
      c.secret_named("-bad", IndexMap::new()),
      Err(CompileError::InvalidName { .. })
    ));
  }
}
