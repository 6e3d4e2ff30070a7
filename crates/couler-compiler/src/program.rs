//! Compiling declarative step programs.

use std::collections::HashMap;

use couler_config::{ArgDef, EnvDef, ProgramDef, ProgramItem, StepBody, StepDef};
use couler_workflow::{
  Arg, Artifact, CallSite, CompareOp, CompileError, Condition, Env, OutputRef, Resources,
  SecretRef,
};
use serde_json::Value;
use tracing::debug;

use crate::compiler::{Branch, Compiler};
use crate::spec::{ContainerSpec, JobSpec, ScriptSource, ScriptSpec};

/// Replay `program` as builder calls on `compiler`.
///
/// A step without an explicit `line` is issued from its 1-based position in
/// the program; steps of a `concurrent` block share the block's line.
pub fn compile_program(compiler: &mut Compiler, program: &ProgramDef) -> Result<(), CompileError> {
  if let Some(seconds) = program.ttl_seconds_after_finished {
    compiler.set_ttl_seconds_after_finished(seconds);
  }

  let secret = program
    .secret
    .as_ref()
    .map(|def| compiler.secret_named(&def.name, def.data.clone()))
    .transpose()?;

  let mut outputs: HashMap<String, OutputRef> = HashMap::new();
  for (index, item) in program.steps.iter().enumerate() {
    let line = u32::try_from(index + 1).unwrap_or(u32::MAX);
    match item {
      ProgramItem::Step(def) => {
        if let Some(out) = compile_step(compiler, def, line, secret.as_ref(), &outputs)? {
          outputs.insert(def.name.clone(), out);
        }
      }
      ProgramItem::Concurrent(block) => {
        let line = block.line.unwrap_or(line);
        let branches: Vec<Branch<'_, Option<OutputRef>>> = block
          .concurrent
          .iter()
          .map(|def| {
            let secret = secret.as_ref();
            let outputs = &outputs;
            Box::new(move |c: &mut Compiler| compile_step(c, def, line, secret, outputs))
              as Branch<'_, Option<OutputRef>>
          })
          .collect();

        let results = compiler.concurrent_at(line, branches)?;
        for (def, out) in block.concurrent.iter().zip(results) {
          if let Some(out) = out {
            outputs.insert(def.name.clone(), out);
          }
        }
      }
    }
  }

  debug!(
    workflow = %compiler.workflow_name(),
    items = program.steps.len(),
    "compiled program"
  );
  Ok(())
}

fn compile_step(
  compiler: &mut Compiler,
  def: &StepDef,
  line: u32,
  secret: Option<&SecretRef>,
  outputs: &HashMap<String, OutputRef>,
) -> Result<Option<OutputRef>, CompileError> {
  let site = CallSite::new(&def.name, def.line.unwrap_or(line));

  let Some(when) = &def.when else {
    return run_step(compiler, site, &def.body, secret, outputs);
  };

  let op: CompareOp = when.op.parse()?;
  let condition = Condition::new(lookup(outputs, &when.step)?, op, plain(&when.value));
  compiler.when(condition, |c| run_step(c, site, &def.body, secret, outputs))
}

fn run_step(
  compiler: &mut Compiler,
  site: CallSite,
  body: &StepBody,
  secret: Option<&SecretRef>,
  outputs: &HashMap<String, OutputRef>,
) -> Result<Option<OutputRef>, CompileError> {
  match body {
    StepBody::Container {
      image,
      command,
      args,
      env,
      resources,
      use_secret,
      output,
    } => {
      let args = args
        .iter()
        .map(|arg| match arg {
          ArgDef::From { from } => lookup(outputs, from).map(Arg::Output),
          ArgDef::Value(value) => Ok(Arg::Literal(value.clone())),
        })
        .collect::<Result<Vec<_>, _>>()?;

      let secret = match (use_secret, secret) {
        (true, None) => {
          return Err(CompileError::MissingSecret {
            step: site.invocation_name(),
          });
        }
        (true, Some(secret)) => Some(secret.clone()),
        (false, _) => None,
      };

      let spec = ContainerSpec {
        image: image.clone(),
        command: command.clone(),
        args,
        env: env_of(env)?,
        secret,
        resources: resources.clone().map(Resources::uniform),
        output: output
          .as_ref()
          .map(|path| Artifact::new(site.line(), path.clone())),
      };
      compiler.run_container(site, spec).map(Some)
    }
    StepBody::Script {
      image,
      command,
      source,
      env,
      resources,
    } => {
      let spec = ScriptSpec {
        image: image.clone(),
        command: command.clone(),
        source: Some(ScriptSource::Inline(source.clone())),
        env: env_of(env)?,
        resources: resources.clone().map(Resources::uniform),
      };
      compiler.run_script(site, spec).map(Some)
    }
    StepBody::Job {
      manifest,
      success_condition,
      failure_condition,
    } => {
      let spec = JobSpec {
        manifest: manifest.clone(),
        success_condition: success_condition.clone(),
        failure_condition: failure_condition.clone(),
      };
      compiler.run_job(site, spec).map(|()| None)
    }
  }
}

fn env_of(def: &EnvDef) -> Result<Env, CompileError> {
  match def {
    EnvDef::Map(vars) => Ok(vars.iter().map(|(name, value)| (name, plain(value))).collect()),
    EnvDef::Lists { names, values } => {
      let values: Vec<String> = values.iter().map(plain).collect();
      Env::from_pairs(names.as_slice(), values.as_slice())
    }
  }
}

/// Strings as-is, anything else as JSON text.
fn plain(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

fn lookup(outputs: &HashMap<String, OutputRef>, step: &str) -> Result<OutputRef, CompileError> {
  outputs
    .get(step)
    .cloned()
    .ok_or_else(|| CompileError::UnknownStep(step.to_string()))
}
