//! Step bodies handed to the compiler.

use couler_workflow::{Arg, Artifact, Env, Resources, SecretRef};
use indexmap::IndexMap;

/// A container step: `bash -c <command> <args...>` in `image`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerSpec {
  pub image: String,
  pub command: Vec<String>,
  pub args: Vec<Arg>,
  pub env: Env,
  /// Every key of this secret is exposed as an env variable.
  pub secret: Option<SecretRef>,
  pub resources: Option<Resources>,
  /// File published as the step's output parameter.
  pub output: Option<Artifact>,
}

impl ContainerSpec {
  pub fn new(image: impl Into<String>) -> Self {
    Self {
      image: image.into(),
      ..Self::default()
    }
  }

  pub fn command(mut self, command: impl Into<String>) -> Self {
    self.command.push(command.into());
    self
  }

  pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn env(mut self, env: Env) -> Self {
    self.env.extend(env);
    self
  }

  pub fn secret(mut self, secret: &SecretRef) -> Self {
    self.secret = Some(secret.clone());
    self
  }

  /// Request and limit the same `amounts`, e.g. `{"cpu": "1", "memory": "1Gi"}`.
  pub fn resources(mut self, amounts: IndexMap<String, serde_json::Value>) -> Self {
    self.resources = Some(Resources::uniform(amounts));
    self
  }

  pub fn output(mut self, artifact: Artifact) -> Self {
    self.output = Some(artifact);
    self
  }
}

/// Where a script step's source comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
  /// Used verbatim.
  Inline(String),
  /// A whole function definition. For `python` scripts only the body after
  /// the signature is kept, dedented.
  PythonFunction(String),
}

/// A script step: `source` fed to `command` in `image`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptSpec {
  pub image: String,
  /// Defaults to `python`.
  pub command: Option<String>,
  pub source: Option<ScriptSource>,
  pub env: Env,
  pub resources: Option<Resources>,
}

impl ScriptSpec {
  pub fn new(image: impl Into<String>) -> Self {
    Self {
      image: image.into(),
      ..Self::default()
    }
  }

  pub fn command(mut self, command: impl Into<String>) -> Self {
    self.command = Some(command.into());
    self
  }

  pub fn source(mut self, source: impl Into<String>) -> Self {
    self.source = Some(ScriptSource::Inline(source.into()));
    self
  }

  pub fn python_function(mut self, definition: impl Into<String>) -> Self {
    self.source = Some(ScriptSource::PythonFunction(definition.into()));
    self
  }

  pub fn env(mut self, env: Env) -> Self {
    self.env.extend(env);
    self
  }

  pub fn resources(mut self, amounts: IndexMap<String, serde_json::Value>) -> Self {
    self.resources = Some(Resources::uniform(amounts));
    self
  }

  pub(crate) fn command_or_default(&self) -> &str {
    self.command.as_deref().unwrap_or("python")
  }

  /// The text placed in the template, `None` when there is nothing to run.
  pub(crate) fn rendered_source(&self) -> Option<String> {
    let text = match self.source.as_ref()? {
      ScriptSource::Inline(text) => text.clone(),
      ScriptSource::PythonFunction(text)
        if self.command_or_default().eq_ignore_ascii_case("python") =>
      {
        function_body(text)
      }
      ScriptSource::PythonFunction(text) => text.clone(),
    };
    if text.trim().is_empty() {
      None
    } else {
      Some(text)
    }
  }
}

/// A Kubernetes resource the engine creates and watches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSpec {
  pub manifest: String,
  pub success_condition: Option<String>,
  pub failure_condition: Option<String>,
}

impl JobSpec {
  pub fn new(manifest: impl Into<String>) -> Self {
    Self {
      manifest: manifest.into(),
      ..Self::default()
    }
  }

  pub fn success_condition(mut self, condition: impl Into<String>) -> Self {
    self.success_condition = Some(condition.into());
    self
  }

  pub fn failure_condition(mut self, condition: impl Into<String>) -> Self {
    self.failure_condition = Some(condition.into());
    self
  }
}

/// Everything after the signature of a function definition, dedented.
/// A comment trailing the signature line is dropped.
fn function_body(definition: &str) -> String {
  let rest = &definition[signature_end(definition).unwrap_or(0)..];
  let rest = match rest.find('\n') {
    Some(newline) if is_blank_or_comment(&rest[..newline]) => &rest[newline..],
    _ => rest,
  };
  dedent(rest)
}

/// Byte offset just past the `:` closing the signature: the first one outside
/// brackets, string literals and comments.
fn signature_end(definition: &str) -> Option<usize> {
  let mut depth = 0usize;
  let mut quote: Option<char> = None;
  let mut comment = false;
  let mut chars = definition.char_indices();

  while let Some((i, c)) = chars.next() {
    if comment {
      comment = c != '\n';
      continue;
    }
    if let Some(open) = quote {
      if c == '\\' {
        chars.next();
      } else if c == open {
        quote = None;
      }
      continue;
    }
    match c {
      '#' => comment = true,
      '\'' | '"' => quote = Some(c),
      '(' | '[' | '{' => depth += 1,
      ')' | ']' | '}' => depth = depth.saturating_sub(1),
      ':' if depth == 0 => return Some(i + 1),
      _ => {}
    }
  }
  None
}

fn is_blank_or_comment(line: &str) -> bool {
  let line = line.trim();
  line.is_empty() || line.starts_with('#')
}

/// Remove the whitespace margin common to all non-blank lines.
/// Blank lines keep only their newline.
fn dedent(text: &str) -> String {
  let indent = |line: &str| line.len() - line.trim_start_matches([' ', '\t']).len();
  let margin = text
    .lines()
    .filter(|line| !line.trim().is_empty())
    .map(indent)
    .min()
    .unwrap_or(0);

  let mut out = String::with_capacity(text.len());
  for line in text.split_inclusive('\n') {
    let (body, newline) = match line.strip_suffix('\n') {
      Some(body) => (body, "\n"),
      None => (line, ""),
    };
    if !body.trim().is_empty() {
      out.push_str(&body[margin..]);
    }
    out.push_str(newline);
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_function_body_strips_signature_and_dedents() {
    let definition = "def setUp(self):\n        couler._cleanup()\n";
    assert_eq!(function_body(definition), "\ncouler._cleanup()\n");
  }

  #[test]
  fn test_function_body_with_annotations() {
    let definition = "def gen(n: int) -> str:\n    x = n\n\n    if x:\n        print(x)\n";
    assert_eq!(function_body(definition), "\nx = n\n\nif x:\n    print(x)\n");
  }

  #[test]
  fn test_function_body_keeps_body_after_commented_signature() {
    let definition = "def gen():  # entry\n    if True:\n        print(1)\n";
    assert_eq!(function_body(definition), "\nif True:\n    print(1)\n");

    let trailing = "def gen():   \n    if True:\n        print(1)\n";
    assert_eq!(function_body(trailing), "\nif True:\n    print(1)\n");
  }

  #[test]
  fn test_function_body_skips_colons_in_signature() {
    let definition = concat!(
      "def gen(\n",
      "    n: int = 1,\n",
      "    key=lambda v: v,\n",
      "    sep: str = \":\",\n",
      ") -> dict:\n",
      "  return {n: sep}\n",
    );
    assert_eq!(function_body(definition), "\nreturn {n: sep}\n");
  }

  #[test]
  fn test_function_body_single_line() {
    assert_eq!(function_body("def f(): print(1)"), "print(1)");
  }

  #[test]
  fn test_rendered_source() {
    let python = ScriptSpec::new("image1").python_function("def f():\n  ls\n");
    assert_eq!(python.rendered_source().as_deref(), Some("\nls\n"));

    let bash = ScriptSpec::new("image1")
      .command("bash")
      .python_function("def f():\n  ls\n");
    assert_eq!(bash.rendered_source().as_deref(), Some("def f():\n  ls\n"));

    let inline = ScriptSpec::new("image1").command("bash").source("ls");
    assert_eq!(inline.rendered_source().as_deref(), Some("ls"));

    assert_eq!(ScriptSpec::new("image1").rendered_source(), None);
    assert_eq!(ScriptSpec::new("image1").source("  ").rendered_source(), None);
  }
}
