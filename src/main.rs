use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use couler_compiler::{Compiler, compile_program};
use couler_config::{
  CLUSTER_CONFIG_ENV, CompilerConfig, DEFAULT_WORKFLOW_NAME, ProgramDef, WORKFLOW_NAME_ENV,
  load_file,
};

/// Couler - compiles step programs into Argo workflows
#[derive(Parser)]
#[command(name = "couler")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Compile a step program into Argo manifests
  Compile {
    /// Path to the program file (JSON or YAML)
    program_file: PathBuf,

    /// Workflow name (default: the program's name, then "couler")
    #[arg(long, env = WORKFLOW_NAME_ENV)]
    workflow_name: Option<String>,

    /// Path to a cluster config file (JSON or YAML)
    #[arg(long, env = CLUSTER_CONFIG_ENV)]
    cluster_config: Option<PathBuf>,

    /// Write the manifests to this file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    format: OutputFormat,
  },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
  /// Multi-document YAML, secrets first
  Yaml,
  /// A JSON array of documents
  Json,
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging()?;

  match cli.command {
    Some(Commands::Compile {
      program_file,
      workflow_name,
      cluster_config,
      output,
      format,
    }) => {
      compile(program_file, workflow_name, cluster_config, output, format)?;
    }
    None => {
      println!("couler - use --help to see available commands");
    }
  }

  Ok(())
}

/// Logs go to stderr so that stdout carries only the manifest.
fn init_logging() -> Result<()> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
  let subscriber = FmtSubscriber::builder()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(io::stderr)
    .finish();
  tracing::subscriber::set_global_default(subscriber).context("failed to initialize logging")
}

fn compile(
  program_file: PathBuf,
  workflow_name: Option<String>,
  cluster_config: Option<PathBuf>,
  output: Option<PathBuf>,
  format: OutputFormat,
) -> Result<()> {
  let program: ProgramDef = load_file(&program_file)
    .with_context(|| format!("failed to load program file: {}", program_file.display()))?;

  // Unset and empty environment values fall through to the next source.
  let workflow_name = workflow_name
    .filter(|name| !name.trim().is_empty())
    .or_else(|| program.name.clone())
    .unwrap_or_else(|| DEFAULT_WORKFLOW_NAME.to_string());

  let mut config = CompilerConfig::new(workflow_name);
  if let Some(path) = cluster_config.filter(|path| !path.as_os_str().is_empty()) {
    config = config.with_cluster_config(path);
  }

  let mut compiler = Compiler::load(config).context("failed to load cluster config")?;
  compile_program(&mut compiler, &program)
    .with_context(|| format!("failed to compile program: {}", program_file.display()))?;

  info!(
    workflow = %compiler.workflow_name(),
    templates = compiler.templates().len(),
    groups = compiler.groups().len(),
    secrets = compiler.secrets().len(),
    "compiled workflow"
  );

  let manifest = compiler.render().context("failed to render manifest")?;
  let text = match format {
    OutputFormat::Yaml => manifest.to_yaml()?,
    OutputFormat::Json => {
      let mut text = serde_json::to_string_pretty(&manifest.documents()?)?;
      text.push('\n');
      text
    }
  };

  match output {
    Some(path) => {
      fs::write(&path, text)
        .with_context(|| format!("failed to write manifest: {}", path.display()))?;
      info!(path = %path.display(), "wrote manifest");
    }
    None => print!("{text}"),
  }

  Ok(())
}
