use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use fnpush_lib::build::BuildTool;

mod cmd;
mod output;

use cmd::{DeployArgs, Project, WatchArgs};
use output::OutputFormat;

/// fnpush - Build and deploy one cloud function into a per-branch environment
#[derive(Parser)]
#[command(name = "fnpush")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Increase log verbosity (-v debug, -vv trace)
  #[arg(short, long, global = true, action = ArgAction::Count)]
  verbose: u8,

  /// Project root (default: current directory)
  #[arg(long, global = true, value_name = "DIR")]
  root: Option<PathBuf>,

  /// Config file (default: <root>/fnpush.toml when present)
  #[arg(long, global = true, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Build script flavor, overriding the config file
  #[arg(long, global = true, value_enum)]
  build_tool: Option<BuildToolArg>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Import, build, apply and invoke one function
  Deploy {
    /// Function identifier (directory name under the functions directory)
    function: String,

    /// Environment override (default: FNPUSH_ENVIRONMENT, then the git branch)
    #[arg(short, long)]
    environment: Option<String>,

    /// Request payload file (default: <root>/payload.json)
    #[arg(long, value_name = "FILE")]
    payload: Option<PathBuf>,

    /// Response file (default: <root>/output.json)
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Stop after the apply
    #[arg(long)]
    no_invoke: bool,
  },

  /// Redeploy a function whenever its source changes
  Watch {
    /// Function identifier (directory name under the functions directory)
    function: String,

    /// Environment override (default: FNPUSH_ENVIRONMENT, then the git branch)
    #[arg(short, long)]
    environment: Option<String>,

    /// Ignore events for this long after startup (e.g. 500ms, 2s)
    #[arg(long, value_parser = humantime::parse_duration)]
    settle: Option<Duration>,
  },

  /// Show the resolved environment and the live resource names
  Env {
    /// Also show resource names for this function
    function: Option<String>,

    /// Environment override (default: FNPUSH_ENVIRONMENT, then the git branch)
    #[arg(short, long)]
    environment: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
  },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BuildToolArg {
  Bash,
  Powershell,
}

impl From<BuildToolArg> for BuildTool {
  fn from(arg: BuildToolArg) -> Self {
    match arg {
      BuildToolArg::Bash => BuildTool::Bash,
      BuildToolArg::Powershell => BuildTool::Powershell,
    }
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let quiet = matches!(cli.command, Commands::Env { .. });
  init_tracing(cli.verbose, quiet);

  let project = Project::load(
    cli.root.as_deref(),
    cli.config.as_deref(),
    cli.build_tool.map(BuildTool::from),
  )?;

  match cli.command {
    Commands::Deploy {
      function,
      environment,
      payload,
      output,
      no_invoke,
    } => cmd::cmd_deploy(
      &project,
      DeployArgs {
        function,
        environment,
        payload,
        output,
        no_invoke,
      },
    ),
    Commands::Watch {
      function,
      environment,
      settle,
    } => cmd::cmd_watch(
      &project,
      WatchArgs {
        function,
        environment,
        settle,
      },
    ),
    Commands::Env {
      function,
      environment,
      format,
    } => cmd::cmd_env(&project, function.as_deref(), environment.as_deref(), format),
  }
}

/// Logs go to stderr so that stdout stays clean for responses and JSON.
fn init_tracing(verbose: u8, quiet: bool) {
  let level = match (verbose, quiet) {
    (0, true) => "warn",
    (0, false) => "info",
    (1, _) => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}
