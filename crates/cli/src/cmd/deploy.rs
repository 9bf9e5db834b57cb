//! Implementation of the `fnpush deploy` command.
//!
//! One reconciliation run for a single function: import what already exists,
//! build, apply the targeted plan, then invoke the live function and print
//! its tail logs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use fnpush_lib::cloud::InvocationLog;
use fnpush_lib::consts::{DEFAULT_OUTPUT_FILE, DEFAULT_PAYLOAD_FILE};
use fnpush_lib::naming::FunctionId;
use fnpush_lib::pipeline::Pipeline;
use fnpush_lib::process::SystemRunner;

use super::Project;
use crate::output::{format_duration, print_error, print_info, print_stat, print_success, print_warning};

pub struct DeployArgs {
  pub function: String,
  pub environment: Option<String>,
  pub payload: Option<PathBuf>,
  pub output: Option<PathBuf>,
  pub no_invoke: bool,
}

/// Execute the deploy command.
///
/// Resolves the environment, runs the import/build/apply pipeline once and,
/// unless `--no-invoke` is given, invokes the deployed function and prints
/// its log tail. Any failure ends the command with a non-zero exit.
pub fn cmd_deploy(project: &Project, args: DeployArgs) -> Result<()> {
  let function = FunctionId::parse(&args.function)?;
  let payload = project.path_or_default(args.payload.as_deref(), DEFAULT_PAYLOAD_FILE);
  let output = project.path_or_default(args.output.as_deref(), DEFAULT_OUTPUT_FILE);

  let rt = super::runtime()?;
  rt.block_on(deploy(project, function, &args, &payload, &output))
}

async fn deploy(project: &Project, function: FunctionId, args: &DeployArgs, payload: &Path, output: &Path) -> Result<()> {
  let resolved = project.resolve_environment(args.environment.as_deref()).await?;
  let pipeline = Pipeline::new(SystemRunner, &project.config, &project.root, resolved.id, function);

  print_info(&format!(
    "Deploying {} to {} as {}",
    pipeline.function(),
    pipeline.environment(),
    pipeline.function_target().live_name
  ));

  let report = match pipeline.run().await {
    Ok(report) => report,
    Err(err) => {
      print_error(&format!("Deployment of {} failed", pipeline.function()));
      return Err(err).context("Deployment failed");
    }
  };

  print_success(&format!(
    "Deployed {} in {}",
    report.live_name,
    format_duration(report.elapsed)
  ));
  print_stat("Role", &report.role_import.to_string());
  print_stat("Function", &report.function_import.to_string());

  if args.no_invoke {
    return Ok(());
  }

  info!(payload = %payload.display(), "invoking deployed function");
  let log = pipeline
    .invoke(payload, output)
    .await
    .context("Invocation failed")?;

  print_success(&format!("Response saved to {}", output.display()));
  match log {
    InvocationLog::Decoded(text) => {
      println!();
      println!("Logs:");
      println!("{}", text);
    }
    InvocationLog::Raw(text) => {
      print_warning("Log output was not valid base64; showing it as received");
      println!("{}", text);
    }
  }

  Ok(())
}
