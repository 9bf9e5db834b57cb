//! Implementation of the `fnpush watch` command.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

use fnpush_lib::naming::FunctionId;
use fnpush_lib::pipeline::Pipeline;
use fnpush_lib::process::SystemRunner;
use fnpush_lib::watch::{WatchLoop, WatchOptions, watch_directory};

use super::Project;
use crate::output::{print_info, print_stat, print_success};

pub struct WatchArgs {
  pub function: String,
  pub environment: Option<String>,
  pub settle: Option<Duration>,
}

/// Watches the function's source directory and redeploys on every change
/// until interrupted. Failed runs are reported and the watch continues.
pub fn cmd_watch(project: &Project, args: WatchArgs) -> Result<()> {
  let function = FunctionId::parse(&args.function)?;

  let rt = super::runtime()?;
  rt.block_on(watch(project, function, &args))
}

async fn watch(project: &Project, function: FunctionId, args: &WatchArgs) -> Result<()> {
  let resolved = project.resolve_environment(args.environment.as_deref()).await?;
  let pipeline = Pipeline::new(SystemRunner, &project.config, &project.root, resolved.id, function);
  let source = pipeline.source_dir();

  // Dropping the watcher ends the event stream, so it lives for the whole loop.
  let (_watcher, events) = watch_directory(&source).context("Failed to start file watcher")?;

  print_info(&format!(
    "Watching {} for {} in {}",
    source.display(),
    pipeline.function(),
    pipeline.environment()
  ));
  print_stat("Live name", &pipeline.function_target().live_name);
  println!("Press Ctrl-C to stop.");

  let options = WatchOptions {
    root: source,
    include_dotfiles: project.config.watch.include_dotfiles,
    settle: args.settle.unwrap_or(project.config.watch.settle),
  };
  let summary = WatchLoop::new(pipeline, options).run(events, shutdown_signal()).await;

  print_success(&format!(
    "Stopped after {} run(s): {} deployed, {} failed",
    summary.runs_started, summary.completed, summary.failed
  ));
  Ok(())
}

async fn shutdown_signal() {
  if let Err(err) = tokio::signal::ctrl_c().await {
    warn!(error = %err, "could not listen for Ctrl-C; stop the process to exit");
    std::future::pending::<()>().await;
  }
}
