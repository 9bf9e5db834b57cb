//! Single-function reconciliation pipeline.
//!
//! One run checks the execution role and the function in the live account,
//! imports whichever already exist, builds the artifact, and applies a plan
//! scoped to the function's resource address. Steps are strictly sequential
//! and the first fatal failure ends the run. Import problems are never fatal.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::build::{BuildError, BuildInvoker};
use crate::cloud::{self, AwsCli, InvocationError, InvocationLog};
use crate::config::Config;
use crate::naming::{EnvironmentId, FunctionId, NamingScheme, ResourceTarget};
use crate::process::CommandRunner;
use crate::terraform::{self, ApplyError, ImportOutcome, Terraform};

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error(transparent)]
  Build(#[from] BuildError),

  #[error(transparent)]
  Apply(#[from] ApplyError),

  #[error(transparent)]
  Invocation(#[from] InvocationError),
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
  pub environment: EnvironmentId,
  pub function: FunctionId,
  pub live_name: String,
  pub role_import: ImportOutcome,
  pub function_import: ImportOutcome,
  pub elapsed: Duration,
}

pub struct Pipeline<R> {
  runner: R,
  naming: NamingScheme,
  aws: AwsCli,
  terraform: Terraform,
  builder: BuildInvoker,
  environment: EnvironmentId,
  function: FunctionId,
}

impl<R: CommandRunner> Pipeline<R> {
  pub fn new(runner: R, config: &Config, project_root: &Path, environment: EnvironmentId, function: FunctionId) -> Self {
    Self {
      runner,
      naming: config.naming(),
      aws: config.aws(),
      terraform: config.terraform(project_root),
      builder: config.build_invoker(project_root),
      environment,
      function,
    }
  }

  pub fn environment(&self) -> &EnvironmentId {
    &self.environment
  }

  pub fn function(&self) -> &FunctionId {
    &self.function
  }

  pub fn source_dir(&self) -> PathBuf {
    self.builder.source_dir(&self.function)
  }

  pub fn role_target(&self) -> ResourceTarget {
    self.naming.role_target(&self.environment)
  }

  pub fn function_target(&self) -> ResourceTarget {
    self.naming.function_target(&self.environment, &self.function)
  }

  /// Runs one full reconciliation: role import, function import, build and
  /// the scoped apply. Import problems are reported in the [`RunReport`];
  /// a build or apply failure ends the run with an error.
  pub async fn run(&self) -> Result<RunReport, PipelineError> {
    let started = Instant::now();
    let role = self.role_target();
    let function = self.function_target();

    info!(
      environment = %self.environment,
      function = %self.function,
      live_name = %function.live_name,
      "starting deployment run"
    );

    self.ensure_initialized().await;

    let role_import =
      terraform::import_if_exists(&self.runner, &self.aws, &self.terraform, &role, &self.environment).await;
    let function_import =
      terraform::import_if_exists(&self.runner, &self.aws, &self.terraform, &function, &self.environment).await;

    self.builder.build(&self.runner, &self.function).await?;
    terraform::apply(&self.runner, &self.terraform, &self.environment, &self.function).await?;

    Ok(RunReport {
      environment: self.environment.clone(),
      function: self.function.clone(),
      live_name: function.live_name,
      role_import,
      function_import,
      elapsed: started.elapsed(),
    })
  }

  /// Invokes the deployed function under its live name.
  pub async fn invoke(&self, payload: &Path, output: &Path) -> Result<InvocationLog, PipelineError> {
    let live_name = self.function_target().live_name;
    Ok(cloud::invoke(&self.runner, &self.aws, &live_name, payload, output).await?)
  }

  /// Imports need an initialized working directory. On a fresh checkout run
  /// `init` up front; a failure here resurfaces in the apply step.
  async fn ensure_initialized(&self) {
    if self.terraform.is_initialized() {
      return;
    }

    info!(dir = %self.terraform.dir().display(), "terraform not initialized; running init before import");
    match self.runner.run(&self.terraform.init()).await {
      Ok(output) if output.success() => {}
      Ok(output) => warn!(code = ?output.code, "terraform init failed; imports will likely fail"),
      Err(err) => warn!(error = %err, "terraform init could not be started"),
    }
  }
}
