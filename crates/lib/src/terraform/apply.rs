//! Targeted init → plan → apply.

use std::fmt;

use thiserror::Error;
use tracing::info;

use super::Terraform;
use crate::naming::{EnvironmentId, FunctionId};
use crate::process::{CommandRunner, Invocation, RunnerError, exit_status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStage {
  Init,
  Plan,
  Apply,
}

impl fmt::Display for ApplyStage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      ApplyStage::Init => "init",
      ApplyStage::Plan => "plan",
      ApplyStage::Apply => "apply",
    })
  }
}

#[derive(Debug, Error)]
pub enum ApplyError {
  #[error("terraform {stage} could not be started: {source}")]
  Spawn {
    stage: ApplyStage,
    #[source]
    source: RunnerError,
  },

  #[error("terraform {stage} failed ({})", exit_status(.code))]
  Failed { stage: ApplyStage, code: Option<i32> },
}

impl ApplyError {
  pub fn stage(&self) -> ApplyStage {
    match self {
      ApplyError::Spawn { stage, .. } | ApplyError::Failed { stage, .. } => *stage,
    }
  }
}

async fn step<R: CommandRunner>(runner: &R, stage: ApplyStage, invocation: Invocation) -> Result<(), ApplyError> {
  info!(stage = %stage, command = %invocation, "running terraform");
  let output = runner
    .run(&invocation)
    .await
    .map_err(|source| ApplyError::Spawn { stage, source })?;

  if output.success() {
    Ok(())
  } else {
    Err(ApplyError::Failed {
      stage,
      code: output.code,
    })
  }
}

/// Plans and applies exactly one function resource.
///
/// Each stage must succeed before the next one starts.
pub async fn apply<R: CommandRunner>(
  runner: &R,
  terraform: &Terraform,
  environment: &EnvironmentId,
  function: &FunctionId,
) -> Result<(), ApplyError> {
  let address = function.logical_address();

  step(runner, ApplyStage::Init, terraform.init()).await?;
  step(runner, ApplyStage::Plan, terraform.plan(&address, environment)).await?;
  step(runner, ApplyStage::Apply, terraform.apply()).await?;

  info!(address = %address, environment = %environment, "apply complete");
  Ok(())
}
