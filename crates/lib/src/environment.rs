//! Environment resolution.
//!
//! The environment identity is taken from, in order: an explicit override,
//! the `FNPUSH_ENVIRONMENT` variable, or the current git branch. There is no
//! fallback default; deploying into a guessed environment could clobber
//! someone else's resources.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::consts::ENVIRONMENT_ENV_VAR;
use crate::naming::{EnvironmentId, NamingError};
use crate::process::{CommandRunner, Invocation, RunnerError, exit_status};

#[derive(Debug, Error)]
pub enum ResolutionError {
  #[error("could not run git to detect the current branch: {0}")]
  GitUnavailable(#[source] RunnerError),

  #[error("git could not determine the current branch ({}): {stderr}", exit_status(.code))]
  GitFailed { code: Option<i32>, stderr: String },

  #[error("repository is in detached HEAD state; pass an environment explicitly")]
  DetachedHead,

  #[error("invalid environment: {0}")]
  Invalid(#[from] NamingError),
}

/// Where a resolved environment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentSource {
  Explicit,
  Variable,
  GitBranch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEnvironment {
  pub id: EnvironmentId,
  pub source: EnvironmentSource,
}

#[derive(Debug, Clone)]
pub struct EnvironmentResolver {
  git: String,
  repo_dir: PathBuf,
}

impl EnvironmentResolver {
  pub fn new(git: impl Into<String>, repo_dir: impl Into<PathBuf>) -> Self {
    Self {
      git: git.into(),
      repo_dir: repo_dir.into(),
    }
  }

  pub async fn resolve<R: CommandRunner>(
    &self,
    runner: &R,
    explicit: Option<&str>,
  ) -> Result<ResolvedEnvironment, ResolutionError> {
    if let Some(raw) = explicit {
      return Ok(ResolvedEnvironment {
        id: EnvironmentId::normalize(raw)?,
        source: EnvironmentSource::Explicit,
      });
    }

    if let Ok(raw) = std::env::var(ENVIRONMENT_ENV_VAR)
      && !raw.trim().is_empty()
    {
      debug!(var = ENVIRONMENT_ENV_VAR, value = %raw, "environment taken from variable");
      return Ok(ResolvedEnvironment {
        id: EnvironmentId::normalize(&raw)?,
        source: EnvironmentSource::Variable,
      });
    }

    let branch = self.current_branch(runner).await?;
    Ok(ResolvedEnvironment {
      id: EnvironmentId::normalize(&branch)?,
      source: EnvironmentSource::GitBranch,
    })
  }

  async fn current_branch<R: CommandRunner>(&self, runner: &R) -> Result<String, ResolutionError> {
    let invocation = Invocation::new(&self.git)
      .args(["rev-parse", "--abbrev-ref", "HEAD"])
      .current_dir(&self.repo_dir);

    let output = runner
      .run(&invocation)
      .await
      .map_err(ResolutionError::GitUnavailable)?;

    if !output.success() {
      return Err(ResolutionError::GitFailed {
        code: output.code,
        stderr: output.stderr,
      });
    }

    let branch = output.stdout.trim();
    if branch == "HEAD" {
      return Err(ResolutionError::DetachedHead);
    }
    debug!(branch = %branch, "detected git branch");
    Ok(branch.to_string())
  }
}
