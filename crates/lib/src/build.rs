//! Artifact build step.
//!
//! The build tool is external; it receives the function identifier as its last
//! argument and must leave the packaged artifact where the terraform
//! configuration expects it.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::naming::FunctionId;
use crate::process::{CommandRunner, Invocation, RunnerError, exit_status};

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("function source directory not found: {0}")]
  MissingSource(PathBuf),

  #[error("could not start build tool: {0}")]
  Spawn(#[source] RunnerError),

  #[error("build of `{function}` failed ({})", exit_status(.code))]
  Failed { function: String, code: Option<i32> },
}

/// Stock build scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildTool {
  #[default]
  Bash,
  Powershell,
}

impl BuildTool {
  pub fn command(self) -> BuildCommand {
    match self {
      BuildTool::Bash => BuildCommand::new("bash", ["bin/bash/build_single_function.sh"]),
      BuildTool::Powershell => {
        BuildCommand::new("powershell", ["-File", "bin/powershell/build_single_function.ps1"])
      }
    }
  }
}

impl fmt::Display for BuildTool {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      BuildTool::Bash => "bash",
      BuildTool::Powershell => "powershell",
    })
  }
}

/// Program and leading arguments; the function id is appended per build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
  pub program: String,
  pub args: Vec<String>,
}

impl BuildCommand {
  pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      program: program.into(),
      args: args.into_iter().map(Into::into).collect(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct BuildInvoker {
  command: BuildCommand,
  project_root: PathBuf,
  functions_dir: PathBuf,
}

impl BuildInvoker {
  pub fn new(command: BuildCommand, project_root: impl Into<PathBuf>, functions_dir: impl Into<PathBuf>) -> Self {
    Self {
      command,
      project_root: project_root.into(),
      functions_dir: functions_dir.into(),
    }
  }

  pub fn source_dir(&self, function: &FunctionId) -> PathBuf {
    self.functions_dir.join(function.as_str())
  }

  pub fn invocation(&self, function: &FunctionId) -> Invocation {
    Invocation::new(&self.command.program)
      .args(self.command.args.iter().map(String::as_str))
      .arg(function.as_str())
      .current_dir(&self.project_root)
      .inherit_output()
  }

  pub async fn build<R: CommandRunner>(&self, runner: &R, function: &FunctionId) -> Result<(), BuildError> {
    let source = self.source_dir(function);
    if !source.is_dir() {
      return Err(BuildError::MissingSource(source));
    }

    let invocation = self.invocation(function);
    info!(function = %function, command = %invocation, "building function");

    let output = runner.run(&invocation).await.map_err(BuildError::Spawn)?;
    if !output.success() {
      return Err(BuildError::Failed {
        function: function.to_string(),
        code: output.code,
      });
    }

    info!(function = %function, "build finished");
    Ok(())
  }
}
