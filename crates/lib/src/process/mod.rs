//! External process execution.
//!
//! Every collaborator the pipeline drives (git, the aws CLI, terraform and the
//! build tool) is reached through the [`CommandRunner`] trait. The production
//! implementation spawns real processes with tokio; tests swap in a scripted
//! runner that records each invocation.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[cfg(test)]
pub mod testing;

/// How a child process's stdout/stderr are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
  /// Collect stdout/stderr so the caller can inspect them.
  #[default]
  Capture,
  /// Stream straight to the terminal. The returned output is empty.
  Inherit,
}

/// A single external command, described but not yet run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: Option<PathBuf>,
  pub output: OutputMode,
}

impl Invocation {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: None,
      output: OutputMode::Capture,
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.cwd = Some(dir.into());
    self
  }

  pub fn inherit_output(mut self) -> Self {
    self.output = OutputMode::Inherit;
    self
  }
}

impl fmt::Display for Invocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program)?;
    for arg in &self.args {
      write!(f, " {}", arg)?;
    }
    Ok(())
  }
}

/// Completion of a child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
  /// Exit code, `None` when the process was terminated by a signal.
  pub code: Option<i32>,
  /// Trimmed stdout (empty in [`OutputMode::Inherit`]).
  pub stdout: String,
  /// Trimmed stderr (empty in [`OutputMode::Inherit`]).
  pub stderr: String,
}

impl CommandOutput {
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }

  /// Successful completion with the given stdout.
  pub fn ok(stdout: impl Into<String>) -> Self {
    Self {
      code: Some(0),
      stdout: stdout.into(),
      stderr: String::new(),
    }
  }

  /// Failed completion with the given exit code and stderr.
  pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
    Self {
      code: Some(code),
      stdout: String::new(),
      stderr: stderr.into(),
    }
  }
}

/// `exit code N`, or `terminated by signal` when there is no code.
pub fn exit_status(code: &Option<i32>) -> String {
  match code {
    Some(code) => format!("exit code {}", code),
    None => "terminated by signal".to_string(),
  }
}

/// Errors raised before a process produces an exit status.
#[derive(Debug, Error)]
pub enum RunnerError {
  /// The program could not be started (missing binary, permissions, bad cwd).
  #[error("failed to start `{program}`: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },
}

/// Runs external commands to completion.
pub trait CommandRunner: Send + Sync {
  fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<CommandOutput, RunnerError>> + Send;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
  async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RunnerError> {
    debug!(command = %invocation, cwd = ?invocation.cwd, "spawning process");

    let mut command = Command::new(&invocation.program);
    command.args(&invocation.args).stdin(Stdio::null());
    if let Some(dir) = &invocation.cwd {
      command.current_dir(dir);
    }

    let spawn_error = |source| RunnerError::Spawn {
      program: invocation.program.clone(),
      source,
    };

    match invocation.output {
      OutputMode::Inherit => {
        let status = command
          .stdout(Stdio::inherit())
          .stderr(Stdio::inherit())
          .status()
          .await
          .map_err(spawn_error)?;
        Ok(CommandOutput {
          code: status.code(),
          ..CommandOutput::default()
        })
      }
      OutputMode::Capture => {
        let output = command.output().await.map_err(spawn_error)?;
        let result = CommandOutput {
          code: output.status.code(),
          stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
          stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        };
        if !result.success() && !result.stderr.is_empty() {
          debug!(stderr = %result.stderr, "command stderr");
        }
        Ok(result)
      }
    }
  }
}
