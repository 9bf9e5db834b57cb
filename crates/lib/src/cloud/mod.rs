//! Cloud control-plane access through the `aws` CLI.

mod check;
mod invoke;

use std::path::Path;

pub use check::{Probe, exists, probe};
pub use invoke::{InvocationError, InvocationLog, decode_log, invoke};

use crate::naming::{ResourceKind, ResourceTarget};
use crate::process::Invocation;

/// Builds `aws` command lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsCli {
  program: String,
  region: Option<String>,
}

impl AwsCli {
  pub fn new(program: impl Into<String>, region: Option<String>) -> Self {
    Self {
      program: program.into(),
      region,
    }
  }

  fn base(&self, service: &str, operation: &str) -> Invocation {
    let invocation = Invocation::new(&self.program).args([service, operation]);
    match &self.region {
      Some(region) => invocation.args(["--region", region.as_str()]),
      None => invocation,
    }
  }

  /// The describe call used to test whether `target` exists.
  pub fn describe(&self, target: &ResourceTarget) -> Invocation {
    match target.kind {
      ResourceKind::Role => self
        .base("iam", "get-role")
        .args(["--role-name", target.live_name.as_str()]),
      ResourceKind::Function => self
        .base("lambda", "get-function")
        .args(["--function-name", target.live_name.as_str()]),
    }
  }

  /// Synchronous invocation returning the base64 log tail on stdout.
  pub fn invoke(&self, live_name: &str, payload: &Path, output: &Path) -> Invocation {
    self
      .base("lambda", "invoke")
      .args(["--function-name", live_name])
      .arg("--payload")
      .arg(format!("file://{}", payload.display()))
      .args([
        "--cli-binary-format",
        "raw-in-base64-out",
        "--log-type",
        "Tail",
        "--query",
        "LogResult",
        "--output",
        "text",
      ])
      .arg(output.display().to_string())
  }
}

impl Default for AwsCli {
  fn default() -> Self {
    Self::new("aws", None)
  }
}
