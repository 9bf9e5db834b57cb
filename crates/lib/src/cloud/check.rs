//! Resource existence checks.
//!
//! A zero exit from the describe call means the resource exists. Anything
//! else is reported as absent, including throttling, expired credentials and
//! network errors. Those cases are logged as warnings but still count as
//! absence, so a transient failure leads to a creation attempt that
//! terraform has to reject.

use tracing::{debug, warn};

use super::AwsCli;
use crate::naming::ResourceTarget;
use crate::process::CommandRunner;

/// Error codes the aws CLI prints when a resource genuinely does not exist.
const NOT_FOUND_MARKERS: &[&str] = &["NoSuchEntity", "ResourceNotFoundException"];

/// Detailed result of a describe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
  Found,
  NotFound,
  /// The check failed for some other reason.
  Failed { code: Option<i32>, message: String },
}

pub async fn probe<R: CommandRunner>(runner: &R, aws: &AwsCli, target: &ResourceTarget) -> Probe {
  let invocation = aws.describe(target);

  let output = match runner.run(&invocation).await {
    Ok(output) => output,
    Err(err) => {
      return Probe::Failed {
        code: None,
        message: err.to_string(),
      };
    }
  };

  if output.success() {
    Probe::Found
  } else if NOT_FOUND_MARKERS.iter().any(|marker| output.stderr.contains(marker)) {
    Probe::NotFound
  } else {
    Probe::Failed {
      code: output.code,
      message: output.stderr,
    }
  }
}

/// Whether `target` exists under its live name.
pub async fn exists<R: CommandRunner>(runner: &R, aws: &AwsCli, target: &ResourceTarget) -> bool {
  match probe(runner, aws, target).await {
    Probe::Found => {
      debug!(kind = %target.kind, name = %target.live_name, "resource exists");
      true
    }
    Probe::NotFound => {
      debug!(kind = %target.kind, name = %target.live_name, "resource not found");
      false
    }
    Probe::Failed { code, message } => {
      warn!(
        kind = %target.kind,
        name = %target.live_name,
        code = ?code,
        error = %message,
        "existence check failed; treating resource as absent"
      );
      false
    }
  }
}
