//! Best-effort state reconciliation.
//!
//! A resource that exists in the account but not in terraform state would
//! make the next apply fail with a name collision. Importing it first lets the
//! scoped apply update it in place. Import never fails a run: whatever goes
//! wrong is reported through [`ImportOutcome`] and the apply gets to decide.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use super::Terraform;
use crate::cloud::{self, AwsCli};
use crate::naming::{EnvironmentId, ResourceTarget};
use crate::process::{CommandRunner, exit_status};

const ALREADY_MANAGED_MARKER: &str = "Resource already managed by Terraform";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum ImportOutcome {
  /// The resource was brought under terraform management.
  Imported,
  /// Terraform already tracks the resource.
  AlreadyTracked,
  /// Nothing to import; the apply will create the resource.
  NotPresent,
  ImportFailed(String),
}

impl fmt::Display for ImportOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ImportOutcome::Imported => f.write_str("imported"),
      ImportOutcome::AlreadyTracked => f.write_str("already tracked"),
      ImportOutcome::NotPresent => f.write_str("not present"),
      ImportOutcome::ImportFailed(reason) => write!(f, "import failed: {}", reason),
    }
  }
}

pub async fn import_if_exists<R: CommandRunner>(
  runner: &R,
  aws: &AwsCli,
  terraform: &Terraform,
  target: &ResourceTarget,
  environment: &EnvironmentId,
) -> ImportOutcome {
  if !cloud::exists(runner, aws, target).await {
    info!(kind = %target.kind, name = %target.live_name, "not found; it will be created");
    return ImportOutcome::NotPresent;
  }

  info!(
    kind = %target.kind,
    name = %target.live_name,
    address = %target.logical_address,
    "found existing resource; importing into terraform state"
  );

  let invocation = terraform.import(&target.logical_address, &target.live_name, environment);
  let outcome = match runner.run(&invocation).await {
    Ok(output) if output.success() => ImportOutcome::Imported,
    Ok(output) if output.stderr.contains(ALREADY_MANAGED_MARKER) => ImportOutcome::AlreadyTracked,
    Ok(output) => {
      let reason = if output.stderr.is_empty() {
        format!("terraform import failed ({})", exit_status(&output.code))
      } else {
        output.stderr
      };
      ImportOutcome::ImportFailed(reason)
    }
    Err(err) => ImportOutcome::ImportFailed(err.to_string()),
  };

  match &outcome {
    ImportOutcome::ImportFailed(reason) => {
      warn!(address = %target.logical_address, reason = %reason, "import failed; continuing");
    }
    other => info!(address = %target.logical_address, outcome = %other, "import finished"),
  }
  outcome
}
