//! Synchronous function invocation for the one-shot deploy path.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;
use tracing::{info, warn};

use super::AwsCli;
use crate::process::{CommandRunner, RunnerError, exit_status};

#[derive(Debug, Error)]
pub enum InvocationError {
  #[error("payload file not found: {0}")]
  PayloadMissing(PathBuf),

  #[error("could not run the aws CLI: {0}")]
  Runner(#[from] RunnerError),

  #[error("invoking `{function}` failed ({}): {stderr}", exit_status(.code))]
  Failed {
    function: String,
    code: Option<i32>,
    stderr: String,
  },
}

/// Execution log tail returned by an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationLog {
  Decoded(String),
  /// The log could not be decoded and is passed through untouched.
  Raw(String),
}

impl InvocationLog {
  pub fn is_decoded(&self) -> bool {
    matches!(self, InvocationLog::Decoded(_))
  }
}

/// Decodes a base64 log tail, falling back to the raw text.
pub fn decode_log(raw: &str) -> InvocationLog {
  let trimmed = raw.trim();
  let decoded = STANDARD
    .decode(trimmed)
    .ok()
    .and_then(|bytes| String::from_utf8(bytes).ok());

  match decoded {
    Some(text) => InvocationLog::Decoded(text),
    None => InvocationLog::Raw(trimmed.to_string()),
  }
}

/// Invokes `live_name` with the payload file, writing the response to `output`.
pub async fn invoke<R: CommandRunner>(
  runner: &R,
  aws: &AwsCli,
  live_name: &str,
  payload: &Path,
  output: &Path,
) -> Result<InvocationLog, InvocationError> {
  if !payload.is_file() {
    return Err(InvocationError::PayloadMissing(payload.to_path_buf()));
  }

  info!(function = %live_name, payload = %payload.display(), "invoking function");
  let result = runner.run(&aws.invoke(live_name, payload, output)).await?;

  if !result.success() {
    return Err(InvocationError::Failed {
      function: live_name.to_string(),
      code: result.code,
      stderr: result.stderr,
    });
  }

  let log = decode_log(&result.stdout);
  if !log.is_decoded() {
    warn!(function = %live_name, "log tail was not valid base64 text; showing raw output");
  }
  Ok(log)
}
