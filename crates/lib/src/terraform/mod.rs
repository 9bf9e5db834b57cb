//! Terraform driver.
//!
//! Every command runs in the infrastructure directory and is scoped to a
//! single resource address, so runs for different functions never touch each
//! other's resources.

mod apply;
mod import;

use std::path::{Path, PathBuf};

pub use apply::{ApplyError, ApplyStage, apply};
pub use import::{ImportOutcome, import_if_exists};

use crate::naming::EnvironmentId;
use crate::process::Invocation;

pub const DEFAULT_ENVIRONMENT_VARIABLE: &str = "environment";
pub const DEFAULT_PLAN_FILE: &str = "tfplan";

/// Builds terraform command lines for one infrastructure directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terraform {
  program: String,
  dir: PathBuf,
  variable: String,
  plan_file: String,
}

impl Terraform {
  pub fn new(program: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      dir: dir.into(),
      variable: DEFAULT_ENVIRONMENT_VARIABLE.to_string(),
      plan_file: DEFAULT_PLAN_FILE.to_string(),
    }
  }

  /// Name of the input variable that receives the environment identity.
  pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
    self.variable = variable.into();
    self
  }

  pub fn with_plan_file(mut self, plan_file: impl Into<String>) -> Self {
    self.plan_file = plan_file.into();
    self
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// Whether `terraform init` has ever run in the working directory.
  pub fn is_initialized(&self) -> bool {
    self.dir.join(".terraform").is_dir()
  }

  fn command(&self, subcommand: &str) -> Invocation {
    Invocation::new(&self.program).arg(subcommand).current_dir(&self.dir)
  }

  fn var_arg(&self, environment: &EnvironmentId) -> String {
    format!("-var={}={}", self.variable, environment)
  }

  pub fn init(&self) -> Invocation {
    self.command("init").arg("-input=false").inherit_output()
  }

  pub fn plan(&self, address: &str, environment: &EnvironmentId) -> Invocation {
    self
      .command("plan")
      .arg("-input=false")
      .arg(format!("-target={}", address))
      .arg(self.var_arg(environment))
      .arg(format!("-out={}", self.plan_file))
      .inherit_output()
  }

  pub fn apply(&self) -> Invocation {
    self
      .command("apply")
      .args(["-input=false", "-auto-approve", self.plan_file.as_str()])
      .inherit_output()
  }

  /// Output is captured so an "already managed" refusal can be recognised.
  pub fn import(&self, address: &str, live_name: &str, environment: &EnvironmentId) -> Invocation {
    self
      .command("import")
      .arg("-input=false")
      .arg(self.var_arg(environment))
      .args([address, live_name])
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::process::OutputMode;

  fn env(raw: &str) -> EnvironmentId {
    EnvironmentId::normalize(raw).unwrap()
  }

  #[test]
  fn plan_targets_one_address() {
    let tf = Terraform::new("terraform", "infra");
    let plan = tf.plan("aws_lambda_function.sendEmail", &env("prod"));

    assert_eq!(plan.cwd.as_deref(), Some(Path::new("infra")));
    assert_eq!(plan.output, OutputMode::Inherit);
    assert_eq!(
      plan.args,
      vec![
        "plan",
        "-input=false",
        "-target=aws_lambda_function.sendEmail",
        "-var=environment=prod",
        "-out=tfplan"
      ]
    );
  }

  #[test]
  fn apply_uses_saved_plan() {
    let tf = Terraform::new("terraform", "infra").with_plan_file("resize.tfplan");
    assert_eq!(
      tf.apply().args,
      vec!["apply", "-input=false", "-auto-approve", "resize.tfplan"]
    );
  }

  #[test]
  fn import_maps_address_to_live_name() {
    let tf = Terraform::new("terraform", "infra").with_variable("feature_name");
    let import = tf.import("aws_lambda_function.resize", "dev-resize", &env("dev"));

    assert_eq!(import.output, OutputMode::Capture);
    assert_eq!(
      import.args,
      vec![
        "import",
        "-input=false",
        "-var=feature_name=dev",
        "aws_lambda_function.resize",
        "dev-resize"
      ]
    );
  }

  #[test]
  fn initialized_when_dot_terraform_exists() {
    let temp = tempfile::TempDir::new().unwrap();
    let tf = Terraform::new("terraform", temp.path());
    assert!(!tf.is_initialized());

    std::fs::create_dir(temp.path().join(".terraform")).unwrap();
    assert!(tf.is_initialized());
  }
}
