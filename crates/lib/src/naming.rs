//! Environment and resource naming.
//!
//! Every deployed resource carries two names. The *logical address* is what
//! terraform calls it (`aws_lambda_function.sendEmail`) and never changes
//! between environments. The *live name* is what exists in the cloud account
//! and is qualified with the environment everywhere except production.
//! Existence checks and imports use the live name; plan and apply targets use
//! the logical address.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Terraform resource type for deployed functions.
pub const FUNCTION_RESOURCE_TYPE: &str = "aws_lambda_function";

pub const DEFAULT_PRODUCTION_ENVIRONMENT: &str = "prod";
pub const DEFAULT_ROLE_ADDRESS: &str = "aws_iam_role.lambda_exec_role";
pub const DEFAULT_ROLE_NAME_PREFIX: &str = "lambda-exec-role-";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamingError {
  #[error("environment identifier is empty")]
  EmptyEnvironment,

  #[error(
    "invalid function identifier `{0}`: expected a letter or `_` followed by letters, digits, `_` or `-`"
  )]
  InvalidFunction(String),
}

/// Normalized per-branch namespace, safe to embed in resource names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EnvironmentId(String);

impl EnvironmentId {
  /// Replaces every path separator with `-` and trims surrounding whitespace.
  pub fn normalize(raw: &str) -> Result<Self, NamingError> {
    let normalized: String = raw
      .trim()
      .chars()
      .map(|c| if c == '/' || c == '\\' { '-' } else { c })
      .collect();

    if normalized.is_empty() {
      return Err(NamingError::EmptyEnvironment);
    }
    Ok(Self(normalized))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for EnvironmentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Names a function's source directory and its terraform resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FunctionId(String);

impl FunctionId {
  pub fn parse(raw: &str) -> Result<Self, NamingError> {
    let mut chars = raw.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if !(valid_start && valid_rest) {
      return Err(NamingError::InvalidFunction(raw.to_string()));
    }
    Ok(Self(raw.to_string()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn logical_address(&self) -> String {
    format!("{}.{}", FUNCTION_RESOURCE_TYPE, self.0)
  }
}

impl fmt::Display for FunctionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
  /// Execution role the function runs under.
  Role,
  Function,
}

impl ResourceKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ResourceKind::Role => "role",
      ResourceKind::Function => "function",
    }
  }
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A resource as seen by both terraform and the cloud account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceTarget {
  pub kind: ResourceKind,
  pub logical_address: String,
  pub live_name: String,
}

/// Rules for deriving live names from an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingScheme {
  pub production_environment: String,
  pub role_address: String,
  pub role_name_prefix: String,
}

impl Default for NamingScheme {
  fn default() -> Self {
    Self {
      production_environment: DEFAULT_PRODUCTION_ENVIRONMENT.to_string(),
      role_address: DEFAULT_ROLE_ADDRESS.to_string(),
      role_name_prefix: DEFAULT_ROLE_NAME_PREFIX.to_string(),
    }
  }
}

impl NamingScheme {
  pub fn is_production(&self, environment: &EnvironmentId) -> bool {
    environment.as_str() == self.production_environment
  }

  pub fn live_function_name(&self, environment: &EnvironmentId, function: &FunctionId) -> String {
    if self.is_production(environment) {
      function.to_string()
    } else {
      format!("{}-{}", environment, function)
    }
  }

  pub fn function_target(&self, environment: &EnvironmentId, function: &FunctionId) -> ResourceTarget {
    ResourceTarget {
      kind: ResourceKind::Function,
      logical_address: function.logical_address(),
      live_name: self.live_function_name(environment, function),
    }
  }

  /// The role is environment-qualified in every environment, production included.
  pub fn role_target(&self, environment: &EnvironmentId) -> ResourceTarget {
    ResourceTarget {
      kind: ResourceKind::Role,
      logical_address: self.role_address.clone(),
      live_name: format!("{}{}", self.role_name_prefix, environment),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn env(raw: &str) -> EnvironmentId {
    EnvironmentId::normalize(raw).unwrap()
  }

  fn function(raw: &str) -> FunctionId {
    FunctionId::parse(raw).unwrap()
  }

  #[test]
  fn branch_separators_become_hyphens() {
    assert_eq!(env("feature/my-branch").as_str(), "feature-my-branch");
    assert_eq!(env("users/alice/fix\\win").as_str(), "users-alice-fix-win");
  }

  #[test]
  fn branch_without_separators_is_unchanged() {
    assert_eq!(env("main").as_str(), "main");
    assert_eq!(env("  alice-feature\n").as_str(), "alice-feature");
  }

  #[test]
  fn empty_environment_is_rejected() {
    assert_eq!(EnvironmentId::normalize("   "), Err(NamingError::EmptyEnvironment));
    assert_eq!(EnvironmentId::normalize(""), Err(NamingError::EmptyEnvironment));
  }

  #[test]
  fn function_ids_follow_terraform_identifier_rules() {
    assert!(FunctionId::parse("sendEmail").is_ok());
    assert!(FunctionId::parse("_private-fn2").is_ok());

    for bad in ["", "2fast", "with space", "dot.ted", "../escape"] {
      assert_eq!(
        FunctionId::parse(bad),
        Err(NamingError::InvalidFunction(bad.to_string())),
        "{bad:?} should be rejected"
      );
    }
  }

  #[test]
  fn production_live_name_is_bare_function() {
    let scheme = NamingScheme::default();
    assert_eq!(scheme.live_function_name(&env("prod"), &function("sendEmail")), "sendEmail");
  }

  #[test]
  fn non_production_live_names_are_prefixed() {
    let scheme = NamingScheme::default();
    let id = function("resize");

    for raw in ["alice-feature", "feature/x", "production", "Prod", "dev"] {
      let environment = env(raw);
      assert_eq!(
        scheme.live_function_name(&environment, &id),
        format!("{}-resize", environment)
      );
    }
  }

  #[test]
  fn logical_address_ignores_environment() {
    let scheme = NamingScheme::default();
    let id = function("resize");

    let prod = scheme.function_target(&env("prod"), &id);
    let dev = scheme.function_target(&env("alice-feature"), &id);

    assert_eq!(prod.logical_address, "aws_lambda_function.resize");
    assert_eq!(prod.logical_address, dev.logical_address);
    assert_eq!(prod.live_name, "resize");
    assert_eq!(dev.live_name, "alice-feature-resize");
  }

  #[test]
  fn role_is_qualified_even_in_production() {
    let scheme = NamingScheme::default();
    let role = scheme.role_target(&env("prod"));

    assert_eq!(role.kind, ResourceKind::Role);
    assert_eq!(role.logical_address, "aws_iam_role.lambda_exec_role");
    assert_eq!(role.live_name, "lambda-exec-role-prod");
  }

  #[test]
  fn custom_production_identity() {
    let scheme = NamingScheme {
      production_environment: "main".to_string(),
      ..NamingScheme::default()
    };
    assert_eq!(scheme.live_function_name(&env("main"), &function("resize")), "resize");
    assert_eq!(scheme.live_function_name(&env("prod"), &function("resize")), "prod-resize");
  }
}
