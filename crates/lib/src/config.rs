//! Project configuration.
//!
//! Settings come from an optional `fnpush.toml` in the project root. Every key
//! has a default matching the conventional layout (`functions/<id>` sources,
//! a `terraform/` directory, bash build script), so most projects need no
//! file at all. The CLI applies its flags on top of the loaded values.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::debug;

use crate::build::{BuildCommand, BuildInvoker, BuildTool};
use crate::cloud::AwsCli;
use crate::consts::CONFIG_FILENAME;
use crate::environment::EnvironmentResolver;
use crate::naming::{DEFAULT_PRODUCTION_ENVIRONMENT, DEFAULT_ROLE_ADDRESS, DEFAULT_ROLE_NAME_PREFIX, NamingScheme};
use crate::terraform::{DEFAULT_ENVIRONMENT_VARIABLE, DEFAULT_PLAN_FILE, Terraform};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  /// Directory holding one source directory per function.
  pub functions_dir: PathBuf,
  /// Terraform working directory.
  pub terraform_dir: PathBuf,
  /// Environment whose live names carry no prefix.
  pub production_environment: String,
  /// Terraform input variable that receives the environment.
  pub environment_variable: String,
  pub plan_file: String,
  /// Passed to every aws call as `--region` when set.
  pub region: Option<String>,
  pub build: BuildConfig,
  pub role: RoleConfig,
  pub tools: ToolsConfig,
  pub watch: WatchConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      functions_dir: PathBuf::from("functions"),
      terraform_dir: PathBuf::from("terraform"),
      production_environment: DEFAULT_PRODUCTION_ENVIRONMENT.to_string(),
      environment_variable: DEFAULT_ENVIRONMENT_VARIABLE.to_string(),
      plan_file: DEFAULT_PLAN_FILE.to_string(),
      region: None,
      build: BuildConfig::default(),
      role: RoleConfig::default(),
      tools: ToolsConfig::default(),
      watch: WatchConfig::default(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
  pub tool: BuildTool,
  /// Custom build program; overrides `tool` when set.
  pub program: Option<String>,
  pub args: Vec<String>,
}

impl BuildConfig {
  pub fn command(&self) -> BuildCommand {
    match &self.program {
      Some(program) => BuildCommand::new(program.as_str(), self.args.iter().map(String::as_str)),
      None => self.tool.command(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoleConfig {
  pub logical_address: String,
  pub name_prefix: String,
}

impl Default for RoleConfig {
  fn default() -> Self {
    Self {
      logical_address: DEFAULT_ROLE_ADDRESS.to_string(),
      name_prefix: DEFAULT_ROLE_NAME_PREFIX.to_string(),
    }
  }
}

/// Executable names or paths of the external tools.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
  pub git: String,
  pub aws: String,
  pub terraform: String,
}

impl Default for ToolsConfig {
  fn default() -> Self {
    Self {
      git: "git".to_string(),
      aws: "aws".to_string(),
      terraform: "terraform".to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
  /// Events arriving this soon after the watcher starts are dropped.
  #[serde(deserialize_with = "deserialize_duration")]
  pub settle: Duration,
  pub include_dotfiles: bool,
}

impl Default for WatchConfig {
  fn default() -> Self {
    Self {
      settle: Duration::from_millis(500),
      include_dotfiles: false,
    }
  }
}

fn deserialize_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
  let raw = String::deserialize(deserializer)?;
  humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

impl Config {
  pub fn from_toml(path: &Path, content: &str) -> Result<Self, ConfigError> {
    toml::from_str(content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_toml(path, &content)
  }

  /// Loads `explicit` if given, else `fnpush.toml` under `project_root` when
  /// present, else the defaults.
  pub fn discover(project_root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
    if let Some(path) = explicit {
      return Self::load(path);
    }

    let candidate = project_root.join(CONFIG_FILENAME);
    if candidate.is_file() {
      debug!(path = %candidate.display(), "loading project config");
      Self::load(&candidate)
    } else {
      debug!(root = %project_root.display(), "no project config; using defaults");
      Ok(Self::default())
    }
  }

  pub fn resolver(&self, project_root: &Path) -> EnvironmentResolver {
    EnvironmentResolver::new(&self.tools.git, project_root)
  }

  pub fn naming(&self) -> NamingScheme {
    NamingScheme {
      production_environment: self.production_environment.clone(),
      role_address: self.role.logical_address.clone(),
      role_name_prefix: self.role.name_prefix.clone(),
    }
  }

  pub fn aws(&self) -> AwsCli {
    AwsCli::new(&self.tools.aws, self.region.clone())
  }

  pub fn terraform(&self, project_root: &Path) -> Terraform {
    Terraform::new(&self.tools.terraform, project_root.join(&self.terraform_dir))
      .with_variable(&self.environment_variable)
      .with_plan_file(&self.plan_file)
  }

  pub fn build_invoker(&self, project_root: &Path) -> BuildInvoker {
    BuildInvoker::new(
      self.build.command(),
      project_root,
      project_root.join(&self.functions_dir),
    )
  }
}
