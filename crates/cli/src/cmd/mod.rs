//! Subcommand implementations and the project context they share.

mod deploy;
mod env;
mod watch;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use fnpush_lib::build::BuildTool;
use fnpush_lib::config::Config;
use fnpush_lib::environment::ResolvedEnvironment;
use fnpush_lib::process::SystemRunner;

pub use deploy::{DeployArgs, cmd_deploy};
pub use env::cmd_env;
pub use watch::{WatchArgs, cmd_watch};

/// Single-threaded runtime; external calls run one at a time.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
  tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("Failed to create async runtime")
}

/// Project root plus the configuration loaded for it.
pub struct Project {
  pub root: PathBuf,
  pub config: Config,
}

impl Project {
  pub fn load(root: Option<&Path>, config: Option<&Path>, build_tool: Option<BuildTool>) -> Result<Self> {
    let root = match root {
      Some(root) => root.to_path_buf(),
      None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    let root = dunce::canonicalize(&root).with_context(|| format!("Project root not found: {}", root.display()))?;

    let mut config = Config::discover(&root, config)?;
    if let Some(tool) = build_tool {
      config.build.tool = tool;
      config.build.program = None;
    }

    Ok(Self { root, config })
  }

  /// Relative paths are taken from the project root.
  pub fn path_or_default(&self, path: Option<&Path>, default: &str) -> PathBuf {
    match path {
      Some(path) if path.is_absolute() => path.to_path_buf(),
      Some(path) => self.root.join(path),
      None => self.root.join(default),
    }
  }

  pub async fn resolve_environment(&self, explicit: Option<&str>) -> Result<ResolvedEnvironment> {
    self
      .config
      .resolver(&self.root)
      .resolve(&SystemRunner, explicit)
      .await
      .context("Could not determine the target environment")
  }
}
