//! Implementation of the `fnpush env` command.
//!
//! Prints the environment a deploy would target and, for a function, the
//! logical address and live name of every resource it touches.

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use fnpush_lib::environment::{EnvironmentSource, ResolvedEnvironment};
use fnpush_lib::naming::{FunctionId, ResourceTarget};

use super::Project;
use crate::output::{OutputFormat, print_json, print_mapping, print_stat, print_success};

#[derive(Serialize)]
struct EnvReport {
  environment: ResolvedEnvironment,
  production: bool,
  role: ResourceTarget,
  #[serde(skip_serializing_if = "Option::is_none")]
  function: Option<FunctionReport>,
}

#[derive(Serialize)]
struct FunctionReport {
  id: FunctionId,
  source_dir: PathBuf,
  target: ResourceTarget,
}

/// Execute the env command.
///
/// Prints the resolved environment and, when a function is given, the
/// logical address and live name of each resource it touches.
pub fn cmd_env(project: &Project, function: Option<&str>, environment: Option<&str>, format: OutputFormat) -> Result<()> {
  let function = function.map(FunctionId::parse).transpose()?;

  let rt = super::runtime()?;
  let resolved = rt.block_on(project.resolve_environment(environment))?;

  let naming = project.config.naming();
  let builder = project.config.build_invoker(&project.root);
  let report = EnvReport {
    production: naming.is_production(&resolved.id),
    role: naming.role_target(&resolved.id),
    function: function.map(|id| FunctionReport {
      source_dir: builder.source_dir(&id),
      target: naming.function_target(&resolved.id, &id),
      id,
    }),
    environment: resolved,
  };

  if format.is_json() {
    return print_json(&report);
  }

  print_success(&format!(
    "Environment: {} ({})",
    report.environment.id,
    describe_source(report.environment.source)
  ));
  print_stat("Production", if report.production { "yes" } else { "no" });
  print_mapping("Role", &report.role.logical_address, &report.role.live_name);
  if let Some(function) = &report.function {
    print_mapping("Function", &function.target.logical_address, &function.target.live_name);
    print_stat("Source", &function.source_dir.display().to_string());
  }

  Ok(())
}

fn describe_source(source: EnvironmentSource) -> &'static str {
  match source {
    EnvironmentSource::Explicit => "from --environment",
    EnvironmentSource::Variable => "from FNPUSH_ENVIRONMENT",
    EnvironmentSource::GitBranch => "from the current git branch",
  }
}
