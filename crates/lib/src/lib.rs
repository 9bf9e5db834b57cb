//! fnpush-lib: incremental single-function deployment.
//!
//! The crate wires together the pieces of one deployment run:
//! - `environment`: resolves the per-branch environment identity
//! - `naming`: logical terraform addresses vs. live cloud names
//! - `cloud`: existence checks and invocation through the aws CLI
//! - `terraform`: best-effort import and the scoped init/plan/apply
//! - `build`: the external artifact build
//! - `pipeline`: one full reconciliation run
//! - `watch`: the serialized, change-driven redeploy loop

pub mod build;
pub mod cloud;
pub mod config;
pub mod consts;
pub mod environment;
pub mod naming;
pub mod pipeline;
pub mod process;
pub mod terraform;
pub mod watch;
