//! Change-driven redeploy loop.
//!
//! The loop owns the [`RunSlot`] for its (environment, function) pair and is
//! the only place runs are started, so two runs can never touch the terraform
//! state at the same time. A failed run is logged and the loop goes back to
//! waiting; only shutdown or the end of the event stream stops it.

mod event;
mod filter;
mod slot;
mod source;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

pub use event::{ChangeEvent, ChangeKind};
pub use filter::EventFilter;
pub use slot::{Admission, RunOutcome, RunSlot, SlotState};
pub use source::{WatchError, watch_directory};

use crate::pipeline::{Pipeline, PipelineError, RunReport};
use crate::process::CommandRunner;

type RunResult = Result<RunReport, PipelineError>;

#[derive(Debug, Clone)]
pub struct WatchOptions {
  /// Directory whose changes trigger runs.
  pub root: PathBuf,
  pub include_dotfiles: bool,
  pub settle: Duration,
}

/// Totals reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
  pub runs_started: usize,
  pub completed: usize,
  pub failed: usize,
}

pub struct WatchLoop<R> {
  pipeline: Arc<Pipeline<R>>,
  filter: EventFilter,
  slot: RunSlot,
}

impl<R: CommandRunner + 'static> WatchLoop<R> {
  pub fn new(pipeline: Pipeline<R>, options: WatchOptions) -> Self {
    let mut filter = EventFilter::new(options.root, options.include_dotfiles, options.settle);
    filter.prime();
    let slot = RunSlot::new(pipeline.environment().clone(), pipeline.function().clone());
    Self {
      pipeline: Arc::new(pipeline),
      filter,
      slot,
    }
  }

  /// Processes events until `shutdown` resolves or the event stream closes.
  ///
  /// When the stream closes, in-flight and queued runs are allowed to finish.
  /// On shutdown the loop returns immediately; an active run is abandoned.
  pub async fn run(
    mut self,
    mut events: UnboundedReceiver<ChangeEvent>,
    shutdown: impl Future<Output = ()>,
  ) -> WatchSummary {
    tokio::pin!(shutdown);
    let mut runs: JoinSet<RunResult> = JoinSet::new();

    loop {
      tokio::select! {
        _ = &mut shutdown => {
          if !runs.is_empty() {
            warn!("stopping during an active run; terraform state may be left mid-operation");
          }
          break;
        }
        Some(joined) = runs.join_next() => self.on_run_finished(joined, &mut runs),
        event = events.recv() => match event {
          Some(event) => self.on_event(event, &mut runs),
          None => {
            debug!("event stream closed; draining runs");
            while let Some(joined) = runs.join_next().await {
              self.on_run_finished(joined, &mut runs);
            }
            break;
          }
        },
      }
    }

    self.summary()
  }

  fn on_event(&mut self, event: ChangeEvent, runs: &mut JoinSet<RunResult>) {
    if !self.filter.accept(&event) {
      return;
    }

    match self.slot.request() {
      Admission::Start => {
        info!(path = %event.path.display(), "change detected; rebuilding and applying");
        self.spawn_run(runs);
      }
      Admission::Queued => {
        info!(path = %event.path.display(), "change detected during a run; queued one more run");
      }
      Admission::Coalesced => {
        debug!(path = %event.path.display(), "change folded into queued run");
      }
    }
  }

  fn on_run_finished(&mut self, joined: Result<RunResult, JoinError>, runs: &mut JoinSet<RunResult>) {
    let outcome = match joined {
      Ok(Ok(report)) => {
        info!(
          function = %report.function,
          environment = %report.environment,
          live_name = %report.live_name,
          role = %report.role_import,
          import = %report.function_import,
          elapsed_ms = report.elapsed.as_millis() as u64,
          "deployed; waiting for more changes"
        );
        RunOutcome::Completed
      }
      Ok(Err(err)) => {
        error!(
          function = %self.slot.function(),
          environment = %self.slot.environment(),
          error = %err,
          "run failed; save again to retry"
        );
        RunOutcome::Failed
      }
      Err(err) => {
        error!(
          function = %self.slot.function(),
          environment = %self.slot.environment(),
          error = %err,
          "run aborted"
        );
        RunOutcome::Failed
      }
    };

    if outcome == RunOutcome::Failed {
      self.filter.forget();
    }

    if self.slot.finish(outcome) {
      info!(function = %self.slot.function(), "starting queued run");
      self.spawn_run(runs);
    }
  }

  fn spawn_run(&self, runs: &mut JoinSet<RunResult>) {
    let pipeline = Arc::clone(&self.pipeline);
    runs.spawn(async move { pipeline.run().await });
  }

  fn summary(&self) -> WatchSummary {
    WatchSummary {
      runs_started: self.slot.runs_started(),
      completed: self.slot.completed(),
      failed: self.slot.failed(),
    }
  }
}
