//! Run admission for one (environment, function) pair.
//!
//! At most one run is in flight. Changes that arrive while a run is active set
//! a single pending flag, so any burst of events during a run produces exactly
//! one follow-up run.

use crate::naming::{EnvironmentId, FunctionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
  Idle,
  Running,
  /// Running, with one more run owed once it finishes.
  RunningWithPending,
}

/// Answer to a run request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
  /// Start a run now.
  Start,
  /// A run is active; one more will follow it.
  Queued,
  /// A follow-up run is already queued; the request was folded into it.
  Coalesced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
  Completed,
  Failed,
}

#[derive(Debug)]
pub struct RunSlot {
  environment: EnvironmentId,
  function: FunctionId,
  state: SlotState,
  runs_started: usize,
  completed: usize,
  failed: usize,
}

impl RunSlot {
  pub fn new(environment: EnvironmentId, function: FunctionId) -> Self {
    Self {
      environment,
      function,
      state: SlotState::Idle,
      runs_started: 0,
      completed: 0,
      failed: 0,
    }
  }

  pub fn environment(&self) -> &EnvironmentId {
    &self.environment
  }

  pub fn function(&self) -> &FunctionId {
    &self.function
  }

  pub fn state(&self) -> SlotState {
    self.state
  }

  pub fn is_idle(&self) -> bool {
    self.state == SlotState::Idle
  }

  pub fn request(&mut self) -> Admission {
    match self.state {
      SlotState::Idle => {
        self.state = SlotState::Running;
        self.runs_started += 1;
        Admission::Start
      }
      SlotState::Running => {
        self.state = SlotState::RunningWithPending;
        Admission::Queued
      }
      SlotState::RunningWithPending => Admission::Coalesced,
    }
  }

  /// Records the end of the active run. Returns `true` when the queued run
  /// should start immediately; the slot then stays `Running`.
  pub fn finish(&mut self, outcome: RunOutcome) -> bool {
    match outcome {
      RunOutcome::Completed => self.completed += 1,
      RunOutcome::Failed => self.failed += 1,
    }

    match self.state {
      SlotState::RunningWithPending => {
        self.state = SlotState::Running;
        self.runs_started += 1;
        true
      }
      SlotState::Running | SlotState::Idle => {
        self.state = SlotState::Idle;
        false
      }
    }
  }

  pub fn runs_started(&self) -> usize {
    self.runs_started
  }

  pub fn completed(&self) -> usize {
    self.completed
  }

  pub fn failed(&self) -> usize {
    self.failed
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn slot() -> RunSlot {
    RunSlot::new(
      EnvironmentId::normalize("dev").unwrap(),
      FunctionId::parse("resize").unwrap(),
    )
  }

  #[test]
  fn idle_request_starts_a_run() {
    let mut slot = slot();
    assert!(slot.is_idle());
    assert_eq!(slot.request(), Admission::Start);
    assert_eq!(slot.state(), SlotState::Running);
  }

  #[test]
  fn burst_during_run_queues_exactly_one() {
    let mut slot = slot();
    slot.request();

    assert_eq!(slot.request(), Admission::Queued);
    for _ in 0..10 {
      assert_eq!(slot.request(), Admission::Coalesced);
    }

    assert!(slot.finish(RunOutcome::Completed));
    assert_eq!(slot.state(), SlotState::Running);
    assert!(!slot.finish(RunOutcome::Completed));
    assert!(slot.is_idle());
    assert_eq!(slot.runs_started(), 2);
  }

  #[test]
  fn failure_returns_to_idle() {
    let mut slot = slot();
    slot.request();

    assert!(!slot.finish(RunOutcome::Failed));
    assert!(slot.is_idle());
    assert_eq!(slot.failed(), 1);

    assert_eq!(slot.request(), Admission::Start);
    assert!(!slot.finish(RunOutcome::Completed));
    assert_eq!(slot.completed(), 1);
  }

  #[test]
  fn failed_run_still_honours_pending_request() {
    let mut slot = slot();
    slot.request();
    slot.request();

    assert!(slot.finish(RunOutcome::Failed));
    assert_eq!(slot.runs_started(), 2);
  }
}
