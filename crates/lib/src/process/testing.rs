//! Scripted [`CommandRunner`] for tests.
//!
//! Responses are matched on program name plus an argument prefix. Rules added
//! later win over earlier ones, so a test can register a broad default and
//! then override a single call with [`ScriptedRunner::once`]. Calls that match
//! no rule succeed with empty output.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{CommandOutput, CommandRunner, Invocation, RunnerError};

#[derive(Debug, Clone)]
enum Response {
  Output(CommandOutput),
  SpawnFailure,
}

#[derive(Debug)]
struct Rule {
  program: String,
  args_prefix: Vec<String>,
  response: Response,
  remaining: Option<usize>,
}

impl Rule {
  fn matches(&self, invocation: &Invocation) -> bool {
    self.program == invocation.program
      && invocation.args.len() >= self.args_prefix.len()
      && self.args_prefix.iter().zip(&invocation.args).all(|(a, b)| a == b)
  }
}

#[derive(Debug, Default)]
struct State {
  rules: Vec<Rule>,
  calls: Vec<Invocation>,
  active: usize,
  max_active: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
  state: Arc<Mutex<State>>,
  delay: Option<Duration>,
}

impl ScriptedRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Every call sleeps for `delay` before completing.
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  /// Respond to every matching call with `output`.
  pub fn on(&self, program: &str, args_prefix: &[&str], output: CommandOutput) -> &Self {
    self.push(program, args_prefix, Response::Output(output), None)
  }

  /// Respond to the next matching call only.
  pub fn once(&self, program: &str, args_prefix: &[&str], output: CommandOutput) -> &Self {
    self.push(program, args_prefix, Response::Output(output), Some(1))
  }

  /// Matching calls fail as if the binary were missing.
  pub fn fail_spawn(&self, program: &str) -> &Self {
    self.push(program, &[], Response::SpawnFailure, None)
  }

  fn push(&self, program: &str, args_prefix: &[&str], response: Response, remaining: Option<usize>) -> &Self {
    self.state.lock().unwrap().rules.push(Rule {
      program: program.to_string(),
      args_prefix: args_prefix.iter().map(|s| s.to_string()).collect(),
      response,
      remaining,
    });
    self
  }

  pub fn calls(&self) -> Vec<Invocation> {
    self.state.lock().unwrap().calls.clone()
  }

  /// Argument lists of every call made to `program`, in order.
  pub fn calls_to(&self, program: &str) -> Vec<Vec<String>> {
    self
      .calls()
      .into_iter()
      .filter(|call| call.program == program)
      .map(|call| call.args)
      .collect()
  }

  /// Highest number of calls that were in flight at the same time.
  pub fn max_concurrency(&self) -> usize {
    self.state.lock().unwrap().max_active
  }

  fn begin(&self, invocation: &Invocation) -> Response {
    let mut state = self.state.lock().unwrap();
    state.calls.push(invocation.clone());
    state.active += 1;
    state.max_active = state.max_active.max(state.active);

    let index = state.rules.iter().rposition(|rule| rule.matches(invocation));
    let Some(index) = index else {
      return Response::Output(CommandOutput::ok(""));
    };

    let rule = &mut state.rules[index];
    let response = rule.response.clone();
    let exhausted = match rule.remaining.as_mut() {
      Some(remaining) => {
        *remaining -= 1;
        *remaining == 0
      }
      None => false,
    };
    if exhausted {
      state.rules.remove(index);
    }
    response
  }

  fn end(&self) {
    self.state.lock().unwrap().active -= 1;
  }
}

impl CommandRunner for ScriptedRunner {
  async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RunnerError> {
    let response = self.begin(invocation);
    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    self.end();

    match response {
      Response::Output(output) => Ok(output),
      Response::SpawnFailure => Err(RunnerError::Spawn {
        program: invocation.program.clone(),
        source: io::Error::new(io::ErrorKind::NotFound, "scripted spawn failure"),
      }),
    }
  }
}
