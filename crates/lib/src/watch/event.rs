//! File change events.

use std::path::PathBuf;

use notify::EventKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
  Created,
  Modified,
  Removed,
  /// Reads and opens; never trigger a run.
  Access,
  Other,
}

impl From<&EventKind> for ChangeKind {
  fn from(kind: &EventKind) -> Self {
    match kind {
      EventKind::Create(_) => ChangeKind::Created,
      EventKind::Modify(_) => ChangeKind::Modified,
      EventKind::Remove(_) => ChangeKind::Removed,
      EventKind::Access(_) => ChangeKind::Access,
      EventKind::Any | EventKind::Other => ChangeKind::Other,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
  pub path: PathBuf,
  pub kind: ChangeKind,
}

impl ChangeEvent {
  pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
    Self {
      path: path.into(),
      kind,
    }
  }

  /// Splits a notify event into one change per affected path.
  pub fn from_notify(event: notify::Event) -> Vec<Self> {
    let kind = ChangeKind::from(&event.kind);
    event.paths.into_iter().map(|path| Self { path, kind }).collect()
  }
}

#[cfg(test)]
mod tests {
  use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};

  use super::*;

  #[test]
  fn maps_notify_kinds() {
    assert_eq!(ChangeKind::from(&EventKind::Create(CreateKind::File)), ChangeKind::Created);
    assert_eq!(ChangeKind::from(&EventKind::Modify(ModifyKind::Any)), ChangeKind::Modified);
    assert_eq!(ChangeKind::from(&EventKind::Remove(RemoveKind::File)), ChangeKind::Removed);
    assert_eq!(ChangeKind::from(&EventKind::Access(AccessKind::Any)), ChangeKind::Access);
    assert_eq!(ChangeKind::from(&EventKind::Any), ChangeKind::Other);
  }

  #[test]
  fn one_change_per_path() {
    let event = notify::Event::new(EventKind::Modify(ModifyKind::Any))
      .add_path(PathBuf::from("functions/resize/index.js"))
      .add_path(PathBuf::from("functions/resize/lib.js"));

    let changes = ChangeEvent::from_notify(event);

    assert_eq!(
      changes,
      vec![
        ChangeEvent::new("functions/resize/index.js", ChangeKind::Modified),
        ChangeEvent::new("functions/resize/lib.js", ChangeKind::Modified),
      ]
    );
  }
}
