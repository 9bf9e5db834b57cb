//! Decides which file events are worth a deployment run.
//!
//! Rejected: access events, anything under a dot-prefixed path component
//! (editor swap files, `.git`, build caches), events during the settle window
//! right after the watcher starts, and saves that leave a file's content
//! unchanged since the last accepted event. After a failed run the recorded
//! hashes are forgotten, so any save retries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tracing::trace;
use walkdir::WalkDir;

use super::event::{ChangeEvent, ChangeKind};

#[derive(Debug)]
pub struct EventFilter {
  root: PathBuf,
  include_dotfiles: bool,
  settle_until: Instant,
  hashes: HashMap<PathBuf, String>,
}

impl EventFilter {
  pub fn new(root: impl Into<PathBuf>, include_dotfiles: bool, settle: Duration) -> Self {
    Self {
      root: root.into(),
      include_dotfiles,
      settle_until: Instant::now() + settle,
      hashes: HashMap::new(),
    }
  }

  /// Records the current content of every file under the root, so the first
  /// save of an unmodified file is not mistaken for a change.
  pub fn prime(&mut self) {
    let files = WalkDir::new(&self.root)
      .into_iter()
      .filter_map(Result::ok)
      .filter(|entry| entry.file_type().is_file());

    for entry in files {
      if let Some(hash) = content_hash(entry.path()) {
        self.hashes.insert(entry.path().to_path_buf(), hash);
      }
    }
    trace!(files = self.hashes.len(), "primed content hashes");
  }

  /// Drops every recorded hash. Called after a failed run so that saving
  /// a file again, even with the same content, retries the deployment.
  pub fn forget(&mut self) {
    self.hashes.clear();
  }

  pub fn accept(&mut self, event: &ChangeEvent) -> bool {
    if event.kind == ChangeKind::Access {
      return false;
    }
    if Instant::now() < self.settle_until {
      trace!(path = %event.path.display(), "ignoring event during settle window");
      return false;
    }
    if !self.include_dotfiles && self.is_hidden(&event.path) {
      trace!(path = %event.path.display(), "ignoring hidden path");
      return false;
    }

    if event.kind == ChangeKind::Removed {
      self.hashes.remove(&event.path);
      return true;
    }

    // Directories and files that vanished before we could read them still count.
    let Some(hash) = content_hash(&event.path) else {
      return true;
    };
    if self.hashes.get(&event.path) == Some(&hash) {
      trace!(path = %event.path.display(), "content unchanged");
      return false;
    }
    self.hashes.insert(event.path.clone(), hash);
    true
  }

  fn is_hidden(&self, path: &Path) -> bool {
    let relative = path.strip_prefix(&self.root).unwrap_or(path);
    relative
      .components()
      .any(|component| component.as_os_str().to_string_lossy().starts_with('.'))
  }
}

fn content_hash(path: &Path) -> Option<String> {
  let content = std::fs::read(path).ok()?;
  Some(hex::encode(Sha256::digest(&content)))
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;

  fn filter(root: &Path) -> EventFilter {
    EventFilter::new(root, false, Duration::ZERO)
  }

  #[test]
  fn accepts_modified_source_file() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("index.js");
    std::fs::write(&file, "exports.handler = 1").unwrap();

    let mut filter = filter(temp.path());
    assert!(filter.accept(&ChangeEvent::new(&file, ChangeKind::Modified)));
  }

  #[test]
  fn skips_dotfiles_and_dot_directories() {
    let temp = TempDir::new().unwrap();
    let mut filter = filter(temp.path());

    assert!(!filter.accept(&ChangeEvent::new(temp.path().join(".index.js.swp"), ChangeKind::Modified)));
    assert!(!filter.accept(&ChangeEvent::new(temp.path().join(".cache/out.js"), ChangeKind::Created)));
  }

  #[test]
  fn dotfiles_allowed_when_configured() {
    let temp = TempDir::new().unwrap();
    let mut filter = EventFilter::new(temp.path(), true, Duration::ZERO);

    assert!(filter.accept(&ChangeEvent::new(temp.path().join(".env"), ChangeKind::Modified)));
  }

  #[test]
  fn hidden_check_is_relative_to_root() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join(".workspace").join("functions").join("resize");
    let mut filter = filter(&root);

    assert!(filter.accept(&ChangeEvent::new(root.join("index.js"), ChangeKind::Removed)));
  }

  #[test]
  fn ignores_access_events() {
    let temp = TempDir::new().unwrap();
    let mut filter = filter(temp.path());

    assert!(!filter.accept(&ChangeEvent::new(temp.path().join("index.js"), ChangeKind::Access)));
  }

  #[test]
  fn settle_window_drops_startup_burst() {
    let temp = TempDir::new().unwrap();
    let mut filter = EventFilter::new(temp.path(), false, Duration::from_secs(60));

    assert!(!filter.accept(&ChangeEvent::new(temp.path().join("index.js"), ChangeKind::Created)));
  }

  #[test]
  fn unchanged_content_is_skipped() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("index.js");
    std::fs::write(&file, "v1").unwrap();

    let mut filter = filter(temp.path());
    filter.prime();

    assert!(!filter.accept(&ChangeEvent::new(&file, ChangeKind::Modified)));

    std::fs::write(&file, "v2").unwrap();
    assert!(filter.accept(&ChangeEvent::new(&file, ChangeKind::Modified)));
    assert!(!filter.accept(&ChangeEvent::new(&file, ChangeKind::Modified)));
  }

  #[test]
  fn forgotten_hashes_let_identical_save_through() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("index.js");
    std::fs::write(&file, "v1").unwrap();

    let mut filter = filter(temp.path());
    filter.prime();
    filter.forget();

    assert!(filter.accept(&ChangeEvent::new(&file, ChangeKind::Modified)));
    assert!(!filter.accept(&ChangeEvent::new(&file, ChangeKind::Modified)));
  }

  #[test]
  fn removal_always_counts() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("index.js");
    std::fs::write(&file, "v1").unwrap();

    let mut filter = filter(temp.path());
    filter.prime();
    std::fs::remove_file(&file).unwrap();

    assert!(filter.accept(&ChangeEvent::new(&file, ChangeKind::Removed)));
  }
}
