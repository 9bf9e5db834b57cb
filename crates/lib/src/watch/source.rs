//! Bridges notify's callback thread onto a tokio channel.

use std::path::{Path, PathBuf};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tracing::warn;

use super::event::ChangeEvent;

#[derive(Debug, Error)]
pub enum WatchError {
  #[error("watched directory not found: {0}")]
  MissingDirectory(PathBuf),

  #[error("failed to watch {path}: {source}")]
  Notify {
    path: PathBuf,
    #[source]
    source: notify::Error,
  },
}

/// Recursively watches `dir`. Events stop when the returned watcher is dropped.
pub fn watch_directory(dir: &Path) -> Result<(RecommendedWatcher, UnboundedReceiver<ChangeEvent>), WatchError> {
  if !dir.is_dir() {
    return Err(WatchError::MissingDirectory(dir.to_path_buf()));
  }

  let (tx, rx) = unbounded_channel();
  let notify_error = |source| WatchError::Notify {
    path: dir.to_path_buf(),
    source,
  };

  let mut watcher = RecommendedWatcher::new(
    move |res: Result<Event, notify::Error>| match res {
      Ok(event) => {
        for change in ChangeEvent::from_notify(event) {
          // The receiver only goes away during shutdown.
          let _ = tx.send(change);
        }
      }
      Err(err) => warn!(error = %err, "file watcher error"),
    },
    Config::default(),
  )
  .map_err(notify_error)?;

  watcher.watch(dir, RecursiveMode::Recursive).map_err(notify_error)?;
  Ok((watcher, rx))
}
