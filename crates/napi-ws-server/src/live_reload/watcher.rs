//! Filesystem change watcher.
//!
//! Wraps a recursive `notify` watcher on the game directory and turns its raw
//! events into coalesced [`ChangeEvent`]s, skipping hidden paths.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::debouncer::{ChangeEvent, ChangeKind, EventDebouncer};

/// How often the debouncer is checked for ready events.
const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

/// Capacity of the channel between the drain task and the consumer.
const EVENT_BUFFER: usize = 100;

/// Recursive watcher over a single root directory.
///
/// Yields changes through [`next_change`](Self::next_change) until the
/// watcher is dropped. Files that exist when watching starts are never
/// reported. Dropping the watcher stops the `notify` backend and the drain
/// task.
pub struct ChangeWatcher {
    events: mpsc::Receiver<ChangeEvent>,
    watcher: Option<RecommendedWatcher>,
    drain_task: Option<JoinHandle<()>>,
}

impl ChangeWatcher {
    /// Start observing `root` recursively.
    ///
    /// Must be called from within a tokio runtime. If the root is missing or
    /// cannot be watched the failure is logged and the returned watcher
    /// yields no events.
    pub fn observe(root: &Path, window: Duration) -> Self {
        let (tx, events) = mpsc::channel(EVENT_BUFFER);

        match Self::start(root, window, tx) {
            Ok((watcher, drain_task)) => {
                tracing::debug!(root = %root.display(), "Watching directory");
                Self {
                    events,
                    watcher: Some(watcher),
                    drain_task: Some(drain_task),
                }
            }
            Err(err) => {
                tracing::warn!(
                    root = %root.display(),
                    error = %err,
                    "Cannot watch directory, live reload will not fire"
                );
                Self {
                    events,
                    watcher: None,
                    drain_task: None,
                }
            }
        }
    }

    /// Wait for the next change.
    ///
    /// Returns `None` once the watcher has stopped producing events.
    pub async fn next_change(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Whether a `notify` backend is attached.
    pub fn is_active(&self) -> bool {
        self.watcher.is_some()
    }

    fn start(
        root: &Path,
        window: Duration,
        tx: mpsc::Sender<ChangeEvent>,
    ) -> Result<(RecommendedWatcher, JoinHandle<()>), notify::Error> {
        // Backends may report canonical paths (e.g. /private/var on macOS).
        let root = root.canonicalize()?;

        let debouncer = Arc::new(EventDebouncer::new(window));
        let recorder = Arc::clone(&debouncer);
        let watch_root = root.clone();

        let mut watcher =
            notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
                Ok(event) => record_event(&event, &watch_root, &recorder),
                Err(err) => tracing::warn!(error = %err, "File watcher error"),
            })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        let drain_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(DRAIN_INTERVAL);

            loop {
                interval.tick().await;

                for event in debouncer.drain_ready() {
                    if tx.send(event).await.is_err() {
                        // Consumer gone
                        return;
                    }
                }
            }
        });

        Ok((watcher, drain_task))
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        if let Some(task) = self.drain_task.take() {
            task.abort();
        }
    }
}

/// Feed the relevant paths of a raw `notify` event into the debouncer.
fn record_event(event: &Event, root: &Path, debouncer: &EventDebouncer) {
    let Some(kind) = classify(&event.kind) else {
        return;
    };

    // A two-sided rename lists the old path first; only the new name matters.
    let paths: &[PathBuf] = if matches!(
        event.kind,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both))
    ) {
        &event.paths[event.paths.len().saturating_sub(1)..]
    } else {
        &event.paths
    };

    for path in paths {
        if is_ignored(path, root) || path.is_dir() {
            continue;
        }

        tracing::trace!(path = %path.display(), ?kind, "Recorded filesystem event");
        debouncer.record(path.clone(), kind);
    }
}

/// Map a `notify` event kind onto the changes that warrant a reload.
fn classify(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(CreateKind::Folder) => None,
        EventKind::Create(_) => Some(ChangeKind::Added),
        EventKind::Modify(ModifyKind::Metadata(_) | ModifyKind::Name(RenameMode::From)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        _ => None,
    }
}

/// Paths outside the root, or with any dot-prefixed component below it.
fn is_ignored(path: &Path, root: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return true;
    };

    relative.components().any(|component| match component {
        Component::Normal(name) => name.as_encoded_bytes().starts_with(b"."),
        _ => false,
    })
}
