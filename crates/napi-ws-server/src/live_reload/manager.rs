//! Live reload manager.
//!
//! Connects the change watcher to the broadcast channel for the lifetime of
//! the server.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::task::JoinHandle;

use super::broadcast::{BroadcastChannel, Subscription};
use super::debouncer::ChangeKind;
use super::watcher::ChangeWatcher;

/// Default coalescing window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Owns the watch task and the set of push connections.
pub(crate) struct LiveReloadManager {
    root: PathBuf,
    channel: BroadcastChannel,
    debounce: Duration,
    task: Option<JoinHandle<()>>,
}

impl LiveReloadManager {
    /// Create a manager for `root`. Nothing is watched until [`start`](Self::start).
    pub(crate) fn new(root: PathBuf) -> Self {
        Self {
            root,
            channel: BroadcastChannel::new(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            task: None,
        }
    }

    /// Set the coalescing window in milliseconds.
    #[must_use]
    pub(crate) fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce = Duration::from_millis(debounce_ms);
        self
    }

    /// Start watching and broadcasting.
    ///
    /// Spawns a task that forwards every change to all push connections.
    /// Watch failures are logged by the watcher; the task then ends quietly
    /// and the push endpoint keeps accepting connections.
    pub(crate) fn start(&mut self) {
        let mut watcher = ChangeWatcher::observe(&self.root, self.debounce);
        let channel = self.channel.clone();
        let root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());

        self.task = Some(tokio::spawn(async move {
            while let Some(change) = watcher.next_change().await {
                let path = display_path(&change.path, &root);
                let clients = channel.broadcast();

                match change.kind {
                    ChangeKind::Added => tracing::info!(%path, clients, "File added"),
                    ChangeKind::Modified => tracing::info!(%path, clients, "File changed"),
                }
            }

            tracing::debug!("Change watcher stopped");
        }));
    }

    /// Register a new push connection.
    pub(crate) fn subscribe(&self) -> Subscription {
        self.channel.subscribe()
    }

    /// Handle to the push connection set.
    #[cfg(test)]
    pub(crate) fn channel(&self) -> &BroadcastChannel {
        &self.channel
    }

    /// Stop watching and close every push connection.
    pub(crate) fn shutdown(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
        self.channel.close_all();
    }
}

impl Drop for LiveReloadManager {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Path relative to the root for log output, falling back to the full path.
fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
