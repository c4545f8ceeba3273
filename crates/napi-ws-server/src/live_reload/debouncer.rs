//! Event coalescing for the change watcher.
//!
//! Editors usually emit several filesystem events per save (truncate, write,
//! rename). The debouncer folds them into one [`ChangeEvent`] per path so a
//! single save produces a single reload.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Kind of change reported by the watcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// A file appeared under the watch root.
    Added,
    /// An existing file was written to or renamed into place.
    Modified,
}

/// A coalesced change under the watch root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Absolute path of the changed file.
    pub path: PathBuf,
    /// What happened to it.
    pub kind: ChangeKind,
}

struct PendingChange {
    kind: ChangeKind,
    deadline: Instant,
}

/// Thread-safe event debouncer.
///
/// Recording is done from the `notify` callback thread, draining from an
/// async task, so the pending map sits behind a mutex.
pub(crate) struct EventDebouncer {
    pending: Mutex<HashMap<PathBuf, PendingChange>>,
    window: Duration,
}

impl EventDebouncer {
    /// Create a new debouncer with the given coalescing window.
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            window,
        }
    }

    /// Record a raw change. Each new event for a path pushes its deadline out.
    pub(crate) fn record(&self, path: PathBuf, kind: ChangeKind) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let deadline = Instant::now() + self.window;

        match pending.entry(path) {
            Entry::Vacant(entry) => {
                entry.insert(PendingChange { kind, deadline });
            }
            Entry::Occupied(mut entry) => {
                let change = entry.get_mut();
                change.kind = Self::coalesce(change.kind, kind);
                change.deadline = deadline;
            }
        }
    }

    /// An addition absorbs any modification around it.
    fn coalesce(existing: ChangeKind, new: ChangeKind) -> ChangeKind {
        use ChangeKind::{Added, Modified};

        match (existing, new) {
            (Added, _) | (_, Added) => Added,
            (Modified, Modified) => Modified,
        }
    }

    /// Drain events whose deadline has passed, oldest deadline first.
    pub(crate) fn drain_ready(&self) -> Vec<ChangeEvent> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        let mut ready = Vec::new();
        pending.retain(|path, change| {
            if change.deadline <= now {
                ready.push((change.deadline, path.clone(), change.kind));
                false
            } else {
                true
            }
        });
        ready.sort_by_key(|(deadline, _, _)| *deadline);

        ready
            .into_iter()
            .map(|(_, path, kind)| ChangeEvent { path, kind })
            .collect()
    }

    /// Number of paths still waiting for their deadline.
    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_single_event_emitted_after_deadline() {
        let debouncer = EventDebouncer::new(Duration::from_millis(10));
        let path = PathBuf::from("/game/index.html");

        debouncer.record(path.clone(), ChangeKind::Modified);

        assert!(debouncer.drain_ready().is_empty());

        thread::sleep(Duration::from_millis(15));

        let events = debouncer.drain_ready();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].path, path);
        assert_eq!(events[0].kind, ChangeKind::Modified);

        assert!(debouncer.drain_ready().is_empty());
    }

    #[test]
    fn test_multiple_modified_events_coalesce() {
        let debouncer = EventDebouncer::new(Duration::from_millis(10));
        let path = PathBuf::from("/game/main.js");

        debouncer.record(path.clone(), ChangeKind::Modified);
        debouncer.record(path.clone(), ChangeKind::Modified);
        debouncer.record(path, ChangeKind::Modified);

        thread::sleep(Duration::from_millis(15));

        let events = debouncer.drain_ready();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ChangeKind::Modified);
    }

    #[test]
    fn test_added_then_modified_stays_added() {
        let debouncer = EventDebouncer::new(Duration::from_millis(10));
        let path = PathBuf::from("/game/level.json");

        debouncer.record(path.clone(), ChangeKind::Added);
        debouncer.record(path, ChangeKind::Modified);

        thread::sleep(Duration::from_millis(15));

        let events = debouncer.drain_ready();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ChangeKind::Added);
    }

    #[test]
    fn test_multiple_paths_independent() {
        let debouncer = EventDebouncer::new(Duration::from_millis(10));

        debouncer.record(PathBuf::from("/game/a.js"), ChangeKind::Modified);
        debouncer.record(PathBuf::from("/game/b.js"), ChangeKind::Added);

        thread::sleep(Duration::from_millis(15));

        assert_eq!(debouncer.drain_ready().len(), 2);
    }

    #[test]
    fn test_ready_events_drain_in_recording_order() {
        let debouncer = EventDebouncer::new(Duration::from_millis(10));
        let paths: Vec<_> = (0..16)
            .map(|i| PathBuf::from(format!("/game/asset{i}.png")))
            .collect();

        for path in &paths {
            debouncer.record(path.clone(), ChangeKind::Added);
            thread::sleep(Duration::from_millis(1));
        }
        thread::sleep(Duration::from_millis(15));

        let drained: Vec<_> = debouncer
            .drain_ready()
            .into_iter()
            .map(|event| event.path)
            .collect();
        assert_eq!(drained, paths);
    }

    #[test]
    fn test_zero_window_drains_immediately() {
        let debouncer = EventDebouncer::new(Duration::ZERO);

        debouncer.record(PathBuf::from("/game/a.js"), ChangeKind::Modified);

        assert_eq!(debouncer.drain_ready().len(), 1);
        assert_eq!(debouncer.pending_len(), 0);
    }

    #[test]
    fn test_new_event_extends_deadline() {
        let debouncer = EventDebouncer::new(Duration::from_millis(200));
        let path = PathBuf::from("/game/a.js");

        debouncer.record(path.clone(), ChangeKind::Modified);
        debouncer.record(path, ChangeKind::Modified);

        assert!(debouncer.drain_ready().is_empty());
        assert_eq!(debouncer.pending_len(), 1);
    }

    #[test]
    fn test_coalesce_all_combinations() {
        use ChangeKind::{Added, Modified};

        assert_eq!(EventDebouncer::coalesce(Added, Added), Added);
        assert_eq!(EventDebouncer::coalesce(Added, Modified), Added);
        assert_eq!(EventDebouncer::coalesce(Modified, Added), Added);
        assert_eq!(EventDebouncer::coalesce(Modified, Modified), Modified);
    }
}
