//! Live reload system for watch mode.
//!
//! Watches the game directory and pushes reload notifications over
//! server-sent events to every connected browser tab.

mod broadcast;
mod debouncer;
mod endpoint;
mod manager;
mod watcher;

pub use broadcast::{BroadcastChannel, ConnectionId, RELOAD_DATA, Subscription};
pub use debouncer::{ChangeEvent, ChangeKind};
pub use endpoint::LIVE_RELOAD_PATH;
pub(crate) use endpoint::sse_handler;
pub use manager::DEFAULT_DEBOUNCE_MS;
pub(crate) use manager::LiveReloadManager;
pub use watcher::ChangeWatcher;
