//! Filesystem change notifications for the registry.
//!
//! # Architecture
//!
//! ```text
//! notify::RecommendedWatcher (one recursive watch per root)
//!         |
//!    mpsc channel
//!         |
//! ChangeWatcher::run ──► plan_actions ──► Registrar::sync_path / forget_path
//! ```

mod change_watcher;
mod error;
mod handler;

pub use change_watcher::ChangeWatcher;
pub use error::WatchError;
pub use handler::{WatchAction, plan_actions};
