//! Watches labeled directory trees and serves a registry of matching files.
//!
//! At startup every configured `label -> directory` root is walked and each
//! file whose name ends in a configured extension is recorded as a
//! [`FileEntry`] with a synthesized URL. The registry is then exposed at
//! `/registry.json`, and file contents at `/files/<label>/<path>`.

pub mod cli;
pub mod config;
pub mod logging;
pub mod registry;
pub mod server;
pub mod watcher;

pub use config::{Settings, WatcherConfig};
pub use registry::{FileEntry, Registrar, Registry, UrlBuilder};
pub use server::{router, serve_http};
pub use watcher::ChangeWatcher;
