//! File registry: what is tracked and where each file can be fetched.
//!
//! # Architecture
//!
//! ```text
//! WatcherConfig ──► Registrar ──walk──► Registry ◄── HTTP handlers
//!                       ▲                  (mutex)
//!                       └── change events (sync_path)
//! ```

mod entry;
mod error;
mod store;
mod walker;

pub use entry::{FileEntry, UrlBuilder};
pub use error::{RegistryError, RegistryResult};
pub use store::Registry;
pub use walker::{Registrar, Root, WalkReport};
