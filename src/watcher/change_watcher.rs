//! Background consumer of filesystem change notifications.

use std::path::Path;
use std::sync::Arc;

use notify::{Event, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::error::WatchError;
use super::handler::{WatchAction, plan_actions};
use crate::registry::Registrar;

/// Receives notify events for every configured root and keeps the registry
/// in step with them.
///
/// With `sync_registry` off, events are logged and otherwise ignored, so
/// entries may go stale until restart.
///
/// Event paths reported under a root's canonical location are mapped back to
/// the configured root before the registry is touched.
pub struct ChangeWatcher {
    registrar: Arc<Registrar>,
    sync_registry: bool,
    /// Channel for receiving file events.
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    /// The underlying file watcher; `None` when events are fed in directly.
    watcher: Option<notify::RecommendedWatcher>,
}

impl ChangeWatcher {
    /// Create a watcher backed by the platform's notification mechanism.
    ///
    /// Fails only if the notification backend cannot be constructed.
    pub fn new(registrar: Arc<Registrar>, sync_registry: bool) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::channel(100);

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        Ok(Self {
            registrar,
            sync_registry,
            event_rx: rx,
            watcher: Some(watcher),
        })
    }

    /// Create a watcher that consumes events from an existing channel.
    pub fn from_channel(
        registrar: Arc<Registrar>,
        sync_registry: bool,
        event_rx: mpsc::Receiver<notify::Result<Event>>,
    ) -> Self {
        Self {
            registrar,
            sync_registry,
            event_rx,
            watcher: None,
        }
    }

    /// Subscribe to changes under `root`, recursively.
    pub fn watch_root(&mut self, root: &Path) -> Result<(), WatchError> {
        let Some(watcher) = self.watcher.as_mut() else {
            return Ok(());
        };

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: root.to_path_buf(),
                reason: e.to_string(),
            })?;

        crate::debug_event!("watcher", "watching", "{}", root.display());
        Ok(())
    }

    /// Subscribe to every resolved root, logging the ones that fail.
    ///
    /// Returns the number of roots now being watched.
    pub fn watch_all_roots(&mut self) -> usize {
        let roots: Vec<_> = self.registrar.roots().to_vec();
        let mut watched = 0;

        for root in roots {
            match self.watch_root(&root.path) {
                Ok(()) => watched += 1,
                Err(e) => tracing::warn!("[watcher] {}: {e}", root.label),
            }
        }

        watched
    }

    /// Consume events until the channel closes.
    pub async fn run(mut self) {
        crate::log_event!(
            "watcher",
            "started",
            "registry sync {}",
            if self.sync_registry { "on" } else { "off" }
        );

        while let Some(res) = self.event_rx.recv().await {
            match res {
                Ok(event) => self.handle_event(event).await,
                Err(e) => {
                    let error = WatchError::EventError {
                        details: e.to_string(),
                    };
                    tracing::error!("[watcher] {error}");
                }
            }
        }

        crate::log_event!("watcher", "stopped", "event channel closed");
    }

    async fn handle_event(&self, event: Event) {
        for action in plan_actions(&event) {
            self.execute_action(action).await;
        }
    }

    async fn execute_action(&self, action: WatchAction) {
        match action {
            WatchAction::Sync { path } => {
                crate::debug_event!("watcher", "changed", "{}", path.display());
                if self.sync_registry {
                    self.sync(path).await;
                }
            }
            WatchAction::Modified { path } => {
                crate::log_event!("watcher", "modified", "{}", path.display());
                if self.sync_registry {
                    self.sync(path).await;
                }
            }
            WatchAction::Forget { path } => {
                crate::debug_event!("watcher", "deleted", "{}", path.display());
                if self.sync_registry {
                    self.registrar.forget_path(&path);
                }
            }
            WatchAction::None => {}
        }
    }

    /// Re-examine `path` on the blocking pool; walking may touch many files.
    async fn sync(&self, path: std::path::PathBuf) {
        let registrar = self.registrar.clone();
        let target = path.clone();

        match tokio::task::spawn_blocking(move || registrar.sync_path(&target)).await {
            Ok(Ok(0)) => {}
            Ok(Ok(count)) => {
                crate::debug_event!("watcher", "synced", "{count} entries at {}", path.display());
            }
            Ok(Err(e)) => tracing::warn!("[watcher] sync failed: {e}"),
            Err(e) => tracing::error!("[watcher] sync task failed: {e}"),
        }
    }
}
