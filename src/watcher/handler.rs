//! Translation of raw notify events into registry actions.

use std::path::PathBuf;

use notify::{Event, EventKind};

/// Actions the watcher executes against the registrar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    /// Path was created or renamed; re-examine what is there now.
    Sync { path: PathBuf },

    /// File contents were written.
    Modified { path: PathBuf },

    /// Path was removed, along with anything beneath it.
    Forget { path: PathBuf },

    /// Nothing to do (access events and the like).
    None,
}

/// Map one notify event to one action per affected path.
pub fn plan_actions(event: &Event) -> Vec<WatchAction> {
    event
        .paths
        .iter()
        .map(|path| {
            let path = path.clone();
            match event.kind {
                EventKind::Create(_) => WatchAction::Sync { path },
                EventKind::Modify(notify::event::ModifyKind::Name(_)) => WatchAction::Sync { path },
                EventKind::Modify(_) => WatchAction::Modified { path },
                EventKind::Remove(_) => WatchAction::Forget { path },
                EventKind::Access(_) | EventKind::Any | EventKind::Other => WatchAction::None,
            }
        })
        .collect()
}
