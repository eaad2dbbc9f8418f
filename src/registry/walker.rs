//! Populates the registry by walking configured roots.
//!
//! Each root is walked independently: a failure while walking one root stops
//! that root only. Files registered before the failure stay registered.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use super::entry::{FileEntry, UrlBuilder};
use super::error::{RegistryError, RegistryResult};
use super::store::Registry;
use crate::config::{Settings, WatcherConfig};

/// A configured root, resolved to an absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    pub label: String,
    pub path: PathBuf,
    /// Symlink-free form of `path`, when it differs. Some backends (FSEvents)
    /// report events under this form.
    pub canonical: Option<PathBuf>,
}

impl Root {
    fn new(label: &str, path: PathBuf) -> Self {
        let canonical = fs::canonicalize(&path).ok().filter(|c| *c != path);
        Self {
            label: label.to_string(),
            path,
            canonical,
        }
    }

    /// `path` rewritten under `self.path` if it lies below either form of the root.
    fn rebase(&self, path: &Path) -> Option<PathBuf> {
        if path.starts_with(&self.path) {
            return Some(path.to_path_buf());
        }
        let rest = path.strip_prefix(self.canonical.as_ref()?).ok()?;
        Some(self.path.join(rest))
    }
}

/// Outcome of walking every configured root.
#[derive(Debug, Default)]
pub struct WalkReport {
    /// Files registered across all roots.
    pub registered: usize,
    /// Roots that were walked to completion.
    pub completed: Vec<Root>,
    /// One error per root whose walk was aborted.
    pub failures: Vec<RegistryError>,
}

/// Walks roots and inserts matching files into a [`Registry`].
pub struct Registrar {
    registry: Arc<Registry>,
    config: Arc<WatcherConfig>,
    urls: UrlBuilder,
    /// Resolved roots in label order.
    roots: Vec<Root>,
}

impl Registrar {
    pub fn new(registry: Arc<Registry>, config: Arc<WatcherConfig>, urls: UrlBuilder) -> Self {
        let roots = config
            .directories()
            .iter()
            .filter_map(|(label, path)| match absolute_root(path) {
                Ok(path) => Some(Root::new(label, path)),
                Err(e) => {
                    tracing::warn!("[registrar] {label}: {e}; not watched");
                    None
                }
            })
            .collect();

        Self {
            registry,
            config,
            urls,
            roots,
        }
    }

    /// Registrar over a fresh, empty registry.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(Registry::new()),
            Arc::new(settings.watcher_config()),
            settings.url_builder(),
        )
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn urls(&self) -> &UrlBuilder {
        &self.urls
    }

    /// Absolute roots, in label order.
    pub fn roots(&self) -> &[Root] {
        &self.roots
    }

    /// Walk every configured root.
    ///
    /// Roots are visited in label order, so when roots overlap the entry from
    /// the last label wins.
    pub fn register_all(&self) -> WalkReport {
        let mut report = WalkReport::default();

        for (label, path) in self.config.directories() {
            match self.walk_root(label, path) {
                Ok((root, count)) => {
                    crate::log_event!(
                        "registrar",
                        "walked",
                        "{label} ({}): {count} files",
                        root.path.display()
                    );
                    report.registered += count;
                    report.completed.push(root);
                }
                Err(e) => {
                    tracing::warn!("[registrar] {label}: {e}");
                    report.failures.push(e);
                }
            }
        }

        report
    }

    /// Walk a single root, returning it resolved along with the number of files registered.
    pub fn walk_root(&self, label: &str, path: &Path) -> RegistryResult<(Root, usize)> {
        let root = Root::new(label, absolute_root(path)?);
        let count = self.walk_subtree(&root, &root.path)?;
        Ok((root, count))
    }

    /// Walk `start` (a directory or file below `root`) and register matches.
    fn walk_subtree(&self, root: &Root, start: &Path) -> RegistryResult<usize> {
        let mut count = 0;

        for item in WalkDir::new(start).follow_links(false) {
            let dir_entry = item.map_err(|source| RegistryError::Walk {
                root: root.path.clone(),
                source,
            })?;

            if dir_entry.file_type().is_dir() {
                continue;
            }

            if self.register_file(root, dir_entry.path()) {
                count += 1;
            }
        }

        Ok(count)
    }

    /// Register one file if its name carries a watched extension.
    ///
    /// Symlinks count only when they resolve to a regular file.
    fn register_file(&self, root: &Root, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if !self.config.matches_extension(name) {
            return false;
        }
        if !path.is_file() {
            return false;
        }

        // The whole path, root included, must be UTF-8 to be encoded as JSON.
        let relative = path
            .to_str()
            .and_then(|_| path.strip_prefix(&root.path).ok())
            .and_then(slash_path);
        let Some(relative) = relative else {
            crate::debug_event!("registrar", "skipped", "{} (not utf-8)", path.display());
            return false;
        };

        let Some(entry) =
            FileEntry::from_relative(&self.urls, &root.label, &relative, path.to_path_buf())
        else {
            return false;
        };

        crate::debug_event!("registrar", "registered", "{}", entry.url);
        self.registry.insert(path.to_path_buf(), entry);
        true
    }

    /// Root responsible for `path`, preferring the last label when roots overlap.
    ///
    /// Also returns `path` rebased under the root's configured form, so event
    /// paths reported through a canonical root map onto registered keys.
    pub fn resolve(&self, path: &Path) -> Option<(&Root, PathBuf)> {
        self.roots
            .iter()
            .rev()
            .find_map(|root| root.rebase(path).map(|rebased| (root, rebased)))
    }

    /// Bring the registry in line with whatever now exists at `path`.
    ///
    /// Real directories are walked, files (or symlinks to files) are
    /// registered, and vanished paths are removed together with everything
    /// beneath them. Symlinked directories are not followed, matching the
    /// initial walk. Returns the number of entries added or removed.
    pub fn sync_path(&self, path: &Path) -> RegistryResult<usize> {
        let Some((root, path)) = self.resolve(path).map(|(r, p)| (r.clone(), p)) else {
            return Ok(0);
        };

        match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_dir() => self.walk_subtree(&root, &path),
            Ok(_) if path.is_file() => Ok(usize::from(self.register_file(&root, &path))),
            Ok(_) => Ok(0),
            Err(_) => Ok(self.forget_path(&path)),
        }
    }

    /// Remove `path` and anything registered beneath it.
    pub fn forget_path(&self, path: &Path) -> usize {
        let path = match self.resolve(path) {
            Some((_, rebased)) => rebased,
            None => path.to_path_buf(),
        };
        let removed = self.registry.remove_under(&path);
        if removed > 0 {
            crate::log_event!("registrar", "removed", "{removed} under {}", path.display());
        }
        removed
    }
}

/// Make a configured root absolute without resolving symlinks.
fn absolute_root(path: &Path) -> RegistryResult<PathBuf> {
    std::path::absolute(path).map_err(|e| RegistryError::InvalidRoot {
        root: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Join the normal components of a relative path with `/`.
fn slash_path(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn registrar_for(dirs: &[(&str, &Path)], exts: &[&str]) -> Registrar {
        let directories: BTreeMap<String, PathBuf> = dirs
            .iter()
            .map(|(label, path)| (label.to_string(), path.to_path_buf()))
            .collect();
        let config = WatcherConfig::new(directories, exts.iter().map(|e| e.to_string()));
        Registrar::new(
            Arc::new(Registry::new()),
            Arc::new(config),
            UrlBuilder::new("localhost", 9191),
        )
    }

    #[test]
    fn test_walk_filters_by_extension() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("img")).unwrap();
        fs::create_dir_all(root.join("doc")).unwrap();
        fs::write(root.join("img/a.png"), b"png").unwrap();
        fs::write(root.join("doc/b.txt"), b"txt").unwrap();

        let registrar = registrar_for(&[("site", root)], &["png"]);
        let report = registrar.register_all();

        assert_eq!(report.registered, 1);
        assert!(report.failures.is_empty());

        let entries = registrar.registry().snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "site/img/a");
        assert_eq!(entries[0].kind, "png");
        assert_eq!(entries[0].url, "http://localhost:9191/files/site/img/a.png");
        assert_eq!(entries[0].absolute_path, root.join("img/a.png"));
    }

    #[test]
    fn test_directories_named_like_files_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("bundle.js")).unwrap();
        fs::write(root.join("bundle.js/inner.js"), b"x").unwrap();

        let registrar = registrar_for(&[("app", root)], &["js"]);
        registrar.register_all();

        let entries = registrar.registry().snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "app/bundle.js/inner");
    }

    #[test]
    fn test_missing_root_does_not_stop_others() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("ok.md"), b"# ok").unwrap();
        let missing = temp_dir.path().join("does-not-exist");

        let registrar = registrar_for(
            &[("a-missing", missing.as_path()), ("docs", temp_dir.path())],
            &["md"],
        );
        let report = registrar.register_all();

        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0], RegistryError::Walk { .. }));
        assert_eq!(report.registered, 1);
        assert_eq!(report.completed.len(), 1);
        assert_eq!(registrar.registry().len(), 1);
    }

    #[test]
    fn test_sync_path_adds_and_removes() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let registrar = registrar_for(&[("site", root)], &["css"]);
        registrar.register_all();
        assert!(registrar.registry().is_empty());

        fs::create_dir_all(root.join("theme")).unwrap();
        fs::write(root.join("theme/main.css"), b"body{}").unwrap();
        fs::write(root.join("theme/dark.css"), b"body{}").unwrap();

        assert_eq!(registrar.sync_path(&root.join("theme")).unwrap(), 2);
        assert!(
            registrar
                .registry()
                .find_by_url("http://localhost:9191/files/site/theme/main.css")
                .is_some()
        );

        fs::remove_file(root.join("theme/main.css")).unwrap();
        assert_eq!(registrar.sync_path(&root.join("theme/main.css")).unwrap(), 1);
        assert_eq!(registrar.registry().len(), 1);

        fs::remove_dir_all(root.join("theme")).unwrap();
        assert_eq!(registrar.sync_path(&root.join("theme")).unwrap(), 1);
        assert!(registrar.registry().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_sync_path_does_not_follow_symlinked_directory() {
        let temp_dir = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        fs::write(elsewhere.path().join("x.png"), b"png").unwrap();
        std::os::unix::fs::symlink(elsewhere.path(), temp_dir.path().join("linked")).unwrap();

        let registrar = registrar_for(&[("site", temp_dir.path())], &["png"]);
        registrar.register_all();
        assert!(registrar.registry().is_empty());

        let linked = temp_dir.path().join("linked");
        assert_eq!(registrar.sync_path(&linked).unwrap(), 0);
        assert!(registrar.registry().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_sync_path_registers_symlinked_file() {
        let temp_dir = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        fs::write(elsewhere.path().join("x.png"), b"png").unwrap();
        let link = temp_dir.path().join("alias.png");
        std::os::unix::fs::symlink(elsewhere.path().join("x.png"), &link).unwrap();

        let registrar = registrar_for(&[("site", temp_dir.path())], &["png"]);
        assert_eq!(registrar.sync_path(&link).unwrap(), 1);
        assert_eq!(registrar.registry().snapshot()[0].label, "site/alias");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_root_is_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let bad = temp_dir.path().join(OsStr::from_bytes(b"r\xff"));
        let good = temp_dir.path().join("good");
        fs::create_dir_all(&bad).unwrap();
        fs::create_dir_all(&good).unwrap();
        fs::write(bad.join("a.png"), b"png").unwrap();
        fs::write(good.join("b.png"), b"png").unwrap();

        let registrar = registrar_for(
            &[("bad", bad.as_path()), ("good", good.as_path())],
            &["png"],
        );
        let report = registrar.register_all();

        assert!(report.failures.is_empty());
        assert_eq!(report.registered, 1);

        let entries = registrar.registry().snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "good/b");
        assert!(serde_json::to_vec(&entries).is_ok());
    }

    #[test]
    fn test_invalid_root_is_reported_and_not_watched() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.md"), b"# a").unwrap();

        let registrar =
            registrar_for(&[("empty", Path::new("")), ("docs", temp_dir.path())], &["md"]);

        assert_eq!(registrar.roots().len(), 1);
        assert_eq!(registrar.roots()[0].label, "docs");

        let report = registrar.register_all();
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0], RegistryError::InvalidRoot { .. }));
        assert_eq!(report.registered, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_events_under_canonical_root_are_rebased() {
        let temp_dir = TempDir::new().unwrap();
        let real = temp_dir.path().join("real");
        let alias = temp_dir.path().join("alias");
        fs::create_dir_all(&real).unwrap();
        std::os::unix::fs::symlink(&real, &alias).unwrap();

        let registrar = registrar_for(&[("site", alias.as_path())], &["png"]);
        registrar.register_all();

        // Backends that resolve symlinks report the real location
        let real = fs::canonicalize(&real).unwrap();
        fs::write(real.join("new.png"), b"png").unwrap();
        assert_eq!(registrar.sync_path(&real.join("new.png")).unwrap(), 1);

        let entries = registrar.registry().snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "http://localhost:9191/files/site/new.png");
        assert_eq!(entries[0].absolute_path, alias.join("new.png"));

        fs::remove_file(real.join("new.png")).unwrap();
        assert_eq!(registrar.sync_path(&real.join("new.png")).unwrap(), 1);
        assert!(registrar.registry().is_empty());
    }

    #[test]
    fn test_sync_path_outside_roots_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        fs::write(other.path().join("x.css"), b"").unwrap();

        let registrar = registrar_for(&[("site", temp_dir.path())], &["css"]);
        assert_eq!(registrar.sync_path(&other.path().join("x.css")).unwrap(), 0);
        assert!(registrar.registry().is_empty());
    }

    #[test]
    fn test_resolve_prefers_last_label() {
        let temp_dir = TempDir::new().unwrap();
        let outer = temp_dir.path();
        let inner = outer.join("nested");
        fs::create_dir_all(&inner).unwrap();
        fs::write(inner.join("n.txt"), b"").unwrap();

        let registrar = registrar_for(&[("a", outer), ("b", inner.as_path())], &["txt"]);
        registrar.register_all();

        let entries = registrar.registry().snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "b/n");
        let (root, _) = registrar.resolve(&inner.join("n.txt")).unwrap();
        assert_eq!(root.label, "b");
    }

    #[test]
    fn test_slash_path() {
        assert_eq!(slash_path(Path::new("a/b/c.png")).unwrap(), "a/b/c.png");
        assert_eq!(slash_path(Path::new("./c.png")).unwrap(), "c.png");
        assert!(slash_path(Path::new("../c.png")).is_none());
    }
}
