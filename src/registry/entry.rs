//! Tracked file records and URL synthesis.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One tracked file, as served by `/registry.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Configured label joined with the relative path minus its extension.
    pub label: String,

    /// Extension without the leading dot.
    #[serde(rename = "type")]
    pub kind: String,

    /// `http://<host>:<port>/files/<label>/<relative-path>`
    pub url: String,

    /// Real filesystem location used to serve content.
    #[serde(rename = "absolutePath")]
    pub absolute_path: PathBuf,
}

impl FileEntry {
    /// Build an entry for a file found under a configured root.
    ///
    /// `relative` is the slash-separated path below the root, extension
    /// included. Returns `None` when the file name has no extension.
    pub fn from_relative(
        urls: &UrlBuilder,
        root_label: &str,
        relative: &str,
        absolute_path: PathBuf,
    ) -> Option<Self> {
        let (stem, ext) = split_extension(relative)?;

        Some(Self {
            label: join_label(root_label, stem),
            kind: ext.to_string(),
            url: urls.file_url(root_label, relative),
            absolute_path,
        })
    }
}

/// Synthesizes file URLs from an explicit host and port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    base: String,
}

impl UrlBuilder {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            base: format!("http://{host}:{port}"),
        }
    }

    /// `http://<host>:<port>`, without a trailing slash.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// URL for a file under a configured label.
    pub fn file_url(&self, root_label: &str, relative: &str) -> String {
        format!("{}/files/{}", self.base, join_label(root_label, relative))
    }

    /// URL a request path (e.g. `/files/site/a.png`) resolves to.
    pub fn request_url(&self, request_path: &str) -> String {
        format!("{}{request_path}", self.base)
    }
}

/// Split `dir/name.ext` into (`dir/name`, `ext`) on the last dot of the file name.
fn split_extension(relative: &str) -> Option<(&str, &str)> {
    let name_start = relative.rfind('/').map_or(0, |i| i + 1);
    let dot = relative[name_start..].rfind('.')? + name_start;
    Some((&relative[..dot], &relative[dot + 1..]))
}

/// Join path segments with `/`, dropping empty and `.` segments.
fn join_label(root_label: &str, rest: &str) -> String {
    root_label
        .split('/')
        .chain(rest.split('/'))
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}
