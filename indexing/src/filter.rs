//! File filter: size cap + extension whitelist.
//!
//! The service-level filter and the watcher-level filter have overlapping but non-identical
//! extension sets. Rather than unifying them into one policy object, this module exposes two
//! named constructors so the asymmetry stays visible in the type signature of whoever builds a
//! [`FileFilter`].

use std::path::Path;

/// Max file size accepted by any [`FileFilter`], in bytes (10 MiB).
pub const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

const WATCHER_EXTENSIONS: &[&str] =
    &["txt", "md", "java", "py", "js", "go", "sh", "xml", "json"];

const SERVICE_EXTRA_EXTENSIONS: &[&str] = &[
    "cpp",
    "c",
    "h",
    "hpp",
    "yml",
    "yaml",
    "properties",
    "rst",
    "sql",
    "bat",
    "ps1",
    "gradle",
    "mvn",
    "pom",
];

/// Decides whether a path is indexable: a regular file, within the size cap, with a whitelisted
/// extension (case-insensitive suffix match).
#[derive(Debug, Clone)]
pub struct FileFilter {
    max_size_bytes: u64,
    extensions: Vec<String>,
}

impl FileFilter {
    /// The watcher's default extension set: `.txt .md .java .py .js .go .sh .xml .json`.
    pub fn for_watcher() -> Self {
        Self::with_extensions(WATCHER_EXTENSIONS.iter().copied())
    }

    /// The service's default extension set: the watcher's set, plus source/build/config
    /// extensions the watcher does not accept.
    pub fn for_service() -> Self {
        Self::with_extensions(
            WATCHER_EXTENSIONS
                .iter()
                .chain(SERVICE_EXTRA_EXTENSIONS.iter())
                .copied(),
        )
    }

    /// Build a filter over a custom extension set and the default 10 MiB size cap.
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            max_size_bytes: MAX_FILE_SIZE_BYTES,
            extensions: extensions.into_iter().map(|e| e.into().to_lowercase()).collect(),
        }
    }

    pub fn with_max_size_bytes(mut self, max_size_bytes: u64) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }

    /// Whether `path`'s extension is whitelisted (case-insensitive).
    pub fn accepts_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// Whether `size_bytes` is within the cap (inclusive: `<=`).
    pub fn accepts_size(&self, size_bytes: u64) -> bool {
        size_bytes <= self.max_size_bytes
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }
}
