//! The indexing service: drives `path -> bytes -> tokens -> index mutation`, tracks which
//! paths are known to be indexed, and exposes directory-recursive indexing and search.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use tracing::{instrument, trace, warn};
use walkdir::WalkDir;

use crate::filter::FileFilter;
use crate::index::{normalize, FileMetadata, InvertedIndex};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::retry::retry_or_none;
use crate::token::Token;
use crate::tokenize::{Tokenizer, WordTokenizer};

/// One line of a search hit: the file it was found in, the line number, the query that matched,
/// and that file's size for display purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub path: PathBuf,
    pub line: u32,
    pub matched_text: String,
    pub size_bytes: u64,
}

/// Orchestrates the indexing pipeline and exposes directory traversal and search.
///
/// Two concurrent `index_file` calls on the same path race at this layer: the index guarantees
/// each individual `replace_terms` is atomic, but the order of the two replacements is
/// undefined. Operations on the service are not globally linearized, only the index's own
/// operations are.
pub struct IndexingService {
    index: InvertedIndex,
    tokenizer: Box<dyn Tokenizer>,
    filter: FileFilter,
    metrics: Metrics,
    known_indexed: Mutex<HashSet<PathBuf>>,
}

impl Default for IndexingService {
    fn default() -> Self {
        Self::new(Box::new(WordTokenizer::new()), FileFilter::for_service())
    }
}

impl IndexingService {
    pub fn new(tokenizer: Box<dyn Tokenizer>, filter: FileFilter) -> Self {
        Self {
            index: InvertedIndex::new(),
            tokenizer,
            filter,
            metrics: Metrics::new(),
            known_indexed: Mutex::new(HashSet::new()),
        }
    }

    /// The underlying index, for callers (the watcher, tests) that need direct read access.
    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    pub fn filter(&self) -> &FileFilter {
        &self.filter
    }

    /// Run the full per-file pipeline: validate, read with retry, tokenize, mutate the
    /// index, record metadata, record metrics. Every rejection — missing file, filtered
    /// extension, empty content, exhausted I/O retries, empty token stream — collapses to
    /// `false`, never an `Err`.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn index_file(&self, path: &Path) -> bool {
        let start = Instant::now();

        if !self.passes_validation(path) {
            return false;
        }

        let Some(content) = retry_or_none("read_file", || fs::read_to_string(path)) else {
            return false;
        };

        if content.trim().is_empty() {
            trace!("rejecting empty/whitespace-only file");
            return false;
        }

        let Ok(tokens) = self.tokenizer.tokenize(&content) else {
            return false;
        };

        if tokens.is_empty() {
            trace!("rejecting file with no tokens after tokenization");
            return false;
        }

        self.mutate_index(path, &tokens);
        self.record_metadata(path, &tokens);

        self.known_indexed
            .lock()
            .expect("known_indexed lock poisoned")
            .insert(path.to_path_buf());

        self.metrics.record_indexing(start.elapsed());
        true
    }

    fn passes_validation(&self, path: &Path) -> bool {
        let Ok(meta) = fs::metadata(path) else {
            return false;
        };
        if !meta.is_file() {
            return false;
        }
        if !self.filter.accepts_extension(path) {
            return false;
        }
        self.filter.accepts_size(meta.len())
    }

    fn mutate_index(&self, path: &Path, tokens: &[Token]) {
        let already_indexed = self
            .known_indexed
            .lock()
            .expect("known_indexed lock poisoned")
            .contains(path);

        let result = if already_indexed {
            self.index.replace_terms(tokens, path)
        } else {
            self.index.add_terms(tokens, path)
        };

        result.expect("path was validated non-empty above");
    }

    fn record_metadata(&self, path: &Path, tokens: &[Token]) {
        let Some(meta) = retry_or_none("read_attributes", || fs::metadata(path)) else {
            warn!(path = %path.display(), "failed to read file attributes after retries");
            return;
        };

        let last_modified = meta.modified().unwrap_or_else(|_| std::time::SystemTime::now());
        let unique_terms = tokens
            .iter()
            .filter_map(|t| normalize(&t.value))
            .collect::<HashSet<_>>()
            .len() as u64;

        let file_meta = FileMetadata::new(
            path.to_path_buf(),
            meta.len(),
            last_modified,
            std::time::SystemTime::now(),
            tokens.len() as u64,
            unique_terms,
        );

        if self.index.add_metadata(file_meta).is_err() {
            warn!(path = %path.display(), "failed to record metadata");
        }
    }

    /// Recursively index every file under `path` that passes validation. Returns the count of
    /// files successfully indexed. Individual walk failures are skipped with a warning; they do
    /// not abort the traversal.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn index_directory(&self, path: &Path) -> u64 {
        let mut indexed = 0u64;

        for entry in WalkDir::new(path) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "failed to walk directory entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if self.index_file(entry.path()) {
                indexed += 1;
            }
        }

        indexed
    }

    /// Remove `path` from the index. Returns `false` if the path was not known to be indexed.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn remove_file(&self, path: &Path) -> bool {
        let was_known = self
            .known_indexed
            .lock()
            .expect("known_indexed lock poisoned")
            .remove(path);

        if was_known {
            let _ = self.index.remove_file(path);
        }

        was_known
    }

    /// Run a conjunctive (AND) multi-term search and return results sorted by (path, line).
    #[instrument(skip(self, terms))]
    pub fn search_all(&self, terms: &[String]) -> Vec<SearchResult> {
        let start = Instant::now();

        let locations = self.index.find_all(terms);
        let matched_text = terms.join(" AND ");

        let mut results: Vec<SearchResult> = locations
            .into_iter()
            .map(|loc| {
                let size_bytes = self
                    .index
                    .get_metadata(&loc.path)
                    .map(|m| m.size_bytes)
                    .unwrap_or(0);

                SearchResult {
                    path: loc.path,
                    line: loc.line,
                    matched_text: matched_text.clone(),
                    size_bytes,
                }
            })
            .collect();

        results.sort_by(|a, b| a.path.cmp(&b.path).then(a.line.cmp(&b.line)));

        self.metrics.record_search(start.elapsed());
        results
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Reset the service to the empty state: clears the index and forgets every known-indexed
    /// path.
    pub fn clear(&self) {
        self.index.clear();
        self.known_indexed
            .lock()
            .expect("known_indexed lock poisoned")
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn service() -> IndexingService {
        IndexingService::new(Box::new(WordTokenizer::new()), FileFilter::for_service())
    }

    #[test]
    fn empty_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "").unwrap();

        assert!(!service().index_file(&path));
    }

    #[test]
    fn whitespace_only_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ws.txt");
        fs::write(&path, "   \n\t  \n").unwrap();

        assert!(!service().index_file(&path));
    }

    #[test]
    fn non_matching_extension_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, "hello world").unwrap();

        assert!(!service().index_file(&path));
    }

    #[test]
    fn missing_file_is_rejected() {
        let svc = service();
        assert!(!svc.index_file(Path::new("/does/not/exist.txt")));
    }

    #[test]
    fn valid_file_is_indexed_and_searchable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "hello world\nhello again").unwrap();

        let svc = service();
        assert!(svc.index_file(&path));

        let results = svc.search_all(&["hello".to_string()]);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].line, 1);
        assert_eq!(results[1].line, 2);
        assert_eq!(results[0].matched_text, "hello");
    }

    #[test]
    fn reindex_replaces_terms() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.txt");
        fs::write(&path, "foo").unwrap();

        let svc = service();
        assert!(svc.index_file(&path));
        assert_eq!(svc.search_all(&["foo".to_string()]).len(), 1);

        fs::write(&path, "bar").unwrap();
        assert!(svc.index_file(&path));

        assert_eq!(svc.search_all(&["foo".to_string()]).len(), 0);
        assert_eq!(svc.search_all(&["bar".to_string()]).len(), 1);
    }

    #[test]
    fn remove_file_reports_whether_it_was_known() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.txt");
        fs::write(&path, "foo").unwrap();

        let svc = service();
        assert!(!svc.remove_file(&path));

        svc.index_file(&path);
        assert!(svc.remove_file(&path));
        assert!(!svc.remove_file(&path));
    }

    #[test]
    fn index_directory_counts_successes_and_skips_rejects() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello world").unwrap();
        fs::write(dir.path().join("b.bin"), "hello world").unwrap();
        fs::write(dir.path().join("c.txt"), "").unwrap();

        let svc = service();
        assert_eq!(svc.index_directory(dir.path()), 1);
    }

    #[test]
    fn file_over_the_configured_size_cap_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("over_cap.txt");
        fs::write(&path, "hello").unwrap();

        let tiny_filter = FileFilter::for_service().with_max_size_bytes(4);
        let svc = IndexingService::new(Box::new(WordTokenizer::new()), tiny_filter);
        assert!(!svc.index_file(&path));
    }
}
