//! The inverted index: the sole owner of postings and per-file state.
//!
//! Readers never block a writer for longer than one small critical section: every mutation
//! validates its input outside the lock and only takes the write guard to swap in the already-
//! computed result, backed by a single [`RwLock`] over plain [`HashMap`]/[`HashSet`] collections.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::SystemTime;

use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};
use crate::token::Token;

/// A location a term was found at: a file path and a 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileLocation {
    pub path: PathBuf,
    pub line: u32,
}

impl FileLocation {
    pub fn new(path: impl Into<PathBuf>, line: u32) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }
}

/// Metadata recorded for a single indexed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub last_modified: SystemTime,
    pub indexed_at: SystemTime,
    pub total_terms: u64,
    pub unique_terms: u64,
}

impl FileMetadata {
    /// Construct a `FileMetadata`, clamping `unique_terms` to `total_terms` so the invariant
    /// `unique_terms <= total_terms` can never be violated by a caller-supplied count mismatch.
    pub fn new(
        path: impl Into<PathBuf>,
        size_bytes: u64,
        last_modified: SystemTime,
        indexed_at: SystemTime,
        total_terms: u64,
        unique_terms: u64,
    ) -> Self {
        Self {
            path: path.into(),
            size_bytes,
            last_modified,
            indexed_at,
            total_terms,
            unique_terms: unique_terms.min(total_terms),
        }
    }
}

/// A point-in-time view of the index's aggregate counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub file_count: u64,
    pub total_occurrences: u64,
    pub unique_terms: u64,
    pub is_empty: bool,
}

#[derive(Default)]
struct State {
    postings: HashMap<String, HashSet<FileLocation>>,
    per_file_terms: HashMap<PathBuf, HashSet<String>>,
    metadata: HashMap<PathBuf, FileMetadata>,
}

impl State {
    fn path_is_present(&self, path: &Path) -> bool {
        self.per_file_terms.get(path).is_some_and(|terms| !terms.is_empty())
            || self.metadata.contains_key(path)
    }

    /// Remove every posting belonging to `path`. Returns the number of locations removed.
    fn remove_postings_for_path(&mut self, path: &Path) -> u64 {
        let Some(terms) = self.per_file_terms.remove(path) else {
            return 0;
        };

        let mut removed = 0u64;
        for term in terms {
            if let Some(locations) = self.postings.get_mut(&term) {
                let before = locations.len();
                locations.retain(|loc| loc.path != path);
                removed += (before - locations.len()) as u64;
                if locations.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
        removed
    }

    /// Insert `tokens` as postings for `path`. Returns the number of locations inserted.
    fn insert_postings_for_path(&mut self, path: &Path, tokens: &[Token]) -> u64 {
        let mut inserted = 0u64;
        let terms = self.per_file_terms.entry(path.to_path_buf()).or_default();

        for token in tokens {
            let Some(term) = normalize(&token.value) else {
                continue;
            };

            let newly_inserted = self
                .postings
                .entry(term.clone())
                .or_default()
                .insert(FileLocation::new(path.to_path_buf(), token.line));

            if newly_inserted {
                inserted += 1;
            }
            terms.insert(term);
        }

        if terms.is_empty() {
            self.per_file_terms.remove(path);
        }

        inserted
    }
}

/// Normalize a raw term: trim whitespace, NFC-fold, then lower-case. Empty results are dropped.
pub fn normalize(term: &str) -> Option<String> {
    let folded: String = term.trim().nfc().collect();
    let lowered = folded.to_lowercase();
    if lowered.is_empty() {
        None
    } else {
        Some(lowered)
    }
}

/// Thread-safe term → locations mapping with atomic per-file replace/remove.
///
/// Many readers may traverse the index concurrently; at most one writer mutates at a time and
/// readers are excluded only for the duration of that mutation. Validation, normalization, and
/// result sorting all happen outside the critical section.
#[derive(Default)]
pub struct InvertedIndex {
    state: RwLock<State>,
    total_occurrences: AtomicU64,
    file_count: AtomicU64,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `tokens` as new postings for `path`, without touching any postings `path` already
    /// has. An empty token sequence is a no-op.
    pub fn add_terms(&self, tokens: &[Token], path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(Error::invalid_input("add_terms: path must not be empty"));
        }
        if tokens.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write().expect("index lock poisoned");
        let was_present = state.path_is_present(path);

        let inserted = state.insert_postings_for_path(path, tokens);
        self.total_occurrences.fetch_add(inserted, Ordering::Relaxed);

        if !was_present && state.path_is_present(path) {
            self.file_count.fetch_add(1, Ordering::Relaxed);
        }

        Ok(())
    }

    /// Atomically replace every posting `path` has with `tokens`. Readers see either the
    /// pre-call or the post-call postings for `path`, never a mixture.
    pub fn replace_terms(&self, tokens: &[Token], path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(Error::invalid_input("replace_terms: path must not be empty"));
        }

        let mut state = self.state.write().expect("index lock poisoned");
        let was_present = state.path_is_present(path);

        let removed = state.remove_postings_for_path(path);
        self.total_occurrences.fetch_sub(removed, Ordering::Relaxed);

        let inserted = state.insert_postings_for_path(path, tokens);
        self.total_occurrences.fetch_add(inserted, Ordering::Relaxed);

        let now_present = state.path_is_present(path);
        if was_present && !now_present {
            self.file_count.fetch_sub(1, Ordering::Relaxed);
        } else if !was_present && now_present {
            self.file_count.fetch_add(1, Ordering::Relaxed);
        }

        Ok(())
    }

    /// Store or replace `path`'s metadata record.
    pub fn add_metadata(&self, meta: FileMetadata) -> Result<()> {
        let mut state = self.state.write().expect("index lock poisoned");
        let was_present = state.path_is_present(&meta.path);

        state.metadata.insert(meta.path.clone(), meta);

        if !was_present {
            self.file_count.fetch_add(1, Ordering::Relaxed);
        }

        Ok(())
    }

    /// Remove every posting, metadata entry, and per-file term set for `path`. Returns whether
    /// `path` had anything to remove.
    pub fn remove_file(&self, path: &Path) -> Result<bool> {
        if path.as_os_str().is_empty() {
            return Err(Error::invalid_input("remove_file: path must not be empty"));
        }

        let mut state = self.state.write().expect("index lock poisoned");
        let was_present = state.path_is_present(path);

        let removed = state.remove_postings_for_path(path);
        self.total_occurrences.fetch_sub(removed, Ordering::Relaxed);
        state.metadata.remove(path);

        if was_present {
            self.file_count.fetch_sub(1, Ordering::Relaxed);
        }

        Ok(was_present)
    }

    /// Empty all state.
    pub fn clear(&self) {
        let mut state = self.state.write().expect("index lock poisoned");
        state.postings.clear();
        state.per_file_terms.clear();
        state.metadata.clear();
        self.total_occurrences.store(0, Ordering::Relaxed);
        self.file_count.store(0, Ordering::Relaxed);
    }

    /// Return the intersection of postings for every term in `terms`. An empty list, or any
    /// term missing/normalizing to empty, yields an empty result.
    pub fn find_all(&self, terms: &[String]) -> HashSet<FileLocation> {
        if terms.is_empty() {
            return HashSet::new();
        }

        let mut sets: Vec<HashSet<FileLocation>> = Vec::with_capacity(terms.len());
        {
            let state = self.state.read().expect("index lock poisoned");
            for term in terms {
                let Some(normalized_term) = normalize(term) else {
                    return HashSet::new();
                };
                match state.postings.get(&normalized_term) {
                    Some(locations) if !locations.is_empty() => sets.push(locations.clone()),
                    _ => return HashSet::new(),
                }
            }
        }

        sets.sort_by_key(|s| s.len());

        let mut iter = sets.into_iter();
        let mut acc = iter.next().unwrap_or_default();
        for set in iter {
            acc.retain(|loc| set.contains(loc));
            if acc.is_empty() {
                break;
            }
        }
        acc
    }

    pub fn get_metadata(&self, path: &Path) -> Option<FileMetadata> {
        let state = self.state.read().expect("index lock poisoned");
        state.metadata.get(path).cloned()
    }

    pub fn get_stats(&self) -> IndexStats {
        let state = self.state.read().expect("index lock poisoned");
        let file_count = self.file_count.load(Ordering::Relaxed);
        let total_occurrences = self.total_occurrences.load(Ordering::Relaxed);
        let unique_terms = state.postings.len() as u64;

        IndexStats {
            file_count,
            total_occurrences,
            unique_terms,
            is_empty: file_count == 0 && total_occurrences == 0,
        }
    }
}
