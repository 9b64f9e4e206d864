//! This library provides facilities to perform and maintain an in-memory inverted text index.
//!
//! The index can be used to query whether a set of terms co-occurs on the same line in any of
//! the indexed files and returns the locations where it was found.
//!
//! Indexing is performed by splitting a file's content into tokens (see the [`tokenize`] module)
//! and maintaining an inverted index (see the [`index`] module) over the normalized terms. The
//! [`service`] module drives that pipeline end to end; [`watcher`] keeps it automatically in
//! sync with a directory by watching for filesystem events.
//!
//! This crate never installs a `tracing` subscriber itself; only a binary (such as the `service`
//! crate in this workspace) should do that.

pub mod error;
pub mod filter;
pub mod index;
pub mod metrics;
pub mod retry;
pub mod service;
pub mod token;
pub mod tokenize;
pub mod watcher;

pub use error::{Error, Result};
pub use filter::FileFilter;
pub use index::{FileLocation, FileMetadata, IndexStats, InvertedIndex};
pub use metrics::{Metrics, MetricsSnapshot};
pub use service::{IndexingService, SearchResult};
pub use token::{Token, TokenType};
pub use tokenize::{Tokenizer, WordTokenizer};
pub use watcher::FilesystemWatcher;
