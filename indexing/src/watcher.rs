//! The filesystem watcher: turns OS create/modify/delete notifications into calls on an
//! [`IndexingService`], recursively, for one root directory.
//!
//! Built on `notify = "6"` (the version `pustynsky-search-index`'s own watcher uses), which has
//! an explicit `Overflow` representation and unambiguous directory/file classification, unlike
//! the legacy `DebouncedEvent` API of older `notify` releases. The shape is a watch thread
//! feeding a small worker pool over a channel: "watching worker" kept separate from "indexing
//! worker".

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::retry::retry_or_err;
use crate::service::IndexingService;

const WORKER_COUNT: usize = 4;
const POLL_TIMEOUT: Duration = Duration::from_millis(500);
const GRACEFUL_SHUTDOWN_WAIT: Duration = Duration::from_secs(2);
const FORCED_SHUTDOWN_WAIT: Duration = Duration::from_secs(1);

/// Watches a directory tree and keeps an [`IndexingService`] in sync with it.
///
/// Dropping a `FilesystemWatcher` calls [`FilesystemWatcher::stop`], so the OS watch handle and
/// worker threads are released regardless of how the owner exits.
pub struct FilesystemWatcher {
    root: PathBuf,
    raw: Arc<Mutex<Option<RecommendedWatcher>>>,
    running: Arc<AtomicBool>,
    watched_dirs: Arc<AtomicU64>,
    workers: Mutex<Vec<(usize, JoinHandle<()>)>>,
    worker_done_rx: Mutex<Receiver<usize>>,
}

impl FilesystemWatcher {
    /// Start watching `root`. If `index_existing`, first index the tree under `root` (wrapped in
    /// the same retry policy as file I/O); a final failure there is logged and the watcher still
    /// starts. Fails with [`Error::NotADirectory`] if `root` is not an existing directory.
    #[instrument(skip(service), fields(root = %root.as_ref().display()))]
    pub fn start(
        service: Arc<IndexingService>,
        root: impl AsRef<Path>,
        index_existing: bool,
    ) -> Result<Arc<Self>> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(Error::NotADirectory(root));
        }

        if index_existing {
            let svc = Arc::clone(&service);
            let root_for_index = root.clone();
            let outcome = retry_or_err::<u64, String, _>("initial_index", move || {
                Ok(svc.index_directory(&root_for_index))
            });
            match outcome {
                Ok(count) => debug!(count, "initial directory index complete"),
                Err(error) => {
                    warn!(%error, "initial directory index failed after retries; watching anyway")
                }
            }
        }

        let (tx, rx) = channel::<notify::Result<Event>>();
        let mut raw_watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(res);
            },
            notify::Config::default(),
        )?;

        let watched_dirs = Arc::new(AtomicU64::new(0));
        register_tree(&mut raw_watcher, &root, &watched_dirs);

        let raw = Arc::new(Mutex::new(Some(raw_watcher)));
        let running = Arc::new(AtomicBool::new(true));
        let rx = Arc::new(Mutex::new(rx));
        let (done_tx, done_rx) = channel::<usize>();

        let workers = (0..WORKER_COUNT)
            .map(|worker_id| {
                let handle = spawn_worker(
                    worker_id,
                    Arc::clone(&rx),
                    Arc::clone(&running),
                    Arc::clone(&service),
                    Arc::clone(&raw),
                    Arc::clone(&watched_dirs),
                    done_tx.clone(),
                );
                (worker_id, handle)
            })
            .collect();

        Ok(Arc::new(Self {
            root,
            raw,
            running,
            watched_dirs,
            workers: Mutex::new(workers),
            worker_done_rx: Mutex::new(done_rx),
        }))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of directories successfully registered with the OS watch, including `root` itself
    /// and any subtree registered since via a `CREATE` directory event.
    pub fn watched_directory_count(&self) -> u64 {
        self.watched_dirs.load(Ordering::Relaxed)
    }

    /// Stop the event loop and release the OS watch handle. Idempotent: a second call is a
    /// no-op.
    ///
    /// Each worker re-checks the running flag on a ≈500ms poll timeout and signals a shared
    /// completion channel when its loop exits. `stop` waits up to `GRACEFUL_SHUTDOWN_WAIT` (2s)
    /// for every worker to report in, then a further `FORCED_SHUTDOWN_WAIT` (1s) before giving
    /// up on stragglers — `std::thread` has no API to force-terminate a thread, so "forced"
    /// here means abandoning the handle rather than killing it: a worker still running past the
    /// combined 3s window is left to finish (or hang) on its own time, and its `JoinHandle` is
    /// dropped unjoined so `stop` itself never blocks past the bound.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let handles: Vec<(usize, JoinHandle<()>)> =
            self.workers.lock().expect("workers lock poisoned").drain(..).collect();
        let mut remaining: HashSet<usize> = handles.iter().map(|(id, _)| *id).collect();

        let done_rx = self
            .worker_done_rx
            .lock()
            .expect("worker completion channel lock poisoned");
        let deadline = Instant::now() + GRACEFUL_SHUTDOWN_WAIT + FORCED_SHUTDOWN_WAIT;

        while !remaining.is_empty() {
            let time_left = deadline.saturating_duration_since(Instant::now());
            if time_left.is_zero() {
                break;
            }
            match done_rx.recv_timeout(time_left) {
                Ok(worker_id) => {
                    remaining.remove(&worker_id);
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
            }
        }

        for (worker_id, handle) in handles {
            if remaining.contains(&worker_id) {
                warn!(
                    worker_id,
                    "worker did not exit within the 2s graceful / 1s forced shutdown window; abandoning its handle"
                );
            } else {
                let _ = handle.join();
            }
        }

        self.raw
            .lock()
            .expect("watcher handle lock poisoned")
            .take();
    }
}

impl Drop for FilesystemWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_worker(
    worker_id: usize,
    rx: Arc<Mutex<Receiver<notify::Result<Event>>>>,
    running: Arc<AtomicBool>,
    service: Arc<IndexingService>,
    raw: Arc<Mutex<Option<RecommendedWatcher>>>,
    watched_dirs: Arc<AtomicU64>,
    done_tx: Sender<usize>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name(format!("fs-watcher-worker-{worker_id}"))
        .spawn(move || {
            debug!(worker_id, "watcher worker started");
            while running.load(Ordering::Relaxed) {
                let received = {
                    let rx = rx.lock().expect("event channel lock poisoned");
                    rx.recv_timeout(POLL_TIMEOUT)
                };

                match received {
                    Ok(Ok(event)) => dispatch_event(&service, &raw, &watched_dirs, event),
                    Ok(Err(error)) => warn!(worker_id, %error, "watch error"),
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!(worker_id, "watcher worker stopped");
            let _ = done_tx.send(worker_id);
        })
        .expect("failed to spawn watcher worker thread")
}

/// Dispatch one OS event. A directory `CREATE` registers the new subtree;
/// any other `CREATE`/`MODIFY` path is handed to `index_file`, which applies its own filter and
/// quietly does nothing for non-indexable paths. `REMOVE` is handed to `remove_file`, which is a
/// no-op for paths that were never indexed. Everything else (`Access`, `Any`, and `Other` —
/// which is where this crate treats a queue overflow as landing) is logged and ignored.
fn dispatch_event(
    service: &IndexingService,
    raw: &Arc<Mutex<Option<RecommendedWatcher>>>,
    watched_dirs: &AtomicU64,
    event: Event,
) {
    match event.kind {
        EventKind::Create(_) => {
            for path in &event.paths {
                if path.is_dir() {
                    register_new_subtree(raw, path, watched_dirs);
                } else {
                    service.index_file(path);
                }
            }
        }
        EventKind::Modify(_) => {
            for path in &event.paths {
                if path.is_file() {
                    service.index_file(path);
                }
            }
        }
        EventKind::Remove(_) => {
            for path in &event.paths {
                service.remove_file(path);
            }
        }
        EventKind::Other => {
            warn!("received an overflow/unclassified watch event; ignoring");
        }
        EventKind::Access(_) | EventKind::Any => {}
    }
}

fn register_new_subtree(raw: &Arc<Mutex<Option<RecommendedWatcher>>>, path: &Path, watched_dirs: &AtomicU64) {
    let mut guard = raw.lock().expect("watcher handle lock poisoned");
    if let Some(watcher) = guard.as_mut() {
        register_tree(watcher, path, watched_dirs);
    }
}

/// Register `root` and every directory beneath it (best-effort; an individual registration
/// failure is logged and does not abort the walk).
fn register_tree(watcher: &mut RecommendedWatcher, root: &Path, watched_dirs: &AtomicU64) {
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!(%error, "failed to walk directory entry during watch registration");
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        match watcher.watch(entry.path(), RecursiveMode::NonRecursive) {
            Ok(()) => {
                watched_dirs.fetch_add(1, Ordering::Relaxed);
            }
            Err(error) => {
                warn!(path = %entry.path().display(), %error, "failed to register directory with watcher");
            }
        }
    }
}
