//! Filesystem-driven end-to-end scenarios. Unit tests in `src/index.rs` already cover the
//! in-memory shapes of S1-S4 directly against [`InvertedIndex`]; these tests drive the same
//! scenarios (plus the watcher-only S5/S6) through real files and a real [`IndexingService`] /
//! [`FilesystemWatcher`], using `tempfile` for throwaway directories.

use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use indexing::{FileFilter, FilesystemWatcher, IndexingService, WordTokenizer};
use tempfile::tempdir;

fn service() -> IndexingService {
    IndexingService::new(Box::new(WordTokenizer::new()), FileFilter::for_service())
}

fn wait_until(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    condition()
}

#[test]
fn s1_basic_index_and_search() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.txt");
    fs::write(&path, "hello world\nhello again").unwrap();

    let svc = service();
    assert!(svc.index_file(&path));

    let hello = svc.search_all(&["hello".to_string()]);
    assert_eq!(hello.len(), 2);

    let hello_world = svc.search_all(&["hello".to_string(), "world".to_string()]);
    assert_eq!(hello_world.len(), 1);
    assert_eq!(hello_world[0].line, 1);

    let hello_again = svc.search_all(&["hello".to_string(), "again".to_string()]);
    assert_eq!(hello_again.len(), 1);
    assert_eq!(hello_again[0].line, 2);

    assert!(svc.search_all(&["hello".to_string(), "missing".to_string()]).is_empty());
}

#[test]
fn s2_multi_term_same_line_intersection() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("b.txt");
    fs::write(&path, "alpha beta\nbeta gamma").unwrap();

    let svc = service();
    assert!(svc.index_file(&path));

    assert_eq!(svc.search_all(&["alpha".to_string(), "beta".to_string()]).len(), 1);
    assert_eq!(svc.search_all(&["beta".to_string(), "gamma".to_string()]).len(), 1);
    assert!(svc.search_all(&["alpha".to_string(), "gamma".to_string()]).is_empty());
}

#[test]
fn s3_reindex_atomicity_via_real_file_rewrite() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("c.txt");
    fs::write(&path, "foo").unwrap();

    let svc = service();
    assert!(svc.index_file(&path));
    assert_eq!(svc.search_all(&["foo".to_string()]).len(), 1);

    fs::write(&path, "bar").unwrap();
    assert!(svc.index_file(&path));

    assert!(svc.search_all(&["foo".to_string()]).is_empty());
    assert_eq!(svc.search_all(&["bar".to_string()]).len(), 1);
}

#[test]
fn s4_remove_file_clears_everything() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("c.txt");
    fs::write(&path, "bar").unwrap();

    let svc = service();
    svc.index_file(&path);
    assert!(svc.remove_file(&path));
    assert!(svc.search_all(&["bar".to_string()]).is_empty());
}

#[test]
fn s5_watcher_create_modify_delete() {
    let dir = tempdir().unwrap();
    let svc = Arc::new(service());
    let watcher = FilesystemWatcher::start(Arc::clone(&svc), dir.path(), false).unwrap();

    let target = dir.path().join("x.txt");
    fs::write(&target, "ping").unwrap();
    assert!(wait_until(
        || !svc.search_all(&["ping".to_string()]).is_empty(),
        Duration::from_secs(2)
    ));

    fs::write(&target, "pong").unwrap();
    assert!(wait_until(
        || svc.search_all(&["ping".to_string()]).is_empty()
            && !svc.search_all(&["pong".to_string()]).is_empty(),
        Duration::from_secs(2)
    ));

    fs::remove_file(&target).unwrap();
    assert!(wait_until(
        || svc.search_all(&["pong".to_string()]).is_empty(),
        Duration::from_secs(2)
    ));

    watcher.stop();
}

#[test]
fn s6_file_type_gate() {
    let dir = tempdir().unwrap();
    let svc = Arc::new(service());
    let watcher = FilesystemWatcher::start(Arc::clone(&svc), dir.path(), false).unwrap();

    fs::write(dir.path().join("y.bin"), "ping").unwrap();
    thread::sleep(Duration::from_millis(300));
    assert!(svc.search_all(&["ping".to_string()]).is_empty());

    fs::write(dir.path().join("y.txt"), "ping").unwrap();
    assert!(wait_until(
        || !svc.search_all(&["ping".to_string()]).is_empty(),
        Duration::from_secs(2)
    ));

    watcher.stop();
}
