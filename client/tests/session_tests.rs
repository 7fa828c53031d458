use std::sync::Arc;

use client::SessionStore;
use client::session::{FileSessionPersistence, MemoryPersistence, PersistedSession, SessionPersistence};

fn open(path: &std::path::Path) -> SessionStore {
    SessionStore::open(Arc::new(FileSessionPersistence::new(path)), "Bearer")
}

#[test]
fn test_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("session.json");

    let first = open(&path);
    first.set("tok-1", Some("u1")).unwrap();
    drop(first);

    let second = open(&path);
    let session = second.get();
    assert_eq!(session.token(), Some("tok-1"));
    assert_eq!(session.user_id(), Some("u1"));
    assert_eq!(second.authorization().as_deref(), Some("Bearer tok-1"));
}

#[test]
fn test_clear_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let store = open(&path);
    store.set("tok-1", Some("u1")).unwrap();
    store.clear();
    store.clear();
    assert!(!path.exists());

    let reopened = open(&path);
    assert!(!reopened.get().is_authenticated());
}

#[test]
fn test_corrupt_file_reads_as_logged_out() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = open(&path);
    assert!(store.get().token().is_none());
    assert!(store.authorization().is_none());
}

#[test]
fn test_stores_sharing_persistence() {
    let persistence = Arc::new(MemoryPersistence::with_session(PersistedSession {
        token: "Bearer shared".to_string(),
        user_id: Some("u7".to_string()),
    }));

    let store = SessionStore::open(persistence.clone(), "Bearer");
    assert_eq!(store.get().token(), Some("shared"));

    store.clear();
    assert!(persistence.load().unwrap().is_none());
}
