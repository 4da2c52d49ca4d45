//! Version History Tests
//!
//! Tests for:
//! - Numbering starts at 1 and increases by exactly one per append
//! - Concurrent appends to one file never lose or duplicate a number
//! - Appends to different files are independent
//! - Histories persist through the file-backed metadata store

use filevault::metadata::{FileMetadataStore, InMemoryMetadataStore, MetadataStore};
use filevault::VersionStore;
use std::collections::BTreeSet;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn memory_store() -> Arc<VersionStore> {
    Arc::new(VersionStore::new(Arc::new(InMemoryMetadataStore::new())))
}

// =============================================================================
// Numbering
// =============================================================================

#[test]
fn test_notes_scenario() {
    let store = memory_store();

    assert_eq!(store.add_version("alice/notes.txt", b"hello").unwrap(), 1);
    assert_eq!(store.add_version("alice/notes.txt", b"hello world").unwrap(), 2);

    let versions = store.all_versions("alice/notes.txt").unwrap();
    let contents: Vec<&[u8]> = versions.iter().map(|v| v.content()).collect();
    assert_eq!(contents, vec![&b"hello"[..], &b"hello world"[..]]);
    assert_eq!(
        versions.iter().map(|v| v.number()).collect::<Vec<_>>(),
        vec![1, 2]
    );
}

#[test]
fn test_version_lookup_by_number() {
    let store = memory_store();
    store.add_version("alice/a", b"first").unwrap();
    store.add_version("alice/a", b"second").unwrap();

    assert_eq!(store.version("alice/a", 1).unwrap().content(), b"first");
    assert!(store.version("alice/a", 3).is_err());
}

#[test]
fn test_files_have_independent_histories() {
    let store = memory_store();
    store.add_version("alice/a", b"a1").unwrap();
    store.add_version("alice/a", b"a2").unwrap();

    assert_eq!(store.add_version("alice/b", b"b1").unwrap(), 1);
    assert_eq!(store.add_version("bob/a", b"other user").unwrap(), 1);
    assert_eq!(store.latest_version("alice/a").unwrap(), 2);
}

#[test]
fn test_versions_are_immutable_snapshots() {
    let store = memory_store();
    let mut content = b"draft".to_vec();
    store.add_version("alice/a", &content).unwrap();

    content.clear();
    content.extend_from_slice(b"changed");
    store.add_version("alice/a", &content).unwrap();

    assert_eq!(store.version("alice/a", 1).unwrap().content(), b"draft");
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_appends_are_totally_ordered() {
    const WRITERS: usize = 16;

    let store = memory_store();
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let content = format!("writer {}", i);
                let number = store.add_version("alice/shared.txt", content.as_bytes()).unwrap();
                (number, content)
            })
        })
        .collect();

    let results: Vec<(u64, String)> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let numbers: BTreeSet<u64> = results.iter().map(|(n, _)| *n).collect();
    assert_eq!(numbers, (1..=WRITERS as u64).collect::<BTreeSet<_>>());

    let versions = store.all_versions("alice/shared.txt").unwrap();
    assert_eq!(versions.len(), WRITERS);
    for (number, content) in &results {
        let version = &versions[(*number - 1) as usize];
        assert_eq!(version.number(), *number);
        assert_eq!(version.content(), content.as_bytes());
    }
}

#[test]
fn test_concurrent_appends_to_different_files() {
    let store = memory_store();
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let filename = format!("alice/file-{}", i);
                for _ in 0..10 {
                    store.add_version(&filename, b"x").unwrap();
                }
                filename
            })
        })
        .collect();

    for handle in handles {
        let filename = handle.join().unwrap();
        assert_eq!(store.latest_version(&filename).unwrap(), 10);
    }
}

#[test]
fn test_two_stores_sharing_metadata_do_not_lose_updates() {
    // Separate lock tables, as two processes would have
    let metadata: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
    let a = Arc::new(VersionStore::new(Arc::clone(&metadata)).with_max_append_retries(64));
    let b = Arc::new(VersionStore::new(Arc::clone(&metadata)).with_max_append_retries(64));
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = [a, b]
        .into_iter()
        .map(|store| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..20 {
                    store.add_version("alice/shared", b"x").unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let versions = metadata.list_versions("alice/shared").unwrap();
    assert_eq!(versions.len(), 40);
    assert!(versions.iter().enumerate().all(|(i, v)| v.number() == i as u64 + 1));
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_history_persists_across_reopen() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = VersionStore::new(Arc::new(FileMetadataStore::open(temp_dir.path()).unwrap()));
        store.add_version("alice/notes.txt", b"hello").unwrap();
        store.add_version("alice/notes.txt", b"hello world").unwrap();
    }

    let store = VersionStore::new(Arc::new(FileMetadataStore::open(temp_dir.path()).unwrap()));
    assert_eq!(store.latest_version("alice/notes.txt").unwrap(), 2);
    assert_eq!(store.add_version("alice/notes.txt", b"third").unwrap(), 3);
    assert_eq!(
        store.version("alice/notes.txt", 2).unwrap().content(),
        b"hello world"
    );
}
