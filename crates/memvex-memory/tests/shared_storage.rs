// Memory stores opened on the same file share state; different files do not.

#![cfg(feature = "sqlite")]

use memvex_memory::{
    MemoryBackend, MemoryConfig, MemoryQuery, MemoryService, NewMemory, SqliteStore,
};
use tempfile::tempdir;

#[test]
fn same_path_handles_see_each_others_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(".memvex").join("memory.db");

    let writer = SqliteStore::open(&path).unwrap();
    let reader = SqliteStore::open(&path).unwrap();

    let entry = writer
        .store(NewMemory::new("The deploy key lives in vault").namespace("ops"))
        .unwrap();

    let hits = reader.recall(&MemoryQuery::new("vault")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, entry.id);

    assert!(reader.forget(entry.id).unwrap());
    assert!(writer.list(None).unwrap().is_empty());
}

#[test]
fn different_paths_are_isolated() {
    let dir = tempdir().unwrap();
    let a = SqliteStore::open(dir.path().join("a").join("memory.db")).unwrap();
    let b = SqliteStore::open(dir.path().join("b").join("memory.db")).unwrap();

    let entry = a.store(NewMemory::new("only in a")).unwrap();
    assert!(b.list(None).unwrap().is_empty());
    assert!(b.recall(&MemoryQuery::new("only")).unwrap().is_empty());
    assert!(!b.forget(entry.id).unwrap());
    assert_eq!(a.list(None).unwrap().len(), 1);
}

#[test]
fn services_built_from_same_config_share_memories() {
    let dir = tempdir().unwrap();
    let default_path = dir.path().join(".memvex").join("memory.db");
    let config = MemoryConfig::default();

    let claude = MemoryService::from_config(&config, &default_path);
    let cursor = MemoryService::from_config(&config, &default_path);

    claude
        .store(
            NewMemory::new("User prefers tabs over spaces")
                .namespace("coding")
                .agent("claude")
                .tags(["style"]),
        )
        .unwrap();

    let hits = cursor
        .recall(MemoryQuery::new("tabs").namespace("coding").tags(["style"]))
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].agent.as_deref(), Some("claude"));
}

#[test]
fn round_trip_store_list_forget() {
    let dir = tempdir().unwrap();
    let svc = MemoryService::from_config(&MemoryConfig::default(), &dir.path().join("memory.db"));

    let entry = svc
        .store(NewMemory::new("x").namespace("work").tags(["a"]))
        .unwrap();

    let listed = svc.list(Some("work")).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].content, "x");
    assert_eq!(listed[0].tags, Some(vec!["a".to_string()]));

    assert!(svc.forget(entry.id).unwrap());
    assert!(svc.list(None).unwrap().iter().all(|e| e.id != entry.id));
}

#[test]
fn memories_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("memory.db");
    {
        let svc = MemoryService::from_config(&MemoryConfig::default(), &path);
        svc.store(NewMemory::new("The quick brown fox")).unwrap();
        svc.store(NewMemory::new("The lazy dog")).unwrap();
    }

    let svc = MemoryService::from_config(&MemoryConfig::default(), &path);
    let hits = svc.recall(MemoryQuery::new("fox")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].content, "The quick brown fox");
    assert_eq!(svc.list(None).unwrap().len(), 2);
}
