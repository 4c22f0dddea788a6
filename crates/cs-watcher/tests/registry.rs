//! Registry operations across collections, and backend resilience.

mod common;

use std::sync::Arc;

use camino::Utf8Path;
use common::{config, exhaustion, registry, wait_idle, FakeBackend, Fixture, REQUEST, WAIT};
use cs_core::RequestFile;
use cs_format::{parse_request, Format, ParseOptions};
use cs_watcher::{
    BackendEvent, CollectionId, FileOperationKind, LifecycleKind, MemorySink, Notification, Strategy, WatchError,
    SAVE_TEMP_SUFFIX,
};

fn lifecycle_count(sink: &MemorySink, wanted: LifecycleKind) -> usize {
    sink.count(|n| matches!(n, Notification::WatcherLifecycle { kind, .. } if *kind == wanted))
}

#[tokio::test]
async fn test_handle_exhaustion_restarts_with_polling_once() {
    let fixture = Fixture::new();
    fixture.write("a.bru", REQUEST);

    let sink = Arc::new(MemorySink::new());
    let backend = FakeBackend::exhausting();
    let registry = registry(&sink, &backend, config());
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    wait_idle(&sink, &id).await;

    assert_eq!(backend.starts(), vec![Strategy::Native, Strategy::Polling]);
    assert_eq!(lifecycle_count(&sink, LifecycleKind::Restarted), 1);
    assert_eq!(lifecycle_count(&sink, LifecycleKind::Degraded), 0);
    let stats = registry.stats(&id).expect("stats");
    assert!(stats.polling);
    assert!(!stats.degraded);

    backend.send(BackendEvent::Error(exhaustion())).await;
    assert!(
        sink.wait_for(1, WAIT, |n| matches!(n, Notification::WatcherLifecycle { kind: LifecycleKind::Degraded, .. }))
            .await
    );

    assert_eq!(backend.starts().len(), 2);
    assert_eq!(lifecycle_count(&sink, LifecycleKind::Restarted), 1);
    assert!(registry.stats(&id).is_some_and(|s| s.degraded));

    let snapshot = registry.snapshot(&id).await.expect("watch keeps answering");
    assert_eq!(snapshot.stats.total_events, 1);
}

#[tokio::test]
async fn test_native_backend_used_by_default() {
    let fixture = Fixture::new();
    let sink = Arc::new(MemorySink::new());
    let backend = FakeBackend::new();
    let registry = registry(&sink, &backend, config());
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    wait_idle(&sink, &id).await;

    assert_eq!(backend.starts(), vec![Strategy::Native]);
    assert_eq!(lifecycle_count(&sink, LifecycleKind::Restarted), 0);
    assert!(registry.stats(&id).is_some_and(|s| !s.polling));
}

#[tokio::test]
async fn test_use_polling_starts_polling_backend() {
    let fixture = Fixture::new();
    let sink = Arc::new(MemorySink::new());
    let backend = FakeBackend::new();
    let polling = cs_core::WatchConfig {
        use_polling: true,
        ..config()
    };
    let registry = registry(&sink, &backend, polling);
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    wait_idle(&sink, &id).await;

    assert_eq!(backend.starts(), vec![Strategy::Polling]);
    assert!(registry.stats(&id).is_some_and(|s| s.polling));
}

#[tokio::test]
async fn test_add_path_routes_to_longest_root() {
    let fixture = Fixture::new();
    let nested = fixture.mkdir("nested");

    let sink = Arc::new(MemorySink::new());
    let backend = FakeBackend::new();
    let registry = registry(&sink, &backend, config());
    let outer = CollectionId::from("outer");
    let inner = CollectionId::from("inner");
    registry.start_watch(&fixture.root, outer.clone(), &[]).await.expect("watch should start");
    registry.start_watch(&nested, inner.clone(), &[]).await.expect("watch should start");
    wait_idle(&sink, &outer).await;
    wait_idle(&sink, &inner).await;
    sink.take();

    let added = fixture.write("nested/new.bru", REQUEST);
    assert!(registry.add_path(&added).await);
    assert!(backend.watched().contains(&added));

    let owners: Vec<CollectionId> = sink
        .notifications()
        .into_iter()
        .filter_map(|n| match n {
            Notification::TreeUpdate { node, .. } if node.meta.path == added => Some(node.meta.collection_id),
            _ => None,
        })
        .collect();
    assert!(!owners.is_empty());
    assert!(owners.iter().all(|id| *id == inner));

    assert!(registry.remove_path(&added).await);
    assert!(backend.unwatched().contains(&added));

    let elsewhere = Fixture::new();
    assert!(!registry.add_path(&elsewhere.root.join("x.bru")).await);
}

#[tokio::test]
async fn test_save_request_writes_through_temp_file() {
    let fixture = Fixture::new();
    let sink = Arc::new(MemorySink::new());
    let registry = registry(&sink, &FakeBackend::new(), config());
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    wait_idle(&sink, &id).await;

    let request = RequestFile::new("Saved");
    registry
        .save_request(&id, Utf8Path::new("users/saved.bru"), &request, Format::Primary)
        .await
        .expect_err("parent directory does not exist yet");

    fixture.mkdir("users");
    registry
        .save_request(&id, Utf8Path::new("users/saved.bru"), &request, Format::Primary)
        .await
        .expect("save should succeed");

    let target = fixture.root.join("users/saved.bru");
    let written = std::fs::read_to_string(&target).expect("saved file");
    let parsed = parse_request(&written, ParseOptions::new(Format::Primary)).expect("saved content parses");
    assert_eq!(parsed.name, "Saved");
    assert!(!std::path::Path::new(&format!("{target}{SAVE_TEMP_SUFFIX}")).exists());

    let writes = sink.count(|n| {
        matches!(n, Notification::FileOperation { operation: FileOperationKind::Write, path, .. } if *path == target)
    });
    assert_eq!(writes, 1);
}

#[tokio::test]
async fn test_save_request_rejects_bad_targets() {
    let fixture = Fixture::new();
    let sink = Arc::new(MemorySink::new());
    let registry = registry(&sink, &FakeBackend::new(), config());
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");

    let request = RequestFile::new("Saved");
    let outside = registry
        .save_request(&id, Utf8Path::new("/elsewhere/x.bru"), &request, Format::Yaml)
        .await;
    assert!(matches!(outside, Err(WatchError::OutsideRoot { .. })));

    let unknown = registry
        .save_request(&CollectionId::from("nope"), Utf8Path::new("x.bru"), &request, Format::Yaml)
        .await;
    assert!(matches!(unknown, Err(WatchError::WatchNotFound(_))));
}

#[tokio::test]
async fn test_remove_watch_tears_down() {
    let fixture = Fixture::new();
    let sink = Arc::new(MemorySink::new());
    let registry = registry(&sink, &FakeBackend::new(), config());
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    wait_idle(&sink, &id).await;
    assert!(registry.is_watching(&id));

    assert!(registry.remove_watch(&fixture.root, &id).await);
    assert!(!registry.is_watching(&id));
    assert_eq!(lifecycle_count(&sink, LifecycleKind::Stopped), 1);
    assert!(matches!(sink.notifications().last(), Some(Notification::WatcherStats { .. })));
    assert!(registry.collection_config(&id).is_none());

    assert!(!registry.remove_watch(&fixture.root, &id).await);
}

#[tokio::test]
async fn test_start_watch_replaces_existing() {
    let fixture = Fixture::new();
    let other = Fixture::new();
    let sink = Arc::new(MemorySink::new());
    let registry = registry(&sink, &FakeBackend::new(), config());
    let id = CollectionId::from("c1");

    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    registry.start_watch(&other.root, id.clone(), &[]).await.expect("watch should restart");

    assert_eq!(lifecycle_count(&sink, LifecycleKind::Started), 2);
    assert_eq!(lifecycle_count(&sink, LifecycleKind::Stopped), 1);
    assert_eq!(registry.collection_ids(), vec![id.clone()]);
    assert_eq!(registry.root(&id), Some(other.root.clone()));

    registry.shutdown().await;
    assert!(registry.collection_ids().is_empty());
    assert_eq!(lifecycle_count(&sink, LifecycleKind::Stopped), 2);
}

#[tokio::test]
async fn test_periodic_stats_are_emitted() {
    let fixture = Fixture::new();
    fixture.write("a.bru", REQUEST);
    let sink = Arc::new(MemorySink::new());
    let backend = FakeBackend::new();
    let with_stats = cs_core::WatchConfig {
        stats_interval_ms: 20,
        ..config()
    };
    let registry = registry(&sink, &backend, with_stats);
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    wait_idle(&sink, &id).await;

    let added = fixture.write("b.bru", REQUEST);
    backend.touch(&[&added]).await;
    assert!(
        sink.wait_for(1, WAIT, |n| matches!(n, Notification::WatcherStats { stats, .. } if stats.watched_files == 2))
            .await
    );
}
