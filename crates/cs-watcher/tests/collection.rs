//! End-to-end behavior of a single collection watch.

mod common;

use std::sync::Arc;

use camino::Utf8Path;
use common::{
    config, is_parsing_error, registry, wait_idle, FakeBackend, Fixture, BRUNO_JSON, COLLECTION_BRU, REQUEST, WAIT,
};
use cs_core::{ItemUid, LaneConfig};
use cs_lanes::{InlineQueue, Job, LaneRouter, TaskQueue};
use cs_watcher::{
    CollectionId, LifecycleKind, MemorySink, Notification, PhaseName, RequestState, SnapshotItem, Strategy,
    TreeEventKind, TreeNode,
};
use parking_lot::Mutex;

fn tree_updates(sink: &MemorySink, path: &Utf8Path) -> Vec<(TreeEventKind, TreeNode)> {
    sink.notifications()
        .into_iter()
        .filter_map(|n| match n {
            Notification::TreeUpdate { kind, node } if node.meta.path == path => Some((kind, node)),
            _ => None,
        })
        .collect()
}

fn lifecycle_count(sink: &MemorySink, wanted: LifecycleKind) -> usize {
    sink.count(|n| matches!(n, Notification::WatcherLifecycle { kind, .. } if *kind == wanted))
}

fn uid_of(sink: &MemorySink, path: &Utf8Path, wanted: TreeEventKind) -> Option<ItemUid> {
    tree_updates(sink, path)
        .into_iter()
        .find(|(kind, _)| *kind == wanted)
        .map(|(_, node)| node.meta.uid)
}

#[tokio::test]
async fn test_initial_load_goes_idle_exactly_once() {
    let fixture = Fixture::new();
    fixture.write("bruno.json", BRUNO_JSON);
    fixture.write("collection.bru", COLLECTION_BRU);
    let request = fixture.write("users/list.bru", REQUEST);

    let sink = Arc::new(MemorySink::new());
    let backend = FakeBackend::new();
    let registry = registry(&sink, &backend, config());
    let id = CollectionId::from("petstore");

    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    assert!(matches!(
        sink.notifications().first(),
        Some(Notification::LoadingStateChanged { is_loading: true, .. })
    ));

    wait_idle(&sink, &id).await;
    registry.complete_discovery(&id).await.expect("known collection");
    let snapshot = registry.snapshot(&id).await.expect("snapshot");

    assert_eq!(sink.count(|n| n.loading_change() == Some(false)), 1);
    assert_eq!(sink.count(|n| n.loading_change() == Some(true)), 1);
    assert_eq!(snapshot.phase, PhaseName::Idle);
    assert!(!snapshot.loading);
    assert_eq!(snapshot.root.name, "Petstore");
    assert_eq!(backend.starts(), vec![Strategy::Native]);

    let list = snapshot.find_request(&request).expect("request in tree");
    assert_eq!(list.state, RequestState::Complete);
    assert_eq!(list.name, "Get Users");
    assert!(list.data.is_some());
    assert!(matches!(&snapshot.root.items[0], SnapshotItem::Folder(f) if f.name == "users"));

    let config = registry.collection_config(&id).expect("bruno.json loaded");
    assert_eq!(config.name, "petstore");
    assert_eq!(sink.count(|n| matches!(n, Notification::ConfigUpdated { .. })), 1);
    assert_eq!(sink.count(is_parsing_error), 0);
}

#[tokio::test]
async fn test_request_hydrates_progressively() {
    let fixture = Fixture::new();
    let request = fixture.write("ping.bru", REQUEST);

    let sink = Arc::new(MemorySink::new());
    let registry = registry(&sink, &FakeBackend::new(), config());
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    wait_idle(&sink, &id).await;

    let updates = tree_updates(&sink, &request);
    assert_eq!(updates.len(), 3);

    let (kind, partial) = &updates[0];
    assert_eq!(*kind, TreeEventKind::AddFile);
    assert!(partial.partial);
    assert!(partial.data.is_none());
    assert_eq!(partial.meta.name, "Get Users");
    assert_eq!(partial.meta.seq, Some(1));

    assert!(updates[1].1.loading);
    assert!(updates[2].1.is_complete());
    assert!(!updates[2].1.redacted);
    assert_eq!(updates[2].1.size, Some(REQUEST.len() as u64));

    let reads = sink.count(|n| {
        matches!(n, Notification::FileOperation { path, details, .. } if *path == request && details.ends_with("bytes"))
    });
    assert_eq!(reads, 1);
}

#[tokio::test]
async fn test_one_bad_file_does_not_affect_siblings() {
    let fixture = Fixture::new();
    for i in 0..9 {
        fixture.write(&format!("reqs/ok-{i}.bru"), REQUEST);
    }
    let bad = fixture.write("reqs/bad.bru", "meta {\n  seq: first\n}\n");

    let sink = Arc::new(MemorySink::new());
    let registry = registry(&sink, &FakeBackend::new(), config());
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    wait_idle(&sink, &id).await;

    let snapshot = registry.snapshot(&id).await.expect("snapshot");
    assert_eq!(snapshot.count_requests(RequestState::Complete), 9);
    assert_eq!(snapshot.count_requests(RequestState::Error), 1);
    assert!(snapshot.find_request(&bad).and_then(|r| r.error.as_ref()).is_some());
    assert_eq!(sink.count(is_parsing_error), 1);
    assert_eq!(sink.count(|n| n.loading_change() == Some(false)), 1);
}

/// Valid metadata, broken `get` block: the partial record succeeds and the
/// full parse fails.
const BROKEN_BODY: &str = "meta {\n  name: Broken\n  seq: 2\n}\n\nget {\n  url x\n}\n";

fn assert_partial_then_error(sink: &MemorySink, path: &Utf8Path) {
    let updates = tree_updates(sink, path);
    let (kind, partial) = &updates[0];
    assert_eq!(*kind, TreeEventKind::AddFile);
    assert!(partial.partial);
    assert!(partial.error.is_none());
    assert_eq!(partial.meta.name, "Broken");

    let (_, last) = updates.last().expect("final update");
    assert!(last.error.is_some());
    assert!(last.data.is_none());
    assert!(!last.loading);

    let errors = sink.count(|n| matches!(n, Notification::ParsingError { path: p, .. } if p == path));
    assert_eq!(errors, 1);
    assert_eq!(sink.count(is_parsing_error), 1);
}

#[tokio::test]
async fn test_full_parse_failure_after_partial_record() {
    let fixture = Fixture::new();
    fixture.write("ok.bru", REQUEST);
    let broken = fixture.write("broken.bru", BROKEN_BODY);

    let sink = Arc::new(MemorySink::new());
    let registry = registry(&sink, &FakeBackend::new(), config());
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    wait_idle(&sink, &id).await;

    assert_partial_then_error(&sink, &broken);
    let snapshot = registry.snapshot(&id).await.expect("snapshot");
    assert_eq!(snapshot.find_request(&broken).map(|r| r.state), Some(RequestState::Error));
    assert_eq!(snapshot.count_requests(RequestState::Complete), 1);
    assert_eq!(sink.count(|n| n.loading_change() == Some(false)), 1);
}

#[tokio::test]
async fn test_ignored_prefixes_never_surface() {
    let fixture = Fixture::new();
    fixture.write("node_modules/pkg/a.bru", REQUEST);
    fixture.write("drafts/old.bru", REQUEST);
    let kept = fixture.write("api/a.bru", REQUEST);

    let sink = Arc::new(MemorySink::new());
    let backend = FakeBackend::new();
    let registry = registry(&sink, &backend, config());
    let id = CollectionId::from("c1");
    registry
        .start_watch(&fixture.root, id.clone(), &["drafts".to_owned()])
        .await
        .expect("watch should start");
    wait_idle(&sink, &id).await;

    let late_draft = fixture.write("drafts/new.bru", REQUEST);
    let late_api = fixture.write("api/b.bru", REQUEST);
    backend.touch(&[&late_draft, &late_api]).await;
    assert!(
        sink.wait_for(1, WAIT, |n| matches!(n, Notification::TreeUpdate { node, .. } if node.meta.path == late_api && node.is_complete()))
            .await
    );

    let snapshot = registry.snapshot(&id).await.expect("snapshot");
    assert!(snapshot.find_request(&kept).is_some());
    let leaked = sink.count(|n| match n {
        Notification::TreeUpdate { node, .. } => {
            node.meta.path.as_str().contains("node_modules") || node.meta.path.as_str().contains("drafts")
        }
        _ => false,
    });
    assert_eq!(leaked, 0);
}

#[tokio::test]
async fn test_event_kinds_and_uid_stability() {
    let fixture = Fixture::new();
    fixture.mkdir("users");

    let sink = Arc::new(MemorySink::new());
    let backend = FakeBackend::new();
    let registry = registry(&sink, &backend, config());
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    wait_idle(&sink, &id).await;

    let path = fixture.write("users/get.bru", REQUEST);
    backend.touch(&[&path]).await;
    assert!(
        sink.wait_for(1, WAIT, |n| matches!(n, Notification::TreeUpdate { node, .. } if node.meta.path == path && node.is_complete()))
            .await
    );
    let first_uid = uid_of(&sink, &path, TreeEventKind::AddFile).expect("added");

    std::fs::write(&path, REQUEST.replace("Get Users", "Get All Users")).expect("Failed to write file");
    backend.touch(&[&path]).await;
    assert!(
        sink.wait_for(1, WAIT, |n| matches!(n, Notification::TreeUpdate { node, .. } if node.meta.name == "Get All Users" && node.is_complete()))
            .await
    );

    std::fs::remove_file(&path).expect("Failed to remove file");
    backend.touch(&[&path]).await;
    assert!(
        sink.wait_for(1, WAIT, |n| matches!(n, Notification::TreeUpdate { kind: TreeEventKind::Unlink, node } if node.meta.path == path))
            .await
    );
    assert_eq!(uid_of(&sink, &path, TreeEventKind::Unlink), Some(first_uid.clone()));

    sink.take();
    std::fs::write(&path, REQUEST).expect("Failed to write file");
    backend.touch(&[&path]).await;
    assert!(
        sink.wait_for(1, WAIT, |n| matches!(n, Notification::TreeUpdate { kind: TreeEventKind::AddFile, node } if node.meta.path == path))
            .await
    );
    assert_eq!(uid_of(&sink, &path, TreeEventKind::AddFile), Some(first_uid));
    assert_eq!(lifecycle_count(&sink, LifecycleKind::Add), 1);
}

#[tokio::test]
async fn test_removed_directory_cascades_deepest_first() {
    let fixture = Fixture::new();
    let file = fixture.write("users/admin/get.bru", REQUEST);
    let users = fixture.root.join("users");
    let admin = users.join("admin");

    let sink = Arc::new(MemorySink::new());
    let backend = FakeBackend::new();
    let registry = registry(&sink, &backend, config());
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    wait_idle(&sink, &id).await;
    sink.take();

    std::fs::remove_dir_all(&users).expect("Failed to remove directory");
    backend.touch(&[&users]).await;
    assert!(
        sink.wait_for(1, WAIT, |n| matches!(n, Notification::TreeUpdate { kind: TreeEventKind::UnlinkDir, node } if node.meta.path == users))
            .await
    );

    let order: Vec<_> = sink
        .notifications()
        .into_iter()
        .filter_map(|n| match n {
            Notification::TreeUpdate { kind, node } => Some((kind, node.meta.path)),
            _ => None,
        })
        .collect();
    assert_eq!(
        order,
        vec![
            (TreeEventKind::Unlink, file),
            (TreeEventKind::UnlinkDir, admin),
            (TreeEventKind::UnlinkDir, users),
        ]
    );

    let snapshot = registry.snapshot(&id).await.expect("snapshot");
    assert!(snapshot.root.items.is_empty());
}

#[tokio::test]
async fn test_environment_upserts_keep_uid() {
    let fixture = Fixture::new();
    let env = fixture.write("environments/dev.bru", "vars {\n  host: http://localhost\n}\n");
    fixture.write(".env", "TOKEN=abc\n");

    let sink = Arc::new(MemorySink::new());
    let backend = FakeBackend::new();
    let registry = registry(&sink, &backend, config());
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    wait_idle(&sink, &id).await;

    let upserts = |sink: &MemorySink| -> Vec<(ItemUid, String, usize)> {
        sink.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::EnvironmentUpserted { uid, environment, .. } => {
                    Some((uid, environment.name, environment.variables.len()))
                }
                _ => None,
            })
            .collect()
    };

    let first = upserts(&sink);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].1, "dev");
    assert!(sink.notifications().iter().any(
        |n| matches!(n, Notification::EnvUpdated { variables, .. } if variables.get("TOKEN") == Some("abc"))
    ));

    std::fs::write(&env, "vars {\n  host: http://localhost\n  port: 8080\n}\n").expect("Failed to write file");
    backend.touch(&[&env]).await;
    assert!(
        sink.wait_for(2, WAIT, |n| matches!(n, Notification::EnvironmentUpserted { .. }))
            .await
    );
    let second = upserts(&sink);
    assert_eq!(second[1].0, first[0].0);
    assert_eq!(second[1].2, 2);

    std::fs::remove_file(&env).expect("Failed to remove file");
    backend.touch(&[&env]).await;
    assert!(
        sink.wait_for(1, WAIT, |n| matches!(n, Notification::EnvironmentRemoved { uid, .. } if *uid == first[0].0))
            .await
    );

    let env_dir_nodes = sink.count(|n| {
        matches!(n, Notification::TreeUpdate { node, .. } if node.meta.path.as_str().contains("environments"))
    });
    assert_eq!(env_dir_nodes, 0);
}

#[tokio::test]
async fn test_folder_metadata_names_folder() {
    let fixture = Fixture::new();
    fixture.write("users/folder.bru", "meta {\n  name: User Admin\n  seq: 2\n}\n");
    fixture.write("users/list.bru", REQUEST);
    fixture.write("zeta/a.bru", REQUEST);
    fixture.write("zeta/folder.bru", "meta {\n  name: Zeta\n  seq: 1\n}\n");

    let sink = Arc::new(MemorySink::new());
    let registry = registry(&sink, &FakeBackend::new(), config());
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    wait_idle(&sink, &id).await;

    let snapshot = registry.snapshot(&id).await.expect("snapshot");
    let names: Vec<_> = snapshot.root.items.iter().map(SnapshotItem::name).collect();
    assert_eq!(names, vec!["Zeta", "User Admin"]);
}

#[tokio::test]
async fn test_large_request_is_reduced_and_redacted() {
    let fixture = Fixture::new();
    let body = "x".repeat(4096);
    let content = format!(
        "meta {{\n  name: Upload\n  type: http\n  seq: 1\n}}\n\npost {{\n  url: https://example.com\n  body: text\n  auth: none\n}}\n\nbody:text {{\n  {body}\n}}\n"
    );
    let path = fixture.write("upload.bru", &content);

    let sink = Arc::new(MemorySink::new());
    let watch_config = cs_core::WatchConfig {
        large_file_threshold_bytes: 1024,
        max_leaf_bytes: 64,
        ..config()
    };
    let registry = registry(&sink, &FakeBackend::new(), watch_config);
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    wait_idle(&sink, &id).await;

    let updates = tree_updates(&sink, &path);
    assert!(updates.iter().all(|(_, node)| !node.loading));
    let (_, last) = updates.last().expect("request reported");
    assert!(last.is_complete());
    assert!(last.redacted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_lane_offload_keeps_single_idle() {
    let fixture = Fixture::new();
    let mut paths = Vec::new();
    for i in 0..5 {
        paths.push(fixture.write(&format!("r{i}.bru"), REQUEST));
    }

    let sink = Arc::new(MemorySink::new());
    let lanes = Arc::new(LaneRouter::with_rayon(&LaneConfig::default()).expect("default lanes"));
    let watch_config = cs_core::WatchConfig {
        inline_parse_max_bytes: 0,
        ..config()
    };
    let registry = registry(&sink, &FakeBackend::new(), watch_config).with_lanes(Arc::clone(&lanes));
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    wait_idle(&sink, &id).await;

    let snapshot = registry.snapshot(&id).await.expect("snapshot");
    assert_eq!(snapshot.count_requests(RequestState::Complete), 5);
    assert_eq!(sink.count(|n| n.loading_change() == Some(false)), 1);
    let submitted: u64 = lanes.stats().iter().map(|s| s.submitted).sum();
    assert_eq!(submitted, 5);
}

/// A lane queue that holds jobs until the test releases them.
#[derive(Default)]
struct HeldQueue {
    jobs: Mutex<Vec<Job>>,
}

impl HeldQueue {
    fn release(&self) -> usize {
        let jobs = std::mem::take(&mut *self.jobs.lock());
        let n = jobs.len();
        for job in jobs {
            job();
        }
        n
    }
}

impl TaskQueue for HeldQueue {
    fn enqueue(&self, job: Job) {
        self.jobs.lock().push(job);
    }

    fn name(&self) -> &str {
        "held"
    }
}

fn held_router() -> (Arc<HeldQueue>, Arc<LaneRouter>) {
    let queue = Arc::new(HeldQueue::default());
    let dyn_queue: Arc<dyn TaskQueue> = queue.clone();
    let router = LaneRouter::new(vec![(u64::MAX, dyn_queue)]).expect("one lane");
    (queue, Arc::new(router))
}

#[tokio::test]
async fn test_external_pending_delays_idle() {
    let fixture = Fixture::new();
    let request = fixture.write("slow.bru", REQUEST);
    let external = fixture.root.join("external.bin");
    let (queue, lanes) = held_router();

    let sink = Arc::new(MemorySink::new());
    let watch_config = cs_core::WatchConfig {
        inline_parse_max_bytes: 0,
        ..config()
    };
    let registry = registry(&sink, &FakeBackend::new(), watch_config).with_lanes(lanes);
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");

    // The snapshot is answered once discovery has finished.
    let snapshot = registry.snapshot(&id).await.expect("snapshot");
    assert_eq!(snapshot.phase, PhaseName::Processing);

    registry.add_pending(&id, &external).await.expect("known collection");
    let snapshot = registry.snapshot(&id).await.expect("snapshot");
    assert!(snapshot.loading);

    assert_eq!(queue.release(), 1);
    assert!(
        sink.wait_for(1, WAIT, |n| matches!(n, Notification::TreeUpdate { node, .. } if node.meta.path == request && node.is_complete()))
            .await
    );
    assert_eq!(sink.count(|n| n.loading_change() == Some(false)), 0);

    registry.mark_processed(&id, &external).await.expect("known collection");
    wait_idle(&sink, &id).await;
    registry.mark_processed(&id, &external).await.expect("known collection");
    let _ = registry.snapshot(&id).await;
    assert_eq!(sink.count(|n| n.loading_change() == Some(false)), 1);
}

#[tokio::test]
async fn test_late_lane_result_after_teardown_is_dropped() {
    let fixture = Fixture::new();
    fixture.write("slow.bru", REQUEST);
    let (queue, lanes) = held_router();

    let sink = Arc::new(MemorySink::new());
    let watch_config = cs_core::WatchConfig {
        inline_parse_max_bytes: 0,
        ..config()
    };
    let registry = registry(&sink, &FakeBackend::new(), watch_config).with_lanes(lanes);
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    let _ = registry.snapshot(&id).await;

    assert!(registry.remove_watch(&fixture.root, &id).await);
    assert_eq!(lifecycle_count(&sink, LifecycleKind::Stopped), 1);
    let before = sink.len();

    assert_eq!(queue.release(), 1);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert_eq!(sink.len(), before);
    assert_eq!(sink.count(|n| n.loading_change() == Some(false)), 0);
}

#[tokio::test]
async fn test_inline_queue_lane_matches_inline_parse() {
    let fixture = Fixture::new();
    let request = fixture.write("r.bru", REQUEST);
    let queue: Arc<dyn TaskQueue> = Arc::new(InlineQueue::new("inline"));
    let lanes = Arc::new(LaneRouter::new(vec![(1024, Arc::clone(&queue)), (u64::MAX, queue)]).expect("lanes"));

    let sink = Arc::new(MemorySink::new());
    let watch_config = cs_core::WatchConfig {
        inline_parse_max_bytes: 0,
        ..config()
    };
    let registry = registry(&sink, &FakeBackend::new(), watch_config).with_lanes(lanes);
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    wait_idle(&sink, &id).await;

    let snapshot = registry.snapshot(&id).await.expect("snapshot");
    assert_eq!(
        snapshot.find_request(&request).map(|r| r.state),
        Some(RequestState::Complete)
    );
}

#[tokio::test]
async fn test_failed_lane_parse_reports_error_and_goes_idle() {
    let fixture = Fixture::new();
    let broken = fixture.write("broken.bru", BROKEN_BODY);
    let (queue, lanes) = held_router();

    let sink = Arc::new(MemorySink::new());
    let watch_config = cs_core::WatchConfig {
        inline_parse_max_bytes: 0,
        ..config()
    };
    let registry = registry(&sink, &FakeBackend::new(), watch_config).with_lanes(lanes);
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");

    let snapshot = registry.snapshot(&id).await.expect("snapshot");
    assert_eq!(snapshot.phase, PhaseName::Processing);
    assert_eq!(sink.count(is_parsing_error), 0);

    assert_eq!(queue.release(), 1);
    wait_idle(&sink, &id).await;

    assert_partial_then_error(&sink, &broken);
    assert_eq!(sink.count(|n| n.loading_change() == Some(false)), 1);
}

#[tokio::test]
async fn test_reread_during_lane_parse_still_goes_idle() {
    let fixture = Fixture::new();
    let request = fixture.write("slow.bru", REQUEST);
    let (queue, lanes) = held_router();

    let sink = Arc::new(MemorySink::new());
    let backend = FakeBackend::new();
    let watch_config = cs_core::WatchConfig {
        inline_parse_max_bytes: 100,
        ..config()
    };
    let registry = registry(&sink, &backend, watch_config).with_lanes(lanes);
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");

    let snapshot = registry.snapshot(&id).await.expect("snapshot");
    assert_eq!(snapshot.phase, PhaseName::Processing);

    // Small enough now to parse inline while the first read is still on the lane.
    fixture.write("slow.bru", "meta {\n  name: tiny\n}\n");
    backend.touch(&[&request]).await;
    wait_idle(&sink, &id).await;

    assert_eq!(queue.release(), 1);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let snapshot = registry.snapshot(&id).await.expect("snapshot");
    let record = snapshot.find_request(&request).expect("request in tree");
    assert_eq!(record.name, "tiny");
    assert_eq!(record.state, RequestState::Complete);
    assert_eq!(snapshot.phase, PhaseName::Idle);
    assert_eq!(sink.count(|n| n.loading_change() == Some(false)), 1);
}

#[tokio::test]
async fn test_reread_failure_during_lane_parse_still_goes_idle() {
    let fixture = Fixture::new();
    let request = fixture.write("slow.bru", REQUEST);
    let (queue, lanes) = held_router();

    let sink = Arc::new(MemorySink::new());
    let backend = FakeBackend::new();
    let watch_config = cs_core::WatchConfig {
        inline_parse_max_bytes: 100,
        ..config()
    };
    let registry = registry(&sink, &backend, watch_config).with_lanes(lanes);
    let id = CollectionId::from("c1");
    registry.start_watch(&fixture.root, id.clone(), &[]).await.expect("watch should start");
    let _ = registry.snapshot(&id).await;

    fixture.write("slow.bru", "meta {\n  seq: first\n}\n");
    backend.touch(&[&request]).await;
    wait_idle(&sink, &id).await;
    assert_eq!(sink.count(is_parsing_error), 1);

    assert_eq!(queue.release(), 1);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let snapshot = registry.snapshot(&id).await.expect("snapshot");
    assert_eq!(snapshot.find_request(&request).map(|r| r.state), Some(RequestState::Error));
    assert_eq!(sink.count(|n| n.loading_change() == Some(false)), 1);
}
