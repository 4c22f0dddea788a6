//! Shared fixtures for the watcher integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use cs_core::WatchConfig;
use cs_watcher::{
    BackendEvent, BackendRequest, BackendWatch, CollectionId, MemorySink, Notification, PathBatch, Strategy,
    WatchBackend, WatchError, WatcherRegistry,
};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::mpsc;

pub const WAIT: Duration = Duration::from_secs(10);

pub const REQUEST: &str = "meta {\n  name: Get Users\n  type: http\n  seq: 1\n}\n\nget {\n  url: https://example.com/users\n  body: none\n  auth: none\n}\n";

pub const COLLECTION_BRU: &str = "meta {\n  name: Petstore\n}\n";

pub const BRUNO_JSON: &str = r#"{"version":"1","name":"petstore","type":"collection"}"#;

/// A backend driven by the test instead of the OS.
#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    exhaust_native: bool,
    starts: Vec<Strategy>,
    events: Option<mpsc::Sender<BackendEvent>>,
    watched: Vec<Utf8PathBuf>,
    unwatched: Vec<Utf8PathBuf>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Native starts fail as if the OS ran out of watch handles.
    pub fn exhausting() -> Self {
        let backend = Self::default();
        backend.inner.lock().exhaust_native = true;
        backend
    }

    pub fn starts(&self) -> Vec<Strategy> {
        self.inner.lock().starts.clone()
    }

    pub fn watched(&self) -> Vec<Utf8PathBuf> {
        self.inner.lock().watched.clone()
    }

    pub fn unwatched(&self) -> Vec<Utf8PathBuf> {
        self.inner.lock().unwatched.clone()
    }

    pub async fn send(&self, event: BackendEvent) {
        let sender = self.inner.lock().events.clone();
        if let Some(sender) = sender {
            sender.send(event).await.expect("collection should be running");
        }
    }

    pub async fn touch(&self, paths: &[&Utf8Path]) {
        let batch: PathBatch = paths.iter().map(|p| (*p).to_owned()).collect();
        self.send(BackendEvent::Paths(batch)).await;
    }
}

impl WatchBackend for FakeBackend {
    fn start(&self, request: BackendRequest) -> Result<Box<dyn BackendWatch>, WatchError> {
        let mut state = self.inner.lock();
        state.starts.push(request.strategy);
        if state.exhaust_native && request.strategy == Strategy::Native {
            return Err(exhaustion());
        }
        state.events = Some(request.events);
        Ok(Box::new(FakeWatch {
            strategy: request.strategy,
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct FakeWatch {
    strategy: Strategy,
    inner: Arc<Mutex<FakeState>>,
}

impl BackendWatch for FakeWatch {
    fn watch(&mut self, path: &Utf8Path) -> Result<(), WatchError> {
        self.inner.lock().watched.push(path.to_owned());
        Ok(())
    }

    fn unwatch(&mut self, path: &Utf8Path) -> Result<(), WatchError> {
        self.inner.lock().unwatched.push(path.to_owned());
        Ok(())
    }

    fn strategy(&self) -> Strategy {
        self.strategy
    }
}

pub fn exhaustion() -> WatchError {
    WatchError::Notify(notify::Error::new(notify::ErrorKind::MaxFilesWatch))
}

/// A temporary collection directory with a canonical UTF-8 root.
pub struct Fixture {
    _dir: TempDir,
    pub root: Utf8PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let canonical = std::fs::canonicalize(dir.path()).expect("canonicalize");
        let root = Utf8PathBuf::try_from(canonical).expect("Invalid path");
        Self { _dir: dir, root }
    }

    pub fn write(&self, relative: &str, content: &str) -> Utf8PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    pub fn mkdir(&self, relative: &str) -> Utf8PathBuf {
        let path = self.root.join(relative);
        std::fs::create_dir_all(&path).expect("Failed to create directory");
        path
    }
}

pub fn config() -> WatchConfig {
    WatchConfig {
        stats_interval_ms: 0,
        ..WatchConfig::default()
    }
}

pub fn registry(sink: &Arc<MemorySink>, backend: &FakeBackend, config: WatchConfig) -> WatcherRegistry {
    WatcherRegistry::new(config, sink.clone()).with_backend(Arc::new(backend.clone()))
}

pub fn is_idle(id: &CollectionId) -> impl Fn(&Notification) -> bool + '_ {
    move |n| matches!(n, Notification::LoadingStateChanged { collection_id, is_loading: false } if collection_id == id)
}

pub fn is_parsing_error(n: &Notification) -> bool {
    matches!(n, Notification::ParsingError { .. })
}

/// Waits for the collection to report idle.
pub async fn wait_idle(sink: &MemorySink, id: &CollectionId) {
    assert!(sink.wait_for(1, WAIT, is_idle(id)).await, "collection never became idle");
}
