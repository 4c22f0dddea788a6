//! Filesystem notification backends.
//!
//! A backend turns OS notifications into batches of changed paths on the
//! collection's channel. The collection actor derives event kinds itself, so
//! a backend only has to say *which* paths changed.
//!
//! [`NotifyBackend`] is the production implementation, built on
//! `notify-debouncer-mini` over either the platform watcher or
//! [`notify::PollWatcher`]. Hosts and tests can inject any other
//! [`WatchBackend`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                notify threads (native or polling)            │
//! │  ┌──────────────┐    ┌──────────────┐    ┌───────────────┐   │
//! │  │ Watcher      │ -> │ Debouncer    │ -> │ Callback      │   │
//! │  │              │    │ (debounce_ms)│    │ (UTF-8+filter)│   │
//! │  └──────────────┘    └──────────────┘    └───────┬───────┘   │
//! └──────────────────────────────────────────────────│───────────┘
//!                                      blocking_send │
//!                                                    ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │             collection actor (tokio task)                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use cs_core::WatchConfig;
use notify::{PollWatcher, RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer_opt, Config, DebounceEventResult, Debouncer};
use smallvec::SmallVec;
use tokio::sync::mpsc;

use crate::error::WatchError;
use crate::filter::FileFilter;

/// Which notification mechanism a backend uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// The platform's native notifications (inotify, `FSEvents`, ...).
    Native,
    /// Periodic directory scans.
    Polling,
}

/// A batch of changed paths.
pub type PathBatch = SmallVec<[Utf8PathBuf; 8]>;

/// What a backend reports to its collection.
#[derive(Debug)]
pub enum BackendEvent {
    /// These paths changed in some way.
    Paths(PathBatch),
    /// The backend failed after starting.
    Error(WatchError),
}

/// Everything a backend needs to start watching a root.
pub struct BackendRequest {
    /// The collection root.
    pub root: Utf8PathBuf,
    /// Native or polling.
    pub strategy: Strategy,
    /// Debounce, recursion and poll interval settings.
    pub config: WatchConfig,
    /// Paths failing this filter must not be reported.
    pub filter: Arc<dyn FileFilter>,
    /// Where to report.
    pub events: mpsc::Sender<BackendEvent>,
}

impl std::fmt::Debug for BackendRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRequest")
            .field("root", &self.root)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

/// Starts watches.
pub trait WatchBackend: Send + Sync + 'static {
    /// Starts watching `request.root`.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the watch cannot be established.
    fn start(&self, request: BackendRequest) -> Result<Box<dyn BackendWatch>, WatchError>;
}

/// A running watch. Dropping it stops the watch.
pub trait BackendWatch: Send {
    /// Adds a path to the watch.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the path cannot be watched.
    fn watch(&mut self, path: &Utf8Path) -> Result<(), WatchError>;

    /// Removes a path from the watch.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the path was not watched.
    fn unwatch(&mut self, path: &Utf8Path) -> Result<(), WatchError>;

    /// The mechanism in use.
    fn strategy(&self) -> Strategy;
}

/// The production backend, built on `notify`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyBackend;

enum NotifyDebouncer {
    Native(Debouncer<RecommendedWatcher>),
    Polling(Debouncer<PollWatcher>),
}

struct NotifyWatch {
    debouncer: NotifyDebouncer,
    mode: RecursiveMode,
}

impl WatchBackend for NotifyBackend {
    fn start(&self, request: BackendRequest) -> Result<Box<dyn BackendWatch>, WatchError> {
        let BackendRequest {
            root,
            strategy,
            config,
            filter,
            events,
        } = request;

        let debouncer_config = Config::default()
            .with_timeout(config.debounce())
            .with_notify_config(notify::Config::default().with_poll_interval(config.poll_interval()));
        let handler = event_handler(filter, events);

        let debouncer = match strategy {
            Strategy::Native => NotifyDebouncer::Native(new_debouncer_opt(debouncer_config, handler)?),
            Strategy::Polling => NotifyDebouncer::Polling(new_debouncer_opt(debouncer_config, handler)?),
        };

        let mode = if config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        let mut watch = NotifyWatch { debouncer, mode };
        watch.watch(&root)?;

        tracing::info!(path = %root, ?strategy, recursive = config.recursive, "File watcher started");
        Ok(Box::new(watch))
    }
}

impl BackendWatch for NotifyWatch {
    fn watch(&mut self, path: &Utf8Path) -> Result<(), WatchError> {
        let path = path.as_std_path();
        match &mut self.debouncer {
            NotifyDebouncer::Native(d) => notify::Watcher::watch(d.watcher(), path, self.mode)?,
            NotifyDebouncer::Polling(d) => notify::Watcher::watch(d.watcher(), path, self.mode)?,
        }
        Ok(())
    }

    fn unwatch(&mut self, path: &Utf8Path) -> Result<(), WatchError> {
        let path = path.as_std_path();
        match &mut self.debouncer {
            NotifyDebouncer::Native(d) => notify::Watcher::unwatch(d.watcher(), path)?,
            NotifyDebouncer::Polling(d) => notify::Watcher::unwatch(d.watcher(), path)?,
        }
        Ok(())
    }

    fn strategy(&self) -> Strategy {
        match self.debouncer {
            NotifyDebouncer::Native(_) => Strategy::Native,
            NotifyDebouncer::Polling(_) => Strategy::Polling,
        }
    }
}

/// Builds the debouncer callback: UTF-8 conversion, filtering, and
/// forwarding with `blocking_send` (it runs on notify's own thread).
fn event_handler(
    filter: Arc<dyn FileFilter>,
    tx: mpsc::Sender<BackendEvent>,
) -> impl FnMut(DebounceEventResult) + Send + 'static {
    move |res: DebounceEventResult| {
        let event = match res {
            Ok(events) => {
                let mut batch = PathBatch::new();
                for event in events {
                    let path = match Utf8PathBuf::try_from(event.path) {
                        Ok(p) => p,
                        Err(e) => {
                            tracing::warn!(
                                path = %e.into_path_buf().display(),
                                "Skipping non-UTF-8 path in file event"
                            );
                            continue;
                        }
                    };
                    if !filter.should_process(&path) {
                        tracing::trace!(path = %path, "Filtered out file event");
                        continue;
                    }
                    if !batch.contains(&path) {
                        batch.push(path);
                    }
                }
                if batch.is_empty() {
                    return;
                }
                BackendEvent::Paths(batch)
            }
            Err(error) => {
                tracing::warn!(error = %error, "Debouncer error");
                BackendEvent::Error(WatchError::Notify(error))
            }
        };

        if tx.blocking_send(event).is_err() {
            tracing::debug!("Event channel closed, dropping backend event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::AcceptAllFilter;
    use std::time::Duration;
    use tempfile::TempDir;

    fn request(root: &Utf8Path, strategy: Strategy, tx: mpsc::Sender<BackendEvent>) -> BackendRequest {
        BackendRequest {
            root: root.to_owned(),
            strategy,
            config: WatchConfig {
                debounce_ms: 50,
                poll_interval_ms: 50,
                ..WatchConfig::default()
            },
            filter: Arc::new(AcceptAllFilter),
            events: tx,
        }
    }

    #[tokio::test]
    async fn test_notify_backend_starts_native_and_polling() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = Utf8Path::from_path(temp_dir.path()).expect("Invalid path");

        for strategy in [Strategy::Native, Strategy::Polling] {
            let (tx, _rx) = mpsc::channel(8);
            let watch = NotifyBackend.start(request(root, strategy, tx)).expect("watch should start");
            assert_eq!(watch.strategy(), strategy);
        }
    }

    #[tokio::test]
    async fn test_notify_backend_missing_root_fails() {
        let (tx, _rx) = mpsc::channel(8);
        let result = NotifyBackend.start(request(Utf8Path::new("/nonexistent/colsync/root"), Strategy::Native, tx));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_notify_backend_reports_paths() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = Utf8Path::from_path(temp_dir.path()).expect("Invalid path");
        let (tx, mut rx) = mpsc::channel(8);
        let watch = NotifyBackend.start(request(root, Strategy::Native, tx)).expect("watch should start");

        std::fs::write(temp_dir.path().join("ping.bru"), "meta {\n}\n").expect("Failed to write file");
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
        drop(watch);

        // Timing-dependent on some CI filesystems; only check what arrived.
        if let Ok(Some(BackendEvent::Paths(paths))) = event {
            assert!(paths.iter().any(|p| p.as_str().ends_with("ping.bru")));
        }
    }
}
