//! The per-collection actor.
//!
//! Each watched collection runs as one tokio task that owns its loading
//! state, tree, and backend handle. Everything that touches that state is a
//! message: registry commands, backend path batches, and lane results. So
//! nothing here needs a lock.
//!
//! Backends only report *which* paths changed. The actor derives the event
//! kind from the filesystem and the paths it already knows, which makes
//! native and polling backends interchangeable.

use std::cmp::Reverse;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use cs_core::{CollectionConfig, DotEnv, ItemUid, RequestFile, UidCache, WatchConfig};
use cs_format::{Document, DocumentKind, FormatError, ParseOptions};
use cs_lanes::{LaneRouter, ParseMode, ParseTask, TaskOutput};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

use crate::backend::{BackendEvent, BackendRequest, BackendWatch, Strategy, WatchBackend};
use crate::classify::{classify, format_choice, is_environments_dir, PathClass};
use crate::error::WatchError;
use crate::events::{
    CollectionId, FileOperationKind, LifecycleKind, NodeData, NodeMeta, Notification, TreeEventKind, TreeNode,
};
use crate::filter::FileFilter;
use crate::loading::LoadingState;
use crate::sink::Sink;
use crate::stats::WatchStats;
use crate::tree::{CollectionTree, RequestRecord, RequestState, TreeSnapshot};
use crate::walk::walk;

/// Parsed `bruno.json` per collection, readable without the actor.
pub(crate) type ConfigTable = Arc<RwLock<FxHashMap<CollectionId, CollectionConfig>>>;

/// State shared by every collection of a registry.
#[derive(Clone)]
pub(crate) struct Context {
    pub config: WatchConfig,
    pub sink: Arc<dyn Sink>,
    pub backend: Arc<dyn WatchBackend>,
    pub lanes: Option<Arc<LaneRouter>>,
    pub uids: UidCache,
    pub configs: ConfigTable,
}

/// Messages from the registry.
#[derive(Debug)]
pub(crate) enum Command {
    CompleteDiscovery,
    MarkProcessed(Utf8PathBuf),
    AddPending(Utf8PathBuf),
    AddPath(Utf8PathBuf, oneshot::Sender<Result<(), WatchError>>),
    RemovePath(Utf8PathBuf, oneshot::Sender<Result<(), WatchError>>),
    Snapshot(oneshot::Sender<TreeSnapshot>),
    Stop(oneshot::Sender<()>),
}

/// A parse finished on a lane.
struct LaneDone {
    path: Utf8PathBuf,
    revision: u64,
    large: bool,
    result: Result<TaskOutput, FormatError>,
}

type ParseOutcome = Result<(RequestFile, bool), String>;

/// Starts the actor for one collection.
///
/// The loading and `started` notifications go out before this returns, so
/// they precede anything the watch reports.
pub(crate) fn spawn(
    id: CollectionId,
    root: Utf8PathBuf,
    filter: Arc<dyn FileFilter>,
    ctx: Context,
    stats: Arc<WatchStats>,
) -> (mpsc::Sender<Command>, JoinHandle<()>) {
    let capacity = ctx.config.channel_capacity.max(1);
    let (command_tx, command_rx) = mpsc::channel(capacity);
    let (fs_tx, fs_rx) = mpsc::channel(capacity);
    let (lane_tx, lane_rx) = mpsc::unbounded_channel();

    ctx.sink.emit(Notification::LoadingStateChanged {
        collection_id: id.clone(),
        is_loading: true,
    });
    ctx.sink.emit(Notification::WatcherLifecycle {
        collection_id: id.clone(),
        kind: LifecycleKind::Started,
        path: Some(root.clone()),
        data: None,
    });

    let root_uid = ctx.uids.get_or_create(&root);
    let strategy = if ctx.config.use_polling {
        Strategy::Polling
    } else {
        Strategy::Native
    };

    let actor = CollectionActor {
        tree: CollectionTree::new(root.clone(), root_uid),
        id,
        root,
        filter,
        ctx,
        stats,
        loading: LoadingState::new(),
        known_files: FxHashSet::default(),
        known_dirs: FxHashSet::default(),
        backend: None,
        strategy,
        restarted: false,
        degraded: false,
        stats_dirty: false,
        next_revision: 0,
        offloaded: FxHashMap::default(),
        commands: command_rx,
        fs_tx,
        fs_rx,
        lane_tx,
        lane_rx,
    };

    (command_tx, tokio::spawn(actor.run()))
}

struct CollectionActor {
    id: CollectionId,
    root: Utf8PathBuf,
    filter: Arc<dyn FileFilter>,
    ctx: Context,
    stats: Arc<WatchStats>,
    loading: LoadingState,
    tree: CollectionTree,
    known_files: FxHashSet<Utf8PathBuf>,
    known_dirs: FxHashSet<Utf8PathBuf>,
    backend: Option<Box<dyn BackendWatch>>,
    strategy: Strategy,
    restarted: bool,
    degraded: bool,
    stats_dirty: bool,
    next_revision: u64,
    /// Latest revision handed to a lane, per path still counted as pending.
    offloaded: FxHashMap<Utf8PathBuf, u64>,
    commands: mpsc::Receiver<Command>,
    fs_tx: mpsc::Sender<BackendEvent>,
    fs_rx: mpsc::Receiver<BackendEvent>,
    lane_tx: mpsc::UnboundedSender<LaneDone>,
    lane_rx: mpsc::UnboundedReceiver<LaneDone>,
}

impl CollectionActor {
    async fn run(mut self) {
        self.start_backend(self.strategy);
        self.initial_scan().await;
        if self.loading.complete_discovery() {
            self.emit_loading(false);
        }
        self.flush_stats();

        let mut ticker = (self.ctx.config.stats_interval_ms > 0).then(|| {
            let mut interval = tokio::time::interval(std::time::Duration::from_millis(
                self.ctx.config.stats_interval_ms,
            ));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        let mut stop_reply = None;
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => {
                        stop_reply = self.handle_command(command).await;
                        if stop_reply.is_some() {
                            break;
                        }
                    }
                    None => break,
                },
                Some(event) = self.fs_rx.recv() => self.handle_backend_event(event).await,
                Some(done) = self.lane_rx.recv() => self.handle_lane_done(done),
                () = tick(&mut ticker) => self.flush_stats(),
            }
        }

        self.teardown();
        if let Some(reply) = stop_reply {
            let _ = reply.send(());
        }
    }

    // ---------------------------------------------------------------------
    // Backend lifecycle
    // ---------------------------------------------------------------------

    fn start_backend(&mut self, strategy: Strategy) {
        self.strategy = strategy;
        let request = BackendRequest {
            root: self.root.clone(),
            strategy,
            config: self.ctx.config.clone(),
            filter: Arc::clone(&self.filter),
            events: self.fs_tx.clone(),
        };

        match self.ctx.backend.start(request) {
            Ok(watch) => {
                self.stats.set_polling(strategy == Strategy::Polling);
                self.backend = Some(watch);
            }
            Err(err) => self.handle_backend_error(err),
        }
    }

    /// Handle exhaustion earns one restart on the polling backend; any
    /// other failure, or a second exhaustion, leaves the watch degraded.
    fn handle_backend_error(&mut self, err: WatchError) {
        if err.is_handle_exhaustion() && !self.restarted && self.strategy == Strategy::Native {
            self.restarted = true;
            self.backend = None;
            tracing::warn!(
                collection = %self.id,
                error = %err,
                "Watch handles exhausted, restarting with polling"
            );
            self.emit_lifecycle(LifecycleKind::Restarted, None, Some(err.to_string()));
            self.start_backend(Strategy::Polling);
            return;
        }

        tracing::warn!(collection = %self.id, error = %err, "Watcher error");
        if !self.degraded {
            self.degraded = true;
            self.stats.set_degraded();
            self.emit_lifecycle(LifecycleKind::Degraded, None, Some(err.to_string()));
        }
    }

    fn teardown(&mut self) {
        self.backend = None;
        self.ctx.configs.write().remove(&self.id);
        self.emit_lifecycle(LifecycleKind::Stopped, Some(self.root.clone()), None);
        self.emit(Notification::WatcherStats {
            collection_id: self.id.clone(),
            stats: self.stats.snapshot(),
        });
        tracing::info!(collection = %self.id, path = %self.root, "Watch stopped");
    }

    // ---------------------------------------------------------------------
    // Inputs
    // ---------------------------------------------------------------------

    /// Returns the reply channel when the command asks the actor to stop.
    async fn handle_command(&mut self, command: Command) -> Option<oneshot::Sender<()>> {
        match command {
            Command::CompleteDiscovery => {
                if self.loading.complete_discovery() {
                    self.emit_loading(false);
                }
            }
            Command::MarkProcessed(path) => {
                if self.loading.mark_processed(&path) {
                    self.emit_loading(false);
                }
            }
            Command::AddPending(path) => {
                self.loading.add_pending(&path);
            }
            Command::AddPath(path, reply) => {
                let result = match self.backend.as_mut() {
                    Some(backend) => backend.watch(&path),
                    None => Err(WatchError::watch_not_found(self.id.as_str())),
                };
                if result.is_ok() {
                    self.reconcile(path).await;
                }
                let _ = reply.send(result);
            }
            Command::RemovePath(path, reply) => {
                let result = match self.backend.as_mut() {
                    Some(backend) => backend.unwatch(&path),
                    None => Err(WatchError::watch_not_found(self.id.as_str())),
                };
                let _ = reply.send(result);
            }
            Command::Snapshot(reply) => {
                let snapshot = self
                    .tree
                    .snapshot(self.id.clone(), self.loading.phase(), self.stats.snapshot());
                let _ = reply.send(snapshot);
            }
            Command::Stop(reply) => return Some(reply),
        }
        None
    }

    async fn handle_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::Paths(paths) => {
                for path in paths {
                    self.reconcile(path).await;
                }
            }
            BackendEvent::Error(err) => self.handle_backend_error(err),
        }
    }

    fn handle_lane_done(&mut self, done: LaneDone) {
        let LaneDone {
            path,
            revision,
            large,
            result,
        } = done;

        let outcome = match result {
            Ok(TaskOutput::Parsed {
                document: Document::Request(file),
                redacted,
            }) => Ok((file, redacted)),
            Ok(_) => Err("lane returned an unexpected document".to_owned()),
            Err(e) => Err(e.to_string()),
        };

        self.finish_request(&path, revision, large, outcome);
        if self.offloaded.get(&path) == Some(&revision) {
            self.settle_offload(&path);
        }
    }

    /// Clears the pending entry of an offloaded path. Called when its latest
    /// lane result lands, or when a newer revision finished without a lane.
    fn settle_offload(&mut self, path: &Utf8Path) {
        if self.offloaded.remove(path).is_some() && self.loading.mark_processed(path) {
            self.emit_loading(false);
        }
    }

    // ---------------------------------------------------------------------
    // Event derivation
    // ---------------------------------------------------------------------

    async fn initial_scan(&mut self) {
        self.known_dirs.insert(self.root.clone());
        let entries = self.walk_below(self.root.clone()).await;
        for entry in entries {
            if entry.is_dir {
                self.on_add_dir(&entry.path);
            } else {
                self.on_file(&entry.path, TreeEventKind::AddFile).await;
            }
        }
        tracing::info!(
            collection = %self.id,
            files = self.known_files.len(),
            directories = self.known_dirs.len(),
            "Initial scan complete"
        );
    }

    async fn walk_below(&mut self, dir: Utf8PathBuf) -> Vec<crate::walk::WalkEntry> {
        let filter = Arc::clone(&self.filter);
        let recursive = self.ctx.config.recursive;
        match tokio::task::spawn_blocking(move || walk(&dir, &filter, recursive)).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(collection = %self.id, error = %e, "Walk task failed");
                Vec::new()
            }
        }
    }

    /// Works out what happened to `path` and dispatches it.
    async fn reconcile(&mut self, path: Utf8PathBuf) {
        if !path.starts_with(&self.root) || !self.filter.should_process(&path) {
            return;
        }

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => {
                if !self.known_dirs.contains(&path) {
                    self.on_add_dir(&path);
                    for entry in self.walk_below(path).await {
                        if entry.is_dir {
                            if !self.known_dirs.contains(&entry.path) {
                                self.on_add_dir(&entry.path);
                            }
                        } else if !self.known_files.contains(&entry.path) {
                            self.on_file(&entry.path, TreeEventKind::AddFile).await;
                        }
                    }
                }
            }
            Ok(_) => {
                let kind = if self.known_files.contains(&path) {
                    TreeEventKind::Change
                } else {
                    TreeEventKind::AddFile
                };
                self.on_file(&path, kind).await;
            }
            Err(_) => {
                if self.known_files.contains(&path) {
                    self.on_unlink(&path);
                } else if self.known_dirs.contains(&path) {
                    self.on_unlink_dir(&path);
                } else {
                    tracing::trace!(path = %path, "Event for unknown missing path");
                }
            }
        }
    }

    fn on_add_dir(&mut self, dir: &Utf8Path) {
        self.known_dirs.insert(dir.to_owned());
        self.record_event(LifecycleKind::AddDir, dir);
        if is_environments_dir(&self.root, dir) {
            return;
        }

        let uid = self.ctx.uids.get_or_create(dir);
        self.tree.add_folder(dir, uid.clone());
        let (name, seq) = match self.tree.folder(dir) {
            Some(folder) => (
                folder
                    .root
                    .as_ref()
                    .and_then(|r| r.meta.name.clone())
                    .unwrap_or_else(|| folder.dir_name.clone()),
                folder.root.as_ref().and_then(|r| r.meta.seq),
            ),
            None => (dir.file_name().unwrap_or_default().to_owned(), None),
        };
        let meta = self.node_meta(dir, name, uid, seq);
        self.emit_tree(TreeEventKind::AddDir, TreeNode::bare(meta));
    }

    async fn on_file(&mut self, path: &Utf8Path, kind: TreeEventKind) {
        self.known_files.insert(path.to_owned());
        self.record_event(kind.into(), path);

        match classify(&self.root, path) {
            PathClass::Config => self.load_config(path).await,
            PathClass::DotEnv => self.load_dotenv(path).await,
            PathClass::Environment => self.load_environment(path).await,
            PathClass::CollectionRoot => {
                let root = self.root.clone();
                self.load_folder_root(path, &root, kind, DocumentKind::Collection)
                    .await;
            }
            PathClass::FolderRoot => {
                let dir = path.parent().unwrap_or(self.root.as_path()).to_owned();
                self.load_folder_root(path, &dir, kind, DocumentKind::Folder)
                    .await;
            }
            PathClass::Request => self.hydrate_request(path, kind).await,
            PathClass::Other => self.emit(Notification::FileOperation {
                operation: FileOperationKind::Read,
                path: path.to_owned(),
                collection_id: self.id.clone(),
                details: "skipped".to_owned(),
            }),
        }
    }

    fn on_unlink(&mut self, path: &Utf8Path) {
        self.known_files.remove(path);
        self.record_event(LifecycleKind::Unlink, path);

        match classify(&self.root, path) {
            PathClass::Config => {
                self.ctx.configs.write().remove(&self.id);
            }
            PathClass::DotEnv => self.emit(Notification::EnvUpdated {
                collection_id: self.id.clone(),
                variables: DotEnv::default(),
            }),
            PathClass::Environment => self.emit(Notification::EnvironmentRemoved {
                collection_id: self.id.clone(),
                uid: self.ctx.uids.get_or_create(path),
                path: path.to_owned(),
            }),
            PathClass::CollectionRoot => {
                let root = self.root.clone();
                self.clear_folder_root(path, &root);
            }
            PathClass::FolderRoot => {
                let dir = path.parent().unwrap_or(self.root.as_path()).to_owned();
                self.clear_folder_root(path, &dir);
            }
            PathClass::Request => {
                let record = self.tree.remove_request(path);
                let uid = record
                    .as_ref()
                    .map_or_else(|| self.ctx.uids.get_or_create(path), |r| r.uid.clone());
                let name = record.map_or_else(|| file_stem(path), |r| r.name);
                let meta = self.node_meta(path, name, uid, None);
                self.emit_tree(TreeEventKind::Unlink, TreeNode::bare(meta));
                self.offloaded.remove(path);
                if self.loading.mark_processed(path) {
                    self.emit_loading(false);
                }
            }
            PathClass::Other => {}
        }
    }

    /// Removes a directory and everything known below it: files first, then
    /// directories deepest first, then `dir` itself.
    fn on_unlink_dir(&mut self, dir: &Utf8Path) {
        let files: Vec<Utf8PathBuf> = self
            .known_files
            .iter()
            .filter(|p| p.starts_with(dir))
            .cloned()
            .collect();
        for file in files {
            self.on_unlink(&file);
        }

        let mut dirs: Vec<Utf8PathBuf> = self
            .known_dirs
            .iter()
            .filter(|p| p.starts_with(dir) && p.as_path() != dir)
            .cloned()
            .collect();
        dirs.sort_by_key(|p| Reverse(p.components().count()));
        for sub in dirs {
            self.remove_dir(&sub);
        }
        self.remove_dir(dir);
    }

    fn remove_dir(&mut self, dir: &Utf8Path) {
        self.known_dirs.remove(dir);
        self.record_event(LifecycleKind::UnlinkDir, dir);
        if is_environments_dir(&self.root, dir) {
            return;
        }

        let (uid, name) = match self.tree.remove_folder(dir) {
            Some(folder) => (folder.uid, folder.dir_name),
            None => (self.ctx.uids.get_or_create(dir), file_stem(dir)),
        };
        let meta = self.node_meta(dir, name, uid, None);
        self.emit_tree(TreeEventKind::UnlinkDir, TreeNode::bare(meta));
    }

    // ---------------------------------------------------------------------
    // Loaders
    // ---------------------------------------------------------------------

    async fn read(&mut self, path: &Utf8Path) -> Result<String, std::io::Error> {
        let content = tokio::fs::read_to_string(path).await?;
        self.emit(Notification::FileOperation {
            operation: FileOperationKind::Read,
            path: path.to_owned(),
            collection_id: self.id.clone(),
            details: format!("{} bytes", content.len()),
        });
        Ok(content)
    }

    async fn load_config(&mut self, path: &Utf8Path) {
        let parsed = match self.read(path).await {
            Ok(content) => cs_format::parse_collection_config(&content).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match parsed {
            Ok(config) => {
                self.ctx.configs.write().insert(self.id.clone(), config.clone());
                self.emit(Notification::ConfigUpdated {
                    collection_id: self.id.clone(),
                    config,
                });
            }
            Err(error) => self.report_parse_error(path, error),
        }
    }

    async fn load_dotenv(&mut self, path: &Utf8Path) {
        match self.read(path).await {
            Ok(content) => self.emit(Notification::EnvUpdated {
                collection_id: self.id.clone(),
                variables: DotEnv::parse(&content),
            }),
            Err(e) => self.report_parse_error(path, e.to_string()),
        }
    }

    async fn load_environment(&mut self, path: &Utf8Path) {
        let parsed = match self.read(path).await {
            Ok(content) => cs_format::parse_environment(&content, ParseOptions::new(format_choice(path)))
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match parsed {
            Ok(mut environment) => {
                if environment.name.is_empty() {
                    environment.name = file_stem(path);
                }
                self.emit(Notification::EnvironmentUpserted {
                    collection_id: self.id.clone(),
                    uid: self.ctx.uids.get_or_create(path),
                    path: path.to_owned(),
                    environment,
                });
            }
            Err(error) => self.report_parse_error(path, error),
        }
    }

    async fn load_folder_root(
        &mut self,
        path: &Utf8Path,
        dir: &Utf8Path,
        kind: TreeEventKind,
        document: DocumentKind,
    ) {
        let options = ParseOptions::new(format_choice(path));
        let parsed = match self.read(path).await {
            Ok(content) => match document {
                DocumentKind::Collection => cs_format::parse_collection(&content, options),
                _ => cs_format::parse_folder(&content, options),
            }
            .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        let uid = self.folder_uid(dir);
        match parsed {
            Ok(root) => {
                let (name, seq) = self.tree.set_folder_root(dir, Some(root.clone()));
                let mut node = TreeNode::bare(self.node_meta(path, name, uid, seq));
                node.data = Some(NodeData::Folder(Box::new(root)));
                self.emit_tree(kind, node);
            }
            Err(error) => {
                self.report_parse_error(path, error.clone());
                let (name, seq) = self.tree.set_folder_root(dir, None);
                let mut node = TreeNode::bare(self.node_meta(path, name, uid, seq));
                node.error = Some(error);
                self.emit_tree(kind, node);
            }
        }
    }

    fn clear_folder_root(&mut self, path: &Utf8Path, dir: &Utf8Path) {
        let uid = self.folder_uid(dir);
        let (name, seq) = self.tree.set_folder_root(dir, None);
        let meta = self.node_meta(path, name, uid, seq);
        self.emit_tree(TreeEventKind::Change, TreeNode::bare(meta));
    }

    fn folder_uid(&self, dir: &Utf8Path) -> ItemUid {
        if dir == self.root.as_path() {
            self.tree.root_uid().clone()
        } else {
            self.ctx.uids.get_or_create(dir)
        }
    }

    /// Progressive hydration: metadata first, then the full (or reduced)
    /// parse, inline or on a lane.
    async fn hydrate_request(&mut self, path: &Utf8Path, kind: TreeEventKind) {
        self.next_revision += 1;
        let revision = self.next_revision;
        let uid = self.ctx.uids.get_or_create(path);
        let previous = self.tree.request(path).and_then(|r| r.data.clone());

        let content = match self.read(path).await {
            Ok(content) => content,
            Err(e) => {
                self.fail_request(path, kind, uid, 0, revision, e.to_string());
                self.settle_offload(path);
                return;
            }
        };
        let size = content.len() as u64;
        let format = format_choice(path);

        let meta = match cs_format::extract_request_meta(&content, format) {
            Ok(meta) => meta,
            Err(e) => {
                self.fail_request(path, kind, uid, size, revision, e.to_string());
                self.settle_offload(path);
                return;
            }
        };
        let name = if meta.name.is_empty() {
            file_stem(path)
        } else {
            meta.name
        };

        let mut record = RequestRecord {
            uid,
            name,
            kind: meta.kind,
            seq: meta.seq,
            state: RequestState::Partial,
            data: None,
            size,
            redacted: false,
            error: None,
            revision,
        };
        let mut partial = self.record_node(path, &record);
        partial.partial = true;
        self.tree.insert_request(path, record.clone());
        self.emit_tree(kind, partial);

        let large = size >= self.ctx.config.large_file_threshold_bytes;
        if !large {
            record.state = RequestState::Loading;
            record.data = previous;
            let mut loading = self.record_node(path, &record);
            loading.loading = true;
            self.tree.insert_request(path, record);
            self.emit_tree(TreeEventKind::Change, loading);
        }

        let max_leaf_bytes = self.ctx.config.max_leaf_bytes;
        let offload = large || size >= self.ctx.config.inline_parse_max_bytes;
        match self.ctx.lanes.clone().filter(|_| offload) {
            Some(lanes) => {
                let mode = if large {
                    ParseMode::Reduced { max_leaf_bytes }
                } else {
                    ParseMode::Full
                };
                if self.loading.add_pending(path) {
                    self.offloaded.insert(path.to_owned(), revision);
                }
                let task = ParseTask::parse(content, DocumentKind::Request, format, mode).with_label(path.as_str());
                let tx = self.lane_tx.clone();
                let done_path = path.to_owned();
                lanes.submit(task, move |result| {
                    let done = LaneDone {
                        path: done_path,
                        revision,
                        large,
                        result,
                    };
                    if tx.send(done).is_err() {
                        tracing::trace!("Collection gone, dropping lane result");
                    }
                });
            }
            None => {
                let options = ParseOptions::new(format);
                let outcome = if large {
                    cs_format::parse_request_reduced(&content, options, max_leaf_bytes)
                        .map(|r| (r.request, r.redacted))
                } else {
                    cs_format::parse_request(&content, options).map(|r| (r, false))
                };
                self.finish_request(path, revision, large, outcome.map_err(|e| e.to_string()));
                self.settle_offload(path);
            }
        }
    }

    /// Applies a parse result unless the record was removed or re-read since.
    fn finish_request(&mut self, path: &Utf8Path, revision: u64, large: bool, outcome: ParseOutcome) {
        let Some(record) = self.tree.request_mut(path) else {
            tracing::debug!(path = %path, "Dropping parse result for removed request");
            return;
        };
        if record.revision != revision {
            tracing::debug!(path = %path, "Dropping stale parse result");
            return;
        }

        match outcome {
            Ok((file, redacted)) => {
                if !file.name.is_empty() {
                    record.name.clone_from(&file.name);
                }
                record.kind = file.kind;
                record.seq = file.seq;
                record.state = RequestState::Complete;
                record.redacted = large || redacted;
                record.error = None;
                record.data = Some(file);
                let record = record.clone();
                let node = self.record_node(path, &record);
                self.emit_tree(TreeEventKind::Change, node);
            }
            Err(error) => {
                record.state = RequestState::Error;
                record.data = None;
                record.error = Some(error.clone());
                let record = record.clone();
                self.report_parse_error(path, error);
                let node = self.record_node(path, &record);
                self.emit_tree(TreeEventKind::Change, node);
            }
        }
    }

    fn fail_request(
        &mut self,
        path: &Utf8Path,
        kind: TreeEventKind,
        uid: ItemUid,
        size: u64,
        revision: u64,
        error: String,
    ) {
        let record = RequestRecord {
            uid,
            name: file_stem(path),
            kind: cs_core::ItemKind::default(),
            seq: None,
            state: RequestState::Error,
            data: None,
            size,
            redacted: false,
            error: Some(error.clone()),
            revision,
        };
        self.report_parse_error(path, error);
        let node = self.record_node(path, &record);
        self.tree.insert_request(path, record);
        self.emit_tree(kind, node);
    }

    // ---------------------------------------------------------------------
    // Output helpers
    // ---------------------------------------------------------------------

    fn emit(&self, notification: Notification) {
        self.ctx.sink.emit(notification);
    }

    fn emit_tree(&self, kind: TreeEventKind, node: TreeNode) {
        self.emit(Notification::TreeUpdate { kind, node });
    }

    fn emit_loading(&self, is_loading: bool) {
        tracing::info!(collection = %self.id, is_loading, "Loading state changed");
        self.emit(Notification::LoadingStateChanged {
            collection_id: self.id.clone(),
            is_loading,
        });
    }

    fn emit_lifecycle(&self, kind: LifecycleKind, path: Option<Utf8PathBuf>, data: Option<String>) {
        self.emit(Notification::WatcherLifecycle {
            collection_id: self.id.clone(),
            kind,
            path,
            data,
        });
    }

    fn report_parse_error(&self, path: &Utf8Path, error: String) {
        tracing::warn!(collection = %self.id, path = %path, error = %error, "Failed to parse file");
        self.emit(Notification::ParsingError {
            path: path.to_owned(),
            collection_id: self.id.clone(),
            error,
        });
    }

    fn record_event(&mut self, kind: LifecycleKind, path: &Utf8Path) {
        tracing::debug!(collection = %self.id, path = %path, ?kind, "File event");
        self.stats.record_event();
        self.stats
            .set_watched(self.known_files.len(), self.known_dirs.len());
        self.stats_dirty = true;
        self.emit_lifecycle(kind, Some(path.to_owned()), None);
    }

    fn flush_stats(&mut self) {
        if std::mem::take(&mut self.stats_dirty) {
            self.emit(Notification::WatcherStats {
                collection_id: self.id.clone(),
                stats: self.stats.snapshot(),
            });
        }
    }

    fn node_meta(&self, path: &Utf8Path, name: String, uid: ItemUid, seq: Option<u32>) -> NodeMeta {
        NodeMeta {
            collection_id: self.id.clone(),
            path: path.to_owned(),
            name,
            uid,
            seq,
        }
    }

    fn record_node(&self, path: &Utf8Path, record: &RequestRecord) -> TreeNode {
        let mut node = TreeNode::bare(self.node_meta(path, record.name.clone(), record.uid.clone(), record.seq));
        node.data = record.data.clone().map(|d| NodeData::Request(Box::new(d)));
        node.redacted = record.redacted;
        node.size = Some(record.size);
        node.error.clone_from(&record.error);
        node
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn file_stem(path: &Utf8Path) -> String {
    path.file_stem().unwrap_or_default().to_owned()
}
