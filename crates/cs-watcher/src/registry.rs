//! The watcher registry: one actor per watched collection.
//!
//! [`WatcherRegistry`] is what hosts talk to. It starts and stops watches,
//! forwards loading-state calls to the owning collection, and resolves
//! `add_path`/`remove_path` to the collection whose root is the longest
//! prefix of the path.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use cs_core::{CollectionConfig, RequestFile, UidCache, WatchConfig};
use cs_format::{Format, StringifyOptions};
use cs_lanes::LaneRouter;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::backend::{NotifyBackend, WatchBackend};
use crate::collection::{self, Command, ConfigTable, Context};
use crate::error::WatchError;
use crate::events::{CollectionId, FileOperationKind, Notification};
use crate::filter::{CompositeFilter, FileFilter, IgnoreFilter, TempFileFilter, SAVE_TEMP_SUFFIX};
use crate::sink::Sink;
use crate::stats::{WatchStats, WatchStatsSnapshot};
use crate::tree::TreeSnapshot;

struct WatchHandle {
    root: Utf8PathBuf,
    commands: mpsc::Sender<Command>,
    task: JoinHandle<()>,
    stats: Arc<WatchStats>,
}

/// Watches any number of collections and reports through one [`Sink`].
///
/// Dropping the registry stops every watch: each actor tears down when its
/// command channel closes.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use camino::Utf8Path;
/// use cs_core::WatchConfig;
/// use cs_watcher::{TracingSink, WatcherRegistry};
///
/// # async fn example() -> Result<(), cs_watcher::WatchError> {
/// let registry = WatcherRegistry::new(WatchConfig::default(), Arc::new(TracingSink));
/// registry
///     .start_watch(Utf8Path::new("./collections/petstore"), "petstore", &[])
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct WatcherRegistry {
    ctx: Context,
    watches: RwLock<FxHashMap<CollectionId, WatchHandle>>,
}

impl std::fmt::Debug for WatcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherRegistry")
            .field("config", &self.ctx.config)
            .field("lanes", &self.ctx.lanes.is_some())
            .field("watches", &self.watches.read().len())
            .finish_non_exhaustive()
    }
}

impl WatcherRegistry {
    /// Creates a registry on the `notify` backend that parses inline.
    #[must_use]
    pub fn new(config: WatchConfig, sink: Arc<dyn Sink>) -> Self {
        Self {
            ctx: Context {
                config,
                sink,
                backend: Arc::new(NotifyBackend),
                lanes: None,
                uids: UidCache::new(),
                configs: ConfigTable::default(),
            },
            watches: RwLock::new(FxHashMap::default()),
        }
    }

    /// Offloads request parses at or above `inline_parse_max_bytes` to
    /// `lanes`.
    #[must_use]
    pub fn with_lanes(mut self, lanes: Arc<LaneRouter>) -> Self {
        self.ctx.lanes = Some(lanes);
        self
    }

    /// Replaces the notification backend.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn WatchBackend>) -> Self {
        self.ctx.backend = backend;
        self
    }

    /// The path-to-uid cache shared by every collection.
    #[must_use]
    pub const fn uid_cache(&self) -> &UidCache {
        &self.ctx.uids
    }

    /// Starts watching `root` as `collection_id`.
    ///
    /// `ignore` lists root-relative path prefixes to skip on top of
    /// `node_modules` and `.git`. An existing watch with the same id is
    /// stopped first. `loading-state-changed(true)` and the `started`
    /// lifecycle event are emitted before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] if `root` does not exist, or
    /// [`WatchError::NonUtf8Path`] if it resolves to a non-UTF-8 path.
    pub async fn start_watch(
        &self,
        root: &Utf8Path,
        collection_id: impl Into<CollectionId>,
        ignore: &[String],
    ) -> Result<(), WatchError> {
        let collection_id = collection_id.into();
        let root = canonicalize(root).await?;

        if self.is_watching(&collection_id) {
            tracing::info!(collection = %collection_id, "Replacing existing watch");
            self.stop(&collection_id).await;
        }

        let filter: Arc<dyn FileFilter> = Arc::new(
            CompositeFilter::new()
                .and(IgnoreFilter::with_defaults(root.clone(), ignore))
                .and(TempFileFilter),
        );
        let stats = Arc::new(WatchStats::new());

        tracing::info!(collection = %collection_id, path = %root, "Starting watch");
        let (commands, task) = collection::spawn(
            collection_id.clone(),
            root.clone(),
            filter,
            self.ctx.clone(),
            Arc::clone(&stats),
        );

        self.watches.write().insert(
            collection_id,
            WatchHandle {
                root,
                commands,
                task,
                stats,
            },
        );
        Ok(())
    }

    /// Stops the watch for `collection_id`.
    ///
    /// Returns `false` if nothing was watched under that id. A `root` that
    /// differs from the watched one is logged but does not prevent removal.
    pub async fn remove_watch(&self, root: &Utf8Path, collection_id: &CollectionId) -> bool {
        let watched_root = self.watches.read().get(collection_id).map(|h| h.root.clone());
        let Some(watched_root) = watched_root else {
            return false;
        };
        let requested = canonicalize(root).await.unwrap_or_else(|_| root.to_owned());
        if requested != watched_root {
            tracing::warn!(
                collection = %collection_id,
                requested = %root,
                watched = %watched_root,
                "Root mismatch on remove_watch"
            );
        }
        self.stop(collection_id).await
    }

    /// Stops every watch.
    pub async fn shutdown(&self) {
        let ids: Vec<CollectionId> = self.watches.read().keys().cloned().collect();
        for id in ids {
            self.stop(&id).await;
        }
    }

    async fn stop(&self, collection_id: &CollectionId) -> bool {
        let Some(handle) = self.watches.write().remove(collection_id) else {
            return false;
        };
        let (reply, done) = oneshot::channel();
        if handle.commands.send(Command::Stop(reply)).await.is_ok() {
            let _ = done.await;
        }
        if let Err(e) = handle.task.await {
            tracing::warn!(collection = %collection_id, error = %e, "Collection task failed");
        }
        true
    }

    /// Ends discovery for a collection. A second call is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::WatchNotFound`] for an unknown collection.
    pub async fn complete_discovery(&self, collection_id: &CollectionId) -> Result<(), WatchError> {
        self.send(collection_id, Command::CompleteDiscovery).await
    }

    /// Records that an offloaded file finished processing.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::WatchNotFound`] for an unknown collection.
    pub async fn mark_processed(&self, collection_id: &CollectionId, path: &Utf8Path) -> Result<(), WatchError> {
        self.send(collection_id, Command::MarkProcessed(path.to_owned()))
            .await
    }

    /// Records a file whose processing happens outside the collection.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::WatchNotFound`] for an unknown collection.
    pub async fn add_pending(&self, collection_id: &CollectionId, path: &Utf8Path) -> Result<(), WatchError> {
        self.send(collection_id, Command::AddPending(path.to_owned()))
            .await
    }

    async fn send(&self, collection_id: &CollectionId, command: Command) -> Result<(), WatchError> {
        let sender = self
            .watches
            .read()
            .get(collection_id)
            .map(|h| h.commands.clone())
            .ok_or_else(|| WatchError::watch_not_found(collection_id.as_str()))?;
        sender
            .send(command)
            .await
            .map_err(|_| WatchError::ChannelClosed)
    }

    /// Adds `path` to the watch of the collection that owns it.
    ///
    /// Returns `false` if no watched root contains `path`.
    pub async fn add_path(&self, path: &Utf8Path) -> bool {
        self.path_command(path, Command::AddPath).await
    }

    /// Removes `path` from the watch of the collection that owns it.
    ///
    /// Returns `false` if no watched root contains `path`.
    pub async fn remove_path(&self, path: &Utf8Path) -> bool {
        self.path_command(path, Command::RemovePath).await
    }

    async fn path_command(
        &self,
        path: &Utf8Path,
        make: fn(Utf8PathBuf, oneshot::Sender<Result<(), WatchError>>) -> Command,
    ) -> bool {
        let path = canonicalize(path).await.unwrap_or_else(|_| path.to_owned());
        let owner = {
            let watches = self.watches.read();
            let roots = watches.iter().map(|(id, h)| (id, h.root.as_path()));
            owning_root(roots, &path).and_then(|id| watches.get(id).map(|h| (id.clone(), h.commands.clone())))
        };
        let Some((collection_id, sender)) = owner else {
            tracing::debug!(path = %path, "No watch owns path");
            return false;
        };

        let (reply, result) = oneshot::channel();
        if sender.send(make(path.clone(), reply)).await.is_err() {
            return false;
        }
        match result.await {
            Ok(Err(e)) => {
                tracing::warn!(collection = %collection_id, path = %path, error = %e, "Watch update failed");
            }
            Ok(Ok(())) | Err(_) => {}
        }
        true
    }

    /// Returns the assembled tree of a collection.
    pub async fn snapshot(&self, collection_id: &CollectionId) -> Option<TreeSnapshot> {
        let sender = self.watches.read().get(collection_id).map(|h| h.commands.clone())?;
        let (reply, result) = oneshot::channel();
        sender.send(Command::Snapshot(reply)).await.ok()?;
        result.await.ok()
    }

    /// Serializes `request` in `format` and writes it to `path`.
    ///
    /// The content goes to a temporary sibling first and is renamed into
    /// place, so the watch sees one change rather than a truncated file.
    /// A relative `path` is resolved against the collection root.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::WatchNotFound`] for an unknown collection,
    /// [`WatchError::OutsideRoot`] if `path` is not inside the root, a
    /// format error if the request cannot be written in `format`, or the
    /// I/O error from writing.
    pub async fn save_request(
        &self,
        collection_id: &CollectionId,
        path: &Utf8Path,
        request: &RequestFile,
        format: Format,
    ) -> Result<(), WatchError> {
        let root = self
            .watches
            .read()
            .get(collection_id)
            .map(|h| h.root.clone())
            .ok_or_else(|| WatchError::watch_not_found(collection_id.as_str()))?;
        let path = if path.is_absolute() {
            path.to_owned()
        } else {
            root.join(path)
        };
        if !path.starts_with(&root) || path == root {
            return Err(WatchError::outside_root(path, root));
        }

        let content = cs_format::stringify_request(request, StringifyOptions::new(format))?;
        let temp = Utf8PathBuf::from(format!("{path}{SAVE_TEMP_SUFFIX}"));
        tokio::fs::write(&temp, &content).await?;
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        tracing::debug!(collection = %collection_id, path = %path, bytes = content.len(), "Saved request");
        self.ctx.sink.emit(Notification::FileOperation {
            operation: FileOperationKind::Write,
            path,
            collection_id: collection_id.clone(),
            details: format!("{} bytes", content.len()),
        });
        Ok(())
    }

    /// The parsed `bruno.json` of a collection, once loaded.
    #[must_use]
    pub fn collection_config(&self, collection_id: &CollectionId) -> Option<CollectionConfig> {
        self.ctx.configs.read().get(collection_id).cloned()
    }

    /// Current statistics of a collection.
    #[must_use]
    pub fn stats(&self, collection_id: &CollectionId) -> Option<WatchStatsSnapshot> {
        self.watches.read().get(collection_id).map(|h| h.stats.snapshot())
    }

    /// Returns `true` if `collection_id` is being watched.
    #[must_use]
    pub fn is_watching(&self, collection_id: &CollectionId) -> bool {
        self.watches.read().contains_key(collection_id)
    }

    /// Ids of every watched collection.
    #[must_use]
    pub fn collection_ids(&self) -> Vec<CollectionId> {
        self.watches.read().keys().cloned().collect()
    }

    /// The watched root of a collection.
    #[must_use]
    pub fn root(&self, collection_id: &CollectionId) -> Option<Utf8PathBuf> {
        self.watches.read().get(collection_id).map(|h| h.root.clone())
    }
}

async fn canonicalize(path: &Utf8Path) -> Result<Utf8PathBuf, WatchError> {
    let resolved = tokio::fs::canonicalize(path)
        .await
        .map_err(|_| WatchError::path_not_found(path))?;
    Utf8PathBuf::try_from(resolved).map_err(|e| WatchError::non_utf8_path(e.into_path_buf()))
}

/// Picks the id whose root is the longest prefix of `path`.
fn owning_root<'a, I>(roots: I, path: &Utf8Path) -> Option<&'a CollectionId>
where
    I: IntoIterator<Item = (&'a CollectionId, &'a Utf8Path)>,
{
    roots
        .into_iter()
        .filter(|(_, root)| path.starts_with(root))
        .max_by_key(|(_, root)| root.components().count())
        .map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owning_root_prefers_longest_prefix() {
        let outer = CollectionId::from("outer");
        let inner = CollectionId::from("inner");
        let roots = [
            (&outer, Utf8Path::new("/work/api")),
            (&inner, Utf8Path::new("/work/api/nested")),
        ];

        assert_eq!(owning_root(roots, Utf8Path::new("/work/api/nested/a.bru")), Some(&inner));
        assert_eq!(owning_root(roots, Utf8Path::new("/work/api/b.bru")), Some(&outer));
        assert_eq!(owning_root(roots, Utf8Path::new("/work/other/c.bru")), None);
    }

    #[test]
    fn test_owning_root_matches_whole_components() {
        let id = CollectionId::from("api");
        let roots = [(&id, Utf8Path::new("/work/api"))];
        assert_eq!(owning_root(roots, Utf8Path::new("/work/api-old/x.bru")), None);
    }

    #[tokio::test]
    async fn test_start_watch_missing_root() {
        let sink = Arc::new(crate::sink::MemorySink::new());
        let registry = WatcherRegistry::new(WatchConfig::default(), sink.clone());

        let result = registry
            .start_watch(Utf8Path::new("/nonexistent/colsync"), "missing", &[])
            .await;

        assert!(matches!(result, Err(WatchError::PathNotFound(_))));
        assert!(sink.is_empty());
        assert!(!registry.is_watching(&CollectionId::from("missing")));
    }

    #[tokio::test]
    async fn test_unknown_collection_operations() {
        let registry = WatcherRegistry::new(WatchConfig::default(), Arc::new(crate::sink::TracingSink));
        let id = CollectionId::from("ghost");

        assert!(matches!(
            registry.complete_discovery(&id).await,
            Err(WatchError::WatchNotFound(_))
        ));
        assert!(!registry.remove_watch(Utf8Path::new("/x"), &id).await);
        assert!(registry.snapshot(&id).await.is_none());
        assert!(registry.stats(&id).is_none());
        assert!(!registry.add_path(Utf8Path::new("/x/y.bru")).await);
    }
}
