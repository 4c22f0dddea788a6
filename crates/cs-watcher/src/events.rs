//! Notifications emitted by the watcher.
//!
//! Every observable effect of a watch is one [`Notification`] delivered to
//! the registry's [`Sink`](crate::Sink). The enum is closed and serializes
//! to tagged JSON, one object per notification:
//!
//! ```text
//! {"type":"loading-state-changed","collectionId":"c1","isLoading":true}
//! {"type":"tree-update","kind":"addFile","node":{"meta":{...},"partial":true,...}}
//! ```

use std::fmt;

use camino::Utf8PathBuf;
use cs_core::{CollectionConfig, DotEnv, Environment, FolderRoot, ItemUid, RequestFile};
use serde::Serialize;

use crate::stats::WatchStatsSnapshot;

/// Identifier the host assigns to a watched collection.
///
/// # Examples
///
/// ```
/// use cs_watcher::CollectionId;
///
/// let id = CollectionId::from("c1");
/// assert_eq!(id.as_str(), "c1");
/// assert_eq!(id.to_string(), "c1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CollectionId(String);

impl CollectionId {
    /// Wraps a host-provided id.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CollectionId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for CollectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Kind of a tree mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TreeEventKind {
    /// A file appeared.
    AddFile,
    /// A directory appeared.
    AddDir,
    /// A known file changed, or a record moved to a later hydration state.
    Change,
    /// A file disappeared.
    Unlink,
    /// A directory disappeared.
    UnlinkDir,
}

/// Kind of a lifecycle record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleKind {
    /// The watch started.
    Started,
    /// The watch stopped.
    Stopped,
    /// A file appeared.
    Add,
    /// A file changed.
    Change,
    /// A file disappeared.
    Unlink,
    /// A directory appeared.
    AddDir,
    /// A directory disappeared.
    UnlinkDir,
    /// The backend was restarted with polling.
    Restarted,
    /// The backend failed and will not be retried.
    Degraded,
}

impl From<TreeEventKind> for LifecycleKind {
    fn from(kind: TreeEventKind) -> Self {
        match kind {
            TreeEventKind::AddFile => Self::Add,
            TreeEventKind::AddDir => Self::AddDir,
            TreeEventKind::Change => Self::Change,
            TreeEventKind::Unlink => Self::Unlink,
            TreeEventKind::UnlinkDir => Self::UnlinkDir,
        }
    }
}

/// Kind of a file operation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOperationKind {
    /// The watcher read a file.
    Read,
    /// The watcher wrote a file.
    Write,
}

/// Identity of a node in a tree update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMeta {
    /// Owning collection.
    pub collection_id: CollectionId,
    /// Absolute path of the file or directory.
    pub path: Utf8PathBuf,
    /// Display name.
    pub name: String,
    /// Stable identifier.
    pub uid: ItemUid,
    /// Position among siblings, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u32>,
}

/// Payload of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NodeData {
    /// A request file.
    Request(Box<RequestFile>),
    /// Folder or collection metadata.
    Folder(Box<FolderRoot>),
}

/// A node carried by a [`Notification::TreeUpdate`].
///
/// The flags describe where the record is in progressive hydration:
/// `partial` (metadata only), `loading` (previous data retained while a
/// full parse runs), complete (neither flag), or `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Identity.
    pub meta: NodeMeta,
    /// Parsed content, when available.
    pub data: Option<NodeData>,
    /// Only metadata is known.
    pub partial: bool,
    /// A full parse is running.
    pub loading: bool,
    /// Oversized text leaves were replaced by markers.
    pub redacted: bool,
    /// File size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Parse or read failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TreeNode {
    /// Creates a node that only carries identity.
    #[must_use]
    pub const fn bare(meta: NodeMeta) -> Self {
        Self {
            meta,
            data: None,
            partial: false,
            loading: false,
            redacted: false,
            size: None,
            error: None,
        }
    }

    /// Returns `true` if the record is fully hydrated.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.data.is_some() && !self.partial && !self.loading && self.error.is_none()
    }
}

/// Everything the watcher reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Notification {
    /// The in-memory tree changed.
    TreeUpdate {
        /// What happened.
        kind: TreeEventKind,
        /// The affected node.
        node: TreeNode,
    },
    /// The collection entered or left its loading phase.
    LoadingStateChanged {
        /// The collection.
        collection_id: CollectionId,
        /// `true` while discovering or processing.
        is_loading: bool,
    },
    /// The watcher touched a file.
    FileOperation {
        /// Read or write.
        operation: FileOperationKind,
        /// The file.
        path: Utf8PathBuf,
        /// The collection.
        collection_id: CollectionId,
        /// Byte count, or `skipped` for files outside the tree.
        details: String,
    },
    /// A watch lifecycle or per-event record.
    WatcherLifecycle {
        /// The collection.
        collection_id: CollectionId,
        /// What happened.
        kind: LifecycleKind,
        /// The path involved, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<Utf8PathBuf>,
        /// Extra detail, such as the error behind a restart.
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<String>,
    },
    /// Watch statistics.
    WatcherStats {
        /// The collection.
        collection_id: CollectionId,
        /// Counters.
        #[serde(flatten)]
        stats: WatchStatsSnapshot,
    },
    /// A file could not be read or parsed.
    ParsingError {
        /// The file.
        path: Utf8PathBuf,
        /// The collection.
        collection_id: CollectionId,
        /// Human-readable cause.
        error: String,
    },
    /// `bruno.json` was loaded.
    ConfigUpdated {
        /// The collection.
        collection_id: CollectionId,
        /// Parsed configuration.
        config: CollectionConfig,
    },
    /// `.env` was loaded or removed.
    EnvUpdated {
        /// The collection.
        collection_id: CollectionId,
        /// Key/value pairs in file order.
        variables: DotEnv,
    },
    /// An environment file was added or changed.
    EnvironmentUpserted {
        /// The collection.
        collection_id: CollectionId,
        /// Identifier of the environment file.
        uid: ItemUid,
        /// The file.
        path: Utf8PathBuf,
        /// Parsed environment.
        environment: Environment,
    },
    /// An environment file was removed.
    EnvironmentRemoved {
        /// The collection.
        collection_id: CollectionId,
        /// Identifier of the environment file.
        uid: ItemUid,
        /// The file.
        path: Utf8PathBuf,
    },
}

impl Notification {
    /// Returns the collection this notification belongs to.
    #[must_use]
    pub fn collection_id(&self) -> &CollectionId {
        match self {
            Self::TreeUpdate { node, .. } => &node.meta.collection_id,
            Self::LoadingStateChanged { collection_id, .. }
            | Self::FileOperation { collection_id, .. }
            | Self::WatcherLifecycle { collection_id, .. }
            | Self::WatcherStats { collection_id, .. }
            | Self::ParsingError { collection_id, .. }
            | Self::ConfigUpdated { collection_id, .. }
            | Self::EnvUpdated { collection_id, .. }
            | Self::EnvironmentUpserted { collection_id, .. }
            | Self::EnvironmentRemoved { collection_id, .. } => collection_id,
        }
    }

    /// Returns the `type` tag this notification serializes with.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::TreeUpdate { .. } => "tree-update",
            Self::LoadingStateChanged { .. } => "loading-state-changed",
            Self::FileOperation { .. } => "file-operation",
            Self::WatcherLifecycle { .. } => "watcher-lifecycle",
            Self::WatcherStats { .. } => "watcher-stats",
            Self::ParsingError { .. } => "parsing-error",
            Self::ConfigUpdated { .. } => "config-updated",
            Self::EnvUpdated { .. } => "env-updated",
            Self::EnvironmentUpserted { .. } => "environment-upserted",
            Self::EnvironmentRemoved { .. } => "environment-removed",
        }
    }

    /// Returns `Some(is_loading)` for a loading-state change.
    #[must_use]
    pub const fn loading_change(&self) -> Option<bool> {
        match self {
            Self::LoadingStateChanged { is_loading, .. } => Some(*is_loading),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> NodeMeta {
        NodeMeta {
            collection_id: CollectionId::from("c1"),
            path: Utf8PathBuf::from("/c/ping.bru"),
            name: "Ping".to_owned(),
            uid: ItemUid::new("u1"),
            seq: Some(1),
        }
    }

    #[test]
    fn test_loading_state_changed_json() {
        let n = Notification::LoadingStateChanged {
            collection_id: CollectionId::from("c1"),
            is_loading: true,
        };
        let json = serde_json::to_string(&n).unwrap();
        assert_eq!(json, r#"{"type":"loading-state-changed","collectionId":"c1","isLoading":true}"#);
        assert_eq!(n.type_name(), "loading-state-changed");
        assert_eq!(n.loading_change(), Some(true));
    }

    #[test]
    fn test_tree_update_json() {
        let mut node = TreeNode::bare(meta());
        node.partial = true;
        node.size = Some(42);
        let n = Notification::TreeUpdate {
            kind: TreeEventKind::AddFile,
            node,
        };
        insta::assert_json_snapshot!(n, @r#"
        {
          "type": "tree-update",
          "kind": "addFile",
          "node": {
            "meta": {
              "collectionId": "c1",
              "path": "/c/ping.bru",
              "name": "Ping",
              "uid": "u1",
              "seq": 1
            },
            "data": null,
            "partial": true,
            "loading": false,
            "redacted": false,
            "size": 42
          }
        }
        "#);
    }

    #[test]
    fn test_lifecycle_json_skips_empty_fields() {
        let n = Notification::WatcherLifecycle {
            collection_id: CollectionId::from("c1"),
            kind: LifecycleKind::UnlinkDir,
            path: None,
            data: None,
        };
        let json = serde_json::to_string(&n).unwrap();
        assert_eq!(json, r#"{"type":"watcher-lifecycle","collectionId":"c1","kind":"unlinkDir"}"#);
    }

    #[test]
    fn test_collection_id_accessor() {
        let n = Notification::TreeUpdate {
            kind: TreeEventKind::Unlink,
            node: TreeNode::bare(meta()),
        };
        assert_eq!(n.collection_id().as_str(), "c1");
        assert!(!TreeNode::bare(meta()).is_complete());
    }

    #[test]
    fn test_lifecycle_kind_from_tree_kind() {
        assert_eq!(LifecycleKind::from(TreeEventKind::AddFile), LifecycleKind::Add);
        assert_eq!(LifecycleKind::from(TreeEventKind::UnlinkDir), LifecycleKind::UnlinkDir);
    }
}
