//! The in-memory tree of one collection.
//!
//! The actor keeps flat maps keyed by absolute path; [`CollectionTree::snapshot`]
//! assembles the nested view on demand, ordering siblings by `seq` (absent
//! last) and then by name.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use cs_core::{FolderRoot, ItemKind, ItemUid, RequestFile};
use serde::Serialize;

use crate::events::CollectionId;
use crate::loading::LoadingPhase;
use crate::stats::WatchStatsSnapshot;

/// Hydration state of a request record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    /// Only metadata is known.
    Partial,
    /// A full parse is running; previous data, if any, is retained.
    Loading,
    /// Fully parsed.
    Complete,
    /// Reading or parsing failed.
    Error,
}

#[derive(Debug, Clone)]
pub(crate) struct RequestRecord {
    pub uid: ItemUid,
    pub name: String,
    pub kind: ItemKind,
    pub seq: Option<u32>,
    pub state: RequestState,
    pub data: Option<RequestFile>,
    pub size: u64,
    pub redacted: bool,
    pub error: Option<String>,
    /// Bumped on every read so stale lane results can be recognized.
    pub revision: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct FolderRecord {
    pub uid: ItemUid,
    pub dir_name: String,
    pub root: Option<FolderRoot>,
}

impl FolderRecord {
    fn name(&self) -> &str {
        self.root
            .as_ref()
            .and_then(|r| r.meta.name.as_deref())
            .unwrap_or(&self.dir_name)
    }

    fn seq(&self) -> Option<u32> {
        self.root.as_ref().and_then(|r| r.meta.seq)
    }
}

#[derive(Debug)]
pub(crate) struct CollectionTree {
    root: Utf8PathBuf,
    root_uid: ItemUid,
    collection_root: Option<FolderRoot>,
    folders: BTreeMap<Utf8PathBuf, FolderRecord>,
    requests: BTreeMap<Utf8PathBuf, RequestRecord>,
}

impl CollectionTree {
    pub fn new(root: Utf8PathBuf, root_uid: ItemUid) -> Self {
        Self {
            root,
            root_uid,
            collection_root: None,
            folders: BTreeMap::new(),
            requests: BTreeMap::new(),
        }
    }

    pub fn root_uid(&self) -> &ItemUid {
        &self.root_uid
    }

    pub fn add_folder(&mut self, path: &Utf8Path, uid: ItemUid) {
        let dir_name = path.file_name().unwrap_or_default().to_owned();
        self.folders
            .entry(path.to_owned())
            .or_insert(FolderRecord {
                uid,
                dir_name,
                root: None,
            });
    }

    pub fn remove_folder(&mut self, path: &Utf8Path) -> Option<FolderRecord> {
        self.folders.remove(path)
    }

    pub fn folder(&self, path: &Utf8Path) -> Option<&FolderRecord> {
        self.folders.get(path)
    }

    /// Sets or clears the metadata of the folder at `dir`; the root directory
    /// addresses the collection itself. Returns the display name and seq.
    pub fn set_folder_root(&mut self, dir: &Utf8Path, root: Option<FolderRoot>) -> (String, Option<u32>) {
        if dir == self.root.as_path() {
            let name = root
                .as_ref()
                .and_then(|r| r.meta.name.clone())
                .unwrap_or_else(|| self.root.file_name().unwrap_or_default().to_owned());
            let seq = root.as_ref().and_then(|r| r.meta.seq);
            self.collection_root = root;
            return (name, seq);
        }
        match self.folders.get_mut(dir) {
            Some(folder) => {
                folder.root = root;
                (folder.name().to_owned(), folder.seq())
            }
            None => (dir.file_name().unwrap_or_default().to_owned(), None),
        }
    }

    pub fn request(&self, path: &Utf8Path) -> Option<&RequestRecord> {
        self.requests.get(path)
    }

    pub fn request_mut(&mut self, path: &Utf8Path) -> Option<&mut RequestRecord> {
        self.requests.get_mut(path)
    }

    pub fn insert_request(&mut self, path: &Utf8Path, record: RequestRecord) {
        self.requests.insert(path.to_owned(), record);
    }

    pub fn remove_request(&mut self, path: &Utf8Path) -> Option<RequestRecord> {
        self.requests.remove(path)
    }

    pub fn snapshot(
        &self,
        collection_id: CollectionId,
        phase: LoadingPhase,
        stats: WatchStatsSnapshot,
    ) -> TreeSnapshot {
        let name = self
            .collection_root
            .as_ref()
            .and_then(|r| r.meta.name.clone())
            .unwrap_or_else(|| self.root.file_name().unwrap_or_default().to_owned());

        TreeSnapshot {
            collection_id,
            loading: phase != LoadingPhase::Idle,
            phase: phase.into(),
            stats,
            root: SnapshotFolder {
                uid: self.root_uid.clone(),
                name,
                path: self.root.clone(),
                seq: None,
                root: self.collection_root.clone(),
                items: self.children_of(&self.root),
            },
        }
    }

    fn children_of(&self, dir: &Utf8Path) -> Vec<SnapshotItem> {
        let mut items: Vec<SnapshotItem> = Vec::new();

        for (path, folder) in &self.folders {
            if path.parent() == Some(dir) {
                items.push(SnapshotItem::Folder(SnapshotFolder {
                    uid: folder.uid.clone(),
                    name: folder.name().to_owned(),
                    path: path.clone(),
                    seq: folder.seq(),
                    root: folder.root.clone(),
                    items: self.children_of(path),
                }));
            }
        }
        for (path, record) in &self.requests {
            if path.parent() == Some(dir) {
                items.push(SnapshotItem::Request(SnapshotRequest {
                    uid: record.uid.clone(),
                    name: record.name.clone(),
                    kind: record.kind,
                    path: path.clone(),
                    seq: record.seq,
                    state: record.state,
                    size: record.size,
                    redacted: record.redacted,
                    error: record.error.clone(),
                    data: record.data.clone(),
                }));
            }
        }

        items.sort_by(|a, b| sibling_order(a.seq(), a.name(), b.seq(), b.name()));
        items
    }
}

/// Orders siblings by `seq` with absent values last, then by name.
fn sibling_order(a_seq: Option<u32>, a_name: &str, b_seq: Option<u32>, b_name: &str) -> Ordering {
    match (a_seq, b_seq) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a_name.cmp(b_name))
}

/// Serializable loading phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseName {
    /// See [`LoadingPhase::Discovering`].
    Discovering,
    /// See [`LoadingPhase::Processing`].
    Processing,
    /// See [`LoadingPhase::Idle`].
    Idle,
}

impl From<LoadingPhase> for PhaseName {
    fn from(phase: LoadingPhase) -> Self {
        match phase {
            LoadingPhase::Discovering => Self::Discovering,
            LoadingPhase::Processing => Self::Processing,
            LoadingPhase::Idle => Self::Idle,
        }
    }
}

/// The nested view of a collection at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSnapshot {
    /// The collection.
    pub collection_id: CollectionId,
    /// `true` while discovering or processing.
    pub loading: bool,
    /// The loading phase.
    pub phase: PhaseName,
    /// Watch counters.
    pub stats: WatchStatsSnapshot,
    /// The collection root and everything below it.
    pub root: SnapshotFolder,
}

impl TreeSnapshot {
    /// Finds a request anywhere in the tree by path.
    #[must_use]
    pub fn find_request(&self, path: &Utf8Path) -> Option<&SnapshotRequest> {
        self.root.find_request(path)
    }

    /// Counts requests in the given state.
    #[must_use]
    pub fn count_requests(&self, state: RequestState) -> usize {
        self.root.count_requests(state)
    }
}

/// A folder, or the collection root, in a [`TreeSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotFolder {
    /// Stable identifier.
    pub uid: ItemUid,
    /// Display name.
    pub name: String,
    /// Absolute path.
    pub path: Utf8PathBuf,
    /// Position among siblings.
    pub seq: Option<u32>,
    /// Parsed `folder.*` / `collection.*` metadata.
    pub root: Option<FolderRoot>,
    /// Children, ordered.
    pub items: Vec<SnapshotItem>,
}

impl SnapshotFolder {
    fn find_request(&self, path: &Utf8Path) -> Option<&SnapshotRequest> {
        self.items.iter().find_map(|item| match item {
            SnapshotItem::Request(r) if r.path.as_path() == path => Some(r),
            SnapshotItem::Request(_) => None,
            SnapshotItem::Folder(f) => f.find_request(path),
        })
    }

    fn count_requests(&self, state: RequestState) -> usize {
        self.items
            .iter()
            .map(|item| match item {
                SnapshotItem::Request(r) => usize::from(r.state == state),
                SnapshotItem::Folder(f) => f.count_requests(state),
            })
            .sum()
    }
}

/// A request record in a [`TreeSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRequest {
    /// Stable identifier.
    pub uid: ItemUid,
    /// Display name.
    pub name: String,
    /// HTTP or GraphQL.
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Absolute path.
    pub path: Utf8PathBuf,
    /// Position among siblings.
    pub seq: Option<u32>,
    /// Hydration state.
    pub state: RequestState,
    /// File size in bytes.
    pub size: u64,
    /// Text leaves were redacted.
    pub redacted: bool,
    /// Failure message.
    pub error: Option<String>,
    /// Parsed request.
    pub data: Option<RequestFile>,
}

/// A child in a [`SnapshotFolder`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SnapshotItem {
    /// A folder.
    Folder(SnapshotFolder),
    /// A request.
    Request(SnapshotRequest),
}

impl SnapshotItem {
    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Folder(f) => &f.name,
            Self::Request(r) => &r.name,
        }
    }

    /// Position among siblings.
    #[must_use]
    pub const fn seq(&self) -> Option<u32> {
        match self {
            Self::Folder(f) => f.seq,
            Self::Request(r) => r.seq,
        }
    }
}
