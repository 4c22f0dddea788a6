//! Stable item identifiers.
//!
//! Every folder, request and environment file in the tree carries an
//! [`ItemUid`]. The [`UidCache`] maps absolute paths to identifiers so that a
//! file keeps its id across change events and across unlink followed by
//! re-add of the same path.

use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::FxHashMap;

/// An opaque identifier for a tree item.
///
/// Uses a newtype pattern so a raw string can't be passed where an item id is
/// expected. New ids are random v4 UUIDs rendered without hyphens.
///
/// # Examples
///
/// ```
/// use cs_core::ItemUid;
///
/// let a = ItemUid::generate();
/// let b = ItemUid::generate();
/// assert_ne!(a, b);
/// assert_eq!(a.as_str().len(), 32);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemUid(String);

impl ItemUid {
    /// Wraps an existing identifier.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ItemUid {
    #[inline]
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<ItemUid> for String {
    #[inline]
    fn from(id: ItemUid) -> Self {
        id.0
    }
}

/// Path to identifier cache shared by every watch in a registry.
///
/// Entries are never evicted, so an unlinked path that comes back gets the
/// same identifier. Cloning shares the underlying map.
///
/// # Examples
///
/// ```
/// use cs_core::UidCache;
/// use camino::Utf8Path;
///
/// let cache = UidCache::new();
/// let first = cache.get_or_create(Utf8Path::new("/c/a.bru"));
/// let again = cache.get_or_create(Utf8Path::new("/c/a.bru"));
/// assert_eq!(first, again);
/// ```
#[derive(Debug, Clone, Default)]
pub struct UidCache {
    inner: Arc<RwLock<FxHashMap<Utf8PathBuf, ItemUid>>>,
}

impl UidCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the identifier for `path`, creating one on first use.
    pub fn get_or_create(&self, path: &Utf8Path) -> ItemUid {
        if let Some(uid) = self.inner.read().get(path) {
            return uid.clone();
        }
        // Another thread may have inserted between the two locks.
        self.inner
            .write()
            .entry(path.to_owned())
            .or_insert_with(ItemUid::generate)
            .clone()
    }

    /// Returns the identifier for `path` without creating one.
    #[must_use]
    pub fn get(&self, path: &Utf8Path) -> Option<ItemUid> {
        self.inner.read().get(path).cloned()
    }

    /// Number of cached paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns `true` if no path has an identifier yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_paths_get_distinct_ids() {
        let cache = UidCache::new();
        let a = cache.get_or_create(Utf8Path::new("/c/a.bru"));
        let b = cache.get_or_create(Utf8Path::new("/c/b.bru"));
        assert_ne!(a, b);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_clone_shares_entries() {
        let cache = UidCache::new();
        let shared = cache.clone();
        let a = cache.get_or_create(Utf8Path::new("/c/a.bru"));
        assert_eq!(shared.get(Utf8Path::new("/c/a.bru")), Some(a));
    }

    #[test]
    fn test_concurrent_get_or_create_agrees() {
        let cache = UidCache::new();
        let ids: Vec<ItemUid> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| cache.get_or_create(Utf8Path::new("/c/x.bru"))))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_uid_serializes_as_string() {
        let uid = ItemUid::new("abc");
        assert_eq!(serde_json::to_string(&uid).unwrap(), r#""abc""#);
    }
}
