//! Folder and collection root metadata.

use serde::{Deserialize, Serialize};

use super::request::{Auth, KeyValue, Scripts, Vars};

/// The `meta` part of a folder file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderMeta {
    /// Display name; the directory name is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Position among siblings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u32>,
}

/// Request defaults a folder or collection applies to everything below it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderRequest {
    /// Headers added to every request.
    pub headers: Vec<KeyValue>,
    /// Auth inherited by requests using [`Auth::Inherit`].
    pub auth: Auth,
    /// Scripts run around every request.
    pub script: Scripts,
    /// Variables set around every request.
    pub vars: Vars,
    /// Tests run after every request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests: Option<String>,
}

/// Canonical `folder.*` / `collection.*` file.
///
/// Folders default to [`Auth::Inherit`]; the collection root has nothing to
/// inherit from and defaults to [`Auth::None`].
///
/// # Examples
///
/// ```
/// use cs_core::{Auth, FolderRoot};
///
/// assert_eq!(FolderRoot::folder().request.auth, Auth::Inherit);
/// assert_eq!(FolderRoot::collection().request.auth, Auth::None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderRoot {
    /// Name and sequence.
    pub meta: FolderMeta,
    /// Request defaults.
    pub request: FolderRequest,
    /// Markdown documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
}

impl FolderRoot {
    /// Creates an empty folder root (auth inherits).
    #[must_use]
    pub fn folder() -> Self {
        Self::default()
    }

    /// Creates an empty collection root (auth is none).
    #[must_use]
    pub fn collection() -> Self {
        let mut root = Self::default();
        root.request.auth = Auth::None;
        root
    }
}
