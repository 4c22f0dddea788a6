//! Classification of paths under a collection root.

use camino::Utf8Path;
use cs_format::{is_dialect_file, Format, FormatChoice};

/// Name of the collection config file at the root.
pub const CONFIG_FILE: &str = "bruno.json";

/// Name of the dotenv file at the root.
pub const DOTENV_FILE: &str = ".env";

/// Directory holding environment files, directly under the root.
pub const ENVIRONMENTS_DIR: &str = "environments";

const COLLECTION_FILES: &[&str] = &[
    "collection.bru",
    "collection.yml",
    "collection.yaml",
    "opencollection.yml",
    "opencollection.yaml",
];

const FOLDER_FILES: &[&str] = &["folder.bru", "folder.yml", "folder.yaml"];

/// What a file under a collection root is, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathClass {
    /// `bruno.json` at the root.
    Config,
    /// `.env` at the root.
    DotEnv,
    /// A dialect file directly inside `<root>/environments/`.
    Environment,
    /// `collection.*` or `opencollection.*` at the root.
    CollectionRoot,
    /// `folder.*` in a folder below the root.
    FolderRoot,
    /// Any other dialect file.
    Request,
    /// Not part of the tree.
    Other,
}

impl PathClass {
    /// Returns `true` for classes that map to nodes of the tree.
    #[must_use]
    pub const fn is_tree_file(self) -> bool {
        matches!(self, Self::CollectionRoot | Self::FolderRoot | Self::Request)
    }
}

/// Classifies a file path relative to `root`.
///
/// # Examples
///
/// ```
/// use cs_watcher::{classify, PathClass};
/// use camino::Utf8Path;
///
/// let root = Utf8Path::new("/c");
/// assert_eq!(classify(root, Utf8Path::new("/c/bruno.json")), PathClass::Config);
/// assert_eq!(classify(root, Utf8Path::new("/c/environments/dev.bru")), PathClass::Environment);
/// assert_eq!(classify(root, Utf8Path::new("/c/users/folder.bru")), PathClass::FolderRoot);
/// assert_eq!(classify(root, Utf8Path::new("/c/users/list.yml")), PathClass::Request);
/// assert_eq!(classify(root, Utf8Path::new("/c/users/README.md")), PathClass::Other);
/// ```
#[must_use]
pub fn classify(root: &Utf8Path, path: &Utf8Path) -> PathClass {
    let Ok(relative) = path.strip_prefix(root) else {
        return PathClass::Other;
    };
    let Some(name) = relative.file_name() else {
        return PathClass::Other;
    };
    let at_root = relative.parent().is_some_and(|p| p.as_str().is_empty());
    let lower = name.to_ascii_lowercase();

    if at_root && name == CONFIG_FILE {
        return PathClass::Config;
    }
    if at_root && name == DOTENV_FILE {
        return PathClass::DotEnv;
    }
    if !is_dialect_file(name) {
        return PathClass::Other;
    }
    if relative.parent().is_some_and(|p| p.as_str() == ENVIRONMENTS_DIR) {
        return PathClass::Environment;
    }
    if at_root && COLLECTION_FILES.contains(&lower.as_str()) {
        return PathClass::CollectionRoot;
    }
    if !at_root && FOLDER_FILES.contains(&lower.as_str()) {
        return PathClass::FolderRoot;
    }
    PathClass::Request
}

/// Returns `true` if `dir` is the environments directory of `root`.
#[must_use]
pub fn is_environments_dir(root: &Utf8Path, dir: &Utf8Path) -> bool {
    dir.strip_prefix(root).is_ok_and(|rel| rel.as_str() == ENVIRONMENTS_DIR)
}

/// Dialect choice for a file: `.bru` files are always the primary dialect,
/// YAML files are told apart by content.
#[must_use]
pub fn format_choice(path: &Utf8Path) -> FormatChoice {
    if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("bru")) {
        FormatChoice::Explicit(Format::Primary)
    } else {
        FormatChoice::Auto
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(path: &str) -> PathClass {
        classify(Utf8Path::new("/c"), Utf8Path::new(path))
    }

    #[test]
    fn test_root_only_files() {
        assert_eq!(class("/c/bruno.json"), PathClass::Config);
        assert_eq!(class("/c/sub/bruno.json"), PathClass::Other);
        assert_eq!(class("/c/.env"), PathClass::DotEnv);
        assert_eq!(class("/c/sub/.env"), PathClass::Other);
    }

    #[test]
    fn test_environment_files() {
        assert_eq!(class("/c/environments/dev.bru"), PathClass::Environment);
        assert_eq!(class("/c/environments/dev.yml"), PathClass::Environment);
        assert_eq!(class("/c/environments/nested/dev.bru"), PathClass::Request);
        assert_eq!(class("/c/environments/notes.txt"), PathClass::Other);
    }

    #[test]
    fn test_collection_and_folder_files() {
        assert_eq!(class("/c/collection.bru"), PathClass::CollectionRoot);
        assert_eq!(class("/c/opencollection.yaml"), PathClass::CollectionRoot);
        assert_eq!(class("/c/sub/collection.bru"), PathClass::Request);
        assert_eq!(class("/c/sub/folder.yml"), PathClass::FolderRoot);
        assert_eq!(class("/c/folder.bru"), PathClass::Request);
    }

    #[test]
    fn test_requests_and_other() {
        assert_eq!(class("/c/a.bru"), PathClass::Request);
        assert_eq!(class("/c/deep/er/a.YAML"), PathClass::Request);
        assert_eq!(class("/c/a.json"), PathClass::Other);
        assert_eq!(class("/elsewhere/a.bru"), PathClass::Other);
        assert!(PathClass::Request.is_tree_file());
        assert!(!PathClass::Environment.is_tree_file());
    }

    #[test]
    fn test_format_choice() {
        assert_eq!(format_choice(Utf8Path::new("/c/a.bru")), FormatChoice::Explicit(Format::Primary));
        assert_eq!(format_choice(Utf8Path::new("/c/a.yml")), FormatChoice::Auto);
    }

    #[test]
    fn test_is_environments_dir() {
        let root = Utf8Path::new("/c");
        assert!(is_environments_dir(root, Utf8Path::new("/c/environments")));
        assert!(!is_environments_dir(root, Utf8Path::new("/c/a/environments")));
    }
}
