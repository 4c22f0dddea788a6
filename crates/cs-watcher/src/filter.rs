//! Path filtering for watch events.
//!
//! Filters run in the backend callback, before paths reach the collection's
//! channel, and again during directory walks. A path that fails any filter
//! never produces a notification.
//!
//! # Examples
//!
//! ```
//! use cs_watcher::{FileFilter, IgnoreFilter};
//! use camino::Utf8Path;
//!
//! let filter = IgnoreFilter::new("/c", ["node_modules", "build/out"]);
//!
//! assert!(!filter.should_process(Utf8Path::new("/c/node_modules")));
//! assert!(!filter.should_process(Utf8Path::new("/c/node_modules/x/a.bru")));
//! assert!(!filter.should_process(Utf8Path::new("/c/build/out/a.bru")));
//! assert!(filter.should_process(Utf8Path::new("/c/build/a.bru")));
//! assert!(filter.should_process(Utf8Path::new("/c/node_modules_old/a.bru")));
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use smallvec::SmallVec;

/// Patterns ignored in every collection.
pub const DEFAULT_IGNORES: &[&str] = &["node_modules", ".git"];

/// Suffix of the temporary files written by
/// [`WatcherRegistry::save_request`](crate::WatcherRegistry::save_request).
pub const SAVE_TEMP_SUFFIX: &str = ".colsync-tmp";

/// A predicate deciding which paths the watcher processes.
///
/// Filters must be [`Send`] and [`Sync`] because they run on the backend's
/// own thread.
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if the path should be processed.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// A filter that accepts all paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _path: &Utf8Path) -> bool {
        true
    }
}

/// Rejects paths whose root-relative form equals an ignore pattern or lies
/// beneath one.
///
/// Matching is by whole path components: `node_modules` ignores
/// `node_modules/pkg` but not `node_modules_old`. Paths outside the root
/// are not this filter's concern and pass.
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    root: Utf8PathBuf,
    patterns: SmallVec<[Utf8PathBuf; 4]>,
}

impl IgnoreFilter {
    /// Creates a filter for `root` with the given patterns.
    ///
    /// Leading `./` and trailing `/` are stripped from patterns; empty
    /// patterns are dropped.
    #[must_use]
    pub fn new<I, S>(root: impl Into<Utf8PathBuf>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter_map(|p| {
                let p = p.as_ref().trim();
                let p = p.strip_prefix("./").unwrap_or(p).trim_end_matches('/');
                (!p.is_empty()).then(|| Utf8PathBuf::from(p))
            })
            .collect();

        Self {
            root: root.into(),
            patterns,
        }
    }

    /// Creates a filter with [`DEFAULT_IGNORES`] plus `extra`.
    #[must_use]
    pub fn with_defaults<I, S>(root: impl Into<Utf8PathBuf>, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let all: Vec<String> = DEFAULT_IGNORES
            .iter()
            .map(|s| (*s).to_owned())
            .chain(extra.into_iter().map(|s| s.as_ref().to_owned()))
            .collect();
        Self::new(root, all)
    }

    /// The normalized patterns.
    pub fn patterns(&self) -> impl Iterator<Item = &Utf8Path> {
        self.patterns.iter().map(Utf8PathBuf::as_path)
    }
}

impl FileFilter for IgnoreFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return true;
        };
        !self.patterns.iter().any(|p| relative.starts_with(p))
    }
}

/// Rejects temporary files written while saving.
#[derive(Debug, Clone, Copy, Default)]
pub struct TempFileFilter;

impl FileFilter for TempFileFilter {
    #[inline]
    fn should_process(&self, path: &Utf8Path) -> bool {
        !path.as_str().ends_with(SAVE_TEMP_SUFFIX)
    }
}

/// A composite filter that combines multiple filters with AND logic.
///
/// An empty composite accepts everything.
///
/// # Examples
///
/// ```
/// use cs_watcher::{CompositeFilter, FileFilter, IgnoreFilter, TempFileFilter};
/// use camino::Utf8Path;
///
/// let filter = CompositeFilter::new()
///     .and(IgnoreFilter::with_defaults("/c", ["dist"]))
///     .and(TempFileFilter);
///
/// assert!(filter.should_process(Utf8Path::new("/c/a.bru")));
/// assert!(!filter.should_process(Utf8Path::new("/c/.git/HEAD")));
/// assert!(!filter.should_process(Utf8Path::new("/c/dist/a.bru")));
/// assert!(!filter.should_process(Utf8Path::new("/c/a.bru.colsync-tmp")));
/// ```
#[derive(Default)]
pub struct CompositeFilter {
    filters: Vec<Box<dyn FileFilter>>,
}

impl CompositeFilter {
    /// Creates a new empty composite filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter to the composite.
    #[must_use]
    pub fn and<F: FileFilter>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl std::fmt::Debug for CompositeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeFilter")
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl FileFilter for CompositeFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        self.filters.iter().all(|f| f.should_process(path))
    }
}

impl<F: FileFilter + ?Sized> FileFilter for Box<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

impl<F: FileFilter + ?Sized> FileFilter for std::sync::Arc<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}
