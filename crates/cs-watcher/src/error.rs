//! Error types for the cs-watcher crate.
//!
//! This module provides the [`WatchError`] type for errors that can occur
//! while starting, running, or addressing a collection watch.

use camino::Utf8PathBuf;

#[cfg(unix)]
const HANDLE_EXHAUSTION_CODES: &[i32] = &[
    23, // ENFILE
    24, // EMFILE
    28, // ENOSPC (inotify watch limit)
];

#[cfg(not(unix))]
const HANDLE_EXHAUSTION_CODES: &[i32] = &[];

/// Errors that can occur during watch operations.
///
/// # Error Recovery Strategy
///
/// - **Notify errors** ([`WatchError::Notify`]): handle exhaustion triggers a
///   single restart with the polling backend, anything else degrades the watch
/// - **Path not found** ([`WatchError::PathNotFound`]): fatal, the root must exist
/// - **Watch not found** ([`WatchError::WatchNotFound`]): fatal for that call only
/// - **Channel closed** ([`WatchError::ChannelClosed`]): fatal, the watch is gone
/// - **Non-UTF-8 path** ([`WatchError::NonUtf8Path`]): recoverable, skip and continue
/// - **I/O errors** ([`WatchError::Io`]): fatal for that call only
///
/// # Examples
///
/// ```
/// use cs_watcher::WatchError;
///
/// fn handle_error(err: &WatchError) {
///     if err.is_handle_exhaustion() {
///         eprintln!("out of watch handles, falling back to polling");
///     } else if err.is_fatal() {
///         eprintln!("watch error: {err}");
///     }
/// }
/// # handle_error(&WatchError::ChannelClosed);
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize or operate the notify watcher.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The specified path does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// No active watch has the given collection id.
    #[error("no watch for collection '{0}'")]
    WatchNotFound(String),

    /// The path lies outside the collection root it was addressed to.
    #[error("path {path} is outside collection root {root}")]
    OutsideRoot {
        /// The offending path.
        path: Utf8PathBuf,
        /// The collection root.
        root: Utf8PathBuf,
    },

    /// A watch's command channel closed unexpectedly.
    #[error("watch channel closed unexpectedly")]
    ChannelClosed,

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// Stringifying a document for writing failed.
    #[error("failed to stringify document: {0}")]
    Format(#[from] cs_format::FormatError),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Creates a new [`WatchError::NonUtf8Path`] error.
    #[inline]
    pub fn non_utf8_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self::NonUtf8Path(path.into())
    }

    /// Creates a new [`WatchError::WatchNotFound`] error.
    #[inline]
    pub fn watch_not_found(collection_id: impl Into<String>) -> Self {
        Self::WatchNotFound(collection_id.into())
    }

    /// Creates a new [`WatchError::OutsideRoot`] error.
    #[inline]
    pub fn outside_root(path: impl Into<Utf8PathBuf>, root: impl Into<Utf8PathBuf>) -> Self {
        Self::OutsideRoot {
            path: path.into(),
            root: root.into(),
        }
    }

    /// Returns `true` if this error is recoverable (watching can continue).
    ///
    /// Only non-UTF-8 path errors are recoverable as they can be skipped.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonUtf8Path(_))
    }

    /// Returns `true` if this error is fatal for the operation that raised it.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns `true` if the OS ran out of watch handles or descriptors.
    ///
    /// Covers `notify`'s `MaxFilesWatch` and the `EMFILE`, `ENFILE` and
    /// `ENOSPC` OS errors, whether wrapped by `notify` or raw.
    #[must_use]
    pub fn is_handle_exhaustion(&self) -> bool {
        let is_exhausted_io =
            |e: &std::io::Error| e.raw_os_error().is_some_and(|code| HANDLE_EXHAUSTION_CODES.contains(&code));
        match self {
            Self::Notify(err) => match &err.kind {
                notify::ErrorKind::MaxFilesWatch => true,
                notify::ErrorKind::Io(io) => is_exhausted_io(io),
                _ => false,
            },
            Self::Io(io) => is_exhausted_io(io),
            _ => false,
        }
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::PathNotFound(path) | Self::OutsideRoot { path, .. } => Some(path),
            Self::Notify(_)
            | Self::WatchNotFound(_)
            | Self::ChannelClosed
            | Self::NonUtf8Path(_)
            | Self::Format(_)
            | Self::Io(_) => None,
        }
    }
}
