//! Initial discovery of a collection tree.
//!
//! Uses `ignore::WalkBuilder` with its standard filters off: hidden files
//! such as `.env` matter here, and gitignore rules do not apply to
//! collections. Exclusion goes through the watch's [`FileFilter`] instead.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;

use crate::filter::FileFilter;

/// One discovered path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WalkEntry {
    pub path: Utf8PathBuf,
    pub is_dir: bool,
}

/// Walks everything below `root` (not `root` itself), parents before
/// children and siblings by file name.
///
/// Unreadable entries and non-UTF-8 paths are logged and skipped. This is
/// blocking; run it on `spawn_blocking`.
pub(crate) fn walk(root: &Utf8Path, filter: &Arc<dyn FileFilter>, recursive: bool) -> Vec<WalkEntry> {
    let entry_filter = Arc::clone(filter);
    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(std::cmp::Ord::cmp)
        .filter_entry(move |entry| {
            Utf8Path::from_path(entry.path()).is_none_or(|p| entry_filter.should_process(p))
        });
    if !recursive {
        builder.max_depth(Some(1));
    }

    let mut entries = Vec::new();
    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "Error walking directory");
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let Some(path) = Utf8Path::from_path(entry.path()) else {
            tracing::warn!(path = %entry.path().display(), "Skipping non-UTF-8 path");
            continue;
        };
        let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
        entries.push(WalkEntry {
            path: path.to_owned(),
            is_dir,
        });
    }

    tracing::debug!(root = %root, entries = entries.len(), "Walk complete");
    entries
}
