//! The per-collection loading-state machine.
//!
//! A collection moves strictly forward through three phases:
//!
//! ```text
//! Discovering ──complete_discovery──► Processing ──last mark_processed──► Idle
//!      │                                                                   ▲
//!      └────────────── complete_discovery (nothing pending) ──────────────┘
//! ```
//!
//! `is_processing` holds only after discovery has completed with files
//! still pending, and drops the moment the pending set empties. Every
//! method reports whether the collection just stopped loading so the caller
//! can emit exactly one `loading-state-changed(false)`.

use camino::{Utf8Path, Utf8PathBuf};
use cs_core::FxHashSet;

/// Which phase a collection is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadingPhase {
    /// The initial scan is running.
    Discovering,
    /// The scan is done; offloaded files are still being parsed.
    Processing,
    /// Fully loaded.
    Idle,
}

/// Loading state of one collection.
///
/// Owned by the collection's actor; never shared.
///
/// # Examples
///
/// ```
/// use cs_watcher::{LoadingPhase, LoadingState};
/// use camino::Utf8Path;
///
/// let mut state = LoadingState::new();
/// state.add_pending(Utf8Path::new("/c/big.bru"));
///
/// assert!(!state.complete_discovery());
/// assert_eq!(state.phase(), LoadingPhase::Processing);
///
/// assert!(state.mark_processed(Utf8Path::new("/c/big.bru")));
/// assert_eq!(state.phase(), LoadingPhase::Idle);
/// ```
#[derive(Debug, Clone)]
pub struct LoadingState {
    is_discovering: bool,
    is_processing: bool,
    pending: FxHashSet<Utf8PathBuf>,
}

impl Default for LoadingState {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadingState {
    /// Creates a state in the discovering phase.
    #[must_use]
    pub fn new() -> Self {
        Self {
            is_discovering: true,
            is_processing: false,
            pending: FxHashSet::default(),
        }
    }

    /// The current phase.
    #[must_use]
    pub const fn phase(&self) -> LoadingPhase {
        if self.is_discovering {
            LoadingPhase::Discovering
        } else if self.is_processing {
            LoadingPhase::Processing
        } else {
            LoadingPhase::Idle
        }
    }

    /// Returns `true` while discovering or processing.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_discovering || self.is_processing
    }

    /// Number of files still pending.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if `path` is pending.
    #[must_use]
    pub fn is_pending(&self, path: &Utf8Path) -> bool {
        self.pending.contains(path)
    }

    /// Records an offloaded file. Ignored once the collection is idle.
    ///
    /// Returns `true` if the path was recorded.
    pub fn add_pending(&mut self, path: &Utf8Path) -> bool {
        if !self.is_loading() {
            return false;
        }
        self.pending.insert(path.to_owned());
        true
    }

    /// Ends discovery.
    ///
    /// Returns `true` if the collection is now idle, meaning the caller must
    /// emit `loading-state-changed(false)`. Calling this twice is a no-op.
    pub fn complete_discovery(&mut self) -> bool {
        if !self.is_discovering {
            return false;
        }
        self.is_discovering = false;
        if self.pending.is_empty() {
            true
        } else {
            self.is_processing = true;
            false
        }
    }

    /// Removes `path` from the pending set.
    ///
    /// Returns `true` if this emptied the set after discovery, meaning the
    /// caller must emit `loading-state-changed(false)`.
    pub fn mark_processed(&mut self, path: &Utf8Path) -> bool {
        if !self.pending.remove(path) {
            return false;
        }
        if self.is_processing && self.pending.is_empty() {
            self.is_processing = false;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> &Utf8Path {
        Utf8Path::new(s)
    }

    #[test]
    fn test_starts_discovering() {
        let state = LoadingState::new();
        assert_eq!(state.phase(), LoadingPhase::Discovering);
        assert!(state.is_loading());
    }

    #[test]
    fn test_discovery_without_pending_goes_idle() {
        let mut state = LoadingState::new();
        assert!(state.complete_discovery());
        assert_eq!(state.phase(), LoadingPhase::Idle);
        assert!(!state.complete_discovery());
    }

    #[test]
    fn test_two_pending_files() {
        let mut state = LoadingState::new();
        assert!(state.add_pending(p("/c/a.bru")));
        assert!(state.add_pending(p("/c/b.bru")));

        assert!(!state.complete_discovery());
        assert_eq!(state.phase(), LoadingPhase::Processing);
        assert!(state.is_loading());

        assert!(!state.mark_processed(p("/c/a.bru")));
        assert!(state.is_loading());
        assert!(state.mark_processed(p("/c/b.bru")));
        assert_eq!(state.phase(), LoadingPhase::Idle);

        // Repeats never emit again.
        assert!(!state.mark_processed(p("/c/b.bru")));
    }

    #[test]
    fn test_processed_during_discovery_does_not_finish() {
        let mut state = LoadingState::new();
        state.add_pending(p("/c/a.bru"));
        assert!(!state.mark_processed(p("/c/a.bru")));
        assert_eq!(state.phase(), LoadingPhase::Discovering);
        assert!(state.complete_discovery());
    }

    #[test]
    fn test_add_pending_ignored_when_idle() {
        let mut state = LoadingState::new();
        state.complete_discovery();
        assert!(!state.add_pending(p("/c/late.bru")));
        assert_eq!(state.pending_len(), 0);
        assert!(!state.is_pending(p("/c/late.bru")));
    }

    #[test]
    fn test_duplicate_pending_counts_once() {
        let mut state = LoadingState::new();
        state.add_pending(p("/c/a.bru"));
        state.add_pending(p("/c/a.bru"));
        assert_eq!(state.pending_len(), 1);
        state.complete_discovery();
        assert!(state.mark_processed(p("/c/a.bru")));
    }
}
