//! Watch statistics with atomic counters.
//!
//! The collection actor is the only writer. The registry reads the counters
//! without a round trip through the actor, so they live behind an `Arc` and
//! use [`Relaxed`](std::sync::atomic::Ordering::Relaxed) atomics.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Atomic counters for one collection watch.
#[derive(Debug, Default)]
pub struct WatchStats {
    watched_files: AtomicU64,
    watched_directories: AtomicU64,
    total_events: AtomicU64,
    /// Milliseconds since the Unix epoch; zero means no event yet.
    last_event_ms: AtomicU64,
    polling: AtomicBool,
    degraded: AtomicBool,
}

impl WatchStats {
    /// Creates zeroed counters.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one processed event and stamps the time.
    pub fn record_event(&self) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        self.last_event_ms.store(now_ms(), Ordering::Relaxed);
    }

    /// Sets the number of known files and directories.
    pub fn set_watched(&self, files: usize, directories: usize) {
        self.watched_files.store(files as u64, Ordering::Relaxed);
        self.watched_directories
            .store(directories as u64, Ordering::Relaxed);
    }

    /// Marks the watch as running on the polling backend.
    pub fn set_polling(&self, polling: bool) {
        self.polling.store(polling, Ordering::Relaxed);
    }

    /// Marks the watch as degraded.
    pub fn set_degraded(&self) {
        self.degraded.store(true, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot.
    #[must_use]
    pub fn snapshot(&self) -> WatchStatsSnapshot {
        let last = self.last_event_ms.load(Ordering::Relaxed);
        WatchStatsSnapshot {
            watched_files: self.watched_files.load(Ordering::Relaxed),
            watched_directories: self.watched_directories.load(Ordering::Relaxed),
            total_events: self.total_events.load(Ordering::Relaxed),
            last_event_time: (last > 0).then_some(last),
            polling: self.polling.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(1, |d| d.as_millis() as u64)
        .max(1)
}

/// A point-in-time copy of [`WatchStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchStatsSnapshot {
    /// Known files under the root.
    pub watched_files: u64,
    /// Known directories under the root, the root included.
    pub watched_directories: u64,
    /// Events processed since the watch started.
    pub total_events: u64,
    /// Time of the last event, in milliseconds since the Unix epoch.
    pub last_event_time: Option<u64>,
    /// Running on the polling backend.
    pub polling: bool,
    /// The backend failed and was not restarted.
    pub degraded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_stats_record_event() {
        let stats = WatchStats::new();
        assert_eq!(stats.snapshot().last_event_time, None);

        stats.record_event();
        stats.record_event();
        let snap = stats.snapshot();
        assert_eq!(snap.total_events, 2);
        assert!(snap.last_event_time.is_some());
    }

    #[test]
    fn test_watch_stats_flags() {
        let stats = WatchStats::new();
        stats.set_watched(3, 2);
        stats.set_polling(true);
        stats.set_degraded();

        let snap = stats.snapshot();
        assert_eq!(snap.watched_files, 3);
        assert_eq!(snap.watched_directories, 2);
        assert!(snap.polling);
        assert!(snap.degraded);
    }

    #[test]
    fn test_snapshot_json_is_camel_case() {
        let json = serde_json::to_string(&WatchStatsSnapshot::default()).unwrap();
        assert!(json.contains("\"watchedFiles\":0"));
        assert!(json.contains("\"lastEventTime\":null"));
    }
}
