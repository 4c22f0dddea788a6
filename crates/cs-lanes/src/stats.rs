//! Per-lane statistics with atomic counters.
//!
//! Counters use [`Relaxed`](std::sync::atomic::Ordering::Relaxed) ordering.
//! They are read for display and reporting only.
//!
//! # Examples
//!
//! ```
//! use cs_lanes::LaneStats;
//!
//! let stats = LaneStats::new(5_242);
//! stats.record_submitted();
//! stats.record_finished(true);
//!
//! let snapshot = stats.snapshot();
//! assert_eq!(snapshot.completed, 1);
//! assert_eq!(snapshot.in_flight, 0);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters for one lane.
#[derive(Debug, Default)]
pub struct LaneStats {
    /// Upper bound of the lane, in bytes.
    max_bytes: u64,
    /// Tasks handed to the lane's queue.
    submitted: AtomicU64,
    /// Tasks that produced a value.
    completed: AtomicU64,
    /// Tasks whose dispatcher call returned an error.
    failed: AtomicU64,
    /// Tasks submitted but not yet finished.
    in_flight: AtomicU64,
}

impl LaneStats {
    /// Creates zeroed counters for a lane bounded by `max_bytes`.
    #[inline]
    #[must_use]
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            ..Self::default()
        }
    }

    /// Records a task entering the lane.
    #[inline]
    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a task leaving the lane.
    #[inline]
    pub fn record_finished(&self, ok: bool) {
        if ok {
            self.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        // Saturating: a reset between submit and finish must not wrap.
        let _ = self
            .in_flight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)));
    }

    /// Returns a point-in-time snapshot of the counters.
    #[must_use]
    pub fn snapshot(&self) -> LaneSnapshot {
        LaneSnapshot {
            max_bytes: self.max_bytes,
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
        }
    }

    /// Resets every counter except the bound.
    pub fn reset(&self) {
        self.submitted.store(0, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.in_flight.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time copy of one lane's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneSnapshot {
    /// Upper bound of the lane, in bytes.
    pub max_bytes: u64,
    /// Tasks handed to the lane's queue.
    pub submitted: u64,
    /// Tasks that produced a value.
    pub completed: u64,
    /// Tasks that failed.
    pub failed: u64,
    /// Tasks submitted but not yet finished.
    pub in_flight: u64,
}

impl LaneSnapshot {
    /// Returns the number of finished tasks, successful or not.
    #[inline]
    #[must_use]
    pub const fn finished(&self) -> u64 {
        self.completed + self.failed
    }
}
