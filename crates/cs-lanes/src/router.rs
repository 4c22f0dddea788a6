//! Size-bucketed routing of tasks onto lanes.

use std::fmt;
use std::sync::Arc;

use cs_core::LaneConfig;
use cs_format::FormatError;

use crate::{LaneError, LaneSnapshot, LaneStats, ParseTask, RayonQueue, TaskOutput, TaskQueue};

/// One size bucket: an upper bound and the queue that serves it.
pub struct Lane {
    max_bytes: u64,
    queue: Arc<dyn TaskQueue>,
    stats: Arc<LaneStats>,
}

impl Lane {
    /// Upper bound of the lane in bytes.
    #[inline]
    #[must_use]
    pub const fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// The queue serving this lane.
    #[must_use]
    pub fn queue(&self) -> &Arc<dyn TaskQueue> {
        &self.queue
    }

    /// Current counters for this lane.
    #[must_use]
    pub fn snapshot(&self) -> LaneSnapshot {
        self.stats.snapshot()
    }
}

impl fmt::Debug for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lane")
            .field("max_bytes", &self.max_bytes)
            .field("queue", &self.queue.name())
            .finish_non_exhaustive()
    }
}

/// Routes each task to the first lane whose bound fits it.
///
/// Payloads larger than every bound go to the last lane. The table is fixed
/// at construction.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use cs_lanes::{InlineQueue, LaneRouter, TaskQueue};
///
/// let queue: Arc<dyn TaskQueue> = Arc::new(InlineQueue::new("inline"));
/// let router = LaneRouter::new(vec![
///     (1_000, Arc::clone(&queue)),
///     (10_000, Arc::clone(&queue)),
/// ])?;
///
/// assert_eq!(router.route_index(1_000), 0);
/// assert_eq!(router.route_index(1_001), 1);
/// assert_eq!(router.route_index(u64::MAX), 1);
/// # Ok::<(), cs_lanes::LaneError>(())
/// ```
#[derive(Debug)]
pub struct LaneRouter {
    lanes: Vec<Lane>,
}

impl LaneRouter {
    /// Builds a router from `(upper_bound_bytes, queue)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`LaneError::EmptyTable`], [`LaneError::ZeroBound`] or
    /// [`LaneError::NonAscendingBounds`] for a malformed table.
    pub fn new(table: Vec<(u64, Arc<dyn TaskQueue>)>) -> Result<Self, LaneError> {
        if table.is_empty() {
            return Err(LaneError::EmptyTable);
        }

        let mut lanes: Vec<Lane> = Vec::with_capacity(table.len());
        for (index, (max_bytes, queue)) in table.into_iter().enumerate() {
            if max_bytes == 0 {
                return Err(LaneError::ZeroBound { index });
            }
            if let Some(previous) = lanes.last().map(Lane::max_bytes) {
                if previous >= max_bytes {
                    return Err(LaneError::NonAscendingBounds {
                        index,
                        bound: max_bytes,
                        previous,
                    });
                }
            }
            lanes.push(Lane {
                max_bytes,
                queue,
                stats: Arc::new(LaneStats::new(max_bytes)),
            });
        }

        Ok(Self { lanes })
    }

    /// Builds a router with one [`RayonQueue`] per configured bound.
    ///
    /// # Errors
    ///
    /// Returns [`LaneError::Config`] for invalid bounds, or
    /// [`LaneError::PoolBuild`] if a pool cannot start.
    pub fn with_rayon(config: &LaneConfig) -> Result<Self, LaneError> {
        config.validate()?;
        let bounds = config.bounds_bytes()?;

        let mut table: Vec<(u64, Arc<dyn TaskQueue>)> = Vec::with_capacity(bounds.len());
        for (index, bound) in bounds.into_iter().enumerate() {
            let queue = RayonQueue::new(format!("lane{index}"), config.threads_per_lane)?;
            table.push((bound, Arc::new(queue)));
        }

        tracing::debug!(lanes = table.len(), threads = config.threads_per_lane, "Built lane router");
        Self::new(table)
    }

    /// Index of the lane that serves a payload of `size_bytes`.
    #[must_use]
    pub fn route_index(&self, size_bytes: u64) -> usize {
        let last = self.lanes.len().saturating_sub(1);
        self.lanes
            .iter()
            .position(|lane| lane.max_bytes >= size_bytes)
            .unwrap_or(last)
    }

    /// The lane that serves a payload of `size_bytes`.
    #[must_use]
    pub fn route(&self, size_bytes: u64) -> &Lane {
        &self.lanes[self.route_index(size_bytes)]
    }

    /// All lanes, ascending by bound.
    #[must_use]
    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    /// Submits `task` to its lane.
    ///
    /// `on_done` runs on the lane's worker with the dispatcher outcome.
    /// Returns the index of the chosen lane.
    pub fn submit<F>(&self, task: ParseTask, on_done: F) -> usize
    where
        F: FnOnce(Result<TaskOutput, FormatError>) + Send + 'static,
    {
        let index = self.route_index(task.size_bytes);
        let lane = &self.lanes[index];
        let stats = Arc::clone(&lane.stats);

        tracing::debug!(
            lane = index,
            queue = lane.queue.name(),
            size_bytes = task.size_bytes,
            script = task.script_identity(),
            label = task.label.as_deref().unwrap_or_default(),
            "Submitting lane task"
        );

        stats.record_submitted();
        lane.queue.enqueue(Box::new(move || {
            let result = task.run();
            stats.record_finished(result.is_ok());
            on_done(result);
        }));

        index
    }

    /// Counters for every lane, ascending by bound.
    #[must_use]
    pub fn stats(&self) -> Vec<LaneSnapshot> {
        self.lanes.iter().map(Lane::snapshot).collect()
    }
}
