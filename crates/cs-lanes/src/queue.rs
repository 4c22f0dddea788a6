//! Task queues that back each lane.
//!
//! A lane only needs somewhere to run a boxed closure. Hosts may inject
//! any [`TaskQueue`]; the crate ships [`RayonQueue`], which owns a dedicated
//! rayon pool, and [`InlineQueue`], which runs work on the calling thread.

use std::fmt;

use crate::LaneError;

/// A unit of work handed to a queue.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Somewhere a lane can run work.
///
/// Implementations must eventually run every enqueued job exactly once.
pub trait TaskQueue: Send + Sync {
    /// Schedules `job` to run.
    fn enqueue(&self, job: Job);

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// A queue backed by its own rayon thread pool.
///
/// Each lane gets a separate pool so that a burst of large payloads cannot
/// starve small ones.
pub struct RayonQueue {
    name: String,
    pool: rayon::ThreadPool,
}

impl RayonQueue {
    /// Builds a pool of `threads` workers named `<name>-<n>`.
    ///
    /// # Errors
    ///
    /// Returns [`LaneError::PoolBuild`] if the pool cannot be started.
    pub fn new(name: impl Into<String>, threads: usize) -> Result<Self, LaneError> {
        let name = name.into();
        let prefix = name.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(move |i| format!("{prefix}-{i}"))
            .build()
            .map_err(|e| LaneError::pool_build(name.as_str(), e))?;

        Ok(Self { name, pool })
    }

    /// Number of worker threads in the pool.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl TaskQueue for RayonQueue {
    fn enqueue(&self, job: Job) {
        self.pool.spawn(job);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for RayonQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RayonQueue")
            .field("name", &self.name)
            .field("threads", &self.threads())
            .finish()
    }
}

/// A queue that runs each job immediately on the submitting thread.
#[derive(Debug, Clone, Default)]
pub struct InlineQueue {
    name: String,
}

impl InlineQueue {
    /// Creates an inline queue with the given log name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TaskQueue for InlineQueue {
    fn enqueue(&self, job: Job) {
        job();
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_rayon_queue_runs_job() {
        let queue = RayonQueue::new("test-lane", 2).unwrap();
        assert_eq!(queue.threads(), 2);
        assert_eq!(queue.name(), "test-lane");

        let (tx, rx) = mpsc::channel();
        queue.enqueue(Box::new(move || {
            let name = std::thread::current().name().map(str::to_owned);
            tx.send(name).unwrap();
        }));

        let thread_name = rx.recv().unwrap().unwrap();
        assert!(thread_name.starts_with("test-lane-"));
    }

    #[test]
    fn test_rayon_queue_zero_threads_clamped() {
        let queue = RayonQueue::new("zero", 0).unwrap();
        assert_eq!(queue.threads(), 1);
    }

    #[test]
    fn test_inline_queue_runs_synchronously() {
        let queue = InlineQueue::new("inline");
        let (tx, rx) = mpsc::channel();
        queue.enqueue(Box::new(move || tx.send(7).unwrap()));
        assert_eq!(rx.try_recv().unwrap(), 7);
    }
}
