//! Error types for the cs-lanes crate.
//!
//! Every [`LaneError`] is raised while building a router. Once a router
//! exists, task failures are reported through the task's completion
//! callback as [`cs_format::FormatError`] values instead.

use cs_core::ConfigError;

/// Errors that can occur while building a [`LaneRouter`](crate::LaneRouter).
#[derive(Debug, thiserror::Error)]
pub enum LaneError {
    /// The lane table has no entries.
    #[error("lane table is empty")]
    EmptyTable,

    /// A lane bound is zero bytes.
    #[error("lane {index} has a zero byte bound")]
    ZeroBound {
        /// Position of the offending lane.
        index: usize,
    },

    /// A lane bound is not strictly above the previous lane's bound.
    #[error("lane {index} bound {bound} is not above the previous bound {previous}")]
    NonAscendingBounds {
        /// Position of the offending lane.
        index: usize,
        /// The offending bound in bytes.
        bound: u64,
        /// Bound of the lane before it.
        previous: u64,
    },

    /// A lane's worker pool could not be started.
    #[error("failed to build pool for lane {lane}: {source}")]
    PoolBuild {
        /// Name of the lane whose pool failed.
        lane: String,
        /// The underlying rayon error.
        #[source]
        source: rayon::ThreadPoolBuildError,
    },

    /// The lane configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl LaneError {
    /// Creates a new [`LaneError::PoolBuild`] error.
    #[inline]
    pub fn pool_build(lane: impl Into<String>, source: rayon::ThreadPoolBuildError) -> Self {
        Self::PoolBuild {
            lane: lane.into(),
            source,
        }
    }

    /// Returns `true` if the lane table itself is malformed, as opposed to
    /// the environment refusing to start threads.
    #[inline]
    #[must_use]
    pub const fn is_table_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyTable | Self::ZeroBound { .. } | Self::NonAscendingBounds { .. } | Self::Config(_)
        )
    }
}
