//! Size-bucketed worker lanes for collection files.
//!
//! Parsing a 50 MB request body should not delay a 2 KB one. The
//! [`LaneRouter`] keeps an ascending table of byte bounds, each served by
//! its own [`TaskQueue`], and sends every [`ParseTask`] to the first lane
//! whose bound fits the payload (or the last lane when none does).
//!
//! # Overview
//!
//! - [`LaneRouter`]: lane table, routing and submission
//! - [`TaskQueue`]: where a lane runs work; [`RayonQueue`] gives each lane a
//!   dedicated rayon pool, [`InlineQueue`] runs on the caller
//! - [`ParseTask`]: a parse or stringify payload plus its routing size
//! - [`LaneStats`]: per-lane atomic counters
//!
//! # Example
//!
//! ```
//! use cs_core::LaneConfig;
//! use cs_format::{DocumentKind, FormatChoice};
//! use cs_lanes::{LaneRouter, ParseMode, ParseTask};
//!
//! let router = LaneRouter::with_rayon(&LaneConfig::default())?;
//! let (tx, rx) = std::sync::mpsc::channel();
//!
//! let task = ParseTask::parse(
//!     "meta {\n  name: Ping\n}\n\nget {\n  url: http://localhost\n}\n",
//!     DocumentKind::Request,
//!     FormatChoice::Auto,
//!     ParseMode::Full,
//! );
//! router.submit(task, move |result| {
//!     let _ = tx.send(result.is_ok());
//! });
//!
//! assert_eq!(rx.recv().ok(), Some(true));
//! # Ok::<(), cs_lanes::LaneError>(())
//! ```

mod error;
mod queue;
mod router;
mod stats;
mod task;

pub use error::LaneError;
pub use queue::{InlineQueue, Job, RayonQueue, TaskQueue};
pub use router::{Lane, LaneRouter};
pub use stats::{LaneSnapshot, LaneStats};
pub use task::{ParseMode, ParseTask, TaskOutput, TaskPayload};
