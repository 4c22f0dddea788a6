//! Collection watcher with progressive loading and a per-collection
//! loading-state machine.
//!
//! This crate watches collection directories through `notify` (debounced
//! with `notify-debouncer-mini`), keeps an in-memory tree per collection, and
//! reports everything as [`Notification`]s to a [`Sink`].
//!
//! # Overview
//!
//! - [`WatcherRegistry`]: start/stop watches, loading-state calls, saves
//! - [`LoadingState`]: discovering, then processing, then idle; exactly one
//!   `loading-state-changed(false)` per watch
//! - [`classify`]: what a path means inside a collection
//! - [`WatchBackend`]: native or polling notifications; injectable
//! - [`Sink`]: where notifications go ([`ChannelSink`], [`TracingSink`],
//!   [`MemorySink`])
//!
//! Requests are hydrated progressively: a `partial` node with metadata,
//! then a `loading` node, then the complete one. Files at or above
//! `large_file_threshold_bytes` get a reduced parse instead and are flagged
//! `redacted`. When a [`cs_lanes::LaneRouter`] is attached, parses at or
//! above `inline_parse_max_bytes` run on its size-bucketed lanes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  commands   ┌────────────────────────────────────┐
//! │ Watcher      │ ──────────► │ collection actor (one tokio task)  │
//! │ Registry     │ ◄────────── │  LoadingState + CollectionTree     │
//! └──────────────┘  snapshots  │                                    │
//!                              │  ◄── BackendEvent (notify threads) │
//!                              │  ◄── lane results (rayon pools)    │
//!                              └─────────────────┬──────────────────┘
//!                                                │ Notification
//!                                                ▼
//!                                             Sink
//! ```
//!
//! # Crate Dependencies
//!
//! ```text
//! cs-cli ──► cs-watcher ──► cs-lanes ──► cs-format ──► cs-core
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use camino::Utf8Path;
//! use cs_core::WatchConfig;
//! use cs_watcher::{ChannelSink, Notification, WatcherRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (sink, mut notifications) = ChannelSink::new();
//!     let registry = WatcherRegistry::new(WatchConfig::default(), Arc::new(sink));
//!
//!     registry
//!         .start_watch(Utf8Path::new("./collections/petstore"), "petstore", &[])
//!         .await?;
//!
//!     while let Some(notification) = notifications.recv().await {
//!         if let Notification::LoadingStateChanged { is_loading: false, .. } = notification {
//!             println!("petstore loaded");
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! Per-file failures never stop a watch: they become `parsing-error`
//! notifications and error nodes. Watch-level failures are reported through
//! lifecycle events. Running out of OS watch handles restarts the watch
//! once on the polling backend; anything else marks it degraded.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod backend;
pub mod classify;
pub mod error;
pub mod events;
pub mod filter;
pub mod loading;
pub mod registry;
pub mod sink;
pub mod stats;
pub mod tree;

mod collection;
mod walk;

// Re-export error types
pub use error::WatchError;

// Re-export event types
pub use events::{
    CollectionId, FileOperationKind, LifecycleKind, NodeData, NodeMeta, Notification, TreeEventKind, TreeNode,
};

// Re-export filter types
pub use filter::{
    AcceptAllFilter, CompositeFilter, FileFilter, IgnoreFilter, TempFileFilter, DEFAULT_IGNORES, SAVE_TEMP_SUFFIX,
};

pub use backend::{BackendEvent, BackendRequest, BackendWatch, NotifyBackend, PathBatch, Strategy, WatchBackend};
pub use classify::{classify, format_choice, is_environments_dir, PathClass};
pub use loading::{LoadingPhase, LoadingState};
pub use registry::WatcherRegistry;
pub use sink::{ChannelSink, MemorySink, Sink, TracingSink};
pub use stats::{WatchStats, WatchStatsSnapshot};
pub use tree::{PhaseName, RequestState, SnapshotFolder, SnapshotItem, SnapshotRequest, TreeSnapshot};
