//! Core types, configuration, and errors for the colsync workspace.
//!
//! This crate provides the foundational types shared by every other crate:
//!
//! - The canonical in-memory shape all dialects parse into
//!   ([`RequestFile`], [`FolderRoot`], [`Environment`], [`CollectionConfig`])
//! - Configuration structures ([`SyncConfig`], [`WatchConfig`], [`LaneConfig`])
//! - The path to identifier cache ([`UidCache`]) that keeps item ids stable
//! - [`ConfigError`] for configuration loading and validation
//!
//! # Crate Dependencies
//!
//! ```text
//! cs-cli ──► cs-watcher ──► cs-lanes ──► cs-format ──► cs-core
//!                      └──────────────────────────────►
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;
pub mod uid;

pub use config::{LaneConfig, SyncConfig, WatchConfig, BYTES_PER_MB};
pub use error::ConfigError;
pub use types::{
    ApiKeyPlacement, Auth, AuthMode, Body, BodyMode, CollectionConfig, DotEnv, EnvVariable,
    Environment, FolderMeta, FolderRequest, FolderRoot, GraphqlBody, HttpMethod, ItemKind,
    KeyValue, MultipartField, MultipartKind, Param, ParamKind, Request, RequestFile, RequestMeta,
    Scripts, Vars,
};
pub use uid::{ItemUid, UidCache};

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;
