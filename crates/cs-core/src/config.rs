//! Configuration structures for colsync.
//!
//! This module provides configuration types for the engine components:
//!
//! - [`WatchConfig`] - Collection watcher settings (debouncing, polling, hydration thresholds)
//! - [`LaneConfig`] - Lane router settings (bucket bounds, threads per lane)
//! - [`SyncConfig`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] and deserialize with
//! `#[serde(default)]`, so a config file only needs the keys it overrides.

use std::time::Duration;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Number of bytes in one lane megabyte.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Configuration for the collection watcher.
///
/// Controls how file changes are detected and how request files are hydrated.
///
/// # Examples
///
/// ```
/// use cs_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.debounce_ms, 80);
/// assert!(config.recursive);
/// assert!(!config.use_polling);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Debounce window in milliseconds.
    ///
    /// Multiple changes to a path within this window are reported once.
    pub debounce_ms: u64,

    /// Whether to watch subdirectories recursively.
    pub recursive: bool,

    /// Start with the polling backend instead of native notifications.
    pub use_polling: bool,

    /// Poll interval for the polling backend, in milliseconds.
    pub poll_interval_ms: u64,

    /// Files at or above this size get the reduced parse.
    pub large_file_threshold_bytes: u64,

    /// Files below this size are parsed inline instead of on a lane.
    pub inline_parse_max_bytes: u64,

    /// Text leaves larger than this are redacted by the reduced parse.
    pub max_leaf_bytes: usize,

    /// Interval between `watcher-stats` notifications, in milliseconds.
    /// Zero disables periodic stats.
    pub stats_interval_ms: u64,

    /// Capacity of each collection's event channel.
    pub channel_capacity: usize,
}

impl WatchConfig {
    /// Returns the debounce window as a [`Duration`].
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Returns the polling interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Checks option values that would make the watcher misbehave.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] for a zero debounce window,
    /// poll interval, or channel capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::invalid_option("debounce_ms", "must be positive"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::invalid_option(
                "poll_interval_ms",
                "must be positive",
            ));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::invalid_option(
                "channel_capacity",
                "must be positive",
            ));
        }
        if self.max_leaf_bytes == 0 {
            return Err(ConfigError::invalid_option(
                "max_leaf_bytes",
                "must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 80,
            recursive: true,
            use_polling: false,
            poll_interval_ms: 1000,
            large_file_threshold_bytes: 5 * BYTES_PER_MB,
            inline_parse_max_bytes: 64 * 1024,
            max_leaf_bytes: 256 * 1024,
            stats_interval_ms: 1000,
            channel_capacity: 256,
        }
    }
}

/// Configuration for the lane router.
///
/// Each bound is the inclusive upper size of a lane, in megabytes of
/// [`BYTES_PER_MB`] bytes. Bounds must be positive and strictly ascending.
///
/// # Examples
///
/// ```
/// use cs_core::LaneConfig;
///
/// let config = LaneConfig::default();
/// assert_eq!(config.bounds_mb, vec![0.005, 0.1, 1.0, 10.0, 100.0]);
/// assert_eq!(config.bounds_bytes().unwrap()[1], 104_857);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfig {
    /// Upper bounds of each lane, in MB, ascending.
    pub bounds_mb: Vec<f64>,

    /// Worker threads in each lane's pool.
    pub threads_per_lane: usize,
}

impl LaneConfig {
    /// Converts the configured bounds to bytes, validating them on the way.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLaneBounds`] if the list is empty, or a
    /// bound is not finite, not positive, or not strictly ascending.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn bounds_bytes(&self) -> Result<Vec<u64>, ConfigError> {
        if self.bounds_mb.is_empty() {
            return Err(ConfigError::InvalidLaneBounds(
                "at least one lane is required".to_owned(),
            ));
        }

        let mut bytes = Vec::with_capacity(self.bounds_mb.len());
        for &mb in &self.bounds_mb {
            if !mb.is_finite() || mb <= 0.0 {
                return Err(ConfigError::InvalidLaneBounds(format!(
                    "bound {mb} MB must be a positive number"
                )));
            }
            let value = (mb * BYTES_PER_MB as f64) as u64;
            if value == 0 {
                return Err(ConfigError::InvalidLaneBounds(format!(
                    "bound {mb} MB rounds to zero bytes"
                )));
            }
            if bytes.last().is_some_and(|&prev| prev >= value) {
                return Err(ConfigError::InvalidLaneBounds(format!(
                    "bound {mb} MB is not above the previous lane"
                )));
            }
            bytes.push(value);
        }
        Ok(bytes)
    }

    /// Checks the lane table and thread count.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bounds_bytes()?;
        if self.threads_per_lane == 0 {
            return Err(ConfigError::invalid_option(
                "threads_per_lane",
                "must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            bounds_mb: vec![0.005, 0.1, 1.0, 10.0, 100.0],
            threads_per_lane: 1,
        }
    }
}

/// Root configuration for colsync.
///
/// Combines all component configurations into a single structure that can be
/// loaded from a JSON file or constructed programmatically.
///
/// # Examples
///
/// ```
/// use cs_core::SyncConfig;
///
/// let config = SyncConfig::default();
/// assert!(config.validate().is_ok());
///
/// let json = serde_json::to_string_pretty(&config).unwrap();
/// assert!(json.contains("bounds_mb"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Collection watcher configuration.
    pub watch: WatchConfig,

    /// Lane router configuration.
    pub lanes: LaneConfig,
}

impl SyncConfig {
    /// Loads and validates a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it is not valid JSON for this structure, or
    /// a validation error.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every component configuration.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.watch.validate()?;
        self.lanes.validate()
    }
}
