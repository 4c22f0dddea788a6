//! Error types for the cs-core crate.
//!
//! This module provides the [`ConfigError`] type for configuration-related errors
//! that can occur across the workspace.

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use cs_core::ConfigError;
///
/// let error = ConfigError::invalid_option("debounce_ms", "must be positive");
/// assert!(error.to_string().contains("debounce_ms"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// The lane table is empty or its bounds are not strictly ascending.
    #[error("invalid lane bounds: {0}")]
    InvalidLaneBounds(String),

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates an [`ConfigError::InvalidOption`] error.
    #[must_use]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_option_display() {
        let error = ConfigError::invalid_option("threads_per_lane", "must be positive");
        let msg = error.to_string();
        assert!(msg.contains("threads_per_lane"));
        assert!(msg.contains("must be positive"));
    }

    #[test]
    fn test_invalid_lane_bounds_display() {
        let error = ConfigError::InvalidLaneBounds("at least one lane is required".to_owned());
        assert!(error.to_string().contains("at least one lane"));
    }

    #[test]
    fn test_parse_error_from_json() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = ConfigError::from(err);
        assert!(error.to_string().starts_with("failed to parse configuration"));
    }
}
