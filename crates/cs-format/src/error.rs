//! Error types for the cs-format crate.
//!
//! This module provides the [`FormatError`] type for errors that can occur
//! while detecting, parsing, or stringifying a dialect document.

/// Errors that can occur while parsing or stringifying a document.
///
/// Content errors describe a malformed file and are expected at runtime: the
/// watcher reports them and moves on. [`FormatError::UnsupportedFormat`] is a
/// programmer error: the caller asked for a format that cannot be produced.
///
/// # Examples
///
/// ```
/// use cs_format::FormatError;
///
/// let err = FormatError::syntax(3, "expected 'key: value'");
/// assert!(err.is_content_error());
/// assert_eq!(err.to_string(), "syntax error at line 3: expected 'key: value'");
///
/// let err = FormatError::UnsupportedFormat("auto".to_owned());
/// assert!(err.is_programmer_error());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// The primary dialect could not be tokenized.
    #[error("syntax error at line {line}: {message}")]
    Syntax {
        /// One-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// A YAML dialect document is malformed.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// A JSON document is malformed.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A field holds a value that has no canonical meaning.
    #[error("invalid value for '{field}': {message}")]
    InvalidValue {
        /// Dialect field name.
        field: String,
        /// What went wrong.
        message: String,
    },

    /// The requested format cannot be used for this operation.
    #[error("unsupported format '{0}'")]
    UnsupportedFormat(String),
}

impl FormatError {
    /// Creates a [`FormatError::Syntax`] error.
    #[must_use]
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }

    /// Creates a [`FormatError::InvalidValue`] error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if the error describes malformed content.
    #[must_use]
    pub const fn is_content_error(&self) -> bool {
        !self.is_programmer_error()
    }

    /// Returns `true` if the caller misused the API.
    #[must_use]
    pub const fn is_programmer_error(&self) -> bool {
        matches!(self, Self::UnsupportedFormat(_))
    }
}
