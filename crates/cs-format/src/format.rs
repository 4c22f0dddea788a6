//! Dialect identifiers and per-call options.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::FormatError;

/// A concrete dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    /// The block-structured `.bru` dialect.
    Primary,
    /// The YAML variant (`meta:` + `http:`).
    Yaml,
    /// The open-collection YAML schema (`info:` + `http:`).
    OpenCollection,
}

impl Format {
    /// Returns the canonical name (`primary`, `yaml`, `open-collection`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Yaml => "yaml",
            Self::OpenCollection => "open-collection",
        }
    }

    /// Returns the file extension used for new files in this dialect.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Primary => "bru",
            Self::Yaml | Self::OpenCollection => "yml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" | "bru" => Ok(Self::Primary),
            "yaml" | "yml" => Ok(Self::Yaml),
            "open-collection" | "opencollection" => Ok(Self::OpenCollection),
            other => Err(FormatError::UnsupportedFormat(other.to_owned())),
        }
    }
}

/// A format request: a concrete dialect or detection.
///
/// # Examples
///
/// ```
/// use cs_format::{Format, FormatChoice};
///
/// assert_eq!("auto".parse::<FormatChoice>().unwrap(), FormatChoice::Auto);
/// assert_eq!(
///     "yml".parse::<FormatChoice>().unwrap(),
///     FormatChoice::Explicit(Format::Yaml)
/// );
/// assert!("toml".parse::<FormatChoice>().unwrap_err().is_programmer_error());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FormatChoice {
    /// Detect the dialect from the content.
    #[default]
    Auto,
    /// Use this dialect.
    Explicit(Format),
}

impl From<Format> for FormatChoice {
    fn from(format: Format) -> Self {
        Self::Explicit(format)
    }
}

impl fmt::Display for FormatChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Explicit(format) => format.fmt(f),
        }
    }
}

impl FromStr for FormatChoice {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            Ok(Self::Auto)
        } else {
            s.parse().map(Self::Explicit)
        }
    }
}

/// Options for the `parse_*` functions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Dialect of the content, or [`FormatChoice::Auto`] to detect it.
    pub format: FormatChoice,
}

impl ParseOptions {
    /// Options that parse with the given dialect.
    #[must_use]
    pub fn new(format: impl Into<FormatChoice>) -> Self {
        Self {
            format: format.into(),
        }
    }
}

/// Options for the `stringify_*` functions.
///
/// Stringifying needs a concrete dialect: [`FormatChoice::Auto`] is rejected
/// with [`FormatError::UnsupportedFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringifyOptions {
    /// Target dialect.
    pub format: FormatChoice,
}

impl StringifyOptions {
    /// Options that stringify to the given dialect.
    #[must_use]
    pub fn new(format: impl Into<FormatChoice>) -> Self {
        Self {
            format: format.into(),
        }
    }

    pub(crate) fn resolve(self) -> Result<Format, FormatError> {
        match self.format {
            FormatChoice::Explicit(format) => Ok(format),
            FormatChoice::Auto => Err(FormatError::UnsupportedFormat("auto".to_owned())),
        }
    }
}
