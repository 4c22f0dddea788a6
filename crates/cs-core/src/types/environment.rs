//! Environments and `.env` files.

use serde::{Deserialize, Serialize};

/// A single environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVariable {
    /// Variable name.
    pub name: String,
    /// Variable value. Secret values are usually empty on disk.
    #[serde(default)]
    pub value: String,
    /// Whether the variable is active.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Whether the value is kept out of the file.
    #[serde(default)]
    pub secret: bool,
}

impl EnvVariable {
    /// Creates an enabled, non-secret variable.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            enabled: true,
            secret: false,
        }
    }
}

/// Canonical environment file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    /// Environment name; the file stem is used when the dialect has none.
    pub name: String,
    /// Variables in file order.
    pub variables: Vec<EnvVariable>,
}

/// Key/value pairs from a collection's `.env` file, in file order.
///
/// # Examples
///
/// ```
/// use cs_core::DotEnv;
///
/// let env = DotEnv::parse("# comment\nHOST=localhost\nexport TOKEN=\"a b\"\n");
/// assert_eq!(env.get("HOST"), Some("localhost"));
/// assert_eq!(env.get("TOKEN"), Some("a b"));
/// assert_eq!(env.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DotEnv(pub Vec<(String, String)>);

impl DotEnv {
    /// Parses `.env` content.
    ///
    /// Blank lines, `#` comments, and lines without `=` are skipped. An
    /// optional `export ` prefix is stripped. Values wrapped in matching
    /// single or double quotes are unquoted; double-quoted values also
    /// unescape `\n` and `\"`. A later duplicate key replaces the earlier
    /// value in place.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut pairs: Vec<(String, String)> = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            let value = unquote(value.trim());

            if let Some(slot) = pairs.iter_mut().find(|(k, _)| k == key) {
                slot.1 = value;
            } else {
                pairs.push((key.to_owned(), value));
            }
        }

        Self(pairs)
    }

    /// Returns the value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn unquote(value: &str) -> String {
    if value.len() >= 2 {
        if let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
            return inner.replace("\\n", "\n").replace("\\\"", "\"");
        }
        if let Some(inner) = value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
            return inner.to_owned();
        }
    }
    // Unquoted values end at an inline comment.
    match value.find(" #") {
        Some(idx) => value[..idx].trim_end().to_owned(),
        None => value.to_owned(),
    }
}

const fn default_true() -> bool {
    true
}
