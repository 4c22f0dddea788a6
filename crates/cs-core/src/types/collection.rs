//! The collection config file (`bruno.json`).

use serde::{Deserialize, Serialize};

/// Parsed `bruno.json`.
///
/// Keys without a field here are kept in [`CollectionConfig::extra`] and
/// written back unchanged.
///
/// # Examples
///
/// ```
/// use cs_core::CollectionConfig;
///
/// let config = CollectionConfig::from_json(
///     r#"{"version":"1","name":"api","type":"collection","scripts":{"flow":"sandwich"}}"#,
/// )
/// .unwrap();
/// assert_eq!(config.name, "api");
/// assert!(config.extra.contains_key("scripts"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Schema version.
    pub version: String,
    /// Collection name.
    pub name: String,
    /// Always `collection` in practice.
    #[serde(rename = "type")]
    pub kind: String,
    /// Root-relative paths excluded from the watch.
    pub ignore: Vec<String>,
    /// Every other key, verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CollectionConfig {
    /// Parses `bruno.json` content.
    ///
    /// # Errors
    ///
    /// Returns the [`serde_json::Error`] if the content is not a JSON object
    /// of the expected shape.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extra_keys_roundtrip() {
        let json = r#"{"version":"1","name":"n","type":"collection","ignore":["node_modules"],"presets":{"requestUrl":"x"}}"#;
        let config = CollectionConfig::from_json(json).unwrap();
        assert_eq!(config.ignore, vec!["node_modules"]);

        let back: serde_json::Value = serde_json::to_value(&config).unwrap();
        assert_eq!(back["presets"]["requestUrl"], "x");
        assert_eq!(back["type"], "collection");
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(CollectionConfig::from_json("{ nope").is_err());
        assert!(CollectionConfig::from_json("[1,2]").is_err());
    }
}
