//! Dialect detection from content and file names.
//!
//! Detection never fails: anything that does not look like one of the YAML
//! dialects is treated as the primary dialect.

use crate::Format;

/// Guesses the dialect of `content`.
///
/// Rules, in order:
///
/// 1. open-collection: an `opencollection:` key; or `type: collection`
///    together with `items:`; or `info:` together with `http:`, `graphql:`,
///    `request:` or `items:`.
/// 2. yaml: `meta:` together with `http:` or `graphql:`; or a first
///    significant line shaped as a top-level YAML `key:`.
/// 3. primary otherwise, including empty input.
///
/// # Examples
///
/// ```
/// use cs_format::{detect_from_content, Format};
///
/// assert_eq!(detect_from_content(""), Format::Primary);
/// assert_eq!(detect_from_content("meta {\n  name: a\n}\n"), Format::Primary);
/// assert_eq!(detect_from_content("meta:\n  name: a\nhttp:\n  url: x\n"), Format::Yaml);
/// assert_eq!(detect_from_content("opencollection: 1.0.0\n"), Format::OpenCollection);
/// ```
#[must_use]
pub fn detect_from_content(content: &str) -> Format {
    if content.trim().is_empty() {
        return Format::Primary;
    }

    let keys: Vec<(&str, &str)> = top_level_keys(content).collect();
    let has = |key: &str| keys.iter().any(|(k, _)| *k == key);

    if has("opencollection")
        || (keys.iter().any(|(k, v)| *k == "type" && *v == "collection") && has("items"))
        || (has("info") && (has("http") || has("graphql") || has("request") || has("items")))
    {
        return Format::OpenCollection;
    }

    if has("meta") && (has("http") || has("graphql")) {
        return Format::Yaml;
    }

    let first = content
        .lines()
        .map(str::trim_end)
        .find(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'));
    if first.is_some_and(|line| split_key(line).is_some()) {
        return Format::Yaml;
    }

    Format::Primary
}

/// Guesses the dialect from a file name.
///
/// `.bru` is primary, `opencollection.yml|yaml` is open-collection, any
/// other `.yml|.yaml` is yaml, everything else is primary.
///
/// # Examples
///
/// ```
/// use cs_format::{detect_from_filename, Format};
///
/// assert_eq!(detect_from_filename("users.bru"), Format::Primary);
/// assert_eq!(detect_from_filename("opencollection.yml"), Format::OpenCollection);
/// assert_eq!(detect_from_filename("folder.yaml"), Format::Yaml);
/// assert_eq!(detect_from_filename("README.md"), Format::Primary);
/// ```
#[must_use]
pub fn detect_from_filename(name: &str) -> Format {
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let lower = name.to_ascii_lowercase();
    if lower == "opencollection.yml" || lower == "opencollection.yaml" {
        Format::OpenCollection
    } else if lower.ends_with(".yml") || lower.ends_with(".yaml") {
        Format::Yaml
    } else {
        Format::Primary
    }
}

/// Returns `true` if `name` has one of the dialect extensions.
#[must_use]
pub fn is_dialect_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".bru") || lower.ends_with(".yml") || lower.ends_with(".yaml")
}

/// Iterates `(key, value)` for every unindented `key:` line.
fn top_level_keys(content: &str) -> impl Iterator<Item = (&str, &str)> {
    content.lines().filter_map(split_key)
}

/// Splits a top-level YAML mapping line into key and trimmed value.
fn split_key(line: &str) -> Option<(&str, &str)> {
    if line.starts_with([' ', '\t', '#', '-']) {
        return None;
    }
    let (key, rest) = line.split_once(':')?;
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid || !(rest.is_empty() || rest.starts_with(' ')) {
        return None;
    }
    let value = rest.trim().trim_matches(|c| c == '"' || c == '\'');
    Some((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_whitespace_are_primary() {
        assert_eq!(detect_from_content(""), Format::Primary);
        assert_eq!(detect_from_content("  \n\n"), Format::Primary);
    }

    #[test]
    fn test_open_collection_markers() {
        assert_eq!(
            detect_from_content("opencollection: 1.0.0\ninfo:\n  name: c\n"),
            Format::OpenCollection
        );
        assert_eq!(
            detect_from_content("type: collection\nitems:\n  - a\n"),
            Format::OpenCollection
        );
        assert_eq!(
            detect_from_content("info:\n  name: r\nhttp:\n  method: GET\n"),
            Format::OpenCollection
        );
        assert_eq!(
            detect_from_content("info:\n  name: f\nrequest:\n  headers: []\n"),
            Format::OpenCollection
        );
    }

    #[test]
    fn test_type_collection_alone_is_yaml() {
        assert_eq!(detect_from_content("type: collection\n"), Format::Yaml);
    }

    #[test]
    fn test_yaml_markers() {
        assert_eq!(
            detect_from_content("meta:\n  name: a\ngraphql:\n  url: x\n"),
            Format::Yaml
        );
        assert_eq!(
            detect_from_content("# comment\nname: dev\nvariables: []\n"),
            Format::Yaml
        );
    }

    #[test]
    fn test_primary_blocks() {
        let bru = "meta {\n  name: a\n  type: http\n}\n\nget {\n  url: http://x\n}\n";
        assert_eq!(detect_from_content(bru), Format::Primary);
        assert_eq!(detect_from_content("docs {\n  # Title\n}\n"), Format::Primary);
    }

    #[test]
    fn test_url_line_is_not_a_key() {
        assert_eq!(detect_from_content("http://example.com\n"), Format::Primary);
    }

    #[test]
    fn test_detect_from_filename_paths() {
        assert_eq!(
            detect_from_filename("/c/OpenCollection.YAML"),
            Format::OpenCollection
        );
        assert_eq!(detect_from_filename("/c/env/dev.yml"), Format::Yaml);
        assert_eq!(detect_from_filename("/c/folder.bru"), Format::Primary);
    }

    #[test]
    fn test_is_dialect_file() {
        assert!(is_dialect_file("a.bru"));
        assert!(is_dialect_file("a.YML"));
        assert!(!is_dialect_file("bruno.json"));
    }
}
