//! Block lexer and writer for the primary dialect.
//!
//! A document is a sequence of top-level blocks:
//!
//! ```text
//! tag {            dictionary: `key: value` lines, `~key` disables
//!   key: value
//! }
//!
//! docs {           text: content indented by two spaces
//!   # Title
//! }
//!
//! vars:secret [    list: comma or newline separated names
//!   token,
//!   ~apiKey
//! ]
//! ```

use crate::{redaction_marker, FormatError};

/// Tags whose body is free text.
const TEXT_TAGS: &[&str] = &[
    "body",
    "body:json",
    "body:text",
    "body:xml",
    "body:sparql",
    "body:graphql",
    "body:graphql:vars",
    "script:pre-request",
    "script:post-response",
    "tests",
    "docs",
];

/// Tags whose body is a dictionary.
const DICT_TAGS: &[&str] = &[
    "meta",
    "get",
    "post",
    "put",
    "delete",
    "patch",
    "options",
    "head",
    "connect",
    "trace",
    "params:query",
    "params:path",
    "headers",
    "auth",
    "auth:basic",
    "auth:bearer",
    "auth:digest",
    "auth:apikey",
    "body:form-urlencoded",
    "body:multipart-form",
    "vars",
    "vars:pre-request",
    "vars:post-response",
    "assert",
    "settings",
];

/// A dictionary or list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry {
    pub key: String,
    pub value: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BlockBody {
    Dict(Vec<Entry>),
    Text(String),
    List(Vec<Entry>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Block {
    pub tag: String,
    pub line: usize,
    pub body: BlockBody,
}

/// Result of lexing a whole document.
#[derive(Debug, Default)]
pub(crate) struct Lexed {
    pub blocks: Vec<Block>,
    /// Set when at least one text block was replaced by a redaction marker.
    pub redacted: bool,
}

impl Lexed {
    pub fn find(&self, tag: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.tag == tag)
    }

    /// Entries of a dictionary block; empty when the block is absent.
    pub fn dict(&self, tag: &str) -> &[Entry] {
        match self.find(tag).map(|b| &b.body) {
            Some(BlockBody::Dict(entries)) => entries,
            _ => &[],
        }
    }

    /// Entries of a list block; empty when the block is absent.
    pub fn list(&self, tag: &str) -> &[Entry] {
        match self.find(tag).map(|b| &b.body) {
            Some(BlockBody::List(entries)) => entries,
            _ => &[],
        }
    }

    pub fn text(&self, tag: &str) -> Option<&str> {
        match self.find(tag).map(|b| &b.body) {
            Some(BlockBody::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Value of `key` in a dictionary block.
    pub fn value(&self, tag: &str, key: &str) -> Option<&str> {
        self.dict(tag)
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    /// Line of the block, for error reporting.
    pub fn line_of(&self, tag: &str) -> usize {
        self.find(tag).map_or(0, |b| b.line)
    }
}

/// Lexes a primary dialect document.
///
/// With `max_text_bytes` set, text blocks larger than the limit are never
/// materialized: their body becomes a redaction marker and
/// [`Lexed::redacted`] is set.
pub(crate) fn lex(content: &str, max_text_bytes: Option<usize>) -> Result<Lexed, FormatError> {
    let mut lexed = Lexed::default();
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.strip_suffix('\r').unwrap_or(line)));

    while let Some((number, raw)) = lines.next() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(tag) = line.strip_suffix('{') {
            let tag = tag.trim();
            if tag.is_empty() {
                return Err(FormatError::syntax(number, "block without a tag"));
            }
            let body = if DICT_TAGS.contains(&tag) {
                BlockBody::Dict(read_dict(&mut lines, tag, number)?)
            } else {
                // Unknown tags are kept as text so their content can't break lexing.
                let (text, redacted) = read_text(&mut lines, tag, number, max_text_bytes)?;
                if !TEXT_TAGS.contains(&tag) {
                    continue;
                }
                lexed.redacted |= redacted;
                BlockBody::Text(text)
            };
            lexed.blocks.push(Block {
                tag: tag.to_owned(),
                line: number,
                body,
            });
        } else if let Some(tag) = line.strip_suffix('[') {
            let tag = tag.trim();
            let body = BlockBody::List(read_list(&mut lines, tag, number)?);
            lexed.blocks.push(Block {
                tag: tag.to_owned(),
                line: number,
                body,
            });
        } else {
            return Err(FormatError::syntax(
                number,
                format!("expected a block, found '{line}'"),
            ));
        }
    }

    Ok(lexed)
}

/// Reads the entries of the first `tag` dictionary block only.
///
/// Stops as soon as that block closes, so it stays cheap on large files.
pub(crate) fn lex_single_dict(content: &str, tag: &str) -> Result<Vec<Entry>, FormatError> {
    let opener = format!("{tag} {{");
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.strip_suffix('\r').unwrap_or(line)));

    while let Some((number, raw)) = lines.next() {
        if raw.trim() == opener && !raw.starts_with([' ', '\t']) {
            return read_dict(&mut lines, tag, number);
        }
    }
    Ok(Vec::new())
}

fn read_dict<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    tag: &str,
    open_line: usize,
) -> Result<Vec<Entry>, FormatError> {
    let mut entries = Vec::new();
    for (number, raw) in lines.by_ref() {
        let line = raw.trim();
        if line == "}" {
            return Ok(entries);
        }
        if line.is_empty() {
            continue;
        }
        entries.push(parse_dict_line(line, number)?);
    }
    Err(unterminated(tag, open_line))
}

fn parse_dict_line(line: &str, number: usize) -> Result<Entry, FormatError> {
    let (enabled, rest) = match line.strip_prefix('~') {
        Some(rest) => (false, rest),
        None => (true, line),
    };
    let Some((key, value)) = rest.split_once(':') else {
        return Err(FormatError::syntax(
            number,
            format!("expected 'key: value', found '{line}'"),
        ));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(FormatError::syntax(number, "entry without a key"));
    }
    Ok(Entry {
        key: key.to_owned(),
        value: value.trim().to_owned(),
        enabled,
    })
}

fn read_text<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    tag: &str,
    open_line: usize,
    max_bytes: Option<usize>,
) -> Result<(String, bool), FormatError> {
    let mut kept: Vec<&str> = Vec::new();
    let mut size = 0usize;
    let mut over = false;

    for (_, raw) in lines.by_ref() {
        if raw.trim_end() == "}" && !raw.starts_with([' ', '\t']) {
            if over {
                return Ok((redaction_marker(size), true));
            }
            return Ok((kept.join("\n"), false));
        }
        let line = raw.strip_prefix("  ").unwrap_or_else(|| raw.trim_start());
        size += line.len() + 1;
        if over {
            continue;
        }
        if max_bytes.is_some_and(|max| size > max) {
            over = true;
            kept = Vec::new();
        } else {
            kept.push(line);
        }
    }
    Err(unterminated(tag, open_line))
}

fn read_list<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    tag: &str,
    open_line: usize,
) -> Result<Vec<Entry>, FormatError> {
    let mut entries = Vec::new();
    for (_, raw) in lines.by_ref() {
        let line = raw.trim();
        if line == "]" {
            return Ok(entries);
        }
        for item in line.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (enabled, name) = match item.strip_prefix('~') {
                Some(name) => (false, name),
                None => (true, item),
            };
            entries.push(Entry {
                key: name.to_owned(),
                value: String::new(),
                enabled,
            });
        }
    }
    Err(unterminated(tag, open_line))
}

fn unterminated(tag: &str, line: usize) -> FormatError {
    FormatError::syntax(line, format!("unterminated block '{tag}'"))
}

/// Builds a primary dialect document block by block.
///
/// Entries the lexer could not read back unchanged are not written; the
/// first one is reported by [`Writer::finish`].
#[derive(Debug, Default)]
pub(crate) struct Writer {
    out: String,
    rejected: Option<FormatError>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&mut self, tag: &str, bracket: char) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        self.out.push_str(tag);
        self.out.push(' ');
        self.out.push(bracket);
        self.out.push('\n');
    }

    /// Writes a dictionary block. `(key, value, enabled)` triples.
    pub fn dict<'a>(&mut self, tag: &str, entries: impl IntoIterator<Item = (&'a str, &'a str, bool)>) {
        self.open(tag, '{');
        for (key, value, enabled) in entries {
            if let Some(problem) = dict_entry_problem(key, value) {
                self.reject(tag, key, problem);
                continue;
            }
            self.out.push_str("  ");
            if !enabled {
                self.out.push('~');
            }
            self.out.push_str(key);
            self.out.push(':');
            if !value.is_empty() {
                self.out.push(' ');
                self.out.push_str(value);
            }
            self.out.push('\n');
        }
        self.out.push_str("}\n");
    }

    /// Writes a dictionary block, skipping it when there are no entries.
    pub fn dict_if_any<'a>(
        &mut self,
        tag: &str,
        entries: impl IntoIterator<Item = (&'a str, &'a str, bool)>,
    ) {
        let mut entries = entries.into_iter().peekable();
        if entries.peek().is_some() {
            self.dict(tag, entries);
        }
    }

    pub fn text(&mut self, tag: &str, content: &str) {
        self.open(tag, '{');
        for line in content.split('\n') {
            if !line.is_empty() {
                self.out.push_str("  ");
                self.out.push_str(line);
            }
            self.out.push('\n');
        }
        self.out.push_str("}\n");
    }

    pub fn text_opt(&mut self, tag: &str, content: Option<&str>) {
        if let Some(content) = content {
            self.text(tag, content);
        }
    }

    pub fn list<'a>(&mut self, tag: &str, entries: impl IntoIterator<Item = (&'a str, bool)>) {
        self.open(tag, '[');
        let mut problems = Vec::new();
        let items: Vec<String> = entries
            .into_iter()
            .filter(|(name, _)| match list_item_problem(name) {
                Some(problem) => {
                    problems.push(((*name).to_owned(), problem));
                    false
                }
                None => true,
            })
            .map(|(name, enabled)| {
                if enabled {
                    format!("  {name}")
                } else {
                    format!("  ~{name}")
                }
            })
            .collect();
        self.out.push_str(&items.join(",\n"));
        if !items.is_empty() {
            self.out.push('\n');
        }
        self.out.push_str("]\n");
        for (name, problem) in problems {
            self.reject(tag, &name, problem);
        }
    }

    fn reject(&mut self, tag: &str, key: &str, problem: &str) {
        if self.rejected.is_none() {
            self.rejected = Some(FormatError::invalid_value(tag, format!("{problem}: '{key}'")));
        }
    }

    pub fn finish(self) -> Result<String, FormatError> {
        match self.rejected {
            Some(err) => Err(err),
            None => Ok(self.out),
        }
    }
}

/// Why `key: value` would not lex back to the same entry, if it would not.
fn dict_entry_problem(key: &str, value: &str) -> Option<&'static str> {
    if key.is_empty() {
        Some("empty key")
    } else if key.starts_with('~') {
        Some("key starts with '~'")
    } else if key.contains(':') {
        Some("key contains ':'")
    } else if key.contains(['\n', '\r']) || value.contains(['\n', '\r']) {
        Some("line break in entry")
    } else if key.trim() != key {
        Some("key has surrounding whitespace")
    } else if value.trim() != value {
        Some("value has surrounding whitespace")
    } else {
        None
    }
}

fn list_item_problem(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        Some("empty name")
    } else if name.starts_with('~') {
        Some("name starts with '~'")
    } else if name.contains([',', '\n', '\r']) || name == "]" {
        Some("name contains a list delimiter")
    } else if name.trim() != name {
        Some("name has surrounding whitespace")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_dictionary_and_disabled_entries() {
        let lexed = lex("headers {\n  accept: */*\n  ~x-debug: 1\n}\n", None).unwrap();
        let entries = lexed.dict("headers");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "accept");
        assert_eq!(entries[0].value, "*/*");
        assert!(entries[0].enabled);
        assert_eq!(entries[1].key, "x-debug");
        assert!(!entries[1].enabled);
    }

    #[test]
    fn test_value_keeps_colons() {
        let lexed = lex("get {\n  url: http://localhost:3000/a\n}\n", None).unwrap();
        assert_eq!(lexed.value("get", "url"), Some("http://localhost:3000/a"));
    }

    #[test]
    fn test_text_block_is_dedented() {
        let content = "body:json {\n  {\n    \"a\": 1\n  }\n}\n";
        let lexed = lex(content, None).unwrap();
        assert_eq!(lexed.text("body:json"), Some("{\n  \"a\": 1\n}"));
    }

    #[test]
    fn test_list_block() {
        let lexed = lex("vars:secret [\n  token,\n  ~apiKey\n]\n", None).unwrap();
        let entries = lexed.list("vars:secret");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].key, "apiKey");
        assert!(!entries[1].enabled);
    }

    #[test]
    fn test_unterminated_block_reports_opening_line() {
        let err = lex("meta {\n  name: a\n}\n\ndocs {\n  text\n", None).unwrap_err();
        assert!(matches!(
            &err,
            FormatError::Syntax { line: 5, message } if message.contains("docs")
        ));
    }

    #[test]
    fn test_dict_line_without_colon_is_error() {
        let err = lex("meta {\n  name\n}\n", None).unwrap_err();
        assert!(matches!(err, FormatError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_stray_line_is_error() {
        assert!(lex("hello world\n", None).is_err());
    }

    #[test]
    fn test_unknown_text_tags_are_skipped() {
        let lexed = lex("future:thing {\n  a: b: c\n  {{ anything }}\n}\n", None).unwrap();
        assert!(lexed.blocks.is_empty());
    }

    #[test]
    fn test_large_text_block_is_redacted() {
        let big = "x".repeat(100);
        let content = format!("docs {{\n  {big}\n}}\n\ntests {{\n  ok\n}}\n");
        let lexed = lex(&content, Some(10)).unwrap();
        assert!(lexed.redacted);
        assert_eq!(lexed.text("docs"), Some(redaction_marker(101).as_str()));
        assert_eq!(lexed.text("tests"), Some("ok"));
    }

    #[test]
    fn test_lex_single_dict_stops_at_block() {
        let entries = lex_single_dict("meta {\n  name: a\n  seq: 2\n}\n\ndocs {\n", "meta").unwrap();
        assert_eq!(entries.len(), 2);
        assert!(lex_single_dict("get {\n}\n", "meta").unwrap().is_empty());
    }

    #[test]
    fn test_writer_roundtrips_through_lexer() {
        let mut writer = Writer::new();
        writer.dict("headers", [("a", "1", true), ("b", "", false)]);
        writer.text("docs", "line one\n\n  indented");
        writer.list("vars:secret", [("token", true), ("key", false)]);
        let out = writer.finish().unwrap();

        let lexed = lex(&out, None).unwrap();
        assert_eq!(lexed.dict("headers")[1].value, "");
        assert!(!lexed.dict("headers")[1].enabled);
        assert_eq!(lexed.text("docs"), Some("line one\n\n  indented"));
        assert_eq!(lexed.list("vars:secret").len(), 2);
    }

    #[test]
    fn test_writer_rejects_entries_the_lexer_would_change() {
        for (key, value) in [
            ("", "v"),
            (":authority", "example.com"),
            ("~x", "1"),
            (" x", "1"),
            ("x", "  padded"),
            ("x", "two\nlines"),
        ] {
            let mut writer = Writer::new();
            writer.dict("headers", [(key, value, true)]);
            let err = writer.finish().unwrap_err();
            assert!(
                matches!(&err, FormatError::InvalidValue { field, .. } if field == "headers"),
                "{key:?}: {value:?} gave {err}"
            );
        }

        let mut writer = Writer::new();
        writer.list("vars:secret", [("a,b", true)]);
        assert!(writer.finish().is_err());
    }

    #[test]
    fn test_writer_keeps_colons_in_values() {
        let mut writer = Writer::new();
        writer.dict("get", [("url", "https://example.com:8080/a", true)]);
        let lexed = lex(&writer.finish().unwrap(), None).unwrap();
        assert_eq!(lexed.dict("get")[0].value, "https://example.com:8080/a");
    }
}
