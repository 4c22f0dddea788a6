//! Format-independent entry points.
//!
//! Every function picks the dialect from its options (detecting it for
//! [`FormatChoice::Auto`] when parsing) and delegates to the dialect module.

use cs_core::{Auth, CollectionConfig, Environment, FolderRoot, RequestFile, RequestMeta};
use serde::Serialize;

use crate::{
    bru, detect_from_content, opencollection, yaml, Format, FormatChoice, FormatError,
    ParseOptions, StringifyOptions,
};

/// The kinds of document a dialect file can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    /// A request file.
    Request,
    /// A `folder.*` file.
    Folder,
    /// A `collection.*` / `opencollection.*` file.
    Collection,
    /// A file under `environments/`.
    Environment,
}

impl std::str::FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "request" => Ok(Self::Request),
            "folder" => Ok(Self::Folder),
            "collection" => Ok(Self::Collection),
            "environment" | "env" => Ok(Self::Environment),
            other => Err(format!("unknown document kind '{other}'")),
        }
    }
}

/// A parsed document of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Document {
    /// See [`DocumentKind::Request`].
    Request(RequestFile),
    /// See [`DocumentKind::Folder`].
    Folder(FolderRoot),
    /// See [`DocumentKind::Collection`].
    Collection(FolderRoot),
    /// See [`DocumentKind::Environment`].
    Environment(Environment),
}

impl Document {
    /// Returns the kind of this document.
    #[must_use]
    pub const fn kind(&self) -> DocumentKind {
        match self {
            Self::Request(_) => DocumentKind::Request,
            Self::Folder(_) => DocumentKind::Folder,
            Self::Collection(_) => DocumentKind::Collection,
            Self::Environment(_) => DocumentKind::Environment,
        }
    }
}

/// Outcome of [`parse_request_reduced`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducedRequest {
    /// The request, with oversized text leaves replaced by a marker.
    pub request: RequestFile,
    /// Whether any leaf was replaced.
    pub redacted: bool,
}

const REDACTED_PREFIX: &str = "[redacted: ";

/// Returns the marker that replaces a text leaf of `size` bytes.
///
/// # Examples
///
/// ```
/// assert_eq!(cs_format::redaction_marker(2048), "[redacted: 2048 bytes]");
/// ```
#[must_use]
pub fn redaction_marker(size: usize) -> String {
    format!("{REDACTED_PREFIX}{size} bytes]")
}

fn resolve(options: ParseOptions, content: &str) -> Format {
    match options.format {
        FormatChoice::Auto => detect_from_content(content),
        FormatChoice::Explicit(format) => format,
    }
}

/// Parses a request file.
///
/// # Errors
///
/// Returns a content error if the document is malformed in its dialect.
///
/// # Examples
///
/// ```
/// use cs_core::{Auth, HttpMethod};
/// use cs_format::{parse_request, ParseOptions};
///
/// let content = "meta {\n  name: Ping\n}\n\nget {\n  url: http://x/ping\n}\n";
/// let request = parse_request(content, ParseOptions::default())?;
/// assert_eq!(request.name, "Ping");
/// assert_eq!(request.request.method, HttpMethod::Get);
/// assert_eq!(request.request.auth, Auth::Inherit);
/// # Ok::<(), cs_format::FormatError>(())
/// ```
pub fn parse_request(content: &str, options: ParseOptions) -> Result<RequestFile, FormatError> {
    match resolve(options, content) {
        Format::Primary => bru::parse_request(content, None).map(|(file, _)| file),
        Format::Yaml => yaml::parse_request(content),
        Format::OpenCollection => opencollection::parse_request(content),
    }
}

/// Parses a large request file with bounded leaves.
///
/// Text leaves (bodies, scripts, tests, docs) longer than `max_leaf_bytes`
/// are replaced by [`redaction_marker`]. The primary dialect never
/// materializes such leaves, so its peak memory stays near the input size.
/// The YAML dialects parse the whole document first and redact afterwards:
/// the result is bounded, but peak memory during the parse is not.
///
/// # Errors
///
/// Returns a content error if the document is malformed in its dialect.
pub fn parse_request_reduced(
    content: &str,
    options: ParseOptions,
    max_leaf_bytes: usize,
) -> Result<ReducedRequest, FormatError> {
    match resolve(options, content) {
        Format::Primary => {
            let (request, redacted) = bru::parse_request(content, Some(max_leaf_bytes))?;
            Ok(ReducedRequest { request, redacted })
        }
        Format::Yaml => Ok(redact(yaml::parse_request(content)?, max_leaf_bytes)),
        Format::OpenCollection => Ok(redact(opencollection::parse_request(content)?, max_leaf_bytes)),
    }
}

fn redact(mut request: RequestFile, max: usize) -> ReducedRequest {
    let mut redacted = false;
    let mut cut = |leaf: &mut String| {
        if leaf.len() > max {
            *leaf = redaction_marker(leaf.len());
            redacted = true;
        }
    };

    let r = &mut request.request;
    for leaf in [
        &mut r.body.json,
        &mut r.body.text,
        &mut r.body.xml,
        &mut r.body.sparql,
        &mut r.script.req,
        &mut r.script.res,
        &mut r.tests,
        &mut r.docs,
    ]
    .into_iter()
    .flatten()
    {
        cut(leaf);
    }
    if let Some(graphql) = &mut r.body.graphql {
        cut(&mut graphql.query);
        cut(&mut graphql.variables);
    }

    ReducedRequest { request, redacted }
}

/// Extracts name, type and seq without parsing the whole request.
///
/// # Errors
///
/// Returns a content error if the metadata section itself is malformed.
pub fn extract_request_meta(content: &str, format: FormatChoice) -> Result<RequestMeta, FormatError> {
    match resolve(ParseOptions { format }, content) {
        Format::Primary => bru::extract_meta(content),
        Format::Yaml => yaml::extract_meta(content, "meta"),
        Format::OpenCollection => yaml::extract_meta(content, "info"),
    }
}

/// Parses a `folder.*` file. Auth defaults to [`Auth::Inherit`].
///
/// # Errors
///
/// Returns a content error if the document is malformed in its dialect.
pub fn parse_folder(content: &str, options: ParseOptions) -> Result<FolderRoot, FormatError> {
    parse_root(content, options, Auth::Inherit)
}

/// Parses a `collection.*` file. Auth defaults to [`Auth::None`].
///
/// # Errors
///
/// Returns a content error if the document is malformed in its dialect.
pub fn parse_collection(content: &str, options: ParseOptions) -> Result<FolderRoot, FormatError> {
    parse_root(content, options, Auth::None)
}

fn parse_root(content: &str, options: ParseOptions, default_auth: Auth) -> Result<FolderRoot, FormatError> {
    match resolve(options, content) {
        Format::Primary => bru::parse_folder(content, default_auth),
        Format::Yaml => yaml::parse_folder(content, default_auth),
        Format::OpenCollection => opencollection::parse_folder(content, default_auth),
    }
}

/// Parses an environment file.
///
/// # Errors
///
/// Returns a content error if the document is malformed in its dialect.
pub fn parse_environment(content: &str, options: ParseOptions) -> Result<Environment, FormatError> {
    match resolve(options, content) {
        Format::Primary => bru::parse_environment(content),
        Format::Yaml => yaml::parse_environment(content),
        Format::OpenCollection => opencollection::parse_environment(content),
    }
}

/// Parses `bruno.json`.
///
/// # Errors
///
/// Returns [`FormatError::Json`] for malformed JSON.
pub fn parse_collection_config(content: &str) -> Result<CollectionConfig, FormatError> {
    Ok(CollectionConfig::from_json(content)?)
}

/// Stringifies a request file.
///
/// # Errors
///
/// Returns [`FormatError::UnsupportedFormat`] for [`FormatChoice::Auto`],
/// or a serialization error. The primary dialect returns
/// [`FormatError::InvalidValue`] for entries it cannot write back unchanged,
/// such as an empty header name or one containing `:`.
///
/// # Examples
///
/// ```
/// use cs_core::RequestFile;
/// use cs_format::{stringify_request, Format, FormatChoice, StringifyOptions};
///
/// let file = RequestFile::new("Ping");
/// let yaml = stringify_request(&file, StringifyOptions::new(Format::Yaml))?;
/// assert!(yaml.starts_with("meta:"));
///
/// let err = stringify_request(&file, StringifyOptions::new(FormatChoice::Auto)).unwrap_err();
/// assert!(err.is_programmer_error());
/// # Ok::<(), cs_format::FormatError>(())
/// ```
pub fn stringify_request(file: &RequestFile, options: StringifyOptions) -> Result<String, FormatError> {
    match options.resolve()? {
        Format::Primary => bru::stringify_request(file),
        Format::Yaml => yaml::stringify_request(file),
        Format::OpenCollection => opencollection::stringify_request(file),
    }
}

/// Stringifies a folder root.
///
/// # Errors
///
/// Returns [`FormatError::UnsupportedFormat`] for [`FormatChoice::Auto`],
/// or a serialization error.
pub fn stringify_folder(root: &FolderRoot, options: StringifyOptions) -> Result<String, FormatError> {
    match options.resolve()? {
        Format::Primary => bru::stringify_folder(root),
        Format::Yaml => yaml::stringify_folder(root),
        Format::OpenCollection => opencollection::stringify_folder(root, false),
    }
}

/// Stringifies a collection root.
///
/// # Errors
///
/// Returns [`FormatError::UnsupportedFormat`] for [`FormatChoice::Auto`],
/// or a serialization error.
pub fn stringify_collection(root: &FolderRoot, options: StringifyOptions) -> Result<String, FormatError> {
    match options.resolve()? {
        Format::Primary => bru::stringify_folder(root),
        Format::Yaml => yaml::stringify_folder(root),
        Format::OpenCollection => opencollection::stringify_folder(root, true),
    }
}

/// Stringifies an environment. Secret values are never written.
///
/// # Errors
///
/// Returns [`FormatError::UnsupportedFormat`] for [`FormatChoice::Auto`],
/// or a serialization error.
pub fn stringify_environment(
    environment: &Environment,
    options: StringifyOptions,
) -> Result<String, FormatError> {
    match options.resolve()? {
        Format::Primary => bru::stringify_environment(environment),
        Format::Yaml => yaml::stringify_environment(environment),
        Format::OpenCollection => opencollection::stringify_environment(environment),
    }
}

/// Parses a document of the given kind.
///
/// # Errors
///
/// Returns a content error if the document is malformed in its dialect.
pub fn parse_document(kind: DocumentKind, content: &str, options: ParseOptions) -> Result<Document, FormatError> {
    Ok(match kind {
        DocumentKind::Request => Document::Request(parse_request(content, options)?),
        DocumentKind::Folder => Document::Folder(parse_folder(content, options)?),
        DocumentKind::Collection => Document::Collection(parse_collection(content, options)?),
        DocumentKind::Environment => Document::Environment(parse_environment(content, options)?),
    })
}

/// Stringifies a document of any kind.
///
/// # Errors
///
/// Returns [`FormatError::UnsupportedFormat`] for [`FormatChoice::Auto`],
/// or a serialization error.
pub fn stringify_document(document: &Document, options: StringifyOptions) -> Result<String, FormatError> {
    match document {
        Document::Request(file) => stringify_request(file, options),
        Document::Folder(root) => stringify_folder(root, options),
        Document::Collection(root) => stringify_collection(root, options),
        Document::Environment(env) => stringify_environment(env, options),
    }
}
