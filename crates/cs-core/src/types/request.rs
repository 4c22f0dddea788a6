//! Request file types.
//!
//! [`RequestFile`] is the canonical shape of a single request on disk. The
//! optional parts default deterministically: a missing auth block means
//! [`Auth::Inherit`], a missing body means [`BodyMode::None`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// The kind of item a request file describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemKind {
    /// A plain HTTP request.
    #[default]
    HttpRequest,
    /// A GraphQL request sent over HTTP.
    GraphqlRequest,
}

impl ItemKind {
    /// Parses the short dialect spelling (`http` / `graphql`).
    ///
    /// Unknown spellings fall back to [`ItemKind::HttpRequest`].
    #[must_use]
    pub fn from_short(value: &str) -> Self {
        match value.trim() {
            "graphql" | "graphql-request" => Self::GraphqlRequest,
            _ => Self::HttpRequest,
        }
    }

    /// Returns the short dialect spelling (`http` / `graphql`).
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::HttpRequest => "http",
            Self::GraphqlRequest => "graphql",
        }
    }
}

/// HTTP request method.
///
/// Serializes uppercase; deserializes any casing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`
    #[default]
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `PATCH`
    Patch,
    /// `OPTIONS`
    Options,
    /// `HEAD`
    Head,
    /// `CONNECT`
    Connect,
    /// `TRACE`
    Trace,
}

impl HttpMethod {
    /// All methods, in the order the primary dialect lists them.
    pub const ALL: [Self; 9] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Delete,
        Self::Patch,
        Self::Options,
        Self::Head,
        Self::Connect,
        Self::Trace,
    ];

    /// Returns the lowercase spelling used as a block tag (`get`, `post`, ...).
    #[must_use]
    pub const fn as_lower(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
            Self::Patch => "patch",
            Self::Options => "options",
            Self::Head => "head",
            Self::Connect => "connect",
            Self::Trace => "trace",
        }
    }

    /// Returns the uppercase spelling (`GET`, `POST`, ...).
    #[must_use]
    pub const fn as_upper(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
            Self::Connect => "CONNECT",
            Self::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_upper())
    }
}

impl<'de> Deserialize<'de> for HttpMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_lower().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown HTTP method '{needle}'"))
    }
}

/// A named value that can be toggled off without being deleted.
///
/// Used for headers, form fields, variables, and assertions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    /// Entry name.
    pub name: String,
    /// Entry value, verbatim.
    pub value: String,
    /// Whether the entry is active.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl KeyValue {
    /// Creates an enabled entry.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            enabled: true,
        }
    }

    /// Returns the entry with `enabled` set to the given value.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Where a request parameter lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// `?name=value` in the query string.
    #[default]
    Query,
    /// `:name` segment in the URL path.
    Path,
}

/// A request parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Parameter value.
    pub value: String,
    /// Query or path parameter.
    #[serde(rename = "type", default)]
    pub kind: ParamKind,
    /// Whether the parameter is active.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Param {
    /// Creates an enabled parameter of the given kind.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind,
            enabled: true,
        }
    }
}

/// The active body encoding of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyMode {
    /// No body.
    #[default]
    None,
    /// Raw JSON text.
    Json,
    /// Raw plain text.
    Text,
    /// Raw XML text.
    Xml,
    /// Raw SPARQL query.
    Sparql,
    /// `application/x-www-form-urlencoded` fields.
    FormUrlEncoded,
    /// `multipart/form-data` fields.
    MultipartForm,
    /// GraphQL query plus variables.
    Graphql,
}

impl BodyMode {
    /// Returns the dialect spelling used in `body:` entries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Json => "json",
            Self::Text => "text",
            Self::Xml => "xml",
            Self::Sparql => "sparql",
            Self::FormUrlEncoded => "formUrlEncoded",
            Self::MultipartForm => "multipartForm",
            Self::Graphql => "graphql",
        }
    }

    /// Parses any of the dialect spellings of a body mode.
    ///
    /// Accepts both the camelCase and the kebab-case spellings
    /// (`formUrlEncoded`, `form-urlencoded`). Unknown values map to
    /// [`BodyMode::None`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "json" => Self::Json,
            "text" => Self::Text,
            "xml" => Self::Xml,
            "sparql" => Self::Sparql,
            "formUrlEncoded" | "form-urlencoded" => Self::FormUrlEncoded,
            "multipartForm" | "multipart-form" => Self::MultipartForm,
            "graphql" => Self::Graphql,
            _ => Self::None,
        }
    }
}

/// Kind of a multipart form field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultipartKind {
    /// Inline text value.
    #[default]
    Text,
    /// Path to a file to upload.
    File,
}

/// A `multipart/form-data` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipartField {
    /// Field name.
    pub name: String,
    /// Text value, or the file path for [`MultipartKind::File`].
    pub value: String,
    /// Text or file field.
    #[serde(rename = "type", default)]
    pub kind: MultipartKind,
    /// Whether the field is active.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// GraphQL body content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphqlBody {
    /// The query document.
    #[serde(default)]
    pub query: String,
    /// JSON-encoded variables.
    #[serde(default)]
    pub variables: String,
}

/// Request body.
///
/// The content of every mode is kept side by side so that switching the
/// active mode never discards what was typed for another one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Body {
    /// The active encoding.
    pub mode: BodyMode,
    /// JSON text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<String>,
    /// Plain text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// XML text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xml: Option<String>,
    /// SPARQL text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sparql: Option<String>,
    /// Url-encoded form fields.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub form_url_encoded: Vec<KeyValue>,
    /// Multipart form fields.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub multipart_form: Vec<MultipartField>,
    /// GraphQL query and variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graphql: Option<GraphqlBody>,
}

impl Body {
    /// Returns the raw text stored for a textual mode, if any.
    #[must_use]
    pub fn raw(&self, mode: BodyMode) -> Option<&str> {
        match mode {
            BodyMode::Json => self.json.as_deref(),
            BodyMode::Text => self.text.as_deref(),
            BodyMode::Xml => self.xml.as_deref(),
            BodyMode::Sparql => self.sparql.as_deref(),
            _ => None,
        }
    }

    /// Stores raw text for a textual mode. Non-textual modes are ignored.
    pub fn set_raw(&mut self, mode: BodyMode, content: String) {
        match mode {
            BodyMode::Json => self.json = Some(content),
            BodyMode::Text => self.text = Some(content),
            BodyMode::Xml => self.xml = Some(content),
            BodyMode::Sparql => self.sparql = Some(content),
            _ => {}
        }
    }
}

/// Placement of an API key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApiKeyPlacement {
    /// Sent as a header.
    #[default]
    Header,
    /// Sent as a query parameter.
    QueryParams,
}

impl ApiKeyPlacement {
    /// Returns the dialect spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::QueryParams => "queryparams",
        }
    }

    /// Parses the dialect spelling; anything unknown is a header.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "queryparams" | "query" => Self::QueryParams,
            _ => Self::Header,
        }
    }
}

/// Request authentication.
///
/// [`Auth::Inherit`] and [`Auth::None`] are distinct: inherit defers to the
/// enclosing folder or collection, none explicitly sends no credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Auth {
    /// Use the auth of the enclosing folder or collection.
    #[default]
    Inherit,
    /// Send no credentials.
    None,
    /// HTTP basic auth.
    Basic {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// Bearer token.
    Bearer {
        /// The token.
        token: String,
    },
    /// HTTP digest auth.
    Digest {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// API key sent in a header or query parameter.
    ApiKey {
        /// Key name.
        key: String,
        /// Key value.
        value: String,
        /// Where the key is sent.
        placement: ApiKeyPlacement,
    },
}

/// Discriminant of [`Auth`], used by dialects that store the mode separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// See [`Auth::Inherit`].
    Inherit,
    /// See [`Auth::None`].
    None,
    /// See [`Auth::Basic`].
    Basic,
    /// See [`Auth::Bearer`].
    Bearer,
    /// See [`Auth::Digest`].
    Digest,
    /// See [`Auth::ApiKey`].
    ApiKey,
}

impl AuthMode {
    /// Returns the dialect spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inherit => "inherit",
            Self::None => "none",
            Self::Basic => "basic",
            Self::Bearer => "bearer",
            Self::Digest => "digest",
            Self::ApiKey => "apikey",
        }
    }

    /// Parses the dialect spelling. Returns `None` for unknown modes.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inherit" => Some(Self::Inherit),
            "none" => Some(Self::None),
            "basic" => Some(Self::Basic),
            "bearer" => Some(Self::Bearer),
            "digest" => Some(Self::Digest),
            "apikey" | "api-key" => Some(Self::ApiKey),
            _ => None,
        }
    }
}

impl Auth {
    /// Returns the discriminant of this auth value.
    #[must_use]
    pub const fn mode(&self) -> AuthMode {
        match self {
            Self::Inherit => AuthMode::Inherit,
            Self::None => AuthMode::None,
            Self::Basic { .. } => AuthMode::Basic,
            Self::Bearer { .. } => AuthMode::Bearer,
            Self::Digest { .. } => AuthMode::Digest,
            Self::ApiKey { .. } => AuthMode::ApiKey,
        }
    }

    /// Returns an empty auth value of the given mode.
    #[must_use]
    pub fn empty(mode: AuthMode) -> Self {
        match mode {
            AuthMode::Inherit => Self::Inherit,
            AuthMode::None => Self::None,
            AuthMode::Basic => Self::Basic {
                username: String::new(),
                password: String::new(),
            },
            AuthMode::Bearer => Self::Bearer {
                token: String::new(),
            },
            AuthMode::Digest => Self::Digest {
                username: String::new(),
                password: String::new(),
            },
            AuthMode::ApiKey => Self::ApiKey {
                key: String::new(),
                value: String::new(),
                placement: ApiKeyPlacement::Header,
            },
        }
    }
}

/// Scripts run before the request and after the response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scripts {
    /// Pre-request script.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub req: Option<String>,
    /// Post-response script.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub res: Option<String>,
}

impl Scripts {
    /// Returns `true` if neither script is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.req.is_none() && self.res.is_none()
    }
}

/// Variables set before the request and after the response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vars {
    /// Pre-request variables.
    pub req: Vec<KeyValue>,
    /// Post-response variables.
    pub res: Vec<KeyValue>,
}

impl Vars {
    /// Returns `true` if there are no variables at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.req.is_empty() && self.res.is_empty()
    }
}

/// The request part of a [`RequestFile`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    /// HTTP method.
    pub method: HttpMethod,
    /// Target URL, verbatim (may contain `{{variables}}`).
    pub url: String,
    /// Query and path parameters.
    pub params: Vec<Param>,
    /// Request headers.
    pub headers: Vec<KeyValue>,
    /// Request body.
    pub body: Body,
    /// Authentication.
    pub auth: Auth,
    /// Pre-request and post-response scripts.
    pub script: Scripts,
    /// Pre-request and post-response variables.
    pub vars: Vars,
    /// Assertions, `name` is the expression and `value` the operator and operand.
    pub assertions: Vec<KeyValue>,
    /// Test script.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests: Option<String>,
    /// Markdown documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
}

/// Canonical request file.
///
/// # Examples
///
/// ```
/// use cs_core::{BodyMode, HttpMethod, ItemKind, RequestFile};
///
/// let file = RequestFile::new("List users");
/// assert_eq!(file.kind, ItemKind::HttpRequest);
/// assert_eq!(file.request.method, HttpMethod::Get);
/// assert_eq!(file.request.body.mode, BodyMode::None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestFile {
    /// HTTP or GraphQL request.
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Display name.
    pub name: String,
    /// Position among siblings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u32>,
    /// Free-form tags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// The request itself.
    pub request: Request,
}

impl RequestFile {
    /// Creates an empty HTTP request with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the cheap metadata of this request.
    #[must_use]
    pub fn meta(&self) -> RequestMeta {
        RequestMeta {
            name: self.name.clone(),
            kind: self.kind,
            seq: self.seq,
        }
    }
}

/// Cheaply extracted request metadata, used for partial records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
    /// Display name.
    pub name: String,
    /// HTTP or GraphQL request.
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Position among siblings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u32>,
}

const fn default_true() -> bool {
    true
}
