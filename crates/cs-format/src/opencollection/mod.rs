//! The open-collection dialect.
//!
//! Requests:
//!
//! ```yaml
//! info:
//!   name: Create user
//!   type: http
//!   seq: 2
//! http:
//!   method: POST
//!   url: "{{host}}/users"
//!   headers:
//!     - name: x-trace
//!       value: "1"
//!       disabled: true
//!   body:
//!     type: json
//!     data: '{"name": "ada"}'
//!   auth: inherit
//! runtime:
//!   scripts:
//!     - type: before-request
//!       code: console.log(1)
//!   variables:
//!     - name: id
//!       value: "7"
//!       scope: request
//!   assertions:
//!     - expression: res.status
//!       value: eq 201
//! docs: Creates a user.
//! ```
//!
//! Only the active body is stored. Tests are a script with `type: tests`.

use cs_core::{
    ApiKeyPlacement, Auth, AuthMode, Body, BodyMode, Environment, FolderMeta, FolderRequest,
    FolderRoot, GraphqlBody, HttpMethod, ItemKind, KeyValue, MultipartField, MultipartKind, Param,
    ParamKind, Request, RequestFile, Scripts, Vars,
};
use serde::{Deserialize, Serialize};

use crate::yaml::{from_yaml, EnvVariableDoc, EnvironmentDoc};
use crate::FormatError;

/// Version written to new collection files.
const SPEC_VERSION: &str = "1.0.0";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct OcRequest {
    info: OcInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    http: Option<OcHttp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    graphql: Option<OcHttp>,
    #[serde(skip_serializing_if = "OcRuntime::is_empty")]
    runtime: OcRuntime,
    #[serde(skip_serializing_if = "Option::is_none")]
    docs: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct OcInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seq: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct OcHttp {
    method: HttpMethod,
    url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    params: Vec<OcParam>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    headers: Vec<OcPair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<OcBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth: Option<OcAuth>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct OcParam {
    name: String,
    value: String,
    #[serde(rename = "type")]
    kind: ParamKind,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    disabled: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct OcPair {
    name: String,
    value: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    disabled: bool,
}

impl From<&KeyValue> for OcPair {
    fn from(kv: &KeyValue) -> Self {
        Self {
            name: kv.name.clone(),
            value: kv.value.clone(),
            disabled: !kv.enabled,
        }
    }
}

impl From<OcPair> for KeyValue {
    fn from(pair: OcPair) -> Self {
        Self {
            name: pair.name,
            value: pair.value,
            enabled: !pair.disabled,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct OcBody {
    #[serde(rename = "type")]
    kind: String,
    data: OcBodyData,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum OcBodyData {
    Text(String),
    Fields(Vec<OcField>),
    Graphql(OcGraphql),
}

impl Default for OcBodyData {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct OcField {
    name: String,
    value: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    disabled: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct OcGraphql {
    query: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    variables: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum OcAuth {
    /// `inherit` or `none`.
    Keyword(String),
    Config(OcAuthConfig),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct OcAuthConfig {
    #[serde(rename = "type")]
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    placement: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct OcRuntime {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    scripts: Vec<OcScript>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    variables: Vec<OcVariable>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    assertions: Vec<OcAssertion>,
}

impl OcRuntime {
    fn is_empty(&self) -> bool {
        self.scripts.is_empty() && self.variables.is_empty() && self.assertions.is_empty()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct OcScript {
    #[serde(rename = "type")]
    kind: String,
    code: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct OcVariable {
    name: String,
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    disabled: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct OcAssertion {
    expression: String,
    value: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    disabled: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct OcFolder {
    #[serde(skip_serializing_if = "Option::is_none")]
    opencollection: Option<String>,
    info: OcInfo,
    request: OcFolderRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    docs: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct OcFolderRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    headers: Vec<OcPair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth: Option<OcAuth>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    scripts: Vec<OcScript>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    variables: Vec<OcVariable>,
}

const BEFORE_REQUEST: &str = "before-request";
const AFTER_RESPONSE: &str = "after-response";
const TESTS: &str = "tests";

fn body_type(mode: BodyMode) -> &'static str {
    match mode {
        BodyMode::FormUrlEncoded => "form-urlencoded",
        BodyMode::MultipartForm => "multipart-form",
        other => other.as_str(),
    }
}

fn auth_from_oc(auth: Option<OcAuth>, default: Auth) -> Result<Auth, FormatError> {
    let config = match auth {
        None => return Ok(default),
        Some(OcAuth::Keyword(word)) => {
            return match AuthMode::parse(&word) {
                Some(mode @ (AuthMode::Inherit | AuthMode::None)) => Ok(Auth::empty(mode)),
                _ => Err(FormatError::invalid_value(
                    "auth",
                    format!("'{word}' needs a configuration object"),
                )),
            };
        }
        Some(OcAuth::Config(config)) => config,
    };

    let mode = AuthMode::parse(&config.kind).ok_or_else(|| {
        FormatError::invalid_value("auth.type", format!("unknown auth type '{}'", config.kind))
    })?;
    let field = |v: Option<String>| v.unwrap_or_default();
    Ok(match mode {
        AuthMode::Inherit | AuthMode::None => Auth::empty(mode),
        AuthMode::Basic => Auth::Basic {
            username: field(config.username),
            password: field(config.password),
        },
        AuthMode::Digest => Auth::Digest {
            username: field(config.username),
            password: field(config.password),
        },
        AuthMode::Bearer => Auth::Bearer {
            token: field(config.token),
        },
        AuthMode::ApiKey => Auth::ApiKey {
            placement: ApiKeyPlacement::parse(config.placement.as_deref().unwrap_or_default()),
            key: field(config.key),
            value: field(config.value),
        },
    })
}

fn auth_to_oc(auth: &Auth) -> OcAuth {
    let mut config = OcAuthConfig {
        kind: auth.mode().as_str().to_owned(),
        ..OcAuthConfig::default()
    };
    match auth {
        Auth::Inherit | Auth::None => return OcAuth::Keyword(auth.mode().as_str().to_owned()),
        Auth::Basic { username, password } | Auth::Digest { username, password } => {
            config.username = Some(username.clone());
            config.password = Some(password.clone());
        }
        Auth::Bearer { token } => config.token = Some(token.clone()),
        Auth::ApiKey {
            key,
            value,
            placement,
        } => {
            config.key = Some(key.clone());
            config.value = Some(value.clone());
            config.placement = Some(placement.as_str().to_owned());
        }
    }
    OcAuth::Config(config)
}

fn body_from_oc(body: Option<OcBody>) -> Body {
    let Some(body) = body else {
        return Body::default();
    };
    let mode = BodyMode::parse(&body.kind);
    let mut out = Body {
        mode,
        ..Body::default()
    };
    match (mode, body.data) {
        (BodyMode::Graphql, OcBodyData::Graphql(g)) => {
            out.graphql = Some(GraphqlBody {
                query: g.query,
                variables: g.variables,
            });
        }
        (BodyMode::Graphql, OcBodyData::Text(query)) => {
            out.graphql = Some(GraphqlBody {
                query,
                variables: String::new(),
            });
        }
        (BodyMode::FormUrlEncoded, OcBodyData::Fields(fields)) => {
            out.form_url_encoded = fields
                .into_iter()
                .map(|f| KeyValue::new(f.name, f.value).with_enabled(!f.disabled))
                .collect();
        }
        (BodyMode::MultipartForm, OcBodyData::Fields(fields)) => {
            out.multipart_form = fields
                .into_iter()
                .map(|f| MultipartField {
                    kind: if f.kind.as_deref() == Some("file") {
                        MultipartKind::File
                    } else {
                        MultipartKind::Text
                    },
                    name: f.name,
                    value: f.value,
                    enabled: !f.disabled,
                })
                .collect();
        }
        (mode, OcBodyData::Text(text)) => out.set_raw(mode, text),
        // Data that does not fit the declared type carries nothing usable.
        _ => {}
    }
    out
}

fn body_to_oc(body: &Body) -> Option<OcBody> {
    let data = match body.mode {
        BodyMode::None => return None,
        BodyMode::Json | BodyMode::Text | BodyMode::Xml | BodyMode::Sparql => {
            OcBodyData::Text(body.raw(body.mode).unwrap_or_default().to_owned())
        }
        BodyMode::FormUrlEncoded => OcBodyData::Fields(
            body.form_url_encoded
                .iter()
                .map(|kv| OcField {
                    name: kv.name.clone(),
                    value: kv.value.clone(),
                    kind: None,
                    disabled: !kv.enabled,
                })
                .collect(),
        ),
        BodyMode::MultipartForm => OcBodyData::Fields(
            body.multipart_form
                .iter()
                .map(|f| OcField {
                    name: f.name.clone(),
                    value: f.value.clone(),
                    kind: Some(
                        match f.kind {
                            MultipartKind::Text => "text",
                            MultipartKind::File => "file",
                        }
                        .to_owned(),
                    ),
                    disabled: !f.enabled,
                })
                .collect(),
        ),
        BodyMode::Graphql => {
            let graphql = body.graphql.clone().unwrap_or_default();
            OcBodyData::Graphql(OcGraphql {
                query: graphql.query,
                variables: graphql.variables,
            })
        }
    };
    Some(OcBody {
        kind: body_type(body.mode).to_owned(),
        data,
    })
}

fn scripts_from_oc(scripts: Vec<OcScript>) -> (Scripts, Option<String>) {
    let mut out = Scripts::default();
    let mut tests = None;
    for script in scripts {
        match script.kind.as_str() {
            BEFORE_REQUEST => out.req = Some(script.code),
            AFTER_RESPONSE => out.res = Some(script.code),
            TESTS => tests = Some(script.code),
            _ => {}
        }
    }
    (out, tests)
}

fn scripts_to_oc(scripts: &Scripts, tests: Option<&str>) -> Vec<OcScript> {
    [
        (BEFORE_REQUEST, scripts.req.as_deref()),
        (AFTER_RESPONSE, scripts.res.as_deref()),
        (TESTS, tests),
    ]
    .into_iter()
    .filter_map(|(kind, code)| {
        code.map(|code| OcScript {
            kind: kind.to_owned(),
            code: code.to_owned(),
        })
    })
    .collect()
}

fn vars_from_oc(variables: Vec<OcVariable>) -> Vars {
    let mut vars = Vars::default();
    for v in variables {
        let kv = KeyValue::new(v.name, v.value).with_enabled(!v.disabled);
        if v.scope.as_deref() == Some("response") {
            vars.res.push(kv);
        } else {
            vars.req.push(kv);
        }
    }
    vars
}

fn vars_to_oc(vars: &Vars) -> Vec<OcVariable> {
    let req = vars.req.iter().map(|kv| (kv, "request"));
    let res = vars.res.iter().map(|kv| (kv, "response"));
    req.chain(res)
        .map(|(kv, scope)| OcVariable {
            name: kv.name.clone(),
            value: kv.value.clone(),
            scope: Some(scope.to_owned()),
            disabled: !kv.enabled,
        })
        .collect()
}

pub(crate) fn parse_request(content: &str) -> Result<RequestFile, FormatError> {
    let doc: OcRequest = from_yaml(content)?;
    let kind = if doc.graphql.is_some() {
        ItemKind::GraphqlRequest
    } else {
        doc.info
            .kind
            .as_deref()
            .map_or(ItemKind::HttpRequest, ItemKind::from_short)
    };
    let http = doc.graphql.or(doc.http).unwrap_or_default();
    let (script, tests) = scripts_from_oc(doc.runtime.scripts);

    Ok(RequestFile {
        kind,
        name: doc.info.name.unwrap_or_default(),
        seq: doc.info.seq,
        tags: doc.info.tags,
        request: Request {
            method: http.method,
            url: http.url,
            params: http
                .params
                .into_iter()
                .map(|p| Param {
                    name: p.name,
                    value: p.value,
                    kind: p.kind,
                    enabled: !p.disabled,
                })
                .collect(),
            headers: http.headers.into_iter().map(KeyValue::from).collect(),
            body: body_from_oc(http.body),
            auth: auth_from_oc(http.auth, Auth::Inherit)?,
            script,
            vars: vars_from_oc(doc.runtime.variables),
            assertions: doc
                .runtime
                .assertions
                .into_iter()
                .map(|a| KeyValue::new(a.expression, a.value).with_enabled(!a.disabled))
                .collect(),
            tests,
            docs: doc.docs,
        },
    })
}

pub(crate) fn stringify_request(file: &RequestFile) -> Result<String, FormatError> {
    let request = &file.request;
    let block = OcHttp {
        method: request.method,
        url: request.url.clone(),
        params: request
            .params
            .iter()
            .map(|p| OcParam {
                name: p.name.clone(),
                value: p.value.clone(),
                kind: p.kind,
                disabled: !p.enabled,
            })
            .collect(),
        headers: request.headers.iter().map(OcPair::from).collect(),
        body: body_to_oc(&request.body),
        auth: Some(auth_to_oc(&request.auth)),
    };
    let (http, graphql) = match file.kind {
        ItemKind::HttpRequest => (Some(block), None),
        ItemKind::GraphqlRequest => (None, Some(block)),
    };

    let doc = OcRequest {
        info: OcInfo {
            name: Some(file.name.clone()),
            kind: Some(file.kind.short_name().to_owned()),
            seq: file.seq,
            tags: file.tags.clone(),
        },
        http,
        graphql,
        runtime: OcRuntime {
            scripts: scripts_to_oc(&request.script, request.tests.as_deref()),
            variables: vars_to_oc(&request.vars),
            assertions: request
                .assertions
                .iter()
                .map(|kv| OcAssertion {
                    expression: kv.name.clone(),
                    value: kv.value.clone(),
                    disabled: !kv.enabled,
                })
                .collect(),
        },
        docs: request.docs.clone(),
    };
    Ok(serde_yaml_ng::to_string(&doc)?)
}

pub(crate) fn parse_folder(content: &str, default_auth: Auth) -> Result<FolderRoot, FormatError> {
    let doc: OcFolder = from_yaml(content)?;
    let (script, tests) = scripts_from_oc(doc.request.scripts);
    Ok(FolderRoot {
        meta: FolderMeta {
            name: doc.info.name,
            seq: doc.info.seq,
        },
        request: FolderRequest {
            headers: doc.request.headers.into_iter().map(KeyValue::from).collect(),
            auth: auth_from_oc(doc.request.auth, default_auth)?,
            script,
            vars: vars_from_oc(doc.request.variables),
            tests,
        },
        docs: doc.docs,
    })
}

/// Stringifies a folder, or a collection root when `collection` is set.
pub(crate) fn stringify_folder(root: &FolderRoot, collection: bool) -> Result<String, FormatError> {
    let doc = OcFolder {
        opencollection: collection.then(|| SPEC_VERSION.to_owned()),
        info: OcInfo {
            name: root.meta.name.clone(),
            kind: Some(if collection { "collection" } else { "folder" }.to_owned()),
            seq: root.meta.seq,
            tags: Vec::new(),
        },
        request: OcFolderRequest {
            headers: root.request.headers.iter().map(OcPair::from).collect(),
            auth: Some(auth_to_oc(&root.request.auth)),
            scripts: scripts_to_oc(&root.request.script, root.request.tests.as_deref()),
            variables: vars_to_oc(&root.request.vars),
        },
        docs: root.docs.clone(),
    };
    Ok(serde_yaml_ng::to_string(&doc)?)
}

pub(crate) fn parse_environment(content: &str) -> Result<Environment, FormatError> {
    let doc: EnvironmentDoc = from_yaml(content)?;
    Ok(doc.into())
}

pub(crate) fn stringify_environment(environment: &Environment) -> Result<String, FormatError> {
    let doc = EnvironmentDoc {
        name: environment.name.clone(),
        variables: environment
            .variables
            .iter()
            .map(|v| EnvVariableDoc {
                name: v.name.clone(),
                value: if v.secret { String::new() } else { v.value.clone() },
                enabled: None,
                disabled: (!v.enabled).then_some(true),
                secret: v.secret,
            })
            .collect(),
    };
    Ok(serde_yaml_ng::to_string(&doc)?)
}
