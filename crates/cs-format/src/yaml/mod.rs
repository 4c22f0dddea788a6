//! The YAML dialect.
//!
//! The document shapes mirror the canonical types closely, so most fields
//! reuse their serde representation directly:
//!
//! ```yaml
//! meta:
//!   name: List users
//!   type: http
//!   seq: 1
//! http:
//!   method: GET
//!   url: "{{host}}/users"
//!   headers:
//!     - name: accept
//!       value: application/json
//!   auth:
//!     mode: bearer
//!     token: "{{token}}"
//! script:
//!   req: console.log("hi")
//! ```

use cs_core::{
    Auth, Body, EnvVariable, Environment, FolderMeta, FolderRequest, FolderRoot, HttpMethod,
    ItemKind, KeyValue, Param, Request, RequestFile, RequestMeta, Scripts, Vars,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::FormatError;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct RequestDoc {
    meta: MetaDoc,
    #[serde(skip_serializing_if = "Option::is_none")]
    http: Option<HttpDoc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    graphql: Option<HttpDoc>,
    #[serde(skip_serializing_if = "Scripts::is_empty")]
    script: Scripts,
    #[serde(skip_serializing_if = "Vars::is_empty")]
    vars: Vars,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    assertions: Vec<KeyValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tests: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    docs: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct MetaDoc {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct HttpDoc {
    method: HttpMethod,
    url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    params: Vec<Param>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    headers: Vec<KeyValue>,
    body: Body,
    auth: Auth,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct FolderDoc {
    #[serde(skip_serializing_if = "is_empty_meta")]
    meta: FolderMeta,
    request: FolderRequestDoc,
    #[serde(skip_serializing_if = "Option::is_none")]
    docs: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct FolderRequestDoc {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    headers: Vec<KeyValue>,
    auth: Option<Auth>,
    #[serde(skip_serializing_if = "Scripts::is_empty")]
    script: Scripts,
    #[serde(skip_serializing_if = "Vars::is_empty")]
    vars: Vars,
    #[serde(skip_serializing_if = "Option::is_none")]
    tests: Option<String>,
}

/// Environment document shared by both YAML dialects.
///
/// Accepts `enabled: false` as well as `disabled: true`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct EnvironmentDoc {
    pub name: String,
    pub variables: Vec<EnvVariableDoc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct EnvVariableDoc {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub secret: bool,
}

impl From<EnvironmentDoc> for Environment {
    fn from(doc: EnvironmentDoc) -> Self {
        Self {
            name: doc.name,
            variables: doc
                .variables
                .into_iter()
                .map(|v| EnvVariable {
                    enabled: v.enabled.unwrap_or(!v.disabled.unwrap_or(false)),
                    name: v.name,
                    value: v.value,
                    secret: v.secret,
                })
                .collect(),
        }
    }
}

fn is_empty_meta(meta: &FolderMeta) -> bool {
    meta.name.is_none() && meta.seq.is_none()
}

/// Deserializes a document, treating blank content as an empty document.
pub(crate) fn from_yaml<T: DeserializeOwned + Default>(content: &str) -> Result<T, FormatError> {
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_yaml_ng::from_str(content)?)
}

pub(crate) fn parse_request(content: &str) -> Result<RequestFile, FormatError> {
    let doc: RequestDoc = from_yaml(content)?;
    let kind = if doc.graphql.is_some() {
        ItemKind::GraphqlRequest
    } else {
        doc.meta
            .kind
            .as_deref()
            .map_or(ItemKind::HttpRequest, ItemKind::from_short)
    };
    let http = doc.graphql.or(doc.http).unwrap_or_default();

    Ok(RequestFile {
        kind,
        name: doc.meta.name,
        seq: doc.meta.seq,
        tags: doc.meta.tags,
        request: Request {
            method: http.method,
            url: http.url,
            params: http.params,
            headers: http.headers,
            body: http.body,
            auth: http.auth,
            script: doc.script,
            vars: doc.vars,
            assertions: doc.assertions,
            tests: doc.tests,
            docs: doc.docs,
        },
    })
}

pub(crate) fn stringify_request(file: &RequestFile) -> Result<String, FormatError> {
    let request = &file.request;
    let block = HttpDoc {
        method: request.method,
        url: request.url.clone(),
        params: request.params.clone(),
        headers: request.headers.clone(),
        body: request.body.clone(),
        auth: request.auth.clone(),
    };
    let (http, graphql) = match file.kind {
        ItemKind::HttpRequest => (Some(block), None),
        ItemKind::GraphqlRequest => (None, Some(block)),
    };
    let doc = RequestDoc {
        meta: MetaDoc {
            name: file.name.clone(),
            kind: Some(file.kind.short_name().to_owned()),
            seq: file.seq,
            tags: file.tags.clone(),
        },
        http,
        graphql,
        script: request.script.clone(),
        vars: request.vars.clone(),
        assertions: request.assertions.clone(),
        tests: request.tests.clone(),
        docs: request.docs.clone(),
    };
    Ok(serde_yaml_ng::to_string(&doc)?)
}

/// Reads the `meta` (or `info`) section only.
pub(crate) fn extract_meta(content: &str, section: &str) -> Result<RequestMeta, FormatError> {
    #[derive(Default, Deserialize)]
    #[serde(default)]
    struct Section {
        meta: MetaDoc,
    }

    let mut lines = content.lines();
    let mut text = String::new();
    let header = format!("{section}:");

    for line in lines.by_ref() {
        if line.trim_end() == header {
            text.push_str("meta:\n");
            break;
        }
    }
    for line in lines {
        if !line.is_empty() && !line.starts_with([' ', '\t', '#']) {
            break;
        }
        text.push_str(line);
        text.push('\n');
    }
    if text.trim().lines().count() <= 1 {
        return Ok(RequestMeta::default());
    }

    let section: Section = from_yaml(&text)?;
    Ok(RequestMeta {
        name: section.meta.name,
        kind: section
            .meta
            .kind
            .as_deref()
            .map_or(ItemKind::HttpRequest, ItemKind::from_short),
        seq: section.meta.seq,
    })
}

pub(crate) fn parse_folder(content: &str, default_auth: Auth) -> Result<FolderRoot, FormatError> {
    let doc: FolderDoc = from_yaml(content)?;
    Ok(FolderRoot {
        meta: doc.meta,
        request: FolderRequest {
            headers: doc.request.headers,
            auth: doc.request.auth.unwrap_or(default_auth),
            script: doc.request.script,
            vars: doc.request.vars,
            tests: doc.request.tests,
        },
        docs: doc.docs,
    })
}

pub(crate) fn stringify_folder(root: &FolderRoot) -> Result<String, FormatError> {
    let doc = FolderDoc {
        meta: root.meta.clone(),
        request: FolderRequestDoc {
            headers: root.request.headers.clone(),
            auth: Some(root.request.auth.clone()),
            script: root.request.script.clone(),
            vars: root.request.vars.clone(),
            tests: root.request.tests.clone(),
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
                enabled: Some(v.enabled),
                disabled: None,
                secret: v.secret,
            })
            .collect(),
    };
    Ok(serde_yaml_ng::to_string(&doc)?)
}
