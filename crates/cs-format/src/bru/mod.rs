//! The primary (`.bru`) dialect.
//!
//! [`grammar`] turns text into blocks; the sibling modules map blocks to the
//! canonical types and back.

mod environment;
mod folder;
pub(crate) mod grammar;
mod request;

pub(crate) use environment::{parse_environment, stringify_environment};
pub(crate) use folder::{parse_folder, stringify_folder};
pub(crate) use request::{extract_meta, parse_request, stringify_request};

use cs_core::{ApiKeyPlacement, Auth, AuthMode, KeyValue};

use self::grammar::{Entry, Lexed, Writer};
use crate::FormatError;

pub(crate) fn key_values(entries: &[Entry]) -> Vec<KeyValue> {
    entries
        .iter()
        .map(|e| KeyValue::new(e.key.clone(), e.value.clone()).with_enabled(e.enabled))
        .collect()
}

pub(crate) fn kv_triples(values: &[KeyValue]) -> impl Iterator<Item = (&str, &str, bool)> {
    values
        .iter()
        .map(|kv| (kv.name.as_str(), kv.value.as_str(), kv.enabled))
}

pub(crate) fn parse_auth_mode(value: &str) -> Result<AuthMode, FormatError> {
    AuthMode::parse(value)
        .ok_or_else(|| FormatError::invalid_value("auth", format!("unknown auth mode '{value}'")))
}

/// Builds the auth value for `mode` from its `auth:<mode>` block.
pub(crate) fn read_auth(lexed: &Lexed, mode: AuthMode) -> Auth {
    let get = |tag: &str, key: &str| lexed.value(tag, key).unwrap_or_default().to_owned();
    match mode {
        AuthMode::Inherit => Auth::Inherit,
        AuthMode::None => Auth::None,
        AuthMode::Basic => Auth::Basic {
            username: get("auth:basic", "username"),
            password: get("auth:basic", "password"),
        },
        AuthMode::Bearer => Auth::Bearer {
            token: get("auth:bearer", "token"),
        },
        AuthMode::Digest => Auth::Digest {
            username: get("auth:digest", "username"),
            password: get("auth:digest", "password"),
        },
        AuthMode::ApiKey => Auth::ApiKey {
            key: get("auth:apikey", "key"),
            value: get("auth:apikey", "value"),
            placement: ApiKeyPlacement::parse(&get("auth:apikey", "placement")),
        },
    }
}

/// Writes the `auth:<mode>` block for modes that carry fields.
pub(crate) fn write_auth(writer: &mut Writer, auth: &Auth) {
    match auth {
        Auth::Inherit | Auth::None => {}
        Auth::Basic { username, password } => writer.dict(
            "auth:basic",
            [("username", username.as_str(), true), ("password", password.as_str(), true)],
        ),
        Auth::Bearer { token } => writer.dict("auth:bearer", [("token", token.as_str(), true)]),
        Auth::Digest { username, password } => writer.dict(
            "auth:digest",
            [("username", username.as_str(), true), ("password", password.as_str(), true)],
        ),
        Auth::ApiKey {
            key,
            value,
            placement,
        } => writer.dict(
            "auth:apikey",
            [
                ("key", key.as_str(), true),
                ("value", value.as_str(), true),
                ("placement", placement.as_str(), true),
            ],
        ),
    }
}

pub(crate) fn parse_seq(value: &str, line: usize) -> Result<u32, FormatError> {
    value.trim().parse::<u32>().map_err(|_| {
        FormatError::invalid_value("seq", format!("'{value}' is not a sequence number (line {line})"))
    })
}
