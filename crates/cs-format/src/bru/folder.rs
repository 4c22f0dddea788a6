//! Folder and collection root files in the primary dialect.

use cs_core::{Auth, FolderRoot};

use super::grammar::{lex, Writer};
use super::{key_values, kv_triples, parse_auth_mode, parse_seq, read_auth, write_auth};
use crate::FormatError;

/// Parses `folder.bru` / `collection.bru`. `default_auth` applies when the
/// file has no `auth` block.
pub(crate) fn parse_folder(content: &str, default_auth: Auth) -> Result<FolderRoot, FormatError> {
    let lexed = lex(content, None)?;
    let mut root = FolderRoot::default();

    for entry in lexed.dict("meta") {
        match entry.key.as_str() {
            "name" => root.meta.name = Some(entry.value.clone()),
            "seq" => root.meta.seq = Some(parse_seq(&entry.value, lexed.line_of("meta"))?),
            _ => {}
        }
    }

    let request = &mut root.request;
    request.headers = key_values(lexed.dict("headers"));
    request.auth = match lexed.value("auth", "mode") {
        Some(mode) => read_auth(&lexed, parse_auth_mode(mode)?),
        None => default_auth,
    };
    request.vars.req = key_values(lexed.dict("vars:pre-request"));
    request.vars.res = key_values(lexed.dict("vars:post-response"));
    request.script.req = lexed.text("script:pre-request").map(str::to_owned);
    request.script.res = lexed.text("script:post-response").map(str::to_owned);
    request.tests = lexed.text("tests").map(str::to_owned);
    root.docs = lexed.text("docs").map(str::to_owned);

    Ok(root)
}

pub(crate) fn stringify_folder(root: &FolderRoot) -> Result<String, FormatError> {
    let mut writer = Writer::new();

    let seq = root.meta.seq.map(|s| s.to_string());
    let meta = [
        root.meta.name.as_deref().map(|n| ("name", n, true)),
        seq.as_deref().map(|s| ("seq", s, true)),
    ];
    writer.dict_if_any("meta", meta.into_iter().flatten());

    let request = &root.request;
    writer.dict_if_any("headers", kv_triples(&request.headers));
    writer.dict("auth", [("mode", request.auth.mode().as_str(), true)]);
    write_auth(&mut writer, &request.auth);
    writer.dict_if_any("vars:pre-request", kv_triples(&request.vars.req));
    writer.dict_if_any("vars:post-response", kv_triples(&request.vars.res));
    writer.text_opt("script:pre-request", request.script.req.as_deref());
    writer.text_opt("script:post-response", request.script.res.as_deref());
    writer.text_opt("tests", request.tests.as_deref());
    writer.text_opt("docs", root.docs.as_deref());

    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_defaults() {
        let root = parse_folder("meta {\n  name: Users\n  seq: 2\n}\n", Auth::Inherit).unwrap();
        assert_eq!(root.meta.name.as_deref(), Some("Users"));
        assert_eq!(root.meta.seq, Some(2));
        assert_eq!(root.request.auth, Auth::Inherit);

        let collection = parse_folder("", Auth::None).unwrap();
        assert_eq!(collection.request.auth, Auth::None);
        assert!(collection.meta.name.is_none());
    }

    #[test]
    fn test_folder_auth_block() {
        let content = "auth {\n  mode: basic\n}\n\nauth:basic {\n  username: u\n  password: p\n}\n";
        let root = parse_folder(content, Auth::Inherit).unwrap();
        assert_eq!(
            root.request.auth,
            Auth::Basic {
                username: "u".to_owned(),
                password: "p".to_owned()
            }
        );
    }

    #[test]
    fn test_folder_roundtrip() {
        let mut root = FolderRoot::collection();
        root.meta.name = Some("API".to_owned());
        root.request.headers.push(cs_core::KeyValue::new("x-tenant", "acme"));
        root.request.script.req = Some("console.log(1)".to_owned());
        root.docs = Some("# API".to_owned());

        let again = parse_folder(&stringify_folder(&root).unwrap(), Auth::Inherit).unwrap();
        assert_eq!(root, again);
    }

    #[test]
    fn test_explicit_inherit_survives_collection_default() {
        let root = FolderRoot::folder();
        let again = parse_folder(&stringify_folder(&root).unwrap(), Auth::None).unwrap();
        assert_eq!(again.request.auth, Auth::Inherit);
    }
}
