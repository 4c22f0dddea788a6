//! Request files in the primary dialect.

use cs_core::{
    AuthMode, Body, BodyMode, GraphqlBody, HttpMethod, ItemKind, MultipartField, MultipartKind,
    Param, ParamKind, RequestFile, RequestMeta,
};

use super::grammar::{lex, lex_single_dict, Entry, Lexed, Writer};
use super::{key_values, kv_triples, parse_auth_mode, parse_seq, read_auth, write_auth};
use crate::FormatError;

/// Parses a request. With `max_text_bytes` set, large text blocks are
/// redacted; the flag in the result reports whether that happened.
pub(crate) fn parse_request(
    content: &str,
    max_text_bytes: Option<usize>,
) -> Result<(RequestFile, bool), FormatError> {
    let lexed = lex(content, max_text_bytes)?;
    let mut file = RequestFile::default();

    apply_meta(
        &mut file.name,
        &mut file.kind,
        &mut file.seq,
        &mut file.tags,
        lexed.dict("meta"),
        lexed.line_of("meta"),
    )?;

    let request = &mut file.request;
    let mut auth_mode = AuthMode::Inherit;
    if let Some(block) = lexed
        .blocks
        .iter()
        .find(|b| b.tag.parse::<HttpMethod>().is_ok())
    {
        request.method = block.tag.parse().unwrap_or_default();
        for entry in lexed.dict(&block.tag) {
            match entry.key.as_str() {
                "url" => request.url.clone_from(&entry.value),
                "body" => request.body.mode = BodyMode::parse(&entry.value),
                "auth" => auth_mode = parse_auth_mode(&entry.value)?,
                _ => {}
            }
        }
    }

    request.params = params(&lexed);
    request.headers = key_values(lexed.dict("headers"));
    request.auth = read_auth(&lexed, auth_mode);
    request.body = read_body(&lexed, request.body.mode);

    let pre = if lexed.find("vars:pre-request").is_some() {
        lexed.dict("vars:pre-request")
    } else {
        lexed.dict("vars")
    };
    request.vars.req = key_values(pre);
    request.vars.res = key_values(lexed.dict("vars:post-response"));
    request.assertions = key_values(lexed.dict("assert"));

    request.script.req = lexed.text("script:pre-request").map(str::to_owned);
    request.script.res = lexed.text("script:post-response").map(str::to_owned);
    request.tests = lexed.text("tests").map(str::to_owned);
    request.docs = lexed.text("docs").map(str::to_owned);

    Ok((file, lexed.redacted))
}

/// Reads only the `meta` block.
pub(crate) fn extract_meta(content: &str) -> Result<RequestMeta, FormatError> {
    let entries = lex_single_dict(content, "meta")?;
    let mut meta = RequestMeta::default();
    let mut tags = Vec::new();
    apply_meta(&mut meta.name, &mut meta.kind, &mut meta.seq, &mut tags, &entries, 0)?;
    Ok(meta)
}

fn apply_meta(
    name: &mut String,
    kind: &mut ItemKind,
    seq: &mut Option<u32>,
    tags: &mut Vec<String>,
    entries: &[Entry],
    line: usize,
) -> Result<(), FormatError> {
    for entry in entries {
        match entry.key.as_str() {
            "name" => name.clone_from(&entry.value),
            "type" => *kind = ItemKind::from_short(&entry.value),
            "seq" => *seq = Some(parse_seq(&entry.value, line)?),
            "tags" => {
                *tags = entry
                    .value
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_owned)
                    .collect();
            }
            _ => {}
        }
    }
    Ok(())
}

fn params(lexed: &Lexed) -> Vec<Param> {
    let query = lexed.dict("params:query").iter().map(|e| (e, ParamKind::Query));
    let path = lexed.dict("params:path").iter().map(|e| (e, ParamKind::Path));
    query
        .chain(path)
        .map(|(e, kind)| Param {
            name: e.key.clone(),
            value: e.value.clone(),
            kind,
            enabled: e.enabled,
        })
        .collect()
}

fn read_body(lexed: &Lexed, mode: BodyMode) -> Body {
    let text = |tag: &str| lexed.text(tag).map(str::to_owned);
    let graphql = match (lexed.text("body:graphql"), lexed.text("body:graphql:vars")) {
        (None, None) => None,
        (query, variables) => Some(GraphqlBody {
            query: query.unwrap_or_default().to_owned(),
            variables: variables.unwrap_or_default().to_owned(),
        }),
    };

    Body {
        mode,
        json: text("body:json").or_else(|| text("body")),
        text: text("body:text"),
        xml: text("body:xml"),
        sparql: text("body:sparql"),
        form_url_encoded: key_values(lexed.dict("body:form-urlencoded")),
        multipart_form: lexed
            .dict("body:multipart-form")
            .iter()
            .map(multipart_field)
            .collect(),
        graphql,
    }
}

fn multipart_field(entry: &Entry) -> MultipartField {
    let file = entry
        .value
        .strip_prefix("@file(")
        .and_then(|v| v.strip_suffix(')'));
    MultipartField {
        name: entry.key.clone(),
        value: file.unwrap_or(&entry.value).to_owned(),
        kind: if file.is_some() {
            MultipartKind::File
        } else {
            MultipartKind::Text
        },
        enabled: entry.enabled,
    }
}

pub(crate) fn stringify_request(file: &RequestFile) -> Result<String, FormatError> {
    let mut writer = Writer::new();
    let request = &file.request;

    let seq = file.seq.map(|s| s.to_string());
    let tags = file.tags.join(", ");
    let mut meta = vec![
        ("name", file.name.as_str(), true),
        ("type", file.kind.short_name(), true),
    ];
    if let Some(seq) = &seq {
        meta.push(("seq", seq.as_str(), true));
    }
    if !tags.is_empty() {
        meta.push(("tags", tags.as_str(), true));
    }
    writer.dict("meta", meta);

    writer.dict(
        request.method.as_lower(),
        [
            ("url", request.url.as_str(), true),
            ("body", request.body.mode.as_str(), true),
            ("auth", request.auth.mode().as_str(), true),
        ],
    );

    for (tag, kind) in [("params:query", ParamKind::Query), ("params:path", ParamKind::Path)] {
        writer.dict_if_any(
            tag,
            request
                .params
                .iter()
                .filter(|p| p.kind == kind)
                .map(|p| (p.name.as_str(), p.value.as_str(), p.enabled)),
        );
    }
    writer.dict_if_any("headers", kv_triples(&request.headers));
    write_auth(&mut writer, &request.auth);
    write_body(&mut writer, &request.body);

    writer.dict_if_any("vars:pre-request", kv_triples(&request.vars.req));
    writer.dict_if_any("vars:post-response", kv_triples(&request.vars.res));
    writer.dict_if_any("assert", kv_triples(&request.assertions));

    writer.text_opt("script:pre-request", request.script.req.as_deref());
    writer.text_opt("script:post-response", request.script.res.as_deref());
    writer.text_opt("tests", request.tests.as_deref());
    writer.text_opt("docs", request.docs.as_deref());

    writer.finish()
}

fn write_body(writer: &mut Writer, body: &Body) {
    writer.text_opt("body:json", body.json.as_deref());
    writer.text_opt("body:text", body.text.as_deref());
    writer.text_opt("body:xml", body.xml.as_deref());
    writer.text_opt("body:sparql", body.sparql.as_deref());
    if let Some(graphql) = &body.graphql {
        writer.text("body:graphql", &graphql.query);
        if !graphql.variables.is_empty() {
            writer.text("body:graphql:vars", &graphql.variables);
        }
    }
    writer.dict_if_any("body:form-urlencoded", kv_triples(&body.form_url_encoded));

    let files: Vec<String> = body
        .multipart_form
        .iter()
        .map(|f| match f.kind {
            MultipartKind::File => format!("@file({})", f.value),
            MultipartKind::Text => f.value.clone(),
        })
        .collect();
    writer.dict_if_any(
        "body:multipart-form",
        body.multipart_form
            .iter()
            .zip(&files)
            .map(|(f, v)| (f.name.as_str(), v.as_str(), f.enabled)),
    );
}
