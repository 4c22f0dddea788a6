//! Environment files in the primary dialect.
//!
//! Secret variables are listed by name only in a `vars:secret` block; their
//! values never reach the file.

use cs_core::{EnvVariable, Environment};

use super::grammar::{lex, Writer};
use crate::FormatError;

pub(crate) fn parse_environment(content: &str) -> Result<Environment, FormatError> {
    let lexed = lex(content, None)?;

    let plain = lexed.dict("vars").iter().map(|e| EnvVariable {
        name: e.key.clone(),
        value: e.value.clone(),
        enabled: e.enabled,
        secret: false,
    });
    let secret = lexed.list("vars:secret").iter().map(|e| EnvVariable {
        name: e.key.clone(),
        value: String::new(),
        enabled: e.enabled,
        secret: true,
    });

    Ok(Environment {
        name: String::new(),
        variables: plain.chain(secret).collect(),
    })
}

pub(crate) fn stringify_environment(environment: &Environment) -> Result<String, FormatError> {
    let mut writer = Writer::new();
    writer.dict_if_any(
        "vars",
        environment
            .variables
            .iter()
            .filter(|v| !v.secret)
            .map(|v| (v.name.as_str(), v.value.as_str(), v.enabled)),
    );

    let secrets: Vec<(&str, bool)> = environment
        .variables
        .iter()
        .filter(|v| v.secret)
        .map(|v| (v.name.as_str(), v.enabled))
        .collect();
    if !secrets.is_empty() {
        writer.list("vars:secret", secrets);
    }
    writer.finish()
}
