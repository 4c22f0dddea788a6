//! Format detection and dialect parsing for colsync collections.
//!
//! This crate turns the three on-disk dialects of a collection into the
//! canonical types of [`cs_core`] and back:
//!
//! - **primary**: the block-structured `.bru` dialect
//! - **yaml**: a YAML rendition of the same model (`meta:` + `http:`)
//! - **open-collection**: the YAML open collection schema (`info:` + `http:`)
//!
//! # Overview
//!
//! Parsing takes [`ParseOptions`]; with [`FormatChoice::Auto`] the dialect is
//! detected from the content:
//!
//! ```
//! use cs_format::{parse_request, stringify_request, Format, ParseOptions, StringifyOptions};
//!
//! let bru = "meta {\n  name: Health\n  type: http\n}\n\nget {\n  url: http://x/health\n  auth: none\n}\n";
//! let request = parse_request(bru, ParseOptions::default())?;
//!
//! // Convert to the YAML dialect and back.
//! let yaml = stringify_request(&request, StringifyOptions::new(Format::Yaml))?;
//! let again = parse_request(&yaml, ParseOptions::default())?;
//! assert_eq!(request, again);
//! # Ok::<(), cs_format::FormatError>(())
//! ```
//!
//! # Detection
//!
//! | Rule | Dialect |
//! |------|---------|
//! | `opencollection:` key, or `type: collection` + `items:`, or `info:` + `http:` | open-collection |
//! | `meta:` + `http:`/`graphql:`, or a first line shaped as a YAML `key:` | yaml |
//! | anything else, including empty input | primary |
//!
//! # Errors
//!
//! Malformed content yields a content error ([`FormatError::is_content_error`]).
//! Asking to stringify into [`FormatChoice::Auto`] or an unknown format name
//! is a programmer error ([`FormatError::UnsupportedFormat`]).
//!
//! # Thread Safety
//!
//! All entry points are pure functions over `&str` and are safe to call from
//! any thread, which is how the lane router runs them.

#![deny(clippy::all)]
#![warn(missing_docs)]

mod bru;
mod detect;
mod dispatch;
pub mod error;
mod format;
mod opencollection;
mod yaml;

pub use detect::{detect_from_content, detect_from_filename, is_dialect_file};
pub use dispatch::{
    extract_request_meta, parse_collection, parse_collection_config, parse_document,
    parse_environment, parse_folder, parse_request, parse_request_reduced, redaction_marker,
    stringify_collection, stringify_document, stringify_environment, stringify_folder,
    stringify_request, Document, DocumentKind, ReducedRequest,
};
pub use error::FormatError;
pub use format::{Format, FormatChoice, ParseOptions, StringifyOptions};
