//! Canonical domain types for collections.
//!
//! Every dialect parses into, and stringifies from, the types in this module.
//! Nothing here knows about a particular file format.
//!
//! # Module Organization
//!
//! - [`request`] - Request files and their parts (params, body, auth, scripts)
//! - [`folder`] - Folder and collection root metadata (`folder.bru`, `collection.bru`)
//! - [`environment`] - Environment definitions and `.env` files
//! - [`collection`] - The collection config file (`bruno.json`)
//!
//! All public types are re-exported at the crate root:
//!
//! ```
//! use cs_core::{Auth, AuthMode, RequestFile};
//!
//! let request = RequestFile::default();
//! assert_eq!(request.request.auth.mode(), AuthMode::Inherit);
//! assert!(matches!(request.request.auth, Auth::Inherit));
//! ```

mod collection;
mod environment;
mod folder;
mod request;

pub use collection::CollectionConfig;
pub use environment::{DotEnv, EnvVariable, Environment};
pub use folder::{FolderMeta, FolderRequest, FolderRoot};
pub use request::{
    ApiKeyPlacement, Auth, AuthMode, Body, BodyMode, GraphqlBody, HttpMethod, ItemKind, KeyValue,
    MultipartField, MultipartKind, Param, ParamKind, Request, RequestFile, RequestMeta, Scripts,
    Vars,
};
