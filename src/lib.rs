//! sapi_bridge - Typed HTTP request assembly from SAPI-style server
//! variables.
//!
//! Web servers and gateways expose inbound request data as loosely
//! typed maps: CGI-convention server variables, pre-parsed query and
//! form parameters, cookie pairs, flattened upload descriptors and a
//! forward-only body stream. This crate normalizes all of that into a
//! single immutable [`ServerRequest`].
//!
//! # Features
//!
//! - **Canonical URI derivation**: scheme, host, port and path from
//!   heterogeneous, possibly missing server variables; bracketed IPv6
//!   literals, default-port elision and `localhost` fallbacks included
//! - **Header synthesis**: `HTTP_*` folding, Authorization
//!   reconstruction from fragmented legacy auth fields,
//!   Content-Type/Length promotion, cookie-header assembly
//! - **Upload-tree conversion**: flattened or parallel-array file
//!   descriptors into a structured tree of [`UploadedFile`] values
//! - **Re-readable bodies**: forward-only sources drained into a
//!   frozen buffer, with a standard-input fallback
//!
//! # Example
//!
//! ```rust,ignore
//! use sapi_bridge::{FileReader, ServerRequestBuilder};
//!
//! let mut body = FileReader::open("/tmp/request-body");
//! let request = ServerRequestBuilder::new()
//!     .server_params(server_params)
//!     .query_params(query_params)
//!     .cookies(cookies)
//!     .body(&mut body)
//!     .build()?;
//! assert_eq!(request.uri().to_string(), "https://localhost:8080/api?a=foo&b=bar");
//! ```

mod headers;
mod vars;

pub mod body;
pub mod builder;
pub mod error;
pub mod request;
pub mod types;
pub mod uploads;
pub mod uri;

// Re-exports for convenience
pub use body::{FileReader, RawBody};
pub use builder::ServerRequestBuilder;
pub use error::{Error, Result};
pub use request::ServerRequest;
pub use types::ParamList;
pub use uploads::{FileStream, UploadNode, UploadedFile};
pub use uri::{RequestUri, Scheme};
pub use vars::keys;
