//! Fluent assembly of a [`ServerRequest`] from raw server-provided
//! data.

use http::Method;
use serde_json::Value;

use crate::body::{self, RawBody};
use crate::error::Result;
use crate::headers;
use crate::request::ServerRequest;
use crate::types::ParamList;
use crate::uploads;
use crate::uri::RequestUri;
use crate::vars::ServerVars;

/// Media types whose body arrives pre-parsed as form parameters.
const FORM_MEDIA_TYPES: [&str; 2] = ["application/x-www-form-urlencoded", "multipart/form-data"];

/// Builder collecting the raw request data a web server exposes.
///
/// Every input is optional; missing pieces degrade to documented
/// defaults (`GET`, `http://localhost`, protocol `1.1`, empty body).
///
/// # Example
///
/// ```rust,ignore
/// let mut body = FileReader::open("/tmp/request-body");
/// let request = ServerRequestBuilder::new()
///     .server_params(server_params)
///     .query_params(query_params)
///     .cookies(cookies)
///     .body(&mut body)
///     .build()?;
/// ```
#[derive(Default)]
pub struct ServerRequestBuilder<'a> {
    query_params: ParamList,
    parsed_body: ParamList,
    server_params: ParamList,
    cookies: ParamList,
    uploaded_files: Value,
    body: Option<&'a mut dyn RawBody>,
}

impl<'a> ServerRequestBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the decoded query parameters.
    pub fn query_params(mut self, params: ParamList) -> Self {
        self.query_params = params;
        self
    }

    /// Set the form-decoded body parameters. They are attached to the
    /// built request only when the Content-Type is a form media type.
    pub fn parsed_body(mut self, params: ParamList) -> Self {
        self.parsed_body = params;
        self
    }

    /// Set the server/environment variables.
    pub fn server_params(mut self, params: ParamList) -> Self {
        self.server_params = params;
        self
    }

    /// Set the request cookies.
    pub fn cookies(mut self, cookies: ParamList) -> Self {
        self.cookies = cookies;
        self
    }

    /// Set the raw upload descriptor tree.
    pub fn uploaded_files(mut self, descriptors: Value) -> Self {
        self.uploaded_files = descriptors;
        self
    }

    /// Set the raw body source. Without one, `build` drains the
    /// process's standard input stream instead. The source is rewound
    /// and drained but stays open and caller-owned.
    pub fn body(mut self, source: &'a mut dyn RawBody) -> Self {
        self.body = Some(source);
        self
    }

    /// Assemble the immutable request.
    ///
    /// The body is drained unconditionally, regardless of method or
    /// content type. Malformed host, port, protocol and header data
    /// degrade to documented defaults; the only failure is a
    /// structurally invalid upload descriptor tree.
    pub fn build(self) -> Result<ServerRequest> {
        let vars = ServerVars::resolve(&self.server_params);

        let method = resolve_method(vars.method);
        let uri = RequestUri::resolve(&vars);
        let protocol_version = vars.protocol_version();

        let body = match self.body {
            Some(source) => body::drain(source),
            None => body::drain_stdin(),
        };

        let headers = headers::synthesize(&self.server_params, &self.cookies);

        let parsed_body = headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.split(';').next().unwrap_or("").trim())
            .filter(|media_type| FORM_MEDIA_TYPES.contains(media_type))
            .map(|_| self.parsed_body);

        let uploaded_files = uploads::from_descriptors(self.uploaded_files)?;

        tracing::debug!(
            method = %method,
            uri = %uri,
            version = %protocol_version,
            body_len = body.len(),
            uploads = uploaded_files.len(),
            "assembled server request"
        );

        Ok(ServerRequest {
            method,
            uri,
            protocol_version,
            headers,
            server_params: self.server_params,
            query_params: self.query_params,
            cookie_params: self.cookies,
            parsed_body,
            body,
            uploaded_files,
        })
    }
}

fn resolve_method(raw: Option<&str>) -> Method {
    match raw {
        None => Method::GET,
        Some(token) => match Method::from_bytes(token.as_bytes()) {
            Ok(method) => method,
            Err(_) => {
                tracing::warn!(method = token, "unparseable request method, defaulting to GET");
                Method::GET
            }
        },
    }
}
