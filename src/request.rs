//! The immutable derived request value.

use bytes::Bytes;
use http::header::{HeaderMap, CONTENT_TYPE};
use http::Method;

use crate::types::ParamList;
use crate::uploads::UploadNode;
use crate::uri::RequestUri;

/// Immutable, fully normalized server request.
///
/// Built once by [`ServerRequestBuilder`](crate::ServerRequestBuilder)
/// and never mutated afterwards; the only `&mut` surface is upload
/// stream consumption.
#[derive(Debug)]
pub struct ServerRequest {
    pub(crate) method: Method,
    pub(crate) uri: RequestUri,
    pub(crate) protocol_version: String,
    pub(crate) headers: HeaderMap,
    pub(crate) server_params: ParamList,
    pub(crate) query_params: ParamList,
    pub(crate) cookie_params: ParamList,
    pub(crate) parsed_body: Option<ParamList>,
    pub(crate) body: Bytes,
    pub(crate) uploaded_files: Vec<(String, UploadNode)>,
}

impl ServerRequest {
    /// Get the HTTP method.
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the canonical request URI.
    #[inline]
    pub fn uri(&self) -> &RequestUri {
        &self.uri
    }

    /// Get the protocol version (e.g. `"1.1"`).
    #[inline]
    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    /// Get the headers.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the first value of a header by name (case-insensitive).
    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get all values of a header, in insertion order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Get the Content-Type header value.
    #[inline]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Server variables exactly as the caller supplied them.
    #[inline]
    pub fn server_params(&self) -> &ParamList {
        &self.server_params
    }

    /// Get the decoded query parameters.
    #[inline]
    pub fn query_params(&self) -> &ParamList {
        &self.query_params
    }

    /// Get the request cookies.
    #[inline]
    pub fn cookie_params(&self) -> &ParamList {
        &self.cookie_params
    }

    /// Form-decoded body parameters; set only for form media types.
    #[inline]
    pub fn parsed_body(&self) -> Option<&ParamList> {
        self.parsed_body.as_ref()
    }

    /// Get the fully drained, re-readable request body.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Get the uploaded-file tree.
    #[inline]
    pub fn uploaded_files(&self) -> &[(String, UploadNode)] {
        &self.uploaded_files
    }

    /// Mutable upload tree access, for draining upload streams.
    #[inline]
    pub fn uploaded_files_mut(&mut self) -> &mut [(String, UploadNode)] {
        &mut self.uploaded_files
    }

    /// Uploaded-file node for one form field.
    pub fn uploaded_file(&self, field: &str) -> Option<&UploadNode> {
        self.uploaded_files
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, node)| node)
    }
}
