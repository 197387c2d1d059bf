//! Typed view over SAPI/CGI-convention server variables.

use crate::types::ParamList;

/// Well-known server variable keys.
pub mod keys {
    pub const REQUEST_METHOD: &str = "REQUEST_METHOD";
    pub const HTTPS: &str = "HTTPS";
    pub const HTTP_HOST: &str = "HTTP_HOST";
    pub const SERVER_NAME: &str = "SERVER_NAME";
    pub const SERVER_PORT: &str = "SERVER_PORT";
    pub const REQUEST_URI: &str = "REQUEST_URI";
    pub const SERVER_PROTOCOL: &str = "SERVER_PROTOCOL";
    pub const HTTP_AUTHORIZATION: &str = "HTTP_AUTHORIZATION";
    pub const REDIRECT_HTTP_AUTHORIZATION: &str = "REDIRECT_HTTP_AUTHORIZATION";
    pub const PHP_AUTH_USER: &str = "PHP_AUTH_USER";
    pub const PHP_AUTH_PW: &str = "PHP_AUTH_PW";
    pub const PHP_AUTH_DIGEST: &str = "PHP_AUTH_DIGEST";
    pub const HTTP_COOKIE: &str = "HTTP_COOKIE";
    pub const CONTENT_TYPE: &str = "CONTENT_TYPE";
    pub const CONTENT_LENGTH: &str = "CONTENT_LENGTH";
}

/// Last-wins lookup over an ordered parameter list.
pub(crate) fn get<'a>(params: &'a ParamList, key: &str) -> Option<&'a str> {
    params
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Presence check; the value is irrelevant.
pub(crate) fn contains(params: &ParamList, key: &str) -> bool {
    params.iter().any(|(k, _)| k == key)
}

/// Server variables resolved to typed optionals in a single pass.
///
/// Downstream algorithms consume this view instead of re-probing the
/// raw list key by key.
#[derive(Debug, Default)]
pub(crate) struct ServerVars<'a> {
    pub method: Option<&'a str>,
    pub https: bool,
    pub host: Option<&'a str>,
    pub server_name: Option<&'a str>,
    pub server_port: Option<&'a str>,
    pub request_uri: Option<&'a str>,
    pub protocol: Option<&'a str>,
}

impl<'a> ServerVars<'a> {
    pub fn resolve(params: &'a ParamList) -> Self {
        let mut vars = Self::default();
        for (key, value) in params {
            match key.as_str() {
                keys::REQUEST_METHOD => vars.method = Some(value),
                // Presence alone marks the request as TLS-terminated.
                keys::HTTPS => vars.https = true,
                keys::HTTP_HOST => vars.host = Some(value),
                keys::SERVER_NAME => vars.server_name = Some(value),
                keys::SERVER_PORT => vars.server_port = Some(value),
                keys::REQUEST_URI => vars.request_uri = Some(value),
                keys::SERVER_PROTOCOL => vars.protocol = Some(value),
                _ => {}
            }
        }
        vars
    }

    /// Protocol version: the part of `SERVER_PROTOCOL` after the first
    /// slash, `"1.1"` when the field is absent or slash-less.
    pub fn protocol_version(&self) -> String {
        self.protocol
            .and_then(|p| p.split_once('/'))
            .map(|(_, version)| version.to_string())
            .unwrap_or_else(|| "1.1".to_string())
    }
}
