//! Canonical request URI derivation from server variables.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::vars::ServerVars;

/// Global regex for bracketed IPv6 host literals (compiled once).
static BRACKET_HOST_REGEX: OnceLock<Regex> = OnceLock::new();

fn bracket_host_regex() -> &'static Regex {
    BRACKET_HOST_REGEX.get_or_init(|| {
        Regex::new(r"^(?P<host>\[[A-Fa-f0-9:.]+\])(?::(?P<port>\d+))?$").expect("Invalid regex")
    })
}

/// URI scheme, derived from the TLS indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    #[inline]
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical absolute request URI.
///
/// Resolution never fails: missing or malformed host and port
/// information degrades to `localhost` and the scheme default port.
/// `Display` renders the canonical form, with the port suffix only
/// when it differs from the scheme default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUri {
    scheme: Scheme,
    host: String,
    port: u16,
    path_and_query: Option<String>,
}

impl RequestUri {
    /// Derive `(scheme, host, port, path-and-query)` from the typed
    /// server-variable view.
    ///
    /// Host resolution prefers `HTTP_HOST`, falling back to
    /// `SERVER_NAME`. A bracketed IPv6 literal keeps its brackets and
    /// may carry a `:port` suffix; any other host splits at the first
    /// colon. A port that fails to parse is coerced to 0 rather than
    /// rejected.
    pub(crate) fn resolve(vars: &ServerVars<'_>) -> Self {
        let scheme = if vars.https { Scheme::Https } else { Scheme::Http };

        let raw_host = vars
            .host
            .filter(|h| !h.is_empty())
            .or(vars.server_name)
            .unwrap_or("");
        let mut host = raw_host.to_string();
        let mut port = None;

        if let Some(caps) = bracket_host_regex().captures(raw_host) {
            host = caps["host"].to_string();
            port = caps.name("port").map(|m| parse_port(m.as_str()));
        } else if let Some(pos) = raw_host.find(':') {
            port = Some(parse_port(&raw_host[pos + 1..]));
            host.truncate(pos);
        }

        let port = port
            .or_else(|| vars.server_port.map(parse_port))
            .unwrap_or_else(|| scheme.default_port());

        if host.is_empty() {
            host = "localhost".to_string();
        }

        let path_and_query = vars
            .request_uri
            .map(|uri| format!("/{}", uri.trim_start_matches('/')));

        RequestUri {
            scheme,
            host,
            port,
            path_and_query,
        }
    }

    #[inline]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Path plus query string, normalized to a single leading slash.
    /// `None` when the server supplied no request-URI field.
    #[inline]
    pub fn path_and_query(&self) -> Option<&str> {
        self.path_and_query.as_deref()
    }

    /// Whether the resolved port is the default for the scheme.
    #[inline]
    pub fn is_default_port(&self) -> bool {
        self.port == self.scheme.default_port()
    }

    /// Parse the canonical rendering into an `http::Uri`.
    pub fn to_http_uri(&self) -> Result<http::Uri, http::uri::InvalidUri> {
        http::Uri::try_from(self.to_string())
    }
}

impl fmt::Display for RequestUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if !self.is_default_port() {
            write!(f, ":{}", self.port)?;
        }
        if let Some(path_and_query) = &self.path_and_query {
            f.write_str(path_and_query)?;
        }
        Ok(())
    }
}

fn parse_port(raw: &str) -> u16 {
    raw.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParamList;

    fn resolve(items: &[(&str, &str)]) -> RequestUri {
        let params: ParamList = items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let vars = ServerVars::resolve(&params);
        RequestUri::resolve(&vars)
    }

    #[test]
    fn test_defaults_without_host_information() {
        let uri = resolve(&[]);
        assert_eq!(uri.host(), "localhost");
        assert_eq!(uri.port(), 80);
        assert_eq!(uri.scheme(), Scheme::Http);
        assert_eq!(uri.to_string(), "http://localhost");
    }

    #[test]
    fn test_defaults_with_https_indicator() {
        let uri = resolve(&[("HTTPS", "1")]);
        assert_eq!(uri.host(), "localhost");
        assert_eq!(uri.port(), 443);
        assert_eq!(uri.to_string(), "https://localhost");
    }

    #[test]
    fn test_host_with_port() {
        let uri = resolve(&[("HTTP_HOST", "example.com:9090")]);
        assert_eq!(uri.host(), "example.com");
        assert_eq!(uri.port(), 9090);
        assert_eq!(uri.to_string(), "http://example.com:9090");
    }

    #[test]
    fn test_ipv6_literal_with_port() {
        let uri = resolve(&[("HTTP_HOST", "[::1]:8443"), ("HTTPS", "on")]);
        assert_eq!(uri.host(), "[::1]");
        assert_eq!(uri.port(), 8443);
        assert_eq!(uri.to_string(), "https://[::1]:8443");
    }

    #[test]
    fn test_ipv6_literal_without_port() {
        let uri = resolve(&[("HTTP_HOST", "[2001:db8::1]")]);
        assert_eq!(uri.host(), "[2001:db8::1]");
        assert_eq!(uri.port(), 80);
        assert_eq!(uri.to_string(), "http://[2001:db8::1]");
    }

    #[test]
    fn test_server_name_fallback() {
        let uri = resolve(&[("SERVER_NAME", "fallback.example")]);
        assert_eq!(uri.host(), "fallback.example");

        let uri = resolve(&[("HTTP_HOST", ""), ("SERVER_NAME", "fallback.example")]);
        assert_eq!(uri.host(), "fallback.example");
    }

    #[test]
    fn test_explicit_server_port() {
        let uri = resolve(&[("HTTP_HOST", "example.com"), ("SERVER_PORT", "8080")]);
        assert_eq!(uri.port(), 8080);
        assert_eq!(uri.to_string(), "http://example.com:8080");
    }

    #[test]
    fn test_host_port_beats_server_port() {
        let uri = resolve(&[("HTTP_HOST", "example.com:9090"), ("SERVER_PORT", "8080")]);
        assert_eq!(uri.port(), 9090);
    }

    #[test]
    fn test_unparseable_port_coerced_to_zero() {
        let uri = resolve(&[("HTTP_HOST", "example.com:abc")]);
        assert_eq!(uri.host(), "example.com");
        assert_eq!(uri.port(), 0);
        assert_eq!(uri.to_string(), "http://example.com:0");

        let uri = resolve(&[("HTTP_HOST", "example.com"), ("SERVER_PORT", "http")]);
        assert_eq!(uri.port(), 0);
    }

    #[test]
    fn test_default_port_suffix_elided() {
        let uri = resolve(&[("HTTP_HOST", "example.com:80")]);
        assert_eq!(uri.to_string(), "http://example.com");

        let uri = resolve(&[("HTTP_HOST", "example.com:443"), ("HTTPS", "1")]);
        assert_eq!(uri.to_string(), "https://example.com");

        // 443 on plain http is non-default and must appear.
        let uri = resolve(&[("HTTP_HOST", "example.com:443")]);
        assert_eq!(uri.to_string(), "http://example.com:443");
    }

    #[test]
    fn test_request_uri_appended_with_single_leading_slash() {
        let uri = resolve(&[
            ("HTTP_HOST", "example.com"),
            ("REQUEST_URI", "/api?a=foo&b=bar"),
        ]);
        assert_eq!(uri.path_and_query(), Some("/api?a=foo&b=bar"));
        assert_eq!(uri.to_string(), "http://example.com/api?a=foo&b=bar");

        let uri = resolve(&[("HTTP_HOST", "example.com"), ("REQUEST_URI", "//double")]);
        assert_eq!(uri.to_string(), "http://example.com/double");
    }

    #[test]
    fn test_no_request_uri_appends_no_path() {
        let uri = resolve(&[("HTTP_HOST", "example.com")]);
        assert_eq!(uri.path_and_query(), None);
        assert_eq!(uri.to_string(), "http://example.com");
    }

    #[test]
    fn test_to_http_uri_round_trip() {
        let uri = resolve(&[
            ("HTTP_HOST", "example.com:8080"),
            ("REQUEST_URI", "/a/b?c=d"),
        ]);
        let parsed = uri.to_http_uri().unwrap();
        assert_eq!(parsed.host(), Some("example.com"));
        assert_eq!(parsed.port_u16(), Some(8080));
        assert_eq!(parsed.path(), "/a/b");
    }
}
