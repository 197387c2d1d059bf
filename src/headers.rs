//! Header synthesis from server variables and cookies.
//!
//! Server variables carry request headers under an `HTTP_`-prefixed
//! naming convention, with a few headers split across legacy fields
//! (`PHP_AUTH_*`, bare `CONTENT_TYPE`/`CONTENT_LENGTH`). This module
//! folds all of them into one `http::HeaderMap`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::types::ParamList;
use crate::vars::{self, keys};

/// Encoding set for synthesized cookie pairs: alphanumerics plus `-`,
/// `_` and `.` pass through.
const COOKIE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Server-variable prefix marking an inbound request header.
const HEADER_PREFIX: &str = "HTTP_";

/// Derive the final header map from server params plus cookies.
///
/// The synthesis order matters: the cookie header and Authorization
/// are injected into the working field list first, then bare
/// `CONTENT_TYPE`/`CONTENT_LENGTH` are promoted, and only then is the
/// `HTTP_*` convention folded into header names. Later fields
/// overwrite earlier headers of the same name.
pub(crate) fn synthesize(server_params: &ParamList, cookies: &ParamList) -> HeaderMap {
    let mut fields = server_params.clone();

    if !cookies.is_empty() {
        let cookie_header = cookies
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(name, COOKIE_ENCODE_SET),
                    utf8_percent_encode(value, COOKIE_ENCODE_SET)
                )
            })
            .collect::<Vec<_>>()
            // Non-standard pair separator, kept bit-exact: `,` not `; `.
            .join(",");
        set_field(&mut fields, keys::HTTP_COOKIE, cookie_header);
    }

    synthesize_authorization(&mut fields);

    for specific in [keys::CONTENT_TYPE, keys::CONTENT_LENGTH] {
        let prefixed = format!("{}{}", HEADER_PREFIX, specific);
        let value = vars::get(&fields, specific).map(str::to_string);
        if let Some(value) = value {
            if !vars::contains(&fields, &prefixed) {
                fields.push((prefixed, value));
            }
        }
    }

    let mut headers = HeaderMap::new();
    for (key, value) in &fields {
        let Some(raw_name) = key.strip_prefix(HEADER_PREFIX) else {
            continue;
        };
        let name = raw_name.to_ascii_lowercase().replace('_', "-");
        set_header(&mut headers, &name, value.split(',').map(str::trim));
    }

    // A raw CONTENT_TYPE that survived folding unset is attached as a
    // single value, not comma-split.
    if !headers.contains_key(CONTENT_TYPE) {
        if let Some(value) = vars::get(server_params, keys::CONTENT_TYPE) {
            set_header(&mut headers, "content-type", std::iter::once(value));
        }
    }

    headers
}

/// Reconstruct `HTTP_AUTHORIZATION` from legacy auth fields.
///
/// First match wins: an explicit header suppresses everything, then a
/// redirect-forwarded header, then Basic user/password fields, then a
/// digest field.
fn synthesize_authorization(fields: &mut ParamList) {
    if vars::contains(fields, keys::HTTP_AUTHORIZATION) {
        return;
    }

    let authorization = if let Some(forwarded) = vars::get(fields, keys::REDIRECT_HTTP_AUTHORIZATION)
    {
        forwarded.to_string()
    } else if let Some(user) = vars::get(fields, keys::PHP_AUTH_USER) {
        let mut credentials = format!("{}:", user);
        if let Some(password) = vars::get(fields, keys::PHP_AUTH_PW) {
            credentials.push_str(password);
        }
        format!("Basic {}", STANDARD.encode(credentials))
    } else if let Some(digest) = vars::get(fields, keys::PHP_AUTH_DIGEST) {
        digest.to_string()
    } else {
        return;
    };

    fields.push((keys::HTTP_AUTHORIZATION.to_string(), authorization));
}

/// Overwrite the last occurrence of `key` in place, or append.
fn set_field(fields: &mut ParamList, key: &str, value: String) {
    if let Some(entry) = fields.iter_mut().rev().find(|(k, _)| k == key) {
        entry.1 = value;
    } else {
        fields.push((key.to_string(), value));
    }
}

/// Replace a header's value list, skipping names or values that are
/// not representable on the wire.
fn set_header<'v>(headers: &mut HeaderMap, name: &str, values: impl Iterator<Item = &'v str>) {
    let header_name = match HeaderName::from_bytes(name.as_bytes()) {
        Ok(header_name) => header_name,
        Err(_) => {
            tracing::warn!(header = name, "skipping server param with invalid header name");
            return;
        }
    };

    headers.remove(&header_name);
    for value in values {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                headers.append(&header_name, value);
            }
            Err(_) => {
                tracing::warn!(header = %header_name, "skipping invalid header value");
            }
        }
    }
}
