use axum::http::{header, HeaderMap};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Read a cookie value from the request headers. Used as a fallback when the
/// admin console sends the provider session cookie instead of a Bearer header.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE).and_then(|h| h.to_str().ok())?;

    for pair in cookie_header.split(';') {
        let (key, value) = pair.trim().split_once('=')?;
        if key == name && !value.is_empty() {
            return Some(value.to_string());
        }
    }

    None
}
