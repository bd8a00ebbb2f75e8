//! Authentication: JWTs, password hashing, the refresh cookie and the
//! request extractors that turn a bearer token into a [`CurrentUser`].

pub mod extractor;
pub mod jwt;
pub mod password;

use axum::http::{header, HeaderMap, HeaderValue};

pub use extractor::{require_admin, AdminUser, CurrentUser};
pub use jwt::{Claims, JwtManager, TokenPair};

/// Name of the HTTP-only refresh cookie.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Path the refresh cookie is scoped to.
const COOKIE_PATH: &str = "/api/v1/auth";

/// `Set-Cookie` value carrying a refresh token.
pub fn refresh_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{REFRESH_COOKIE}={token}; HttpOnly; SameSite=Strict; Path={COOKIE_PATH}; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that deletes the refresh cookie.
pub fn clear_refresh_cookie(secure: bool) -> String {
    refresh_cookie("", 0, secure)
}

/// Refresh token from the request's `Cookie` headers, if present.
pub fn read_refresh_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == REFRESH_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Builds a header map holding one `Set-Cookie`.
pub fn set_cookie_header(cookie: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(cookie) {
        headers.insert(header::SET_COOKIE, value);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_format() {
        let cookie = refresh_cookie("abc", 604_800, true);
        assert!(cookie.starts_with("refreshToken=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(cookie.ends_with("; Secure"));

        assert!(clear_refresh_cookie(false).contains("Max-Age=0"));
    }

    #[test]
    fn test_read_refresh_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; refreshToken=tok.en.value; lang=en"),
        );
        assert_eq!(read_refresh_cookie(&headers).as_deref(), Some("tok.en.value"));

        let mut empty = HeaderMap::new();
        empty.insert(header::COOKIE, HeaderValue::from_static("refreshToken="));
        assert!(read_refresh_cookie(&empty).is_none());
        assert!(read_refresh_cookie(&HeaderMap::new()).is_none());
    }
}
