//! # CSRF tokens
//!
//! Each session carries one random token. Mutating API calls must echo it back in the
//! `X-CSRF-TOKEN` header (`X-CSRFToken` is accepted too). Plain HTML form posts, which cannot
//! set headers, may send it in a [`CSRF_FIELD`] field instead where the handler allows it.

use axum::http::{HeaderMap, HeaderName};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;

/// Header names checked in order.
pub const CSRF_HEADERS: [HeaderName; 2] = [
    HeaderName::from_static("x-csrf-token"),
    HeaderName::from_static("x-csrftoken"),
];

/// Form field carrying the token in `application/x-www-form-urlencoded` bodies.
pub const CSRF_FIELD: &str = "csrf_token";

const TOKEN_BYTES: usize = 32; // 256 bits

/// Generates a new URL-safe token.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Returns `true` iff the request carries `session_token` in one of the [`CSRF_HEADERS`].
#[must_use]
pub fn check(headers: &HeaderMap, session_token: &str) -> bool {
    let Some(provided) = CSRF_HEADERS.iter().find_map(|name| headers.get(name)) else {
        return false;
    };
    provided
        .to_str()
        .is_ok_and(|provided| check_token(provided, session_token))
}

/// Returns `true` iff `provided` equals a non-empty `session_token`.
#[must_use]
pub fn check_token(provided: &str, session_token: &str) -> bool {
    if session_token.is_empty() {
        return false;
    }
    // blake3::Hash compares in constant time
    blake3::hash(provided.as_bytes()) == blake3::hash(session_token.as_bytes())
}
