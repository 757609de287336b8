//! # Custom HTTP middleware

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::CACHE_CONTROL},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use chrono::Duration;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{debug, error};

use crate::{
    app::AppState,
    auth::{Session, SessionData},
};

/// Name of the private cookie holding [`SessionData`].
pub const SESSION_COOKIE: &str = "flashdeck_session";

/// # `Cache-Control` policy
///
/// Turns into a [`SetResponseHeaderLayer`] which sets `Cache-Control` on responses that do not
/// already carry one.
///
/// ```ignore
/// CachePolicy::public(Duration::hours(1)).layer()
/// ```
/// adds
/// ```text
/// Cache-Control: public, max-age=3600
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// `no-store`
    NoStore,
    /// `public, max-age=N`, with the age truncated to whole seconds
    Public { max_age: Duration },
}

impl CachePolicy {
    #[must_use]
    pub fn public(max_age: Duration) -> Self {
        Self::Public { max_age }
    }

    #[must_use]
    pub fn header_value(self) -> HeaderValue {
        match self {
            CachePolicy::NoStore => HeaderValue::from_static("no-store"),
            CachePolicy::Public { max_age } => {
                let seconds = max_age.num_seconds().max(0);
                HeaderValue::try_from(format!("public, max-age={seconds}"))
                    .unwrap_or_else(|_| HeaderValue::from_static("no-store"))
            }
        }
    }

    #[must_use]
    pub fn layer(self) -> SetResponseHeaderLayer<HeaderValue> {
        SetResponseHeaderLayer::if_not_present(CACHE_CONTROL, self.header_value())
    }
}

impl From<CachePolicy> for SetResponseHeaderLayer<HeaderValue> {
    fn from(value: CachePolicy) -> Self {
        value.layer()
    }
}

/// # Session middleware
///
/// Decodes the session cookie (or starts a new session), exposes it to handlers as a
/// [`Session`] request extension, and writes it back when the handler changed it.
///
/// A cookie that fails decryption or parsing is treated as absent.
pub async fn session(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = jar.get(SESSION_COOKIE).and_then(|cookie| {
        serde_json::from_str::<SessionData>(cookie.value())
            .inspect_err(|err| debug!("discarding unreadable session cookie: {err}"))
            .ok()
    });
    let session = Session::load(existing);
    request.extensions_mut().insert(session.clone());

    let response = next.run(request).await;
    if !session.is_modified() {
        return response;
    }

    match serde_json::to_string(&session.data()) {
        Ok(value) => {
            let cookie = Cookie::build((SESSION_COOKIE, value))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .secure(state.cookie.secure);
            (jar.add(cookie), response).into_response()
        }
        Err(err) => {
            error!("failed to encode session cookie: {err}");
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::CachePolicy;

    #[test]
    fn test_cache_header_values() {
        assert_eq!(CachePolicy::NoStore.header_value(), "no-store");
        assert_eq!(
            CachePolicy::public(Duration::hours(1)).header_value(),
            "public, max-age=3600"
        );
        assert_eq!(
            CachePolicy::public(Duration::milliseconds(1500)).header_value(),
            "public, max-age=1"
        );
    }
}
