//! # JSON API
//!
//! Mounted under `/api`. Every error is reported as `{"error": "..."}` with the status code
//! chosen by [`ApiError`].

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::error;

use crate::{app::AppState, auth::AuthError, db::interface::DatabaseError};

mod auth;
pub(crate) mod extractors;
pub(crate) mod modules;

/// Returns the sub-router for `/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/csrf", get(auth::csrf_token))
        .route(
            "/modules",
            get(modules::list_modules).post(modules::create_module),
        )
        .route("/modules/{id}", get(modules::get_module))
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing or invalid CSRF token")]
    MissingCsrfToken,

    #[error("malformed request: {0}")]
    MalformedPayload(String),

    #[error("{0}")]
    Validation(String),

    #[error("username already taken")]
    UsernameTaken,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("not authenticated")]
    NotLoggedIn,

    #[error("not found")]
    NotFound,

    #[error("internal server error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        #[allow(clippy::enum_glob_use)]
        use ApiError::*;
        match self {
            MissingCsrfToken | MalformedPayload(_) | Validation(_) => StatusCode::BAD_REQUEST,
            UsernameTaken => StatusCode::CONFLICT,
            InvalidCredentials | NotLoggedIn => StatusCode::UNAUTHORIZED,
            NotFound => StatusCode::NOT_FOUND,
            Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound => ApiError::NotFound,
            _ => ApiError::Internal(error.into()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::MissingUsername | AuthError::PasswordTooShort => {
                ApiError::Validation(error.to_string())
            }
            AuthError::UsernameTaken => ApiError::UsernameTaken,
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::NotAuthenticated => ApiError::NotLoggedIn,
            AuthError::Hashing(err) => ApiError::Internal(Box::new(err)),
            AuthError::Task(err) => ApiError::Internal(err.into()),
            AuthError::Database(err) => err.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if let ApiError::Internal(err) = &self {
            error!("{err}");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::ApiError;
    use crate::{auth::AuthError, db::interface::DatabaseError};

    #[test]
    fn test_auth_errors_map_to_statuses() {
        let cases = [
            (AuthError::MissingUsername, StatusCode::BAD_REQUEST),
            (AuthError::PasswordTooShort, StatusCode::BAD_REQUEST),
            (AuthError::UsernameTaken, StatusCode::CONFLICT),
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::NotAuthenticated, StatusCode::UNAUTHORIZED),
            (
                AuthError::Database(DatabaseError::Other("disk on fire".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_hashing_error_keeps_its_source() {
        let err = ApiError::from(AuthError::Hashing(
            argon2::password_hash::Error::Password,
        ));
        let ApiError::Internal(source) = err else {
            panic!("expected an internal error");
        };
        assert!(
            source
                .downcast_ref::<argon2::password_hash::Error>()
                .is_some()
        );
    }

    #[test]
    fn test_validation_message_is_kept() {
        let err = ApiError::from(AuthError::PasswordTooShort);
        assert_eq!(err.to_string(), "password must be at least 4 characters");
    }
}
