//! # Accounts and sessions
//!
//! Registration, login and logout on top of a [`UserRepository`] and the request's [`Session`].
//! None of this depends on HTTP; the API layer maps [`AuthError`] onto status codes.

pub mod csrf;
pub mod password;
mod session;

pub use session::{Session, SessionData};
use tracing::{error, info};

use crate::{
    db::interface::{DatabaseError, UserRepository},
    models::{RowId, User, UserCreate},
};

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("username is required")]
    MissingUsername,

    #[error("password must be at least 4 characters")]
    PasswordTooShort,

    #[error("username already taken")]
    UsernameTaken,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("failed to hash password: {0}")]
    Hashing(#[source] argon2::password_hash::Error),

    #[error("password task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Database(DatabaseError),
}

impl From<DatabaseError> for AuthError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::UniquenessViolation { .. } => AuthError::UsernameTaken,
            other => AuthError::Database(other),
        }
    }
}

/// Creates an account and returns its id. The caller's session is left untouched.
pub async fn register<D>(db: &D, username: &str, password: &str) -> Result<RowId, AuthError>
where
    D: UserRepository + ?Sized,
{
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::MissingUsername);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::PasswordTooShort);
    }
    if db.find_user_by_username(username).await?.is_some() {
        return Err(AuthError::UsernameTaken);
    }

    let password = password.to_owned();
    let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await?
        .map_err(AuthError::Hashing)?;

    let user = db
        .create_user(&UserCreate {
            username: username.to_owned(),
            password_hash,
        })
        .await?;
    info!(user_id = user.id, "registered user {}", user.username);
    Ok(user.id)
}

/// Verifies credentials and binds `session` to the user.
///
/// Unknown usernames and wrong passwords produce the same [`AuthError::InvalidCredentials`].
pub async fn login<D>(
    db: &D,
    session: &Session,
    username: &str,
    password: &str,
) -> Result<User, AuthError>
where
    D: UserRepository + ?Sized,
{
    let Some(user) = db.find_user_by_username(username.trim()).await? else {
        return Err(AuthError::InvalidCredentials);
    };

    let password = password.to_owned();
    let hash = user.password_hash.clone();
    let valid =
        tokio::task::spawn_blocking(move || password::verify_password(&password, &hash)).await?;
    if !valid {
        return Err(AuthError::InvalidCredentials);
    }

    session.set_user(user.id);
    info!(user_id = user.id, "user logged in");
    Ok(user)
}

/// Drops the authenticated identity from `session`.
pub fn logout(session: &Session) -> Result<RowId, AuthError> {
    let user_id = session.clear_user().ok_or(AuthError::NotAuthenticated)?;
    info!(user_id, "user logged out");
    Ok(user_id)
}

/// The user bound to `session`, if any.
///
/// A session pointing at a user that no longer exists counts as anonymous. Storage errors are
/// logged and also reported as no user.
pub async fn current_user<D>(db: &D, session: &Session) -> Option<User>
where
    D: UserRepository + ?Sized,
{
    let user_id = session.user_id()?;
    match db.get_user_by_id(user_id).await {
        Ok(user) => user,
        Err(err) => {
            error!(user_id, "failed to load session user: {err}");
            None
        }
    }
}
