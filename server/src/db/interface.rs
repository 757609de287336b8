use std::{borrow::Cow, future::Future, pin::Pin};

use crate::models::{FlashcardModule, ModuleCreate, OwnedModule, RowId, User, UserCreate};

/// Boxed future returned by every repository method.
pub type DbFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DatabaseError>> + Send + 'a>>;

pub trait UserRepository: Send + Sync {
    /// Inserts a new user. Fails with [`DatabaseError::UniquenessViolation`] if the username is
    /// already taken.
    fn create_user<'user>(&self, user: &'user UserCreate) -> DbFuture<'user, User>;

    /// Exact, case-sensitive username lookup.
    fn find_user_by_username<'name>(&self, username: &'name str) -> DbFuture<'name, Option<User>>;

    fn get_user_by_id(&self, id: RowId) -> DbFuture<'static, Option<User>>;
}

pub trait ModuleRepository: Send + Sync {
    /// Inserts a module in a single statement. `count_questions` is taken from the card list.
    fn create_module<'module>(
        &self,
        module: &'module ModuleCreate,
    ) -> DbFuture<'module, FlashcardModule>;

    /// Every module, newest (highest id) first, with owner usernames joined in.
    fn list_modules(&self) -> DbFuture<'static, Vec<OwnedModule>>;

    fn get_module(&self, id: RowId) -> DbFuture<'static, Option<OwnedModule>>;

    /// Removes every module and returns how many rows were deleted.
    fn delete_all_modules(&self) -> DbFuture<'static, u64>;
}

/// Storage backend used by the HTTP layer.
///
/// Implemented automatically for anything that provides both repositories.
pub trait DatabaseClient: UserRepository + ModuleRepository + 'static {}

impl<T> DatabaseClient for T where T: UserRepository + ModuleRepository + 'static {}

/// Error type for database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("row/resource not found")]
    NotFound,

    #[error(
        "uniqueness violation {}{}",
        if field.is_some() { "on field " } else { "(field unknown)" },
        field.as_deref().unwrap_or("")
    )]
    UniquenessViolation {
        /// The field that caused the uniqueness violation, if known
        field: Option<Cow<'static, str>>,
    },

    #[error("database error: {0}")]
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                Self::UniquenessViolation { field: None }
            }
            other => Self::Other(Box::new(other)),
        }
    }
}
