use std::path::Path;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteSynchronous},
};
use tracing::debug;

use crate::{
    db::interface::{DatabaseError, DbFuture, ModuleRepository, UserRepository},
    models::{FlashcardModule, ModuleCreate, OwnedModule, RowId, User, UserCreate},
};


/// Statements run on every open. Tables are only created when missing; there is no versioned
/// migration history.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS flashcards (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        cards TEXT NOT NULL DEFAULT '[]',
        count_questions INTEGER NOT NULL DEFAULT 0,
        user_id INTEGER NULL REFERENCES users (id)
    )",
];

const MODULE_COLUMNS: &str = "f.id, f.name, f.description, f.cards, f.count_questions, f.user_id, \
     u.username AS owner_name";

#[derive(Debug, thiserror::Error)]
pub enum CreateSqliteClientError {
    #[error("failed to create database schema: {0}")]
    Schema(#[source] sqlx::Error),

    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Opens or creates the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self, CreateSqliteClientError> {
        Ok(Self {
            pool: Self::do_open(
                SqliteConnectOptions::new()
                    .create_if_missing(true)
                    .filename(path),
            )
            .await?,
        })
    }

    /// Creates a client that uses a new in-memory database.
    pub async fn new_memory() -> Result<Self, CreateSqliteClientError> {
        // sqlx has some special handling for the in-memory database which only
        // happens when parsing from a URL string
        Ok(Self {
            pool: Self::do_open("sqlite://:memory:".parse()?).await?,
        })
    }

    async fn do_open(
        base_options: SqliteConnectOptions,
    ) -> Result<SqlitePool, CreateSqliteClientError> {
        let options = base_options
            .synchronous(SqliteSynchronous::Normal)
            .optimize_on_close(true, None)
            .pragma("foreign_keys", "ON");
        let pool = SqlitePool::connect_with(options).await?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(CreateSqliteClientError::Schema)?;
        }
        debug!("database schema ready");

        Ok(pool)
    }
}

impl UserRepository for SqliteClient {
    fn create_user<'user>(&self, user: &'user UserCreate) -> DbFuture<'user, User> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let result = sqlx::query_as::<_, User>(
                "INSERT INTO users (username, password_hash)
                VALUES ($1, $2)
                RETURNING id, username, password_hash",
            )
            .bind(&user.username)
            .bind(&user.password_hash)
            .fetch_one(&pool)
            .await;
            match result {
                Ok(user) => Ok(user),
                Err(e) => match DatabaseError::from(e) {
                    DatabaseError::UniquenessViolation { .. } => {
                        Err(DatabaseError::UniquenessViolation {
                            field: Some("username".into()),
                        })
                    }
                    other => Err(other),
                },
            }
        })
    }

    fn find_user_by_username<'name>(&self, username: &'name str) -> DbFuture<'name, Option<User>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let user: Option<User> = sqlx::query_as(
                "SELECT id, username, password_hash FROM users WHERE username = $1",
            )
            .bind(username)
            .fetch_optional(&pool)
            .await?;
            Ok(user)
        })
    }

    fn get_user_by_id(&self, id: RowId) -> DbFuture<'static, Option<User>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let user: Option<User> =
                sqlx::query_as("SELECT id, username, password_hash FROM users WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&pool)
                    .await?;
            Ok(user)
        })
    }
}

impl ModuleRepository for SqliteClient {
    fn create_module<'module>(
        &self,
        module: &'module ModuleCreate,
    ) -> DbFuture<'module, FlashcardModule> {
        let pool = self.pool.clone();
        Box::pin(async move {
            Ok(sqlx::query_as::<_, FlashcardModule>(
                "INSERT INTO flashcards (name, description, cards, count_questions, user_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, name, description, cards, count_questions, user_id",
            )
            .bind(&module.name)
            .bind(&module.description)
            .bind(&module.cards)
            .bind(module.count_questions())
            .bind(module.user_id)
            .fetch_one(&pool)
            .await?)
        })
    }

    fn list_modules(&self) -> DbFuture<'static, Vec<OwnedModule>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let query = format!(
                "SELECT {MODULE_COLUMNS}
                 FROM flashcards f
                 LEFT JOIN users u ON u.id = f.user_id
                 ORDER BY f.id DESC"
            );
            let modules: Vec<OwnedModule> = sqlx::query_as(&query).fetch_all(&pool).await?;
            Ok(modules)
        })
    }

    fn get_module(&self, id: RowId) -> DbFuture<'static, Option<OwnedModule>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let query = format!(
                "SELECT {MODULE_COLUMNS}
                 FROM flashcards f
                 LEFT JOIN users u ON u.id = f.user_id
                 WHERE f.id = $1"
            );
            let module: Option<OwnedModule> = sqlx::query_as(&query)
                .bind(id)
                .fetch_optional(&pool)
                .await?;
            Ok(module)
        })
    }

    fn delete_all_modules(&self) -> DbFuture<'static, u64> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM flashcards").execute(&pool).await?;
            Ok(result.rows_affected())
        })
    }
}
