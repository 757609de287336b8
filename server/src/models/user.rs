use serde::{Deserialize, Serialize};

use super::RowId;

/// A registered account.
///
/// The password hash never leaves the server: it is skipped when serializing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: RowId,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

impl User {
    #[must_use]
    pub fn id(&self) -> RowId {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

#[derive(Debug, Clone)]
pub struct UserCreate {
    pub username: String,
    /// PHC-format hash produced by [`crate::auth::password::hash_password`].
    pub password_hash: String,
}
