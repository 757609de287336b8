use serde::{Deserialize, Serialize};

use super::{CardList, RowId};

/// A named deck of flashcards, as stored in the `flashcards` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct FlashcardModule {
    pub id: RowId,
    pub name: String,
    pub description: String,
    pub cards: CardList,
    /// Always equal to `cards.len()`; written alongside the cards on insert.
    pub count_questions: i64,
    /// Owning user, if any. Anonymous modules are allowed by the schema.
    pub user_id: Option<RowId>,
}

/// A module joined with its owner's username.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OwnedModule {
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub module: FlashcardModule,
    pub owner_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModuleCreate {
    pub name: String,
    pub description: String,
    pub cards: CardList,
    pub user_id: Option<RowId>,
}

impl ModuleCreate {
    /// Number of questions the new module will report.
    #[must_use]
    pub fn count_questions(&self) -> i64 {
        i64::try_from(self.cards.len()).unwrap_or(i64::MAX)
    }
}
