mod card;
mod config;
mod module;
mod user;

pub use card::{Card, CardList};
pub use config::AppConfig;
pub use module::{FlashcardModule, ModuleCreate, OwnedModule};
pub use user::{User, UserCreate};

/// Identifier type shared by every table; SQLite `INTEGER PRIMARY KEY` rowids.
pub type RowId = i64;
