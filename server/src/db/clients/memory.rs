//! In-process storage backend.
//!
//! Behaves like the SQLite client for every repository operation (unique usernames, ascending
//! ids, newest-first listing) without touching the filesystem. Used by the HTTP tests.

use std::{
    future::ready,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    db::interface::{DatabaseError, DbFuture, ModuleRepository, UserRepository},
    models::{FlashcardModule, ModuleCreate, OwnedModule, RowId, User, UserCreate},
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    modules: Vec<FlashcardModule>,
    next_user_id: RowId,
    next_module_id: RowId,
}

impl Tables {
    fn owned(&self, module: &FlashcardModule) -> OwnedModule {
        let owner_name = module.user_id.and_then(|id| {
            self.users
                .iter()
                .find(|u| u.id == id)
                .map(|u| u.username.clone())
        });
        OwnedModule {
            module: module.clone(),
            owner_name,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryClient {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, DatabaseError> {
        self.tables
            .lock()
            .map_err(|_| DatabaseError::Other("memory store lock poisoned".into()))
    }

    fn with_tables<T, F>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&mut Tables) -> Result<T, DatabaseError>,
    {
        let mut tables = self.tables()?;
        f(&mut tables)
    }
}

impl UserRepository for MemoryClient {
    fn create_user<'user>(&self, user: &'user UserCreate) -> DbFuture<'user, User> {
        let result = self.with_tables(|t| {
            if t.users.iter().any(|u| u.username == user.username) {
                return Err(DatabaseError::UniquenessViolation {
                    field: Some("username".into()),
                });
            }
            t.next_user_id += 1;
            let created = User {
                id: t.next_user_id,
                username: user.username.clone(),
                password_hash: user.password_hash.clone(),
            };
            t.users.push(created.clone());
            Ok(created)
        });
        Box::pin(ready(result))
    }

    fn find_user_by_username<'name>(&self, username: &'name str) -> DbFuture<'name, Option<User>> {
        let result = self.with_tables(|t| {
            Ok(t.users.iter().find(|u| u.username == username).cloned())
        });
        Box::pin(ready(result))
    }

    fn get_user_by_id(&self, id: RowId) -> DbFuture<'static, Option<User>> {
        let result = self.with_tables(|t| Ok(t.users.iter().find(|u| u.id == id).cloned()));
        Box::pin(ready(result))
    }
}

impl ModuleRepository for MemoryClient {
    fn create_module<'module>(
        &self,
        module: &'module ModuleCreate,
    ) -> DbFuture<'module, FlashcardModule> {
        let result = self.with_tables(|t| {
            t.next_module_id += 1;
            let created = FlashcardModule {
                id: t.next_module_id,
                name: module.name.clone(),
                description: module.description.clone(),
                cards: module.cards.clone(),
                count_questions: module.count_questions(),
                user_id: module.user_id,
            };
            t.modules.push(created.clone());
            Ok(created)
        });
        Box::pin(ready(result))
    }

    fn list_modules(&self) -> DbFuture<'static, Vec<OwnedModule>> {
        let result = self.with_tables(|t| {
            let mut modules: Vec<OwnedModule> = t.modules.iter().map(|m| t.owned(m)).collect();
            modules.sort_by(|a, b| b.module.id.cmp(&a.module.id));
            Ok(modules)
        });
        Box::pin(ready(result))
    }

    fn get_module(&self, id: RowId) -> DbFuture<'static, Option<OwnedModule>> {
        let result = self.with_tables(|t| {
            Ok(t.modules.iter().find(|m| m.id == id).map(|m| t.owned(m)))
        });
        Box::pin(ready(result))
    }

    fn delete_all_modules(&self) -> DbFuture<'static, u64> {
        let result = self.with_tables(|t| {
            let removed = t.modules.len() as u64;
            t.modules.clear();
            Ok(removed)
        });
        Box::pin(ready(result))
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryClient;
    use crate::{
        db::interface::{DatabaseError, ModuleRepository, UserRepository},
        models::{Card, ModuleCreate, UserCreate},
    };

    fn user(name: &str) -> UserCreate {
        UserCreate {
            username: name.to_string(),
            password_hash: "not-a-real-hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let client = MemoryClient::new();
        client.create_user(&user("alice")).await.unwrap();
        let err = client.create_user(&user("alice")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::UniquenessViolation { .. }));
        // usernames are case-sensitive
        client.create_user(&user("Alice")).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_modules_newest_first_with_owner() {
        let client = MemoryClient::new();
        let owner = client.create_user(&user("bob")).await.unwrap();
        for name in ["one", "two", "three"] {
            client
                .create_module(&ModuleCreate {
                    name: name.to_string(),
                    description: String::new(),
                    cards: vec![Card::new("t", "d")].into(),
                    user_id: Some(owner.id),
                })
                .await
                .unwrap();
        }
        let modules = client.list_modules().await.unwrap();
        let names: Vec<_> = modules.iter().map(|m| m.module.name.as_str()).collect();
        assert_eq!(names, ["three", "two", "one"]);
        assert!(modules.iter().all(|m| m.owner_name.as_deref() == Some("bob")));

        assert_eq!(client.delete_all_modules().await.unwrap(), 3);
        assert!(client.list_modules().await.unwrap().is_empty());
    }
}
