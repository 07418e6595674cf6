// In-memory credential store for tests and local experiments

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::users::{
    error::StoreError,
    models::{NewUser, UniqueField, User},
    repository::UserRepository,
};

#[derive(Default)]
struct Table {
    next_id: i32,
    rows: BTreeMap<i32, User>,
}

impl Table {
    /// Same uniqueness rules as the `users` table constraints
    fn check_unique(&self, username: &str, email: &str, except: Option<i32>) -> Result<(), StoreError> {
        let taken = |matches: &dyn Fn(&User) -> bool| {
            self.rows
                .values()
                .any(|row| Some(row.id) != except && matches(row))
        };

        // Username is reported first, matching the service's own checks
        if taken(&|row| row.username == username) {
            return Err(StoreError::UniqueViolation(UniqueField::Username));
        }
        if taken(&|row| row.email == email) {
            return Err(StoreError::UniqueViolation(UniqueField::Email));
        }
        Ok(())
    }

    fn find(&self, predicate: impl Fn(&User) -> bool) -> Option<User> {
        self.rows.values().find(|row| predicate(row)).cloned()
    }
}

/// `UserRepository` held in process memory
#[derive(Default)]
pub struct InMemoryUserRepository {
    table: RwLock<Table>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.rows.is_empty()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut table = self.table.write().await;
        table.check_unique(&user.username, &user.email, None)?;

        table.next_id += 1;
        let now = Utc::now();
        let row = User {
            id: table.next_id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.table.read().await.find(|row| row.username == username))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.table.read().await.find(|row| row.email == email))
    }

    async fn find_by_username_or_email(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .table
            .read()
            .await
            .find(|row| row.username == identifier || row.email == identifier))
    }

    async fn save(&self, user: &User) -> Result<Option<User>, StoreError> {
        let mut table = self.table.write().await;
        if !table.rows.contains_key(&user.id) {
            return Ok(None);
        }
        table.check_unique(&user.username, &user.email, Some(user.id))?;

        let mut row = user.clone();
        row.updated_at = Utc::now();
        table.rows.insert(row.id, row.clone());
        Ok(Some(row))
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }
}
