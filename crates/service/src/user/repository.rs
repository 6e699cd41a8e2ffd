use std::sync::Arc;

use async_trait::async_trait;
use models::User;
use thiserror::Error;
use tracing::error;

use crate::storage::{MemStore, Record, StoreError};

impl Record for User {
    type Key = String;

    fn key(&self) -> String { self.email.clone() }
}

/// Outcome kinds of the user repository. Store internals never cross this boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepoError {
    #[error("user not found: {0}")]
    NotFound(String),
    #[error("user already exists: {0}")]
    AlreadyExists(String),
    #[error("store failure: {0}")]
    StoreFailure(String),
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::KeyExists(email) => Self::AlreadyExists(email),
            StoreError::KeyMissing(email) => Self::NotFound(email),
            other => {
                error!(error = %other, "user store transaction failed");
                Self::StoreFailure(other.to_string())
            }
        }
    }
}

/// Repository abstraction for user persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<(), RepoError>;
    async fn get_by_email(&self, email: &str) -> Result<User, RepoError>;
    async fn update(&self, user: &User) -> Result<(), RepoError>;
    async fn delete(&self, email: &str) -> Result<(), RepoError>;
    /// All users ordered by email; empty when there are none.
    async fn list(&self) -> Result<Vec<User>, RepoError>;
}

/// Repository backed by an injected [`MemStore`].
///
/// Every write stages against its snapshot and is re-validated at commit, so
/// concurrent creates of one email leave exactly one winner.
#[derive(Clone, Default)]
pub struct MemUserRepository {
    store: Arc<MemStore<User>>,
}

impl MemUserRepository {
    pub fn new(store: Arc<MemStore<User>>) -> Self { Self { store } }

    pub fn store(&self) -> &Arc<MemStore<User>> { &self.store }
}

#[async_trait]
impl UserRepository for MemUserRepository {
    async fn create(&self, user: &User) -> Result<(), RepoError> {
        let mut txn = self.store.begin(true);
        txn.insert(user.clone())?;
        txn.commit()?;
        Ok(())
    }

    async fn get_by_email(&self, email: &str) -> Result<User, RepoError> {
        let txn = self.store.begin(false);
        let found = txn.lookup(email)?;
        found
            .map(|u| User::clone(&u))
            .ok_or_else(|| RepoError::NotFound(email.to_string()))
    }

    async fn update(&self, user: &User) -> Result<(), RepoError> {
        let mut txn = self.store.begin(true);
        txn.replace(user.clone())?;
        txn.commit()?;
        Ok(())
    }

    async fn delete(&self, email: &str) -> Result<(), RepoError> {
        let mut txn = self.store.begin(true);
        txn.delete(email.to_string())?;
        txn.commit()?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>, RepoError> {
        let txn = self.store.begin(false);
        let users = txn.scan()?.map(|u| User::clone(&u)).collect();
        Ok(users)
    }
}

/// Simple in-memory mock repository for service tests
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockUserRepository {
        users: Mutex<HashMap<String, User>>,
    }

    impl MockUserRepository {
        fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, User>>, RepoError> {
            self.users.lock().map_err(|e| RepoError::StoreFailure(e.to_string()))
        }
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn create(&self, user: &User) -> Result<(), RepoError> {
            let mut users = self.lock()?;
            if users.contains_key(&user.email) {
                return Err(RepoError::AlreadyExists(user.email.clone()));
            }
            users.insert(user.email.clone(), user.clone());
            Ok(())
        }

        async fn get_by_email(&self, email: &str) -> Result<User, RepoError> {
            let users = self.lock()?;
            users.get(email).cloned().ok_or_else(|| RepoError::NotFound(email.to_string()))
        }

        async fn update(&self, user: &User) -> Result<(), RepoError> {
            let mut users = self.lock()?;
            match users.get_mut(&user.email) {
                Some(existing) => {
                    *existing = user.clone();
                    Ok(())
                }
                None => Err(RepoError::NotFound(user.email.clone())),
            }
        }

        async fn delete(&self, email: &str) -> Result<(), RepoError> {
            let mut users = self.lock()?;
            users.remove(email).map(|_| ()).ok_or_else(|| RepoError::NotFound(email.to_string()))
        }

        async fn list(&self) -> Result<Vec<User>, RepoError> {
            let users = self.lock()?;
            let mut list: Vec<User> = users.values().cloned().collect();
            list.sort_by(|a, b| a.email.cmp(&b.email));
            Ok(list)
        }
    }
}
