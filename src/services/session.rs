//! Current User Session
//!
//! The signed-in user is the `currentUser` key; there are no credentials.

use std::sync::Arc;

use crate::domain::{DomainError, DomainResult, UserRecord};
use crate::repository::{load_json_opt, KvStore, KvWrite, Repository, StorageKey, UserRepository};

pub struct SessionService {
    store: Arc<dyn KvStore>,
    users: Arc<UserRepository>,
}

impl SessionService {
    pub fn new(store: Arc<dyn KvStore>, users: Arc<UserRepository>) -> Self {
        Self { store, users }
    }

    /// Sign in as an existing user record
    pub async fn sign_in(&self, username: &str) -> DomainResult<UserRecord> {
        let user = self
            .users
            .find_by_id(username.trim().to_string())
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("User {}", username)))?;

        self.store
            .write_batch(vec![KvWrite::put_json(&StorageKey::CurrentUser, &user)?])
            .await?;
        log::info!("{} signed in as {}", user.username, user.role.as_str());
        Ok(user)
    }

    pub async fn current_user(&self) -> DomainResult<Option<UserRecord>> {
        load_json_opt(self.store.as_ref(), &StorageKey::CurrentUser).await
    }

    pub async fn sign_out(&self) -> DomainResult<()> {
        self.store
            .write_batch(vec![KvWrite::remove(&StorageKey::CurrentUser)])
            .await
    }

    pub async fn require_user(&self) -> DomainResult<UserRecord> {
        self.current_user()
            .await?
            .ok_or_else(|| DomainError::Unauthorized("Please log in".into()))
    }

    pub async fn require_admin(&self) -> DomainResult<UserRecord> {
        let user = self.require_user().await?;
        if !user.is_admin() {
            return Err(DomainError::Unauthorized("Admin role required".into()));
        }
        Ok(user)
    }
}
