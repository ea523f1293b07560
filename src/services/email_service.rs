//! Authorized Email Allowlist

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tokio::sync::Mutex;

use crate::domain::{DomainError, DomainResult};
use crate::repository::{load_json, KvStore, KvWrite, StorageKey};

fn email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_some_and(|re| re.is_match(email))
}

pub struct AuthorizedEmails {
    store: Arc<dyn KvStore>,
    lock: Mutex<()>,
}

impl AuthorizedEmails {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    pub async fn list(&self) -> DomainResult<Vec<String>> {
        load_json(self.store.as_ref(), &StorageKey::AuthorizedEmails).await
    }

    pub async fn add(&self, email: &str) -> DomainResult<Vec<String>> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(DomainError::InvalidInput("Please enter a valid email address".into()));
        }
        let _guard = self.lock.lock().await;

        let mut emails = self.list().await?;
        if emails.iter().any(|e| e == email) {
            return Err(DomainError::Conflict(format!("{} is already authorized", email)));
        }
        emails.push(email.to_string());
        self.save(&emails).await?;
        Ok(emails)
    }

    pub async fn remove(&self, email: &str) -> DomainResult<Vec<String>> {
        let _guard = self.lock.lock().await;

        let mut emails = self.list().await?;
        let before = emails.len();
        emails.retain(|e| e != email);
        if emails.len() == before {
            return Err(DomainError::NotFound(format!("Authorized email {}", email)));
        }
        self.save(&emails).await?;
        Ok(emails)
    }

    /// An empty allowlist authorizes everyone
    pub async fn is_authorized(&self, email: &str) -> DomainResult<bool> {
        let emails = self.list().await?;
        Ok(emails.is_empty() || emails.iter().any(|e| e.eq_ignore_ascii_case(email.trim())))
    }

    async fn save(&self, emails: &[String]) -> DomainResult<()> {
        self.store
            .write_batch(vec![KvWrite::put_json(&StorageKey::AuthorizedEmails, emails)?])
            .await
    }
}
