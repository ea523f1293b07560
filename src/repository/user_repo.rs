//! User Repository
//!
//! SQLite-backed user records keyed by username.

use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::db::not_initialized;
use super::events::{ChangeFeed, StoreEvent};
use super::traits::{Repository, SearchableRepository};
use crate::domain::{DomainError, DomainResult, Role, UserRecord};

pub struct UserRepository {
    conn: Arc<Mutex<Option<Connection>>>,
    feed: ChangeFeed,
}

impl UserRepository {
    pub fn new(conn: Arc<Mutex<Option<Connection>>>, feed: ChangeFeed) -> Self {
        Self { conn, feed }
    }

    /// Users with the given role, ordered by username
    pub async fn list_by_role(&self, role: Role) -> DomainResult<Vec<UserRecord>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let mut stmt = conn.prepare("SELECT record FROM users WHERE role = ? ORDER BY username")?;
        let mut rows = stmt.query(params![role.as_str()])?;

        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            if let Some(user) = decode_record(&row.get::<_, String>(0)?) {
                users.push(user);
            }
        }
        Ok(users)
    }
}

#[async_trait]
impl Repository<UserRecord> for UserRepository {
    async fn create(&self, entity: &UserRecord) -> DomainResult<UserRecord> {
        {
            let guard = self.conn.lock().await;
            let conn = guard.as_ref().ok_or_else(not_initialized)?;

            let inserted = conn.execute(
                "INSERT OR IGNORE INTO users (username, email, role, record, updated_at) VALUES (?, ?, ?, ?, ?)",
                params![
                    entity.username,
                    entity.email,
                    entity.role.as_str(),
                    serde_json::to_string(entity)?,
                    chrono::Utc::now().timestamp_millis()
                ],
            )?;
            if inserted == 0 {
                return Err(DomainError::Conflict(format!("User {} already exists", entity.username)));
            }
        }

        self.feed.publish(StoreEvent::User(entity.username.clone()));
        Ok(entity.clone())
    }

    async fn find_by_id(&self, id: String) -> DomainResult<Option<UserRecord>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let mut stmt = conn.prepare("SELECT record FROM users WHERE username = ?")?;
        let mut rows = stmt.query(params![id])?;

        if let Some(row) = rows.next()? {
            Ok(decode_record(&row.get::<_, String>(0)?))
        } else {
            Ok(None)
        }
    }

    async fn exists(&self, id: String) -> DomainResult<bool> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    async fn list(&self) -> DomainResult<Vec<UserRecord>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let mut stmt = conn.prepare("SELECT record FROM users ORDER BY username")?;
        let mut rows = stmt.query([])?;

        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            if let Some(user) = decode_record(&row.get::<_, String>(0)?) {
                users.push(user);
            }
        }
        Ok(users)
    }

    async fn update(&self, entity: &UserRecord) -> DomainResult<UserRecord> {
        {
            let guard = self.conn.lock().await;
            let conn = guard.as_ref().ok_or_else(not_initialized)?;

            let updated = conn.execute(
                "UPDATE users SET email = ?, role = ?, record = ?, updated_at = ? WHERE username = ?",
                params![
                    entity.email,
                    entity.role.as_str(),
                    serde_json::to_string(entity)?,
                    chrono::Utc::now().timestamp_millis(),
                    entity.username
                ],
            )?;
            if updated == 0 {
                return Err(DomainError::NotFound(format!("User {}", entity.username)));
            }
        }

        self.feed.publish(StoreEvent::User(entity.username.clone()));
        Ok(entity.clone())
    }

    async fn delete(&self, id: String) -> DomainResult<()> {
        {
            let guard = self.conn.lock().await;
            let conn = guard.as_ref().ok_or_else(not_initialized)?;

            let deleted = conn.execute("DELETE FROM users WHERE username = ?", params![id])?;
            if deleted == 0 {
                return Err(DomainError::NotFound(format!("User {}", id)));
            }
        }

        self.feed.publish(StoreEvent::User(id));
        Ok(())
    }
}

#[async_trait]
impl SearchableRepository<UserRecord> for UserRepository {
    async fn search(&self, query: &str) -> DomainResult<Vec<UserRecord>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let pattern = format!("%{}%", escape_like(query.trim()));
        let mut stmt = conn.prepare(
            "SELECT record FROM users
             WHERE username LIKE ?1 ESCAPE '\\' OR email LIKE ?1 ESCAPE '\\'
             ORDER BY username",
        )?;
        let mut rows = stmt.query(params![pattern])?;

        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            if let Some(user) = decode_record(&row.get::<_, String>(0)?) {
                users.push(user);
            }
        }
        Ok(users)
    }
}

/// Match `%` and `_` literally in a LIKE pattern
fn escape_like(query: &str) -> String {
    query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Corrupt records are logged and skipped
fn decode_record(raw: &str) -> Option<UserRecord> {
    match serde_json::from_str(raw) {
        Ok(user) => Some(user),
        Err(e) => {
            log::warn!("Skipping malformed user record: {}", e);
            None
        }
    }
}
