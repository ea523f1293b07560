//! Key-Value Store
//!
//! The JSON namespace every module reads and writes. Whole values are replaced
//! on write; a batch of writes commits together.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

use super::db::not_initialized;
use super::events::{ChangeFeed, StoreEvent};
use super::keys::StorageKey;
use crate::domain::{DomainError, DomainResult};

/// One write in a batch
#[derive(Debug, Clone, PartialEq)]
pub enum KvWrite {
    Put { key: String, value: String },
    Remove { key: String },
}

impl KvWrite {
    pub fn key(&self) -> &str {
        match self {
            KvWrite::Put { key, .. } | KvWrite::Remove { key } => key,
        }
    }

    /// Serialize `value` as the new content of `key`
    pub fn put_json<V: Serialize + ?Sized>(key: &StorageKey, value: &V) -> DomainResult<Self> {
        Ok(KvWrite::Put {
            key: key.as_key(),
            value: serde_json::to_string(value)?,
        })
    }

    pub fn remove(key: &StorageKey) -> Self {
        KvWrite::Remove { key: key.as_key() }
    }
}

/// Storage contract for the JSON namespace
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Raw value of a key
    async fn get(&self, key: &str) -> DomainResult<Option<String>>;

    /// Apply all writes atomically, then publish one event per key
    async fn write_batch(&self, writes: Vec<KvWrite>) -> DomainResult<()>;

    /// Allocate the next id of a named sequence (starts at 1)
    async fn next_id(&self, sequence: &str) -> DomainResult<u64>;

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

/// Read a JSON value, treating missing and malformed values as default.
///
/// Malformed JSON is logged and masked, never propagated.
pub async fn load_json<V>(store: &dyn KvStore, key: &StorageKey) -> DomainResult<V>
where
    V: DeserializeOwned + Default,
{
    Ok(load_json_opt(store, key).await?.unwrap_or_default())
}

/// Read a JSON value; `None` when the key is missing or malformed
pub async fn load_json_opt<V>(store: &dyn KvStore, key: &StorageKey) -> DomainResult<Option<V>>
where
    V: DeserializeOwned,
{
    let Some(raw) = store.get(&key.as_key()).await? else {
        return Ok(None);
    };
    match serde_json::from_str::<V>(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            log::warn!("Ignoring malformed value for key {}: {}", key, e);
            Ok(None)
        }
    }
}

/// SQLite implementation of the JSON namespace
pub struct SqliteKvStore {
    conn: Arc<Mutex<Option<Connection>>>,
    feed: ChangeFeed,
}

impl SqliteKvStore {
    pub fn new(conn: Arc<Mutex<Option<Connection>>>, feed: ChangeFeed) -> Self {
        Self { conn, feed }
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> DomainResult<Option<String>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let value = conn
            .query_row("SELECT value FROM kv_store WHERE key = ?", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    async fn write_batch(&self, writes: Vec<KvWrite>) -> DomainResult<()> {
        if writes.is_empty() {
            return Ok(());
        }

        {
            let mut guard = self.conn.lock().await;
            let conn = guard.as_mut().ok_or_else(not_initialized)?;
            let now = chrono::Utc::now().timestamp_millis();

            let tx = conn.transaction()?;
            for write in &writes {
                match write {
                    KvWrite::Put { key, value } => {
                        tx.execute(
                            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
                             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                            params![key, value, now],
                        )?;
                    }
                    KvWrite::Remove { key } => {
                        tx.execute("DELETE FROM kv_store WHERE key = ?", params![key])?;
                    }
                }
            }
            tx.commit()?;
        }

        for write in writes {
            self.feed.publish(StoreEvent::Key(write.key().to_string()));
        }
        Ok(())
    }

    async fn next_id(&self, sequence: &str) -> DomainResult<u64> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let value = conn.query_row(
            "INSERT INTO sequences (name, value) VALUES (?, 1)
             ON CONFLICT(name) DO UPDATE SET value = value + 1
             RETURNING value",
            params![sequence],
            |row| row.get::<_, i64>(0),
        )?;
        u64::try_from(value).map_err(|_| DomainError::Internal(format!("Sequence {} overflowed", sequence)))
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.feed.subscribe()
    }
}
