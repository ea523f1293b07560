//! Repository Layer
//!
//! Data access abstractions and implementations.

mod traits;
pub(crate) mod db;
mod events;
mod keys;
mod kv_store;
mod collection;
mod user_repo;

#[cfg(test)]
mod tests;

pub use traits::{Repository, SearchableRepository};
pub use db::{init_db, DbState, IN_MEMORY};
pub use events::{ChangeFeed, StoreEvent};
pub use keys::StorageKey;
pub use kv_store::{load_json, load_json_opt, KvStore, KvWrite, SqliteKvStore};
pub use collection::CollectionRepository;
pub use user_repo::UserRepository;
