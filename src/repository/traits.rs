//! Repository Traits
//!
//! Storage contracts the services depend on. Implemented by the JSON
//! collections in `kv_store` and by the SQLite `users` table.

use async_trait::async_trait;
use crate::domain::{DomainResult, Entity};

/// CRUD over one entity type.
///
/// `create` and `update` return the stored value; `update` and `delete`
/// fail with `NotFound` for unknown ids.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    async fn create(&self, entity: &T) -> DomainResult<T>;

    async fn find_by_id(&self, id: T::Id) -> DomainResult<Option<T>>;

    async fn exists(&self, id: T::Id) -> DomainResult<bool>;

    async fn list(&self) -> DomainResult<Vec<T>>;

    async fn update(&self, entity: &T) -> DomainResult<T>;

    async fn delete(&self, id: T::Id) -> DomainResult<()>;
}

/// Case-insensitive substring lookup
#[async_trait]
pub trait SearchableRepository<T: Entity>: Repository<T> {
    async fn search(&self, query: &str) -> DomainResult<Vec<T>>;
}
