//! JSON Collection Repository
//!
//! A `Vec<T>` persisted under one key. Every mutation reads the whole array,
//! edits it and writes it back.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;

use super::keys::StorageKey;
use super::kv_store::{load_json, KvStore, KvWrite};
use super::traits::Repository;
use crate::domain::{DomainError, DomainResult, NumberedEntity};

pub struct CollectionRepository<T> {
    store: Arc<dyn KvStore>,
    key: StorageKey,
    _entity: PhantomData<fn() -> T>,
}

impl<T> CollectionRepository<T>
where
    T: NumberedEntity + Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn KvStore>, key: StorageKey) -> Self {
        Self {
            store,
            key,
            _entity: PhantomData,
        }
    }

    pub fn key(&self) -> &StorageKey {
        &self.key
    }

    /// Read the whole collection
    pub async fn load_all(&self) -> DomainResult<Vec<T>> {
        load_json::<Vec<T>>(self.store.as_ref(), &self.key).await
    }

    /// Build the write that replaces the whole collection
    pub fn replace_write(&self, entities: &[T]) -> DomainResult<KvWrite> {
        KvWrite::put_json(&self.key, entities)
    }

    pub async fn save_all(&self, entities: &[T]) -> DomainResult<()> {
        self.store.write_batch(vec![self.replace_write(entities)?]).await
    }

    /// Allocate an id from this collection's sequence
    pub async fn next_id(&self) -> DomainResult<u64> {
        self.store.next_id(&self.key.as_key()).await
    }
}

#[async_trait]
impl<T> Repository<T> for CollectionRepository<T>
where
    T: NumberedEntity + Serialize + DeserializeOwned + 'static,
{
    async fn create(&self, entity: &T) -> DomainResult<T> {
        let mut entities = self.load_all().await?;

        let mut created = entity.clone();
        if created.id() == 0 {
            created.set_id(self.next_id().await?);
        } else if entities.iter().any(|e| e.id() == created.id()) {
            return Err(DomainError::Conflict(format!("{} {} already exists", self.key, created.id())));
        }

        entities.push(created.clone());
        self.save_all(&entities).await?;
        Ok(created)
    }

    async fn find_by_id(&self, id: u64) -> DomainResult<Option<T>> {
        Ok(self.load_all().await?.into_iter().find(|e| e.id() == id))
    }

    async fn exists(&self, id: u64) -> DomainResult<bool> {
        Ok(self.load_all().await?.iter().any(|e| e.id() == id))
    }

    async fn list(&self) -> DomainResult<Vec<T>> {
        self.load_all().await
    }

    async fn update(&self, entity: &T) -> DomainResult<T> {
        let mut entities = self.load_all().await?;
        let slot = entities
            .iter_mut()
            .find(|e| e.id() == entity.id())
            .ok_or_else(|| DomainError::NotFound(format!("{} {}", self.key, entity.id())))?;
        *slot = entity.clone();

        self.save_all(&entities).await?;
        Ok(entity.clone())
    }

    async fn delete(&self, id: u64) -> DomainResult<()> {
        let mut entities = self.load_all().await?;
        let before = entities.len();
        entities.retain(|e| e.id() != id);
        if entities.len() == before {
            return Err(DomainError::NotFound(format!("{} {}", self.key, id)));
        }
        self.save_all(&entities).await
    }
}
