//! Base repository trait with the common CRUD operations.
//!
//! Implementations are bound to a `PersistenceContext`, so every call shares
//! its transaction and identity map.

use async_trait::async_trait;

use common::AppResult;
use domain::{Page, PageRequest, Sort};

/// Generic CRUD contract implemented by every entity repository.
#[async_trait]
pub trait CrudRepository: Send {
    type Entity: Send + Sync + 'static;
    type Id: Copy + Send + Sync + 'static;

    /// Insert a transient entity, or merge a persistent one into the context.
    ///
    /// Inserts run immediately so the identity is known; merges are written
    /// at the next flush.
    async fn save(&mut self, entity: Self::Entity) -> AppResult<Self::Entity>;

    /// Save every entity in order
    async fn save_all(&mut self, entities: Vec<Self::Entity>) -> AppResult<Vec<Self::Entity>> {
        let mut saved = Vec::with_capacity(entities.len());
        for entity in entities {
            saved.push(self.save(entity).await?);
        }
        Ok(saved)
    }

    /// Find by identity; managed instances are returned without a query
    async fn find_by_id(&mut self, id: Self::Id) -> AppResult<Option<Self::Entity>>;

    async fn exists_by_id(&mut self, id: Self::Id) -> AppResult<bool> {
        Ok(self.find_by_id(id).await?.is_some())
    }

    async fn find_all(&mut self) -> AppResult<Vec<Self::Entity>>;

    async fn find_all_by_id(&mut self, ids: &[Self::Id]) -> AppResult<Vec<Self::Entity>>;

    async fn find_all_sorted(&mut self, sort: &Sort) -> AppResult<Vec<Self::Entity>>;

    async fn find_all_paged(&mut self, request: &PageRequest) -> AppResult<Page<Self::Entity>>;

    async fn count(&mut self) -> AppResult<u64>;

    /// Delete immediately; deleting a removed or transient entity is a no-op
    async fn delete(&mut self, entity: &Self::Entity) -> AppResult<()>;

    /// Delete by identity; fails with `NotFound` when nothing was deleted
    async fn delete_by_id(&mut self, id: Self::Id) -> AppResult<()>;

    /// Delete every row and detach every managed instance
    async fn delete_all(&mut self) -> AppResult<u64>;
}
