//! Repository Layer - Core Traits
//!
//! Defines the abstract interfaces for data access.
//! Implementations can use SQLite, Supabase, in-memory, etc.

use async_trait::async_trait;
use crate::domain::{Entity, DomainResult};

/// Core repository trait for CRUD operations
///
/// Generic over any Entity type.
/// All operations are async to support various backends.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Create a new entity, returning it as stored
    async fn create(&self, entity: &T) -> DomainResult<T>;

    /// Find entity by ID
    async fn find_by_id(&self, id: &T::Id) -> DomainResult<Option<T>>;

    /// List entities matching a filter, in the store's canonical order
    async fn list(&self, filter: &T::Filter) -> DomainResult<Vec<T>>;

    /// Apply a partial update to one entity
    ///
    /// Fails with `NotFound` when no entity has this ID.
    async fn update(&self, id: &T::Id, patch: &T::Patch) -> DomainResult<()>;

    /// Delete entity by ID
    async fn delete(&self, id: &T::Id) -> DomainResult<()>;
}
