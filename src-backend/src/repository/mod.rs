//! Repository Layer
//!
//! Data access abstractions and implementations.

mod traits;
mod db;
mod deal_repo;
mod deal_positioning;
mod memory_repo;
mod rest_repo;

#[cfg(test)]
mod tests;

use std::sync::Arc;

pub use traits::Repository;
pub use db::{init_db, DbState, SharedConnection};
pub use deal_repo::SqliteDealRepository;
pub use deal_positioning::DealStore;
pub use memory_repo::{FailurePlan, MemoryDealRepository};
pub use rest_repo::RestDealRepository;

use crate::config::StoreConfig;
use crate::domain::DomainResult;

/// Shared handle to whichever deal store is configured
pub type SharedDealStore = Arc<dyn DealStore>;

/// Build the deal store described by `config`
pub async fn open_store(config: &StoreConfig) -> DomainResult<SharedDealStore> {
    match config {
        StoreConfig::Sqlite { path } => {
            let state = init_db(path).await?;
            Ok(Arc::new(SqliteDealRepository::new(state.conn)))
        }
        StoreConfig::Supabase { url, anon_key, table } => {
            log::info!("Using Supabase store {} (table {})", url, table);
            Ok(Arc::new(RestDealRepository::new(url.clone(), anon_key.clone(), table.clone())))
        }
        StoreConfig::Memory => Ok(Arc::new(MemoryDealRepository::new())),
    }
}
