//! Deal Repository - In-Memory
//!
//! Process-local store for demos and tests. Writes can be scripted to fail
//! or hang so callers can exercise their rollback and timeout paths.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::Mutex;

use crate::domain::{sort_canonical, Deal, DealFilter, DealId, DealPatch, DomainError, DomainResult};
use super::deal_positioning::DealStore;
use super::traits::Repository;

/// Scripted behaviour for update calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePlan {
    #[default]
    Never,
    /// Fail only the n-th update call (1-based) counted from when the plan was set
    NthUpdate(usize),
    /// Fail every update
    AllUpdates,
    /// Never complete an update
    StallUpdates,
}

/// In-memory implementation of the deal repository
#[derive(Default)]
pub struct MemoryDealRepository {
    deals: Mutex<Vec<Deal>>,
    plan: Mutex<FailurePlan>,
    updates_since_plan: AtomicUsize,
    updates_total: AtomicUsize,
    next_id: AtomicU64,
}

impl MemoryDealRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `deals`
    pub fn with_deals(deals: Vec<Deal>) -> Self {
        Self {
            deals: Mutex::new(deals),
            ..Self::default()
        }
    }

    pub async fn set_failure_plan(&self, plan: FailurePlan) {
        *self.plan.lock().await = plan;
        self.updates_since_plan.store(0, Ordering::SeqCst);
    }

    /// Number of update calls received, failed ones included
    pub fn update_calls(&self) -> usize {
        self.updates_total.load(Ordering::SeqCst)
    }

    /// Copy of every stored deal in canonical order
    pub async fn snapshot(&self) -> Vec<Deal> {
        let mut deals = self.deals.lock().await.clone();
        sort_canonical(&mut deals);
        deals
    }

    async fn check_plan(&self) -> DomainResult<()> {
        let call = self.updates_since_plan.fetch_add(1, Ordering::SeqCst) + 1;
        self.updates_total.fetch_add(1, Ordering::SeqCst);

        let plan = *self.plan.lock().await;
        match plan {
            FailurePlan::Never => Ok(()),
            FailurePlan::NthUpdate(n) if n == call => {
                Err(DomainError::Unavailable(format!("simulated failure on update #{}", call)))
            }
            FailurePlan::NthUpdate(_) => Ok(()),
            FailurePlan::AllUpdates => {
                Err(DomainError::Unavailable("simulated write failure".to_string()))
            }
            FailurePlan::StallUpdates => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Repository<Deal> for MemoryDealRepository {
    async fn create(&self, entity: &Deal) -> DomainResult<Deal> {
        let mut deals = self.deals.lock().await;

        let mut deal = entity.clone();
        if deal.id.as_str().is_empty() {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            deal.id = DealId::new(format!("mem-{}", n));
        }
        if deals.iter().any(|d| d.id == deal.id) {
            return Err(DomainError::Conflict(format!("Deal {} already exists", deal.id)));
        }
        let now = chrono::Utc::now();
        deal.created_at.get_or_insert(now);
        deal.updated_at = Some(now);

        deals.push(deal.clone());
        Ok(deal)
    }

    async fn find_by_id(&self, id: &DealId) -> DomainResult<Option<Deal>> {
        let deals = self.deals.lock().await;
        Ok(deals.iter().find(|d| &d.id == id).cloned())
    }

    async fn list(&self, filter: &DealFilter) -> DomainResult<Vec<Deal>> {
        let deals = self.deals.lock().await;
        let mut matching: Vec<Deal> = deals.iter().filter(|d| filter.matches(d)).cloned().collect();
        sort_canonical(&mut matching);
        Ok(matching)
    }

    async fn update(&self, id: &DealId, patch: &DealPatch) -> DomainResult<()> {
        if patch.is_empty() {
            return Err(DomainError::InvalidInput(format!("Nothing to update for deal {}", id)));
        }
        self.check_plan().await?;

        let mut deals = self.deals.lock().await;
        let deal = deals
            .iter_mut()
            .find(|d| &d.id == id)
            .ok_or_else(|| DomainError::NotFound(format!("Deal {} not found", id)))?;
        patch.apply_to(deal);
        deal.updated_at = Some(chrono::Utc::now());
        Ok(())
    }

    async fn delete(&self, id: &DealId) -> DomainResult<()> {
        self.deals.lock().await.retain(|d| &d.id != id);
        Ok(())
    }
}

impl DealStore for MemoryDealRepository {}
