//! Deal Positioning Operations
//!
//! Operations for managing deal order indexes within a stage.
//! The default bodies work on any deal repository through list/update;
//! the SQLite repository overrides them with direct SQL.

use async_trait::async_trait;
use rusqlite::params;

use crate::domain::{Deal, DealFilter, DealPatch, DomainError, DomainResult, Stage};
use super::traits::Repository;

/// Deal repository plus order index maintenance
#[async_trait]
pub trait DealStore: Repository<Deal> {
    /// Order index that places a new deal at the bottom of a stage
    async fn next_order_index(&self, stage: &Stage) -> DomainResult<i64> {
        let deals = self.list(&DealFilter::stage(stage.clone())).await?;
        Ok(deals.iter().map(|d| d.order_index).max().map_or(0, |max| max + 1))
    }

    /// Rewrite a stage's order indexes as 0, 1, 2, ... keeping the current order.
    ///
    /// Returns the number of deals whose index changed.
    async fn renumber_stage(&self, stage: &Stage) -> DomainResult<usize> {
        let deals = self.list(&DealFilter::stage(stage.clone())).await?;
        let mut changed = 0;
        for (new_pos, deal) in deals.iter().enumerate() {
            let new_pos = new_pos as i64;
            if deal.order_index != new_pos {
                self.update(&deal.id, &DealPatch::order(new_pos)).await?;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl DealStore for super::deal_repo::SqliteDealRepository {
    async fn next_order_index(&self, stage: &Stage) -> DomainResult<i64> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        conn.query_row(
            "SELECT COALESCE(MAX(order_index), -1) + 1 FROM deals WHERE stage = ?",
            params![stage.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .map_err(|e| DomainError::Internal(e.to_string()))
    }

    async fn renumber_stage(&self, stage: &Stage) -> DomainResult<usize> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let mut rows_to_fix = Vec::new();
        {
            let mut stmt = conn
                .prepare(
                    "SELECT id, order_index FROM deals WHERE stage = ? ORDER BY order_index, id",
                )
                .map_err(|e| DomainError::Internal(e.to_string()))?;
            let mut rows = stmt
                .query(params![stage.as_str()])
                .map_err(|e| DomainError::Internal(e.to_string()))?;

            let mut new_pos: i64 = 0;
            while let Some(row) = rows.next().map_err(|e| DomainError::Internal(e.to_string()))? {
                let id: String = row.get(0).map_err(|e| DomainError::Internal(e.to_string()))?;
                let current: i64 = row.get(1).map_err(|e| DomainError::Internal(e.to_string()))?;
                if current != new_pos {
                    rows_to_fix.push((id, new_pos));
                }
                new_pos += 1;
            }
        }

        // One transaction so a half-renumbered stage is never visible
        let tx = conn.transaction().map_err(|e| DomainError::Internal(e.to_string()))?;
        let now = chrono::Utc::now().to_rfc3339();
        for (id, new_pos) in &rows_to_fix {
            tx.execute(
                "UPDATE deals SET order_index = ?, updated_at = ? WHERE id = ?",
                params![new_pos, now, id],
            )
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        }
        tx.commit().map_err(|e| DomainError::Internal(e.to_string()))?;

        log::info!("Renumbered stage {}: {} deals changed", stage, rows_to_fix.len());
        Ok(rows_to_fix.len())
    }
}
