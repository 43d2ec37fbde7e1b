//! Optimistic State Application
//!
//! Applies a move plan to an in-memory board before the store confirms it.

use pipeline_backend::domain::{sort_canonical, Deal};

use super::ordering::MovePlan;

/// New board with `plan` applied, in canonical order.
///
/// `previous` is left untouched so it can serve as the rollback snapshot.
pub fn apply_plan(previous: &[Deal], plan: &MovePlan) -> Vec<Deal> {
    let mut next = previous.to_vec();
    for (id, patch) in plan.writes() {
        if let Some(deal) = next.iter_mut().find(|d| d.id == id) {
            patch.apply_to(deal);
        }
    }
    sort_canonical(&mut next);
    next
}
