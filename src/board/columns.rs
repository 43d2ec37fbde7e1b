//! Board Columns
//!
//! Columns are not stored; they are derived from the deal list by grouping
//! on stage and sorting by order index.

use std::collections::HashMap;

use pipeline_backend::domain::{sort_canonical, Deal, DealId, Stage};

/// One status bucket and the deals in it, top to bottom
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub stage: Stage,
    pub deals: Vec<Deal>,
}

impl Column {
    pub fn len(&self) -> usize {
        self.deals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }

    /// Sum of deal values, shown in the column header
    pub fn total_value(&self) -> f64 {
        self.deals.iter().map(|d| d.value).sum()
    }

    pub fn position_of(&self, id: &DealId) -> Option<usize> {
        self.deals.iter().position(|d| &d.id == id)
    }

    pub fn order_indexes(&self) -> Vec<i64> {
        self.deals.iter().map(|d| d.order_index).collect()
    }
}

/// The column for `stage`, sorted
pub fn column_of(board: &[Deal], stage: &Stage) -> Column {
    let mut deals: Vec<Deal> = board.iter().filter(|d| &d.stage == stage).cloned().collect();
    sort_canonical(&mut deals);
    Column {
        stage: stage.clone(),
        deals,
    }
}

/// One column per configured stage, in order.
///
/// Deals whose stage is not configured still get a column, appended after
/// the configured ones in the order their stages first appear.
pub fn columns_for(stages: &[Stage], board: &[Deal]) -> Vec<Column> {
    let mut by_stage: HashMap<&Stage, Vec<Deal>> = HashMap::new();
    let mut extra_stages: Vec<&Stage> = Vec::new();
    for deal in board {
        if !stages.contains(&deal.stage) && !extra_stages.contains(&&deal.stage) {
            extra_stages.push(&deal.stage);
        }
        by_stage.entry(&deal.stage).or_default().push(deal.clone());
    }

    stages
        .iter()
        .chain(extra_stages)
        .map(|stage| {
            let mut deals = by_stage.remove(stage).unwrap_or_default();
            sort_canonical(&mut deals);
            Column {
                stage: stage.clone(),
                deals,
            }
        })
        .collect()
}
