//! Reorder Persistence and Reconciliation
//!
//! One drag gesture runs through an explicit state machine:
//!
//! ```text
//! idle -> dragging -> committing -> settled | rolled_back -> reconciled -> idle
//! ```
//!
//! The snapshot taken before the optimistic update travels with the state
//! so rollback never depends on anything captured elsewhere. Errors end up
//! as toasts; nothing here fails past `handle_drop`.

use std::sync::Arc;

use board_dragdrop::{DropEvent, Slot};
use pipeline_backend::domain::{
    Deal, DealFilter, DealId, DealPatch, DomainError, DomainResult, Stage,
};
use pipeline_backend::repository::SharedDealStore;
use pipeline_backend::BoardConfig;
use serde::Serialize;
use tokio::task::JoinSet;

use super::columns::{column_of, columns_for, Column};
use super::optimistic::apply_plan;
use super::ordering::{plan_move, translate_index, BoardSlot, CardMove, MovePlan};
use crate::notify::{Notifier, Toast};
use crate::store::{BoardCache, BoardQuery};

/// Named phases of a gesture, in the order they are entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Dragging,
    Committing,
    Settled,
    RolledBack,
    Reconciled,
}

/// The board as it was before the optimistic update
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    deals: Arc<Vec<Deal>>,
    /// Prior values of every card the plan writes, including cards the
    /// board's filter hides
    written: Vec<Deal>,
}

impl Snapshot {
    /// Capture `deals` for the cache and, from `planned_from`, the cards
    /// `plan` is about to change
    pub fn capture(deals: Arc<Vec<Deal>>, planned_from: &[Deal], plan: &MovePlan) -> Self {
        let ids = plan.card_ids();
        let written = planned_from
            .iter()
            .filter(|d| ids.contains(&d.id))
            .cloned()
            .collect();
        Self { deals, written }
    }

    pub fn deals(&self) -> &[Deal] {
        &self.deals
    }

    fn find(&self, id: &DealId) -> Option<&Deal> {
        self.written.iter().find(|d| &d.id == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReorderState {
    Idle,
    /// Optimistic state is in the cache; writes are in flight
    Committing { snapshot: Snapshot, plan: MovePlan },
    /// Every write succeeded
    Settled { snapshot: Snapshot, plan: MovePlan },
    /// A write failed and the snapshot was put back
    RolledBack { snapshot: Snapshot, error: DomainError },
    /// The board was re-fetched from the store
    Reconciled { outcome: MoveOutcome },
}

impl ReorderState {
    pub fn phase(&self) -> Phase {
        match self {
            ReorderState::Idle => Phase::Idle,
            ReorderState::Committing { .. } => Phase::Committing,
            ReorderState::Settled { .. } => Phase::Settled,
            ReorderState::RolledBack { .. } => Phase::RolledBack,
            ReorderState::Reconciled { .. } => Phase::Reconciled,
        }
    }

    fn outcome(&self) -> MoveOutcome {
        match self {
            ReorderState::Settled { .. } => MoveOutcome::Committed,
            ReorderState::RolledBack { error, .. } => MoveOutcome::RolledBack(error.clone()),
            ReorderState::Reconciled { outcome } => outcome.clone(),
            ReorderState::Idle | ReorderState::Committing { .. } => MoveOutcome::Ignored,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", content = "error", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// Nothing to do: dropped outside the board, on its own slot, or unknown card
    Ignored,
    Committed,
    RolledBack(DomainError),
}

/// What happened to one drop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveReport {
    pub outcome: MoveOutcome,
    pub phases: Vec<Phase>,
}

impl MoveReport {
    fn ignored() -> Self {
        Self {
            outcome: MoveOutcome::Ignored,
            phases: vec![Phase::Dragging, Phase::Idle],
        }
    }
}

/// Drives board moves against the store, the query cache and the toast surface
pub struct BoardController {
    store: SharedDealStore,
    cache: Arc<BoardCache>,
    notifier: Arc<dyn Notifier>,
    query: BoardQuery,
    config: BoardConfig,
}

impl BoardController {
    pub fn new(
        store: SharedDealStore,
        cache: Arc<BoardCache>,
        notifier: Arc<dyn Notifier>,
        config: BoardConfig,
    ) -> Self {
        Self {
            store,
            cache,
            notifier,
            query: BoardQuery::default(),
            config,
        }
    }

    /// Show only deals matching `query`
    pub fn with_query(mut self, query: BoardQuery) -> Self {
        self.query = query;
        self
    }

    pub fn query(&self) -> &BoardQuery {
        &self.query
    }

    /// Fetch the board from the store and cache it
    pub async fn load(&self) -> DomainResult<Arc<Vec<Deal>>> {
        let deals = Arc::new(self.store.list(&self.query.filter).await?);
        self.cache.set(self.query.clone(), deals.clone());
        Ok(deals)
    }

    /// Cached board, if loaded
    pub fn board(&self) -> Option<Arc<Vec<Deal>>> {
        self.cache.get(&self.query)
    }

    /// Configured columns for the cached board
    pub fn columns(&self) -> Vec<Column> {
        let board = self.board().unwrap_or_default();
        columns_for(&self.config.stages, &board)
    }

    async fn current_board(&self) -> DomainResult<Arc<Vec<Deal>>> {
        match self.board() {
            Some(board) if !self.cache.is_stale(&self.query) => Ok(board),
            _ => self.load().await,
        }
    }

    /// Move a card by id to `index` in `stage`, as if it had been dragged there
    pub async fn move_card(&self, card_id: &DealId, stage: &Stage, index: usize) -> MoveReport {
        let board = match self.current_board().await {
            Ok(board) => board,
            Err(e) => {
                log::error!("Failed to load board: {}", e);
                self.notifier.notify(Toast::error("Error loading deals"));
                return MoveReport::ignored();
            }
        };
        let Some(card) = board.iter().find(|d| &d.id == card_id) else {
            log::warn!("Move of unknown deal {} ignored", card_id);
            return MoveReport::ignored();
        };
        let source_index = column_of(&board, &card.stage).position_of(card_id).unwrap_or(0);
        let source = Slot::new(card.stage.as_str(), source_index);
        let destination = Slot::new(stage.as_str(), index);
        self.handle_drop(DropEvent::new(card_id.clone(), source, Some(destination)))
            .await
    }

    /// Carry out a drop from the drag tracker
    pub async fn handle_drop(&self, event: DropEvent<DealId>) -> MoveReport {
        let Some(destination) = event.destination else {
            log::info!("Drop of {} outside any column ignored", event.card_id);
            return MoveReport::ignored();
        };

        let board = match self.current_board().await {
            Ok(board) => board,
            Err(e) => {
                log::error!("Failed to load board: {}", e);
                self.notifier.notify(Toast::error("Error loading deals"));
                return MoveReport::ignored();
            }
        };

        let mv = CardMove::new(event.card_id, event.source.into(), destination.into());
        let (planned_from, plan) = match self.plan(&board, mv).await {
            Ok(Some(planned)) => planned,
            Ok(None) => return MoveReport::ignored(),
            Err(e) => {
                log::error!("Failed to load stage for move: {}", e);
                self.notifier.notify(Toast::error("Error loading deals"));
                return MoveReport::ignored();
            }
        };

        let mut phases = vec![Phase::Dragging];
        let mut state = self.begin(board, &planned_from, plan);
        phases.push(state.phase());
        state = self.commit(state).await;
        phases.push(state.phase());
        state = self.reconcile(state).await;
        phases.push(state.phase());
        phases.push(Phase::Idle);

        MoveReport {
            outcome: state.outcome(),
            phases,
        }
    }

    /// Compute the plan for `mv` over the cards it was planned from.
    ///
    /// Order values are shared by every card in a stage, so with a
    /// filtered board the stages involved are fetched in full and the drop
    /// index is mapped onto them.
    async fn plan(
        &self,
        board: &Arc<Vec<Deal>>,
        mv: CardMove,
    ) -> DomainResult<Option<(Vec<Deal>, MovePlan)>> {
        if self.query.filter == DealFilter::all() {
            return Ok(plan_move(board, &mv).map(|plan| (board.to_vec(), plan)));
        }
        let Some(card) = board.iter().find(|d| d.id == mv.card_id) else {
            return Ok(None);
        };

        let mut full = self.store.list(&DealFilter::stage(card.stage.clone())).await?;
        if card.stage != mv.to.stage {
            full.extend(self.store.list(&DealFilter::stage(mv.to.stage.clone())).await?);
        }
        let index = translate_index(&full, board, &mv.to.stage, &mv.card_id, mv.to.index);
        let to = BoardSlot::new(mv.to.stage.clone(), index);
        let mv = CardMove { to, ..mv };
        Ok(plan_move(&full, &mv).map(|plan| (full, plan)))
    }

    /// Snapshot `board` and put the optimistic result of `plan` in the
    /// cache. `planned_from` holds the stored cards the plan was computed
    /// over.
    pub fn begin(
        &self,
        board: Arc<Vec<Deal>>,
        planned_from: &[Deal],
        plan: MovePlan,
    ) -> ReorderState {
        let optimistic = apply_plan(&board, &plan);
        self.cache.set(self.query.clone(), optimistic);
        ReorderState::Committing {
            snapshot: Snapshot::capture(board, planned_from, &plan),
            plan,
        }
    }

    /// Persist the plan. Any failure, including the deadline passing,
    /// restores the snapshot.
    pub async fn commit(&self, state: ReorderState) -> ReorderState {
        let (snapshot, plan) = match state {
            ReorderState::Committing { snapshot, plan } => (snapshot, plan),
            other => return other,
        };

        let timeout = self.config.write_timeout();
        let mut written = Vec::new();
        let writes = self.write_all(plan.writes(), &mut written);
        let result = match tokio::time::timeout(timeout, writes).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::Timeout(format!(
                "Writes did not finish within {} ms",
                self.config.write_timeout_ms
            ))),
        };

        match result {
            Ok(()) => ReorderState::Settled { snapshot, plan },
            Err(error) => {
                log::error!("Move failed, rolling back: {}", error);
                self.cache.set(self.query.clone(), snapshot.deals.clone());
                self.notifier.notify(Toast::error(if plan.is_reorder() {
                    "Error reordering deals"
                } else {
                    "Error moving deal"
                }));

                // A timed-out write may still land, so every card is put back
                let touched = if matches!(error, DomainError::Timeout(_)) {
                    plan.card_ids()
                } else {
                    written
                };
                self.compensate(&snapshot, &touched).await;
                ReorderState::RolledBack { snapshot, error }
            }
        }
    }

    /// Re-fetch the board and make it the cached truth
    pub async fn reconcile(&self, state: ReorderState) -> ReorderState {
        let outcome = state.outcome();
        self.cache.invalidate(&self.query);
        if let Err(e) = self.load().await {
            log::warn!("Failed to refetch board after move: {}", e);
        }
        ReorderState::Reconciled { outcome }
    }

    /// Rewrite `stage` as 0..n-1 and refresh the board
    pub async fn renumber(&self, stage: &Stage) -> DomainResult<usize> {
        let changed = match self.store.renumber_stage(stage).await {
            Ok(changed) => changed,
            Err(e) => {
                log::error!("Failed to renumber {}: {}", stage, e);
                self.notifier.notify(Toast::error("Error renumbering deals"));
                return Err(e);
            }
        };
        self.reconcile(ReorderState::Idle).await;
        self.notifier
            .notify(Toast::info(format!("Renumbered {} deals in {}", changed, stage)));
        Ok(changed)
    }

    // Writes run concurrently; `written` collects the ids that made it so
    // the caller still knows them if this future is dropped on timeout.
    async fn write_all(
        &self,
        writes: Vec<(DealId, DealPatch)>,
        written: &mut Vec<DealId>,
    ) -> DomainResult<()> {
        let mut tasks = JoinSet::new();
        for (id, patch) in writes {
            let store = self.store.clone();
            tasks.spawn(async move {
                let result = store.update(&id, &patch).await;
                (id, result)
            });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, Ok(()))) => written.push(id),
                Ok((id, Err(e))) => {
                    log::error!("Failed to update deal {}: {}", id, e);
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    let e = DomainError::Internal(format!("Write task failed: {}", e));
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn compensate(&self, snapshot: &Snapshot, ids: &[DealId]) {
        if ids.is_empty() {
            return;
        }
        let restore = async {
            for id in ids {
                let Some(before) = snapshot.find(id) else { continue };
                let patch = DealPatch::position(before.stage.clone(), before.order_index);
                if let Err(e) = self.store.update(id, &patch).await {
                    log::warn!("Failed to restore deal {}: {}", id, e);
                }
            }
        };
        if tokio::time::timeout(self.config.write_timeout(), restore).await.is_err() {
            log::warn!("Restoring {} deals timed out", ids.len());
        }
    }
}
