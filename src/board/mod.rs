//! Board
//!
//! Columns, card ordering and the drag/drop move lifecycle.

pub mod columns;
pub mod optimistic;
pub mod ordering;
pub mod reorder;

pub use columns::{column_of, columns_for, Column};
pub use optimistic::apply_plan;
pub use ordering::{insertion_order_index, plan_move, reorder_within, BoardSlot, CardMove, MovePlan};
pub use reorder::{BoardController, MoveOutcome, MoveReport, Phase, ReorderState, Snapshot};
