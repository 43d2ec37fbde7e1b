//! Pipeline Board
//!
//! Kanban board over sales deals: drag a card, see it move at once, and
//! have the store agree afterwards.

pub mod board;
pub mod notify;
pub mod store;

pub use board::BoardController;
pub use notify::{Notifier, Severity, Toast, ToastQueue};
pub use store::{BoardCache, BoardQuery, CacheEvent, QueryCache};
