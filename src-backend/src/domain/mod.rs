//! Domain Layer
//!
//! Contains all domain entities and core abstractions.
//! This layer has NO external dependencies (except serde and chrono for serialization).

mod entity;
mod deal;
mod stage;

pub use entity::{Entity, DomainError, DomainResult};
pub use deal::{sort_canonical, Deal, DealFilter, DealId, DealPatch, Priority};
pub use stage::Stage;
