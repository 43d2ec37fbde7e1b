//! Pipeline Backend
//!
//! Layered architecture:
//! - domain: Core entities and business rules
//! - repository: Data access abstractions and implementations
//! - config: Store and board settings

pub mod config;
pub mod domain;
pub mod repository;

pub use config::{AppConfig, BoardConfig, StoreConfig};
