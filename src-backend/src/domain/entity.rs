//! Domain Layer - Core Entity Trait
//!
//! This trait defines the basic contract for all domain entities.
//! All entities must have a unique ID and be thread-safe.

use serde::{Deserialize, Serialize};

/// Core trait for all domain entities
pub trait Entity: Sized + Send + Sync + Clone {
    /// The type of the entity's unique identifier
    type Id: Clone + Eq + std::hash::Hash + std::fmt::Display + Send + Sync;
    /// Filter accepted by list queries
    type Filter: Send + Sync;
    /// Partial field update accepted by update-by-id
    type Patch: Send + Sync;

    /// Returns the entity's unique identifier
    fn id(&self) -> Self::Id;
}

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainError {
    NotFound(String),
    InvalidInput(String),
    Conflict(String),
    Internal(String),
    /// The backing store could not be reached or refused to serve the request
    Unavailable(String),
    /// A write did not settle within the configured deadline
    Timeout(String),
}

impl DomainError {
    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::NotFound(_) => "not_found",
            DomainError::InvalidInput(_) => "invalid_input",
            DomainError::Conflict(_) => "conflict",
            DomainError::Internal(_) => "internal",
            DomainError::Unavailable(_) => "unavailable",
            DomainError::Timeout(_) => "timeout",
        }
    }
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DomainError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            DomainError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            DomainError::Internal(msg) => write!(f, "Internal error: {}", msg),
            DomainError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
            DomainError::Timeout(msg) => write!(f, "Timed out: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::NotFound("Deal d-1 not found".to_string());
        assert_eq!(err.to_string(), "Not found: Deal d-1 not found");
        assert_eq!(DomainError::Timeout("x".into()).kind(), "timeout");
    }
}
