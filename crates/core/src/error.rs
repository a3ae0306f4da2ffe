//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic business failures only. Every variant is surfaced to the
/// caller as-is; nothing in the domain layer retries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A referenced entity does not exist (or was deleted).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The operation is not valid for the entity's current status.
    #[error("{entity} in status {current} cannot {attempted}")]
    InvalidState {
        entity: &'static str,
        current: String,
        attempted: String,
    },

    /// A business rule on the request failed (empty items, duplicates, amounts).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The entity cannot be removed while dependents reference it.
    #[error("{entity} is referenced by {count} {dependents}")]
    ResourceInUse {
        entity: &'static str,
        dependents: &'static str,
        count: u64,
    },

    /// A domain invariant was violated (tenant/id mismatch, arithmetic overflow).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The acting party is not allowed to act on this entity.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_state(
        entity: &'static str,
        current: impl core::fmt::Display,
        attempted: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            entity,
            current: current.to_string(),
            attempted: attempted.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn resource_in_use(entity: &'static str, dependents: &'static str, count: u64) -> Self {
        Self::ResourceInUse {
            entity,
            dependents,
            count,
        }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_names_current_and_attempted() {
        let err = DomainError::invalid_state("order", "DELIVERED", "transition to CANCELLED");
        assert_eq!(
            err.to_string(),
            "order in status DELIVERED cannot transition to CANCELLED"
        );
    }

    #[test]
    fn resource_in_use_reports_blocking_count() {
        let err = DomainError::resource_in_use("rfq", "quotations", 3);
        assert_eq!(err.to_string(), "rfq is referenced by 3 quotations");
    }
}
