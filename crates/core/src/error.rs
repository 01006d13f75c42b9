//! Domain error model.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A quantity or currency amount was negative.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A work order line item id did not resolve.
    #[error("line item not found: {0}")]
    LineItemNotFound(Uuid),

    /// An inventory part id did not resolve.
    #[error("part not found: {0}")]
    PartNotFound(Uuid),

    /// Requested quantity exceeds on-hand stock.
    ///
    /// Only raised when the caller's stock policy blocks on shortage;
    /// the default policy logs a warning and proceeds (shops backorder).
    #[error("insufficient stock for part {part_id}: requested {requested}, on hand {on_hand}")]
    InsufficientStock {
        part_id: Uuid,
        requested: Decimal,
        on_hand: Decimal,
    },

    /// An invoice was requested for a work order with no line items.
    #[error("cannot invoice a work order with no line items")]
    EmptyLineItems,

    /// The work order reached its terminal state; no further changes permitted.
    #[error("work order is archived")]
    WorkOrderArchived,

    /// A status move that the forward-only workflow does not allow.
    #[error("illegal status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
