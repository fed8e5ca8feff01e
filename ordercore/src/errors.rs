//! Error types for `OrderCore`.
//!
//! The taxonomy keeps the three failure classes of the checkout contract
//! distinguishable in type and shape:
//!
//! - **Input errors** (empty cart, malformed payload) — rejected before any
//!   transaction is opened.
//! - **Validation failures** (unknown product, insufficient stock) —
//!   collected exhaustively per line, expected and user-facing.
//! - **Store failures** (lock contention, lost connectivity, commit failure) —
//!   reported generically and classified transient or not, so callers know
//!   what is safe to retry.
//!
//! Validation failures must never be conflated with store failures: a caller
//! that retries a validation failure will just fail again, and a caller that
//! shows a store failure to the customer leaks nothing useful.

use crate::types::ProductId;
use thiserror::Error;

/// What went wrong with one specific cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineIssue {
    /// The referenced product identifier matched no catalog row.
    ProductNotFound,
    /// The locked stock level could not cover the requested quantity.
    InsufficientStock,
}

impl std::fmt::Display for LineIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProductNotFound => write!(f, "Product not found"),
            Self::InsufficientStock => write!(f, "Insufficient stock"),
        }
    }
}

/// A validation failure attributable to one cart line.
///
/// Line errors are collected across the whole cart — validation never stops
/// at the first failing line — and reported together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("line for product {product_id}: {issue}")]
pub struct LineError {
    /// The product identifier the failing line referenced.
    pub product_id: ProductId,
    /// The reason this line failed validation.
    pub issue: LineIssue,
}

impl LineError {
    /// A "Product not found" error for the given line.
    pub const fn not_found(product_id: ProductId) -> Self {
        Self {
            product_id,
            issue: LineIssue::ProductNotFound,
        }
    }

    /// An "Insufficient stock" error for the given line.
    pub const fn insufficient_stock(product_id: ProductId) -> Self {
        Self {
            product_id,
            issue: LineIssue::InsufficientStock,
        }
    }
}

/// Errors from the persistence layer.
///
/// Store errors carry a short operator-facing description. None of the
/// variants embed caller data, so the whole error is safe to log;
/// user-facing layers should surface only an opaque failure indicator.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store could not be reached or the connection was lost.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A row lock could not be acquired in time.
    #[error("lock contention: {0}")]
    LockContention(String),

    /// The engine aborted the transaction to preserve isolation
    /// (serialization failure or deadlock).
    #[error("serialization conflict: {0}")]
    SerializationConflict(String),

    /// Beginning, committing, or rolling back a transaction failed.
    #[error("transaction failed: {0}")]
    Transaction(String),

    /// A database constraint rejected a write.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Encoding a value for storage failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(String),

    /// Decoding a stored value failed.
    #[error("deserialization failed: {0}")]
    DeserializationFailed(String),

    /// The store is temporarily unavailable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// An unexpected internal failure.
    #[error("internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Whether a caller may safely retry the whole operation.
    ///
    /// Lock waits, serialization conflicts, and connectivity losses are
    /// transient: the transaction rolled back cleanly and a retry against
    /// fresh state can succeed. Constraint and codec failures will not get
    /// better on retry.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_)
                | Self::LockContention(_)
                | Self::SerializationConflict(_)
                | Self::Transaction(_)
                | Self::Unavailable(_)
        )
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the order placement transaction.
#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    /// The submitted cart had no lines. Rejected before a transaction is
    /// opened.
    #[error("order must contain at least one cart line")]
    EmptyCart,

    /// One or more cart lines failed validation; the transaction was rolled
    /// back and nothing was written.
    #[error("order validation failed for {} cart line(s)", .0.len())]
    Validation(Vec<LineError>),

    /// The persistence layer failed; the transaction never began or was
    /// rolled back.
    #[error("checkout store failure: {0}")]
    Store(#[from] StoreError),

    /// An unexpected internal failure (e.g. a total that overflowed the
    /// money range).
    #[error("internal checkout error: {0}")]
    Internal(String),
}

impl CheckoutError {
    /// Whether a caller may safely resubmit the same order.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Store(err) => err.is_transient(),
            Self::EmptyCart | Self::Validation(_) | Self::Internal(_) => false,
        }
    }
}

/// Result alias for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

/// Errors from catalog maintenance operations.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// The identity performing the operation lacks the admin flag.
    #[error("admin privileges required")]
    Unauthorized,

    /// The persistence layer failed.
    #[error("catalog store failure: {0}")]
    Store(#[from] StoreError),
}

/// Result alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors from credential verification.
///
/// Issuance is out of scope; these cover only the verification contract an
/// external authentication collaborator implements.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// No credential was presented.
    #[error("credential required")]
    MissingCredential,

    /// The credential was malformed, forged, or expired.
    #[error("invalid or expired credential")]
    InvalidCredential,
}
