//! Error handling and result types for tree and record-store operations.
//!
//! Lookup misses are never errors: they surface as `None` or an empty
//! collection. Errors are reserved for refused inserts, structural
//! inconsistencies found by the validator, and failures raised by the
//! record store (which are carried through unchanged).

use crate::types::{AnchorId, EntryId, Relation};
use thiserror::Error;

/// Error raised by a [`RecordStore`](crate::RecordStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The anchor does not exist (never created, or already deleted).
    #[error("anchor {0} does not exist")]
    MissingAnchor(AnchorId),
    /// The entry does not exist (never created, or already deleted).
    #[error("entry {0} does not exist")]
    MissingEntry(EntryId),
    /// The anchor already carries an entry edge on the requested side.
    #[error("anchor {anchor} already has an {side} entry edge ({existing})")]
    EdgeConflict {
        anchor: AnchorId,
        side: &'static str,
        existing: EntryId,
    },
    /// A relation of this kind already leaves the anchor.
    #[error("anchor {from} already has a {kind:?} relation")]
    RelationExists { kind: Relation, from: AnchorId },
    /// The anchor is still wired into the structure and cannot be deleted.
    #[error("anchor {0} is still in use")]
    AnchorInUse(AnchorId),
    /// A commit (or begin) was refused by the transactional substrate.
    #[error("transaction failure: {0}")]
    TransactionFailure(String),
    /// `commit` or `abort` was called with no open transaction.
    #[error("no open transaction")]
    NoTransaction,
}

impl StoreError {
    /// Create a TransactionFailure with context
    pub fn transaction_failure(operation: &str, details: &str) -> Self {
        Self::TransactionFailure(format!("{}: {}", operation, details))
    }
}

/// Error type for tree operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// Invalid order specified at construction.
    #[error("order {order} is invalid (minimum required: {minimum})")]
    InvalidOrder { order: usize, minimum: usize },
    /// Teardown was asked to commit every zero deletions.
    #[error("commit batch size must be at least 1")]
    InvalidBatchSize,
    /// Insert of a key that already holds a value in a unique tree.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    /// A structural invariant does not hold. Signals a bug; never expected
    /// in production and never repaired silently.
    #[error("structural inconsistency: {0}")]
    StructuralInconsistency(String),
    /// The tree was torn down by `destroy_all`.
    #[error("tree has been destroyed")]
    Destroyed,
    /// Failure raised by the record store, propagated unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TreeError {
    /// Create a StructuralInconsistency with the check that failed and where
    pub fn inconsistency(check: &str, details: &str) -> Self {
        Self::StructuralInconsistency(format!("{}: {}", check, details))
    }

    /// Check if this error came from a failed transaction boundary
    pub fn is_transaction_failure(&self) -> bool {
        matches!(self, Self::Store(StoreError::TransactionFailure(_)))
    }

    /// Check if this error reports a broken invariant
    pub fn is_inconsistency(&self) -> bool {
        matches!(self, Self::StructuralInconsistency(_))
    }
}

/// Internal and public result type for tree operations
pub type TreeResult<T> = Result<T, TreeError>;

/// Result type for tree modification operations
pub type ModifyResult<T> = Result<T, TreeError>;

/// Result type for tree construction
pub type InitResult<T> = Result<T, TreeError>;

/// Result type for record-store primitives
pub type StoreResult<T> = Result<T, StoreError>;
