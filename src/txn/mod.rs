//! Transaction identifiers and the abort taxonomy.
//!
//! Concurrency control itself lives outside the engine core; what remains
//! here is the identity a query runs under and the error that signals the
//! transaction must be abandoned. Operators never catch that error, they
//! release their resources and re-raise it.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of a running transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Allocate a fresh transaction id.
    pub fn new() -> Self {
        TransactionId(NEXT_TXN_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric value of this id.
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Transaction-level errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionError {
    /// The transaction must be abandoned; the caller decides whether to retry.
    #[error("transaction aborted")]
    Aborted,
}

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;
