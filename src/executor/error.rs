//! Executor error types

use thiserror::Error;

use crate::schema::Type;
use crate::storage::error::StorageError;
use crate::txn::TransactionError;

use super::aggregate::AggOp;

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Executor errors
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// Storage layer error
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Transaction error
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    /// Type mismatch during evaluation
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: Type, got: Type },

    /// Named field missing from a schema
    #[error("field {0} not found in schema")]
    FieldNotFound(String),

    /// Field index out of bounds
    #[error("field index {index} out of bounds (schema has {len} fields)")]
    FieldIndexOutOfBounds { index: usize, len: usize },

    /// Aggregate operation the field type cannot support
    #[error("unsupported aggregate {op} over {ty} field")]
    UnsupportedAggregate { op: AggOp, ty: Type },

    /// Rows fed to an operator do not match the expected layout
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Iterator method called outside open/close
    #[error("operator is not open")]
    NotOpen,

    /// `next()` called with no tuple remaining
    #[error("no more tuples")]
    NoSuchTuple,

    /// Internal executor error
    #[error("internal error: {0}")]
    Internal(String),
}

impl ExecutorError {
    /// Whether this error carries the transaction-aborted signal.
    ///
    /// Aborts must unwind the operator tree unchanged; everything else may
    /// be swallowed during close.
    pub fn is_aborted(&self) -> bool {
        matches!(
            self,
            ExecutorError::Transaction(TransactionError::Aborted)
                | ExecutorError::Storage(StorageError::Transaction(TransactionError::Aborted))
        )
    }
}
