//! Planner error types

use thiserror::Error;

use crate::executor::error::ExecutorError;
use crate::storage::error::StorageError;

/// Result type for planning operations
pub type PlanResult<T> = Result<T, PlanError>;

/// Errors raised while building or lowering a logical plan
#[derive(Error, Debug)]
pub enum PlanError {
    /// Alias does not name a scanned table
    #[error("{0} references an unknown table alias")]
    UnknownAlias(String),

    /// Same alias used by two scans
    #[error("duplicate table alias: {0}")]
    DuplicateAlias(String),

    /// Field name resolves to no scanned table
    #[error("field {0} does not exist")]
    UnknownField(String),

    /// Unqualified field name appears in more than one scanned table
    #[error("field {0} appears in multiple tables")]
    AmbiguousField(String),

    /// Field reference with too many qualifier segments
    #[error("{0} is not a valid field reference")]
    InvalidFieldRef(String),

    /// `*` used where a concrete field is required
    #[error("invalid use of wildcard: {0}")]
    InvalidWildcard(String),

    /// Join predicate names two fields of the same table
    #[error("cannot join on two fields from the same table")]
    SelfJoinField,

    /// Aggregate operator name is not MIN/MAX/SUM/AVG/COUNT
    #[error("unknown aggregate operator: {0}")]
    UnknownAggOp(String),

    /// Select list shape does not fit the declared aggregation
    #[error("invalid select list: {0}")]
    InvalidSelectList(String),

    /// Filter constant cannot be parsed as the field's type
    #[error("invalid constant {value:?} for field {field}")]
    InvalidConstant { field: String, value: String },

    /// The join graph leaves more than one unconnected subplan
    #[error("query does not join all scanned tables")]
    DisconnectedJoins,

    /// No statistics registered for a base table the optimizer needs
    #[error("missing statistics for table {0}")]
    MissingStats(String),

    /// Executor-level failure while lowering the plan
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// Storage-level failure while lowering the plan
    #[error(transparent)]
    Storage(#[from] StorageError),
}
