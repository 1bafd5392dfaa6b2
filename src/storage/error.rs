//! Storage error types

use thiserror::Error;

use crate::storage::page::PageId;
use crate::txn::TransactionError;

/// Storage operation errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO error from the filesystem
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The transaction this operation ran under was aborted
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    /// Table id is not registered in the catalog
    #[error("table {0} is not registered in the catalog")]
    UnknownTable(u64),

    /// Page number past the end of the heap file
    #[error("page {0} is out of bounds")]
    PageOutOfBounds(PageId),

    /// Buffer pool is at capacity with no evictable page
    #[error("buffer pool is full ({0} pages)")]
    BufferPoolFull(usize),

    /// Page has no free slots
    #[error("page {0} has no free slots")]
    PageFull(PageId),

    /// Slot index past the end of the page's slot array
    #[error("slot {slot} is out of bounds on page {page}")]
    InvalidSlot { page: PageId, slot: usize },

    /// Deleting from a slot that holds no tuple
    #[error("slot {slot} on page {page} is empty")]
    EmptySlot { page: PageId, slot: usize },

    /// Tuple has no record id to locate it by
    #[error("tuple has no record id")]
    MissingRecordId,

    /// Tuple does not belong to the targeted page or table
    #[error("tuple does not belong to {0}")]
    WrongPage(PageId),

    /// Row layout does not match the table schema
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// On-disk page bytes could not be decoded
    #[error("invalid page data: {0}")]
    InvalidPage(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
