//! SeqScan executor
//!
//! Reads every tuple of a table in page order, slot order within a page.

use std::sync::Arc;

use crate::db::Database;
use crate::schema::TupleDesc;
use crate::storage::heap::HeapFileIterator;
use crate::tuple::Tuple;
use crate::txn::TransactionId;

use super::error::ExecutorResult;
use super::Executor;

/// Sequential scan over one table.
///
/// Output columns are relabeled `alias.field` so downstream name resolution
/// can tell apart multiple scans of the same table. The page count is
/// snapshotted when the scan opens; pages appended afterwards are not
/// visible to it.
pub struct SeqScan {
    table_id: u64,
    alias: String,
    desc: Arc<TupleDesc>,
    iter: HeapFileIterator,
}

impl SeqScan {
    /// Create a scan of `table_id` under `txn`, labeling columns with
    /// `alias`.
    pub fn new(
        db: &Database,
        txn: TransactionId,
        table_id: u64,
        alias: &str,
    ) -> ExecutorResult<Self> {
        let file = db.catalog().db_file(table_id)?;
        let desc = Arc::new(file.desc().qualify(alias));
        let iter = file.iter(db.buffer_pool().clone(), txn);
        Ok(SeqScan {
            table_id,
            alias: alias.to_string(),
            desc,
            iter,
        })
    }

    /// Id of the scanned table.
    pub fn table_id(&self) -> u64 {
        self.table_id
    }

    /// Alias the scan labels its columns with.
    pub fn alias(&self) -> &str {
        &self.alias
    }
}

impl Executor for SeqScan {
    fn open(&mut self) -> ExecutorResult<()> {
        self.iter.open()?;
        Ok(())
    }

    fn fetch_next(&mut self) -> ExecutorResult<Option<Tuple>> {
        Ok(self
            .iter
            .next_tuple()?
            .map(|t| t.with_desc(self.desc.clone())))
    }

    fn rewind(&mut self) -> ExecutorResult<()> {
        self.iter.rewind();
        Ok(())
    }

    fn close(&mut self) -> ExecutorResult<()> {
        self.iter.close();
        Ok(())
    }

    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }
}
