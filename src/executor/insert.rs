//! Insert executor
//!
//! Drains its child into a table through the buffer pool and emits a single
//! tuple holding the row count.

use std::sync::Arc;

use crate::db::Database;
use crate::schema::{TupleDesc, Type};
use crate::storage::error::StorageError;
use crate::tuple::{Field, Tuple};
use crate::txn::{TransactionError, TransactionId};

use super::error::{ExecutorError, ExecutorResult};
use super::{Executor, Operator};

/// Inserts every child tuple into `table_id`.
///
/// The first `next` after open does all the work and returns a one-field
/// tuple with the insert count; the stream then ends until reopened. IO
/// failures while inserting surface as transaction aborts.
pub struct Insert {
    db: Database,
    txn: TransactionId,
    child: Operator,
    table_id: u64,
    desc: Arc<TupleDesc>,
    active: bool,
}

impl Insert {
    /// Create an insert of `child`'s stream into `table_id` under `txn`.
    ///
    /// Fails if the child's row layout does not match the table schema.
    pub fn new(
        db: &Database,
        txn: TransactionId,
        child: Operator,
        table_id: u64,
    ) -> ExecutorResult<Self> {
        let table_desc = db.catalog().tuple_desc(table_id)?;
        if !child.tuple_desc().compatible_with(&table_desc) {
            return Err(ExecutorError::SchemaMismatch(format!(
                "child rows [{}] do not fit table layout [{}]",
                child.tuple_desc(),
                table_desc
            )));
        }
        Ok(Insert {
            db: db.clone(),
            txn,
            child,
            table_id,
            desc: Arc::new(TupleDesc::with_names(vec![Type::Int], vec!["inserted"])),
            active: false,
        })
    }
}

impl Executor for Insert {
    fn open(&mut self) -> ExecutorResult<()> {
        self.child.open()?;
        self.active = true;
        Ok(())
    }

    fn fetch_next(&mut self) -> ExecutorResult<Option<Tuple>> {
        if !self.active {
            return Ok(None);
        }
        let mut count = 0i32;
        while let Some(tuple) = self.child.next_opt()? {
            self.db
                .buffer_pool()
                .insert_tuple(self.txn, self.table_id, tuple)
                .map_err(|e| match e {
                    // a half-done write leaves the table in an unknown
                    // state, so the transaction has to go
                    StorageError::Io(_) => ExecutorError::Transaction(TransactionError::Aborted),
                    other => other.into(),
                })?;
            count += 1;
        }
        self.active = false;
        Ok(Some(Tuple::new(self.desc.clone(), vec![Field::Int(count)])))
    }

    fn rewind(&mut self) -> ExecutorResult<()> {
        self.child.rewind()
    }

    fn close(&mut self) -> ExecutorResult<()> {
        self.active = false;
        self.child.close()
    }

    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }
}
