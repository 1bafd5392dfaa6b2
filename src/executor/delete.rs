//! Delete executor
//!
//! Drains its child and removes each tuple from the table it came from,
//! emitting a single tuple holding the row count.

use std::sync::Arc;

use crate::db::Database;
use crate::schema::{TupleDesc, Type};
use crate::tuple::{Field, Tuple};
use crate::txn::TransactionId;

use super::error::ExecutorResult;
use super::{Executor, Operator};

/// Deletes every tuple produced by the child operator.
///
/// Tuples are located by their record ids, so the child stream must come
/// from a scan (possibly filtered) rather than a reshaping operator. The
/// first `next` after open does all the work; the stream then ends until
/// reopened.
pub struct Delete {
    db: Database,
    txn: TransactionId,
    child: Operator,
    desc: Arc<TupleDesc>,
    active: bool,
}

impl Delete {
    /// Create a delete of `child`'s stream under `txn`.
    pub fn new(db: &Database, txn: TransactionId, child: Operator) -> Self {
        Delete {
            db: db.clone(),
            txn,
            child,
            desc: Arc::new(TupleDesc::with_names(vec![Type::Int], vec!["inserted"])),
            active: false,
        }
    }
}

impl Executor for Delete {
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
            self.db.buffer_pool().delete_tuple(self.txn, &tuple)?;
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
