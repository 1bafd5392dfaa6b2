//! OrderBy executor
//!
//! Materializes its child on open, sorts once, then streams the sorted rows.
//! Rewinding resets the cursor without re-sorting.

use std::sync::Arc;

use crate::schema::TupleDesc;
use crate::tuple::Tuple;

use super::error::{ExecutorError, ExecutorResult};
use super::{Executor, Operator};

/// In-memory sort on a single field.
///
/// A pipeline breaker: the whole child stream is collected at `open`.
/// The sort is stable, so tuples with equal keys keep their input order.
pub struct OrderBy {
    field: usize,
    ascending: bool,
    child: Operator,
    rows: Vec<Tuple>,
    pos: usize,
}

impl OrderBy {
    /// Sort `child` on field `field`, ascending when `ascending` is true.
    pub fn new(field: usize, ascending: bool, child: Operator) -> Self {
        OrderBy {
            field,
            ascending,
            child,
            rows: Vec::new(),
            pos: 0,
        }
    }
}

impl Executor for OrderBy {
    fn open(&mut self) -> ExecutorResult<()> {
        self.child.open()?;

        self.rows.clear();
        while let Some(tuple) = self.child.next_opt()? {
            if tuple.field(self.field).is_none() {
                return Err(ExecutorError::FieldIndexOutOfBounds {
                    index: self.field,
                    len: tuple.fields().len(),
                });
            }
            self.rows.push(tuple);
        }

        let field = self.field;
        let ascending = self.ascending;
        self.rows.sort_by(|a, b| {
            let ord = a.field(field).cmp(&b.field(field));
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        });
        self.pos = 0;
        Ok(())
    }

    fn fetch_next(&mut self) -> ExecutorResult<Option<Tuple>> {
        if self.pos >= self.rows.len() {
            return Ok(None);
        }
        let row = self.rows[self.pos].clone();
        self.pos += 1;
        Ok(Some(row))
    }

    fn rewind(&mut self) -> ExecutorResult<()> {
        self.pos = 0;
        Ok(())
    }

    fn close(&mut self) -> ExecutorResult<()> {
        self.rows.clear();
        self.pos = 0;
        self.child.close()
    }

    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        self.child.tuple_desc()
    }
}
