//! Project executor
//!
//! Narrows child tuples to a chosen list of fields.

use std::sync::Arc;

use crate::schema::TupleDesc;
use crate::tuple::Tuple;

use super::error::{ExecutorError, ExecutorResult};
use super::{Executor, Operator};

/// Projection onto an ordered list of child field indices.
pub struct Project {
    fields: Vec<usize>,
    desc: Arc<TupleDesc>,
    child: Operator,
}

impl Project {
    /// Project `child` onto `fields`, checking each against the expected
    /// output type.
    ///
    /// Field names are carried over from the child schema.
    pub fn new(
        fields: Vec<usize>,
        types: Vec<crate::schema::Type>,
        child: Operator,
    ) -> ExecutorResult<Self> {
        debug_assert_eq!(fields.len(), types.len());
        let child_desc = child.tuple_desc();
        let mut out = Vec::with_capacity(fields.len());
        for (&index, &expected) in fields.iter().zip(&types) {
            let actual = child_desc
                .field_type(index)
                .ok_or(ExecutorError::FieldIndexOutOfBounds {
                    index,
                    len: child_desc.num_fields(),
                })?;
            if actual != expected {
                return Err(ExecutorError::TypeMismatch {
                    expected,
                    got: actual,
                });
            }
            out.push((expected, child_desc.field_name(index).map(str::to_string)));
        }
        Ok(Project {
            fields,
            desc: Arc::new(TupleDesc::new(out)),
            child,
        })
    }
}

impl Executor for Project {
    fn open(&mut self) -> ExecutorResult<()> {
        self.child.open()
    }

    fn fetch_next(&mut self) -> ExecutorResult<Option<Tuple>> {
        let Some(tuple) = self.child.next_opt()? else {
            return Ok(None);
        };
        let mut fields = Vec::with_capacity(self.fields.len());
        for &index in &self.fields {
            let field = tuple
                .field(index)
                .ok_or(ExecutorError::FieldIndexOutOfBounds {
                    index,
                    len: tuple.fields().len(),
                })?;
            fields.push(field.clone());
        }
        Ok(Some(Tuple::new(self.desc.clone(), fields)))
    }

    fn rewind(&mut self) -> ExecutorResult<()> {
        self.child.rewind()
    }

    fn close(&mut self) -> ExecutorResult<()> {
        self.child.close()
    }

    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }
}
