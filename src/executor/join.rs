//! Join executor
//!
//! Joins two child streams, picking the strategy from the predicate: an
//! in-memory hash join for equality predicates, a nested loop join for
//! everything else. Output tuples are `merge(outer, inner)` under the
//! concatenated schema.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::schema::TupleDesc;
use crate::tuple::{Field, Tuple};

use super::error::{ExecutorError, ExecutorResult};
use super::predicate::{JoinPredicate, Op};
use super::{Executor, Operator};

enum Strategy {
    /// Build a hash table over the outer child at open, probe with the
    /// inner child. Multi-match probes are cached as pre-merged tuples so
    /// nothing aliases the table while it is being probed.
    Hash {
        table: HashMap<Field, Vec<Tuple>>,
        pending: VecDeque<Tuple>,
    },
    /// For each outer tuple, rescan the inner child.
    NestedLoop { outer_tuple: Option<Tuple> },
}

/// Relational join of two child operators.
///
/// Equality predicates run as a hash join whose build side (the outer
/// child) is drained and closed at `open`; rewinding only rewinds the probe
/// side, the hash table is kept. Other predicates run as a nested loop,
/// which requires the inner child to be rewindable - every operator in this
/// engine is.
pub struct Join {
    predicate: JoinPredicate,
    outer: Operator,
    inner: Operator,
    desc: Arc<TupleDesc>,
    strategy: Strategy,
}

impl Join {
    /// Join `outer` and `inner` on `predicate`.
    pub fn new(predicate: JoinPredicate, outer: Operator, inner: Operator) -> Self {
        let desc = Arc::new(TupleDesc::merge(outer.tuple_desc(), inner.tuple_desc()));
        let strategy = if predicate.op() == Op::Equals {
            Strategy::Hash {
                table: HashMap::new(),
                pending: VecDeque::new(),
            }
        } else {
            Strategy::NestedLoop { outer_tuple: None }
        };
        Join {
            predicate,
            outer,
            inner,
            desc,
            strategy,
        }
    }

    /// The join predicate.
    pub fn predicate(&self) -> &JoinPredicate {
        &self.predicate
    }
}

impl Executor for Join {
    fn open(&mut self) -> ExecutorResult<()> {
        match &mut self.strategy {
            Strategy::Hash { table, pending } => {
                table.clear();
                pending.clear();
                // build side: drain the outer child, then release it
                self.outer.open()?;
                while let Some(tuple) = self.outer.next_opt()? {
                    let key = tuple
                        .field(self.predicate.field1())
                        .cloned()
                        .ok_or(ExecutorError::FieldIndexOutOfBounds {
                            index: self.predicate.field1(),
                            len: tuple.fields().len(),
                        })?;
                    table.entry(key).or_default().push(tuple);
                }
                self.outer.close()?;
                self.inner.open()
            }
            Strategy::NestedLoop { outer_tuple } => {
                *outer_tuple = None;
                self.outer.open()?;
                self.inner.open()
            }
        }
    }

    fn fetch_next(&mut self) -> ExecutorResult<Option<Tuple>> {
        match &mut self.strategy {
            Strategy::Hash { table, pending } => {
                if let Some(tuple) = pending.pop_front() {
                    return Ok(Some(tuple));
                }
                while let Some(inner_tuple) = self.inner.next_opt()? {
                    let key = inner_tuple
                        .field(self.predicate.field2())
                        .ok_or(ExecutorError::FieldIndexOutOfBounds {
                            index: self.predicate.field2(),
                            len: inner_tuple.fields().len(),
                        })?;
                    let Some(matches) = table.get(key) else {
                        continue;
                    };
                    if let [single] = matches.as_slice() {
                        return Ok(Some(Tuple::merge(self.desc.clone(), single, &inner_tuple)));
                    }
                    // several build tuples share the key: merge them all now
                    // and replay from the cache on subsequent calls
                    for outer_tuple in matches {
                        pending.push_back(Tuple::merge(
                            self.desc.clone(),
                            outer_tuple,
                            &inner_tuple,
                        ));
                    }
                    return Ok(pending.pop_front());
                }
                Ok(None)
            }
            Strategy::NestedLoop { outer_tuple } => loop {
                if outer_tuple.is_none() {
                    match self.outer.next_opt()? {
                        Some(t) => *outer_tuple = Some(t),
                        None => return Ok(None),
                    }
                }
                let current = outer_tuple.as_ref().expect("outer tuple present");
                while let Some(inner_tuple) = self.inner.next_opt()? {
                    if self.predicate.filter(current, &inner_tuple)? {
                        return Ok(Some(Tuple::merge(self.desc.clone(), current, &inner_tuple)));
                    }
                }
                self.inner.rewind()?;
                *outer_tuple = None;
            },
        }
    }

    fn rewind(&mut self) -> ExecutorResult<()> {
        match &mut self.strategy {
            Strategy::Hash { pending, .. } => {
                // the hash table survives; only the probe side restarts
                pending.clear();
                self.inner.rewind()
            }
            Strategy::NestedLoop { outer_tuple } => {
                *outer_tuple = None;
                self.outer.rewind()?;
                self.inner.rewind()
            }
        }
    }

    fn close(&mut self) -> ExecutorResult<()> {
        match &mut self.strategy {
            Strategy::Hash { table, pending } => {
                table.clear();
                pending.clear();
            }
            Strategy::NestedLoop { outer_tuple } => *outer_tuple = None,
        }
        self.inner.close()?;
        self.outer.close()
    }

    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }
}
