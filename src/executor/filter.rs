//! Filter executor
//!
//! Passes through the child tuples that satisfy a predicate.

use std::sync::Arc;

use crate::schema::TupleDesc;
use crate::tuple::Tuple;

use super::error::ExecutorResult;
use super::predicate::Predicate;
use super::{Executor, Operator};

/// Relational select: emits child tuples satisfying the predicate.
pub struct Filter {
    predicate: Predicate,
    child: Operator,
}

impl Filter {
    /// Create a filter applying `predicate` to the tuples of `child`.
    pub fn new(predicate: Predicate, child: Operator) -> Self {
        Filter { predicate, child }
    }

    /// The predicate being applied.
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl Executor for Filter {
    fn open(&mut self) -> ExecutorResult<()> {
        self.child.open()
    }

    fn fetch_next(&mut self) -> ExecutorResult<Option<Tuple>> {
        while let Some(tuple) = self.child.next_opt()? {
            if self.predicate.filter(&tuple)? {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn rewind(&mut self) -> ExecutorResult<()> {
        self.child.rewind()
    }

    fn close(&mut self) -> ExecutorResult<()> {
        self.child.close()
    }

    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        self.child.tuple_desc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::predicate::Op;
    use crate::schema::Type;
    use crate::tuple::Field;

    struct MockExec {
        desc: Arc<TupleDesc>,
        rows: Vec<Tuple>,
        pos: usize,
    }

    impl MockExec {
        fn ints(values: &[i32]) -> Self {
            let desc = Arc::new(TupleDesc::unnamed(vec![Type::Int]));
            let rows = values
                .iter()
                .map(|v| Tuple::new(desc.clone(), vec![Field::Int(*v)]))
                .collect();
            MockExec { desc, rows, pos: 0 }
        }
    }

    impl Executor for MockExec {
        fn open(&mut self) -> ExecutorResult<()> {
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
            Ok(())
        }

        fn tuple_desc(&self) -> &Arc<TupleDesc> {
            &self.desc
        }
    }

    fn drain_ints(op: &mut Operator) -> Vec<i32> {
        let mut out = vec![];
        while op.has_next().unwrap() {
            out.push(op.next().unwrap().field(0).unwrap().as_int().unwrap());
        }
        out
    }

    #[test]
    fn test_filter_greater_than() {
        let child = Operator::new(MockExec::ints(&[1, 2, 3, 4, 5]));
        let mut filter = Operator::new(Filter::new(
            Predicate::new(0, Op::GreaterThan, Field::Int(2)),
            child,
        ));
        filter.open().unwrap();
        assert_eq!(drain_ints(&mut filter), vec![3, 4, 5]);
        filter.close().unwrap();
    }

    #[test]
    fn test_filter_nothing_matches() {
        let child = Operator::new(MockExec::ints(&[1, 2, 3]));
        let mut filter = Operator::new(Filter::new(
            Predicate::new(0, Op::GreaterThan, Field::Int(10)),
            child,
        ));
        filter.open().unwrap();
        assert!(!filter.has_next().unwrap());
        filter.close().unwrap();
    }

    #[test]
    fn test_filter_rewind() {
        let child = Operator::new(MockExec::ints(&[1, 2, 3]));
        let mut filter = Operator::new(Filter::new(
            Predicate::new(0, Op::LessThan, Field::Int(3)),
            child,
        ));
        filter.open().unwrap();
        assert_eq!(drain_ints(&mut filter), vec![1, 2]);
        filter.rewind().unwrap();
        assert_eq!(drain_ints(&mut filter), vec![1, 2]);
        filter.close().unwrap();
    }

    #[test]
    fn test_commuted_filters_agree() {
        let p = Predicate::new(0, Op::GreaterThan, Field::Int(1));
        let q = Predicate::new(0, Op::LessThan, Field::Int(5));

        let mut pq = Operator::new(Filter::new(
            p.clone(),
            Operator::new(Filter::new(q.clone(), Operator::new(MockExec::ints(&[1, 2, 3, 4, 5])))),
        ));
        let mut qp = Operator::new(Filter::new(
            q,
            Operator::new(Filter::new(p, Operator::new(MockExec::ints(&[1, 2, 3, 4, 5])))),
        ));
        pq.open().unwrap();
        qp.open().unwrap();
        assert_eq!(drain_ints(&mut pq), drain_ints(&mut qp));
    }
}
