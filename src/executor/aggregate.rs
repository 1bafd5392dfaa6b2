//! Aggregate executor
//!
//! Computes a single aggregate (MIN, MAX, SUM, AVG, COUNT) over one column,
//! optionally grouped by another column. A pipeline breaker: the child is
//! fully drained and closed during `open`, after which the computed groups
//! are streamed out.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::schema::{TupleDesc, Type};
use crate::tuple::{Field, Tuple};

use super::error::{ExecutorError, ExecutorResult};
use super::{Executor, Operator};

/// Aggregation operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl AggOp {
    /// Parse an operator name, case-insensitively.
    pub fn parse(s: &str) -> Option<AggOp> {
        match s.to_uppercase().as_str() {
            "MIN" => Some(AggOp::Min),
            "MAX" => Some(AggOp::Max),
            "SUM" => Some(AggOp::Sum),
            "AVG" => Some(AggOp::Avg),
            "COUNT" => Some(AggOp::Count),
            _ => None,
        }
    }
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggOp::Min => "MIN",
            AggOp::Max => "MAX",
            AggOp::Sum => "SUM",
            AggOp::Avg => "AVG",
            AggOp::Count => "COUNT",
        };
        write!(f, "{}", s)
    }
}

/// Sentinel group key when not grouping.
fn default_group() -> Field {
    Field::Int(0)
}

/// Folds integer fields group by group.
struct IntegerAggregator {
    group_field: Option<usize>,
    agg_field: usize,
    op: AggOp,
    // group key -> folded value; insertion order kept for deterministic output
    results: HashMap<Field, i64>,
    counts: HashMap<Field, i64>,
    keys: Vec<Field>,
}

impl IntegerAggregator {
    fn new(group_field: Option<usize>, agg_field: usize, op: AggOp) -> Self {
        IntegerAggregator {
            group_field,
            agg_field,
            op,
            results: HashMap::new(),
            counts: HashMap::new(),
            keys: Vec::new(),
        }
    }

    fn merge(&mut self, tuple: &Tuple) -> ExecutorResult<()> {
        let key = self.group_key(tuple)?;
        let value = tuple
            .field(self.agg_field)
            .and_then(Field::as_int)
            .ok_or(ExecutorError::TypeMismatch {
                expected: Type::Int,
                got: Type::Str,
            })? as i64;

        if !self.results.contains_key(&key) {
            self.keys.push(key.clone());
        }
        match self.op {
            AggOp::Min => {
                let entry = self.results.entry(key).or_insert(i64::MAX);
                *entry = (*entry).min(value);
            }
            AggOp::Max => {
                let entry = self.results.entry(key).or_insert(i64::MIN);
                *entry = (*entry).max(value);
            }
            AggOp::Sum => *self.results.entry(key).or_insert(0) += value,
            AggOp::Avg => {
                *self.results.entry(key.clone()).or_insert(0) += value;
                *self.counts.entry(key).or_insert(0) += 1;
            }
            AggOp::Count => *self.results.entry(key).or_insert(0) += 1,
        }
        Ok(())
    }

    fn group_key(&self, tuple: &Tuple) -> ExecutorResult<Field> {
        match self.group_field {
            Some(g) => tuple
                .field(g)
                .cloned()
                .ok_or(ExecutorError::FieldIndexOutOfBounds {
                    index: g,
                    len: tuple.fields().len(),
                }),
            None => Ok(default_group()),
        }
    }

    /// Emit one output tuple per group, in group-discovery order.
    fn into_tuples(self, desc: Arc<TupleDesc>) -> Vec<Tuple> {
        self.keys
            .iter()
            .map(|key| {
                let raw = self.results[key];
                let value = match self.op {
                    // integer division, matching SUM/COUNT arithmetic
                    AggOp::Avg => raw / self.counts[key],
                    _ => raw,
                };
                make_result(&desc, self.group_field.is_some(), key, value as i32)
            })
            .collect()
    }
}

/// Folds string fields group by group; only COUNT is meaningful.
struct StringAggregator {
    group_field: Option<usize>,
    counts: HashMap<Field, i64>,
    keys: Vec<Field>,
}

impl StringAggregator {
    fn new(group_field: Option<usize>, op: AggOp) -> ExecutorResult<Self> {
        if op != AggOp::Count {
            return Err(ExecutorError::UnsupportedAggregate { op, ty: Type::Str });
        }
        Ok(StringAggregator {
            group_field,
            counts: HashMap::new(),
            keys: Vec::new(),
        })
    }

    fn merge(&mut self, tuple: &Tuple) -> ExecutorResult<()> {
        let key = match self.group_field {
            Some(g) => tuple
                .field(g)
                .cloned()
                .ok_or(ExecutorError::FieldIndexOutOfBounds {
                    index: g,
                    len: tuple.fields().len(),
                })?,
            None => default_group(),
        };
        if !self.counts.contains_key(&key) {
            self.keys.push(key.clone());
        }
        *self.counts.entry(key).or_insert(0) += 1;
        Ok(())
    }

    fn into_tuples(self, desc: Arc<TupleDesc>) -> Vec<Tuple> {
        self.keys
            .iter()
            .map(|key| make_result(&desc, self.group_field.is_some(), key, self.counts[key] as i32))
            .collect()
    }
}

fn make_result(desc: &Arc<TupleDesc>, grouped: bool, key: &Field, value: i32) -> Tuple {
    if grouped {
        Tuple::new(desc.clone(), vec![key.clone(), Field::Int(value)])
    } else {
        Tuple::new(desc.clone(), vec![Field::Int(value)])
    }
}

enum Aggregator {
    Int(IntegerAggregator),
    Str(StringAggregator),
}

/// Grouped aggregation over a single column.
///
/// Output schema is `[group, INT]` when grouping, `[INT]` otherwise; the
/// aggregate column is named `field(OP)`.
pub struct Aggregate {
    child: Operator,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggOp,
    agg_type: Type,
    desc: Arc<TupleDesc>,
    output: Vec<Tuple>,
    pos: usize,
}

impl Aggregate {
    /// Aggregate `op` over field `agg_field` of `child`, grouped by
    /// `group_field` when given.
    pub fn new(
        child: Operator,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggOp,
    ) -> ExecutorResult<Self> {
        let child_desc = child.tuple_desc();
        let agg_type =
            child_desc
                .field_type(agg_field)
                .ok_or(ExecutorError::FieldIndexOutOfBounds {
                    index: agg_field,
                    len: child_desc.num_fields(),
                })?;
        if agg_type == Type::Str && op != AggOp::Count {
            return Err(ExecutorError::UnsupportedAggregate { op, ty: Type::Str });
        }

        let agg_name = format!(
            "{}({})",
            child_desc.field_name(agg_field).unwrap_or("null"),
            op
        );
        let desc = match group_field {
            Some(g) => {
                let group_type =
                    child_desc
                        .field_type(g)
                        .ok_or(ExecutorError::FieldIndexOutOfBounds {
                            index: g,
                            len: child_desc.num_fields(),
                        })?;
                let group_name = child_desc.field_name(g).unwrap_or("null").to_string();
                TupleDesc::new(vec![
                    (group_type, Some(group_name)),
                    (Type::Int, Some(agg_name)),
                ])
            }
            None => TupleDesc::new(vec![(Type::Int, Some(agg_name))]),
        };

        Ok(Aggregate {
            child,
            agg_field,
            group_field,
            op,
            agg_type,
            desc: Arc::new(desc),
            output: Vec::new(),
            pos: 0,
        })
    }

    /// The aggregation operator.
    pub fn op(&self) -> AggOp {
        self.op
    }

    /// Group-by field index in the input, if grouping.
    pub fn group_field(&self) -> Option<usize> {
        self.group_field
    }
}

impl Executor for Aggregate {
    fn open(&mut self) -> ExecutorResult<()> {
        self.child.open()?;

        let mut aggregator = match self.agg_type {
            Type::Int => Aggregator::Int(IntegerAggregator::new(
                self.group_field,
                self.agg_field,
                self.op,
            )),
            Type::Str => Aggregator::Str(StringAggregator::new(self.group_field, self.op)?),
        };
        while let Some(tuple) = self.child.next_opt()? {
            match &mut aggregator {
                Aggregator::Int(a) => a.merge(&tuple)?,
                Aggregator::Str(a) => a.merge(&tuple)?,
            }
        }
        self.child.close()?;

        self.output = match aggregator {
            Aggregator::Int(a) => a.into_tuples(self.desc.clone()),
            Aggregator::Str(a) => a.into_tuples(self.desc.clone()),
        };
        self.pos = 0;
        Ok(())
    }

    fn fetch_next(&mut self) -> ExecutorResult<Option<Tuple>> {
        if self.pos >= self.output.len() {
            return Ok(None);
        }
        let row = self.output[self.pos].clone();
        self.pos += 1;
        Ok(Some(row))
    }

    fn rewind(&mut self) -> ExecutorResult<()> {
        // replay the computed groups; the child is not rescanned
        self.pos = 0;
        Ok(())
    }

    fn close(&mut self) -> ExecutorResult<()> {
        self.output.clear();
        self.pos = 0;
        self.child.close()
    }

    fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockExec {
        desc: Arc<TupleDesc>,
        rows: Vec<Tuple>,
        pos: usize,
    }

    impl MockExec {
        fn grouped(values: &[(&str, i32)]) -> Self {
            let desc = Arc::new(TupleDesc::with_names(
                vec![Type::Str, Type::Int],
                vec!["g", "v"],
            ));
            let rows = values
                .iter()
                .map(|(g, v)| Tuple::new(desc.clone(), vec![Field::string(*g), Field::Int(*v)]))
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

    fn drain_groups(op: &mut Operator) -> Vec<(String, i32)> {
        let mut out = vec![];
        while op.has_next().unwrap() {
            let t = op.next().unwrap();
            out.push((
                t.field(0).unwrap().as_str().unwrap().to_string(),
                t.field(1).unwrap().as_int().unwrap(),
            ));
        }
        out.sort();
        out
    }

    fn sample() -> Operator {
        Operator::new(MockExec::grouped(&[
            ("a", 1),
            ("a", 3),
            ("b", 5),
            ("b", 7),
            ("b", 9),
        ]))
    }

    #[test]
    fn test_grouped_avg_integer_division() {
        let mut agg = Operator::new(Aggregate::new(sample(), 1, Some(0), AggOp::Avg).unwrap());
        agg.open().unwrap();
        assert_eq!(
            drain_groups(&mut agg),
            vec![("a".to_string(), 2), ("b".to_string(), 7)]
        );
        agg.close().unwrap();
    }

    #[test]
    fn test_grouped_sum_and_count() {
        let mut sum = Operator::new(Aggregate::new(sample(), 1, Some(0), AggOp::Sum).unwrap());
        sum.open().unwrap();
        assert_eq!(
            drain_groups(&mut sum),
            vec![("a".to_string(), 4), ("b".to_string(), 21)]
        );

        let mut count = Operator::new(Aggregate::new(sample(), 1, Some(0), AggOp::Count).unwrap());
        count.open().unwrap();
        assert_eq!(
            drain_groups(&mut count),
            vec![("a".to_string(), 2), ("b".to_string(), 3)]
        );
    }

    #[test]
    fn test_min_max_without_grouping() {
        let mut min = Operator::new(Aggregate::new(sample(), 1, None, AggOp::Min).unwrap());
        min.open().unwrap();
        let t = min.next().unwrap();
        assert_eq!(t.field(0).unwrap().as_int(), Some(1));
        assert!(!min.has_next().unwrap());

        let mut max = Operator::new(Aggregate::new(sample(), 1, None, AggOp::Max).unwrap());
        max.open().unwrap();
        assert_eq!(max.next().unwrap().field(0).unwrap().as_int(), Some(9));
    }

    #[test]
    fn test_avg_single_element_group() {
        let child = Operator::new(MockExec::grouped(&[("only", 42)]));
        let mut agg = Operator::new(Aggregate::new(child, 1, Some(0), AggOp::Avg).unwrap());
        agg.open().unwrap();
        assert_eq!(drain_groups(&mut agg), vec![("only".to_string(), 42)]);
    }

    #[test]
    fn test_string_aggregation_only_count() {
        let err = Aggregate::new(sample(), 0, None, AggOp::Sum);
        assert!(matches!(
            err,
            Err(ExecutorError::UnsupportedAggregate { .. })
        ));

        let mut count = Operator::new(Aggregate::new(sample(), 0, Some(0), AggOp::Count).unwrap());
        count.open().unwrap();
        assert_eq!(
            drain_groups(&mut count),
            vec![("a".to_string(), 2), ("b".to_string(), 3)]
        );
    }

    #[test]
    fn test_output_schema_and_names() {
        let agg = Aggregate::new(sample(), 1, Some(0), AggOp::Avg).unwrap();
        let desc = agg.tuple_desc().clone();
        assert_eq!(desc.num_fields(), 2);
        assert_eq!(desc.field_type(0), Some(Type::Str));
        assert_eq!(desc.field_type(1), Some(Type::Int));
        assert_eq!(desc.field_name(0), Some("g"));
        assert_eq!(desc.field_name(1), Some("v(AVG)"));
    }

    #[test]
    fn test_rewind_replays_groups() {
        let mut agg = Operator::new(Aggregate::new(sample(), 1, Some(0), AggOp::Sum).unwrap());
        agg.open().unwrap();
        let first = drain_groups(&mut agg);
        agg.rewind().unwrap();
        assert_eq!(drain_groups(&mut agg), first);
    }

    #[test]
    fn test_empty_input_yields_no_groups() {
        let child = Operator::new(MockExec::grouped(&[]));
        let mut agg = Operator::new(Aggregate::new(child, 1, Some(0), AggOp::Sum).unwrap());
        agg.open().unwrap();
        assert!(!agg.has_next().unwrap());
    }
}
