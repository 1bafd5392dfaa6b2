//! Comparison predicates over tuple fields.

use std::cmp::Ordering;
use std::fmt;

use crate::tuple::{Field, Tuple};

use super::error::{ExecutorError, ExecutorResult};

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Equals,
    GreaterThan,
    LessThan,
    LessThanOrEq,
    GreaterThanOrEq,
    NotEquals,
}

impl Op {
    /// Evaluate `lhs op rhs`. Fields of different types never compare.
    pub fn apply(&self, lhs: &Field, rhs: &Field) -> ExecutorResult<bool> {
        let ord = match (lhs, rhs) {
            (Field::Int(a), Field::Int(b)) => a.cmp(b),
            (Field::Str(a), Field::Str(b)) => a.cmp(b),
            _ => {
                return Err(ExecutorError::TypeMismatch {
                    expected: lhs.field_type(),
                    got: rhs.field_type(),
                })
            }
        };
        Ok(self.matches(ord))
    }

    fn matches(&self, ord: Ordering) -> bool {
        match self {
            Op::Equals => ord == Ordering::Equal,
            Op::NotEquals => ord != Ordering::Equal,
            Op::GreaterThan => ord == Ordering::Greater,
            Op::GreaterThanOrEq => ord != Ordering::Less,
            Op::LessThan => ord == Ordering::Less,
            Op::LessThanOrEq => ord != Ordering::Greater,
        }
    }

    /// The operator to use when the two sides of a comparison swap places:
    /// `a < b` becomes `b > a`, and so on.
    pub fn swap_sides(&self) -> Op {
        match self {
            Op::GreaterThan => Op::LessThan,
            Op::GreaterThanOrEq => Op::LessThanOrEq,
            Op::LessThan => Op::GreaterThan,
            Op::LessThanOrEq => Op::GreaterThanOrEq,
            Op::Equals => Op::Equals,
            Op::NotEquals => Op::NotEquals,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Op::Equals => "=",
            Op::GreaterThan => ">",
            Op::LessThan => "<",
            Op::LessThanOrEq => "<=",
            Op::GreaterThanOrEq => ">=",
            Op::NotEquals => "<>",
        };
        write!(f, "{}", s)
    }
}

/// `field op constant` over a single tuple.
#[derive(Debug, Clone)]
pub struct Predicate {
    field: usize,
    op: Op,
    operand: Field,
}

impl Predicate {
    /// Create a predicate comparing field `field` against `operand`.
    pub fn new(field: usize, op: Op, operand: Field) -> Self {
        Predicate { field, op, operand }
    }

    /// Index of the field this predicate ranges over.
    pub fn field(&self) -> usize {
        self.field
    }

    /// The comparison operator.
    pub fn op(&self) -> Op {
        self.op
    }

    /// The constant being compared against.
    pub fn operand(&self) -> &Field {
        &self.operand
    }

    /// Whether `tuple` satisfies this predicate.
    pub fn filter(&self, tuple: &Tuple) -> ExecutorResult<bool> {
        let value = tuple
            .field(self.field)
            .ok_or(ExecutorError::FieldIndexOutOfBounds {
                index: self.field,
                len: tuple.fields().len(),
            })?;
        self.op.apply(value, &self.operand)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{} {} {}", self.field, self.op, self.operand)
    }
}

/// `left.field1 op right.field2` over a pair of tuples.
#[derive(Debug, Clone)]
pub struct JoinPredicate {
    field1: usize,
    op: Op,
    field2: usize,
}

impl JoinPredicate {
    /// Create a join predicate over field `field1` of the outer tuple and
    /// field `field2` of the inner tuple.
    pub fn new(field1: usize, op: Op, field2: usize) -> Self {
        JoinPredicate { field1, op, field2 }
    }

    /// Field index on the outer side.
    pub fn field1(&self) -> usize {
        self.field1
    }

    /// The comparison operator.
    pub fn op(&self) -> Op {
        self.op
    }

    /// Field index on the inner side.
    pub fn field2(&self) -> usize {
        self.field2
    }

    /// Whether the pair `(left, right)` satisfies this predicate.
    pub fn filter(&self, left: &Tuple, right: &Tuple) -> ExecutorResult<bool> {
        let lhs = left
            .field(self.field1)
            .ok_or(ExecutorError::FieldIndexOutOfBounds {
                index: self.field1,
                len: left.fields().len(),
            })?;
        let rhs = right
            .field(self.field2)
            .ok_or(ExecutorError::FieldIndexOutOfBounds {
                index: self.field2,
                len: right.fields().len(),
            })?;
        self.op.apply(lhs, rhs)
    }
}
