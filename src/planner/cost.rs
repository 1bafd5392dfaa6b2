//! Cost and cardinality model for join ordering.
//!
//! Joins are costed by strategy: an equality join runs as a hash join
//! (build the outer side, stream the inner side), anything else as a
//! nested loop (rescan the inner side once per outer tuple).

use crate::executor::predicate::Op;

/// Cost of joining an outer relation (cardinality `outer_card`, producing
/// cost `outer_cost`) with an inner one.
pub fn estimate_join_cost(
    op: Op,
    outer_card: usize,
    inner_card: usize,
    outer_cost: f64,
    inner_cost: f64,
) -> f64 {
    let outer_card = outer_card as f64;
    match op {
        // hash join: build over the outer side, one pass over the inner
        Op::Equals => outer_cost + outer_card + inner_cost,
        // nested loop: inner rescan per outer tuple plus the compare work
        _ => outer_cost + outer_card * inner_cost + outer_card * inner_card as f64,
    }
}

/// Cardinality of `t1 join t2`.
///
/// Equality joins respect declared primary keys: joining through a key
/// cannot yield more rows than the other side has. Non-equality joins fall
/// back to a fixed 30% of the cross product, floored at one row.
pub fn estimate_join_cardinality(
    op: Op,
    card1: usize,
    card2: usize,
    t1_pkey: bool,
    t2_pkey: bool,
) -> usize {
    match op {
        Op::Equals => {
            if t1_pkey && t2_pkey {
                card1.min(card2)
            } else if t1_pkey {
                card2
            } else if t2_pkey {
                card1
            } else {
                card1.max(card2)
            }
        }
        _ => (((card1 * card2) as f64 * 0.3) as usize).max(1),
    }
}
