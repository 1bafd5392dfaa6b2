//! Cost-based join ordering.
//!
//! [`JoinOptimizer::order_joins`] runs a Selinger-style dynamic program
//! over subsets of the query's table joins: the best plan for every subset
//! of size k is built by extending the best plans of its size k-1 subsets
//! with the remaining join, trying both inner/outer orientations. Costs and
//! cardinalities come from [`super::cost`] fed with histogram-derived base
//! table estimates.
//!
//! Subplan joins are not reordered; they are appended after the ordered
//! table joins in their original sequence, with the subplan kept on the
//! probe side.

use std::collections::{HashMap, HashSet};

use crate::db::Database;
use crate::executor::predicate::{JoinPredicate, Op};
use crate::executor::{Join, Operator};
use crate::stats::StatsCatalog;

use super::cost::{estimate_join_cardinality, estimate_join_cost};
use super::error::{PlanError, PlanResult};
use super::logical::{LogicalJoin, LogicalJoinNode};

/// Best plan found so far for one subset of the joins.
struct Subplan {
    cost: f64,
    card: usize,
    order: Vec<LogicalJoinNode>,
    aliases: HashSet<String>,
    /// Alias sequence of the join order; the tie-break between equal-cost
    /// plans, compared lexicographically.
    key: Vec<String>,
}

/// Orders the joins of one query using base-table statistics.
pub struct JoinOptimizer<'a> {
    db: &'a Database,
    alias_to_id: &'a HashMap<String, u64>,
    stats: &'a StatsCatalog,
    selectivities: &'a HashMap<String, f64>,
}

impl<'a> JoinOptimizer<'a> {
    /// Create an optimizer over the query's alias mapping, the stats
    /// registry, and the per-alias filter selectivities accumulated so far.
    pub fn new(
        db: &'a Database,
        alias_to_id: &'a HashMap<String, u64>,
        stats: &'a StatsCatalog,
        selectivities: &'a HashMap<String, f64>,
    ) -> Self {
        JoinOptimizer {
            db,
            alias_to_id,
            stats,
            selectivities,
        }
    }

    /// Reorder `joins` to minimize estimated cost.
    ///
    /// The returned sequence is bottom-up: the first join is applied first.
    /// If the join graph is disconnected the input order is returned
    /// unchanged and the failure surfaces later as
    /// [`PlanError::DisconnectedJoins`] when the plan is lowered.
    pub fn order_joins(&self, joins: Vec<LogicalJoin>) -> PlanResult<Vec<LogicalJoin>> {
        let mut table_joins = Vec::new();
        let mut subplan_joins = Vec::new();
        for join in joins {
            match join {
                LogicalJoin::Tables(node) => table_joins.push(node),
                LogicalJoin::Subplan(node) => subplan_joins.push(node),
            }
        }

        let ordered = self.order_table_joins(table_joins)?;
        Ok(ordered
            .into_iter()
            .map(LogicalJoin::Tables)
            .chain(subplan_joins.into_iter().map(LogicalJoin::Subplan))
            .collect())
    }

    fn order_table_joins(
        &self,
        joins: Vec<LogicalJoinNode>,
    ) -> PlanResult<Vec<LogicalJoinNode>> {
        let n = joins.len();
        if n <= 1 {
            return Ok(joins);
        }

        let full: usize = (1 << n) - 1;
        let mut best: Vec<Option<Subplan>> = Vec::with_capacity(full + 1);
        best.resize_with(full + 1, || None);

        for mask in 1..=full {
            let mut winner: Option<Subplan> = None;
            for (j, node) in joins.iter().enumerate() {
                if mask & (1 << j) == 0 {
                    continue;
                }
                let prev_mask = mask & !(1 << j);
                let candidate = if prev_mask == 0 {
                    Some(self.first_join(node)?)
                } else {
                    match &best[prev_mask] {
                        Some(prev) => self.extend_join(prev, node)?,
                        None => None,
                    }
                };
                if let Some(c) = candidate {
                    if winner.as_ref().map_or(true, |w| Self::better(&c, w)) {
                        winner = Some(c);
                    }
                }
            }
            best[mask] = winner;
        }

        match best.swap_remove(full) {
            Some(plan) => {
                tracing::debug!(
                    cost = plan.cost,
                    card = plan.card,
                    order = ?plan.key,
                    "picked join order"
                );
                Ok(plan.order)
            }
            None => {
                tracing::debug!("join graph is disconnected; keeping input join order");
                Ok(joins)
            }
        }
    }

    /// Plan a single join between two base tables.
    fn first_join(&self, node: &LogicalJoinNode) -> PlanResult<Subplan> {
        let (cost1, card1) = self.base_estimates(&node.t1_alias)?;
        let (cost2, card2) = self.base_estimates(&node.t2_alias)?;
        let card = estimate_join_cardinality(
            node.op,
            card1,
            card2,
            self.is_primary_key(&node.t1_alias, &node.f1_name),
            self.is_primary_key(&node.t2_alias, &node.f2_name),
        );

        let forward = node.clone();
        let forward_cost = estimate_join_cost(forward.op, card1, card2, cost1, cost2);
        let swapped = node.swap_inner_outer();
        let swapped_cost = estimate_join_cost(swapped.op, card2, card1, cost2, cost1);

        let chosen = Self::pick_orientation(
            (forward, forward_cost),
            (swapped, swapped_cost),
        );
        Ok(self.make_subplan(chosen.0, chosen.1, card, None))
    }

    /// Extend a subset plan with one more join touching it.
    fn extend_join(
        &self,
        prev: &Subplan,
        node: &LogicalJoinNode,
    ) -> PlanResult<Option<Subplan>> {
        // orient the join so its t1 side is the existing plan
        let node = if prev.aliases.contains(&node.t1_alias) {
            node.clone()
        } else if prev.aliases.contains(&node.t2_alias) {
            node.swap_inner_outer()
        } else {
            return Ok(None);
        };

        let (base_cost, base_card) = self.base_estimates(&node.t2_alias)?;
        let card = estimate_join_cardinality(
            node.op,
            prev.card,
            base_card,
            self.is_primary_key(&node.t1_alias, &node.f1_name),
            self.is_primary_key(&node.t2_alias, &node.f2_name),
        );

        let plan_outer_cost =
            estimate_join_cost(node.op, prev.card, base_card, prev.cost, base_cost);
        let swapped = node.swap_inner_outer();
        let base_outer_cost =
            estimate_join_cost(swapped.op, base_card, prev.card, base_cost, prev.cost);

        let chosen = Self::pick_orientation(
            (node, plan_outer_cost),
            (swapped, base_outer_cost),
        );
        Ok(Some(self.make_subplan(chosen.0, chosen.1, card, Some(prev))))
    }

    fn pick_orientation(
        a: (LogicalJoinNode, f64),
        b: (LogicalJoinNode, f64),
    ) -> (LogicalJoinNode, f64) {
        if b.1 < a.1 || (b.1 == a.1 && (&b.0.t1_alias, &b.0.t2_alias) < (&a.0.t1_alias, &a.0.t2_alias))
        {
            b
        } else {
            a
        }
    }

    fn make_subplan(
        &self,
        node: LogicalJoinNode,
        cost: f64,
        card: usize,
        prev: Option<&Subplan>,
    ) -> Subplan {
        let mut order = prev.map(|p| p.order.clone()).unwrap_or_default();
        let mut aliases = prev.map(|p| p.aliases.clone()).unwrap_or_default();
        let mut key = prev.map(|p| p.key.clone()).unwrap_or_default();
        aliases.insert(node.t1_alias.clone());
        aliases.insert(node.t2_alias.clone());
        key.push(node.t1_alias.clone());
        key.push(node.t2_alias.clone());
        order.push(node);
        Subplan {
            cost,
            card,
            order,
            aliases,
            key,
        }
    }

    fn better(a: &Subplan, b: &Subplan) -> bool {
        a.cost < b.cost || (a.cost == b.cost && a.key < b.key)
    }

    /// Scan cost and post-filter cardinality of a base table.
    fn base_estimates(&self, alias: &str) -> PlanResult<(f64, usize)> {
        let table_id = self
            .alias_to_id
            .get(alias)
            .ok_or_else(|| PlanError::UnknownAlias(alias.to_string()))?;
        let name = self.db.catalog().table_name(*table_id)?;
        let stats = self
            .stats
            .get(&name)
            .ok_or_else(|| PlanError::MissingStats(name.clone()))?;
        let selectivity = self.selectivities.get(alias).copied().unwrap_or(1.0);
        let card = stats.estimate_table_cardinality(selectivity).max(1);
        Ok((stats.scan_cost(), card))
    }

    /// Whether `alias.field` is the declared primary key of its table.
    fn is_primary_key(&self, alias: &str, field: &str) -> bool {
        self.alias_to_id
            .get(alias)
            .and_then(|id| self.db.catalog().primary_key(*id).ok().flatten())
            .map_or(false, |pk| pk == field)
    }
}

/// Build the physical join for an ordered table-to-table join node.
///
/// Field indices are resolved by qualified name against each side's schema.
pub fn instantiate_join(
    node: &LogicalJoinNode,
    left: Operator,
    right: Operator,
) -> PlanResult<Operator> {
    let f1 = left
        .tuple_desc()
        .field_index(&node.f1_qualified)
        .ok_or_else(|| PlanError::UnknownField(node.f1_qualified.clone()))?;
    let f2 = right
        .tuple_desc()
        .field_index(&node.f2_qualified)
        .ok_or_else(|| PlanError::UnknownField(node.f2_qualified.clone()))?;
    Ok(Operator::new(Join::new(
        JoinPredicate::new(f1, node.op, f2),
        left,
        right,
    )))
}

/// Build the physical join against a subquery plan, whose join field is
/// the first column of its result.
pub fn instantiate_subplan_join(
    f1_qualified: &str,
    op: Op,
    left: Operator,
    subplan: Operator,
) -> PlanResult<Operator> {
    let f1 = left
        .tuple_desc()
        .field_index(f1_qualified)
        .ok_or_else(|| PlanError::UnknownField(f1_qualified.to_string()))?;
    Ok(Operator::new(Join::new(
        JoinPredicate::new(f1, op, 0),
        left,
        subplan,
    )))
}
