//! Lowering logical plans to operator trees.
//!
//! [`PhysicalPlanner::plan`] walks a [`LogicalPlan`] bottom-up: scans
//! first, then filters (accumulating per-alias selectivities), then the
//! optimizer-ordered joins, then the optional aggregate, order-by, and the
//! final projection.

use std::collections::HashMap;

use crate::executor::aggregate::AggOp;
use crate::executor::predicate::Predicate;
use crate::executor::{Aggregate, Filter, Operator, OrderBy, Project, SeqScan};
use crate::schema::Type;
use crate::stats::StatsCatalog;
use crate::tuple::Field;
use crate::txn::TransactionId;

use super::error::{PlanError, PlanResult};
use super::logical::{split_qualified, LogicalJoin, LogicalPlan};
use super::optimizer::{instantiate_join, instantiate_subplan_join, JoinOptimizer};

/// Builds executable operator trees from logical plans.
pub struct PhysicalPlanner;

impl PhysicalPlanner {
    /// Lower `plan` into an operator tree running under `txn`.
    pub fn plan(
        mut plan: LogicalPlan,
        txn: TransactionId,
        stats: &StatsCatalog,
    ) -> PlanResult<Operator> {
        let db = plan.db().clone();

        // one sequential scan per alias
        let mut subplans: HashMap<String, Operator> = HashMap::new();
        let mut selectivities: HashMap<String, f64> = HashMap::new();
        for scan in plan.scans() {
            let op = Operator::new(SeqScan::new(&db, txn, scan.table_id, &scan.alias)?);
            subplans.insert(scan.alias.clone(), op);
            selectivities.insert(scan.alias.clone(), 1.0);
        }

        // filters sit directly on their scans; each one narrows the
        // alias's estimated selectivity
        for filter in plan.filters() {
            let child = subplans
                .remove(&filter.table_alias)
                .ok_or_else(|| PlanError::UnknownAlias(filter.table_alias.clone()))?;
            let desc = child.tuple_desc();
            let index = desc
                .field_index(&filter.qualified_field)
                .ok_or_else(|| PlanError::UnknownField(filter.qualified_field.clone()))?;
            let constant = match desc.field_type(index) {
                Some(Type::Int) => {
                    Field::Int(filter.constant.parse().map_err(|_| {
                        PlanError::InvalidConstant {
                            field: filter.qualified_field.clone(),
                            value: filter.constant.clone(),
                        }
                    })?)
                }
                _ => Field::string(filter.constant.as_str()),
            };
            let predicate = Predicate::new(index, filter.op, constant);

            let table_id = plan
                .table_id(&filter.table_alias)
                .ok_or_else(|| PlanError::UnknownAlias(filter.table_alias.clone()))?;
            let table_name = db.catalog().table_name(table_id)?;
            match stats.get(&table_name) {
                Some(table_stats) => {
                    let s = table_stats.estimate_selectivity(
                        predicate.field(),
                        predicate.op(),
                        predicate.operand(),
                    )?;
                    *selectivities.entry(filter.table_alias.clone()).or_insert(1.0) *= s;
                }
                None => {
                    tracing::debug!(table = %table_name, "no statistics; assuming selectivity 1");
                }
            }

            subplans.insert(
                filter.table_alias.clone(),
                Operator::new(Filter::new(predicate, child)),
            );
        }

        // order joins and fold them into the subplans
        let joins = plan.take_joins();
        let optimizer = JoinOptimizer::new(&db, plan.alias_map(), stats, &selectivities);
        let joins = optimizer.order_joins(joins)?;

        // equivalences: once two aliases are joined, the combined tree is
        // stored under the left key and every alias of the right tree maps
        // to it
        let mut equiv: HashMap<String, String> = HashMap::new();
        for join in joins {
            match join {
                LogicalJoin::Tables(node) => {
                    let left_key = resolve(&equiv, &node.t1_alias);
                    let right_key = resolve(&equiv, &node.t2_alias);
                    let left = subplans
                        .remove(&left_key)
                        .ok_or_else(|| PlanError::UnknownAlias(left_key.clone()))?;
                    let right = subplans
                        .remove(&right_key)
                        .ok_or_else(|| PlanError::UnknownAlias(right_key.clone()))?;
                    subplans.insert(left_key.clone(), instantiate_join(&node, left, right)?);

                    equiv.insert(right_key.clone(), left_key.clone());
                    for value in equiv.values_mut() {
                        if *value == right_key {
                            *value = left_key.clone();
                        }
                    }
                }
                LogicalJoin::Subplan(node) => {
                    let left_key = resolve(&equiv, &node.t1_alias);
                    let left = subplans
                        .remove(&left_key)
                        .ok_or_else(|| PlanError::UnknownAlias(left_key.clone()))?;
                    subplans.insert(
                        left_key.clone(),
                        instantiate_subplan_join(&node.f1_qualified, node.op, left, node.subplan)?,
                    );
                }
            }
        }

        if subplans.len() > 1 {
            return Err(PlanError::DisconnectedJoins);
        }
        let mut node = subplans
            .into_values()
            .next()
            .ok_or(PlanError::DisconnectedJoins)?;
        let node_desc = node.tuple_desc().clone();

        // the output projection, validated against the aggregation shape
        let mut out_fields = Vec::new();
        let mut out_types = Vec::new();
        if let Some((agg_op_name, agg_field)) = plan.agg() {
            let mut idx = 0;
            if let Some(group_by) = plan.group_by() {
                let first = plan
                    .select_list()
                    .first()
                    .ok_or_else(|| PlanError::InvalidSelectList("empty select list".into()))?;
                if &first.qualified_field != group_by {
                    return Err(PlanError::InvalidSelectList(
                        "the first selected field must be the group-by field".into(),
                    ));
                }
                let group_index = node_desc
                    .field_index(group_by)
                    .ok_or_else(|| PlanError::UnknownField(group_by.clone()))?;
                out_fields.push(idx);
                out_types.push(
                    node_desc
                        .field_type(group_index)
                        .expect("group field exists"),
                );
                idx += 1;
            }
            if plan.select_list().len() != idx + 1 {
                return Err(PlanError::InvalidSelectList(format!(
                    "an aggregated query selects exactly {} fields",
                    idx + 1
                )));
            }
            if plan.select_list()[idx].agg_op.is_none() {
                return Err(PlanError::InvalidSelectList(
                    "the last selected field must be the aggregate".into(),
                ));
            }
            out_fields.push(idx);
            out_types.push(Type::Int);

            // fold the aggregate in before projecting
            let op = AggOp::parse(agg_op_name)
                .ok_or_else(|| PlanError::UnknownAggOp(agg_op_name.clone()))?;
            let agg_index = node_desc
                .field_index(agg_field)
                .ok_or_else(|| PlanError::UnknownField(agg_field.clone()))?;
            let group_index = match plan.group_by() {
                Some(g) => Some(
                    node_desc
                        .field_index(g)
                        .ok_or_else(|| PlanError::UnknownField(g.clone()))?,
                ),
                None => None,
            };
            node = Operator::new(Aggregate::new(node, agg_index, group_index, op)?);
        } else {
            for select in plan.select_list() {
                if select.qualified_field == "null.*" {
                    for i in 0..node_desc.num_fields() {
                        out_fields.push(i);
                        out_types.push(node_desc.field_type(i).expect("field exists"));
                    }
                } else if split_qualified(&select.qualified_field).1 == "*" {
                    return Err(PlanError::InvalidWildcard(select.qualified_field.clone()));
                } else {
                    let index = node_desc
                        .field_index(&select.qualified_field)
                        .ok_or_else(|| PlanError::UnknownField(select.qualified_field.clone()))?;
                    out_fields.push(index);
                    out_types.push(node_desc.field_type(index).expect("field exists"));
                }
            }
        }

        if let Some((field, ascending)) = plan.order_by() {
            // resolved against the tree as it stands, i.e. after any
            // aggregation
            let index = node
                .tuple_desc()
                .field_index(field)
                .ok_or_else(|| PlanError::UnknownField(field.clone()))?;
            node = Operator::new(OrderBy::new(index, *ascending, node));
        }

        Ok(Operator::new(Project::new(out_fields, out_types, node)?))
    }
}

fn resolve(equiv: &HashMap<String, String>, alias: &str) -> String {
    match equiv.get(alias) {
        Some(canonical) => canonical.clone(),
        None => alias.to_string(),
    }
}
