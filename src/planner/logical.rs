//! Logical query plans.
//!
//! A [`LogicalPlan`] collects scan, filter, and join nodes plus a select
//! list, optional aggregation, and optional ordering - the shape a query
//! has after parsing and before the optimizer picks a join order. Field
//! names are resolved (and disambiguated) against the scanned tables as
//! nodes are added.

use std::collections::HashMap;

use crate::db::Database;
use crate::executor::predicate::Op;
use crate::executor::Operator;
use crate::stats::StatsCatalog;
use crate::txn::TransactionId;

use super::error::{PlanError, PlanResult};
use super::physical::PhysicalPlanner;

/// One base-table access in the plan.
#[derive(Debug, Clone)]
pub struct LogicalScanNode {
    /// Table being scanned.
    pub table_id: u64,
    /// Alias the query knows the table by.
    pub alias: String,
}

/// One `alias.field op constant` filter.
#[derive(Debug, Clone)]
pub struct LogicalFilterNode {
    /// Alias of the table the filter ranges over.
    pub table_alias: String,
    /// Bare field name, without qualifier.
    pub field_name: String,
    /// `alias.field` form used for schema lookups.
    pub qualified_field: String,
    /// Comparison operator.
    pub op: Op,
    /// Unparsed constant; its type follows the field's type.
    pub constant: String,
}

/// A join between fields of two scanned tables.
///
/// Equality is symmetric in the two aliases and ignores the field names:
/// two nodes are equal when they connect the same pair of tables.
#[derive(Debug, Clone)]
pub struct LogicalJoinNode {
    /// Alias of the first (outer) table.
    pub t1_alias: String,
    /// Alias of the second (inner) table.
    pub t2_alias: String,
    /// Bare join field name in t1.
    pub f1_name: String,
    /// Bare join field name in t2.
    pub f2_name: String,
    /// `alias.field` form of the t1 field.
    pub f1_qualified: String,
    /// `alias.field` form of the t2 field.
    pub f2_qualified: String,
    /// Join predicate operator.
    pub op: Op,
}

impl LogicalJoinNode {
    /// Create a join node between `t1.f1` and `t2.f2`.
    pub fn new(t1: &str, t2: &str, f1: &str, f2: &str, op: Op) -> Self {
        LogicalJoinNode {
            t1_alias: t1.to_string(),
            t2_alias: t2.to_string(),
            f1_name: f1.to_string(),
            f2_name: f2.to_string(),
            f1_qualified: format!("{}.{}", t1, f1),
            f2_qualified: format!("{}.{}", t2, f2),
            op,
        }
    }

    /// The same join with inner and outer swapped; comparison operators
    /// flip direction accordingly.
    pub fn swap_inner_outer(&self) -> LogicalJoinNode {
        LogicalJoinNode::new(
            &self.t2_alias,
            &self.t1_alias,
            &self.f2_name,
            &self.f1_name,
            self.op.swap_sides(),
        )
    }
}

impl PartialEq for LogicalJoinNode {
    fn eq(&self, other: &Self) -> bool {
        (self.t1_alias == other.t1_alias && self.t2_alias == other.t2_alias)
            || (self.t1_alias == other.t2_alias && self.t2_alias == other.t1_alias)
    }
}

impl Eq for LogicalJoinNode {}

/// A join between a scanned table and an already-built subquery plan.
///
/// The subplan always sits on the inner (probe) side and its join field is
/// the first column of its result. These joins are never reordered or
/// swapped by the optimizer.
pub struct LogicalSubplanJoinNode {
    /// Alias of the outer table.
    pub t1_alias: String,
    /// Bare join field name in t1.
    pub f1_name: String,
    /// `alias.field` form of the t1 field.
    pub f1_qualified: String,
    /// The subquery operator tree.
    pub subplan: Operator,
    /// Join predicate operator.
    pub op: Op,
}

/// Either kind of join the plan can hold.
pub enum LogicalJoin {
    /// Table-to-table join, reorderable by the optimizer.
    Tables(LogicalJoinNode),
    /// Table-to-subplan join, kept in input order.
    Subplan(LogicalSubplanJoinNode),
}

/// One entry of the select list.
#[derive(Debug, Clone)]
pub struct LogicalSelectListNode {
    /// `alias.field` being output, or `null.*` for all fields.
    pub qualified_field: String,
    /// Aggregate operation over the field, if any.
    pub agg_op: Option<String>,
}

/// A parsed query ready for optimization.
pub struct LogicalPlan {
    db: Database,
    scans: Vec<LogicalScanNode>,
    filters: Vec<LogicalFilterNode>,
    joins: Vec<LogicalJoin>,
    select_list: Vec<LogicalSelectListNode>,
    agg: Option<(String, String)>,
    group_by: Option<String>,
    order_by: Option<(String, bool)>,
    alias_to_id: HashMap<String, u64>,
}

impl LogicalPlan {
    /// Create an empty plan over `db`.
    pub fn new(db: &Database) -> Self {
        LogicalPlan {
            db: db.clone(),
            scans: Vec::new(),
            filters: Vec::new(),
            joins: Vec::new(),
            select_list: Vec::new(),
            agg: None,
            group_by: None,
            order_by: None,
            alias_to_id: HashMap::new(),
        }
    }

    /// Id of the table scanned under `alias`.
    pub fn table_id(&self, alias: &str) -> Option<u64> {
        self.alias_to_id.get(alias).copied()
    }

    /// The full alias-to-table mapping.
    pub fn alias_map(&self) -> &HashMap<String, u64> {
        &self.alias_to_id
    }

    /// Scan a table under the given alias. One scan node is needed per
    /// alias, so self-joins scan the same table twice.
    pub fn add_scan(&mut self, table_id: u64, alias: &str) -> PlanResult<()> {
        if self.alias_to_id.contains_key(alias) {
            return Err(PlanError::DuplicateAlias(alias.to_string()));
        }
        tracing::trace!(table_id, alias, "added scan");
        self.scans.push(LogicalScanNode {
            table_id,
            alias: alias.to_string(),
        });
        self.alias_to_id.insert(alias.to_string(), table_id);
        Ok(())
    }

    /// Add a `field op constant` filter. The field may be qualified
    /// (`alias.field`) or a unique bare name.
    pub fn add_filter(&mut self, field: &str, op: Op, constant: &str) -> PlanResult<()> {
        let qualified = self.disambiguate_name(field)?;
        let (alias, field_name) = split_qualified(&qualified);
        if field_name == "*" {
            return Err(PlanError::InvalidWildcard(
                "* cannot appear in a filter".to_string(),
            ));
        }
        self.filters.push(LogicalFilterNode {
            table_alias: alias.to_string(),
            field_name: field_name.to_string(),
            qualified_field: qualified.clone(),
            op,
            constant: constant.to_string(),
        });
        tracing::trace!(field = %qualified, %op, constant, "added filter");
        Ok(())
    }

    /// Add a join between two fields of two different tables.
    pub fn add_join(&mut self, field1: &str, field2: &str, op: Op) -> PlanResult<()> {
        let q1 = self.disambiguate_name(field1)?;
        let q2 = self.disambiguate_name(field2)?;
        let (t1, f1) = split_qualified(&q1);
        let (t2, f2) = split_qualified(&q2);
        if f1 == "*" || f2 == "*" {
            return Err(PlanError::InvalidWildcard(
                "* cannot be a join field".to_string(),
            ));
        }
        if t1 == t2 {
            return Err(PlanError::SelfJoinField);
        }
        tracing::trace!(left = %q1, right = %q2, %op, "added join");
        self.joins
            .push(LogicalJoin::Tables(LogicalJoinNode::new(t1, t2, f1, f2, op)));
        Ok(())
    }

    /// Add a join between a field and a subquery plan. The subquery's join
    /// field is the first column of its result.
    pub fn add_subplan_join(
        &mut self,
        field1: &str,
        subplan: Operator,
        op: Op,
    ) -> PlanResult<()> {
        let q1 = self.disambiguate_name(field1)?;
        let (t1, f1) = split_qualified(&q1);
        if f1 == "*" {
            return Err(PlanError::InvalidWildcard(
                "* cannot be a join field".to_string(),
            ));
        }
        tracing::trace!(left = %q1, %op, "added subplan join");
        self.joins.push(LogicalJoin::Subplan(LogicalSubplanJoinNode {
            t1_alias: t1.to_string(),
            f1_name: f1.to_string(),
            f1_qualified: q1,
            subplan,
            op,
        }));
        Ok(())
    }

    /// Append a field (optionally aggregated) to the select list.
    pub fn add_project_field(&mut self, field: &str, agg_op: Option<&str>) -> PlanResult<()> {
        let qualified = self.disambiguate_name(field)?;
        self.select_list.push(LogicalSelectListNode {
            qualified_field: qualified,
            agg_op: agg_op.map(str::to_string),
        });
        Ok(())
    }

    /// Declare the single aggregate of the query, with an optional group-by
    /// field.
    pub fn add_aggregate(
        &mut self,
        op: &str,
        agg_field: &str,
        group_by: Option<&str>,
    ) -> PlanResult<()> {
        let agg_field = self.disambiguate_name(agg_field)?;
        self.group_by = match group_by {
            Some(g) => Some(self.disambiguate_name(g)?),
            None => None,
        };
        self.agg = Some((op.to_string(), agg_field));
        Ok(())
    }

    /// Declare the single order-by of the query.
    pub fn add_order_by(&mut self, field: &str, ascending: bool) -> PlanResult<()> {
        let qualified = self.disambiguate_name(field)?;
        if split_qualified(&qualified).1 == "*" {
            return Err(PlanError::InvalidWildcard(
                "cannot order by *".to_string(),
            ));
        }
        self.order_by = Some((qualified, ascending));
        Ok(())
    }

    /// Resolve `name` to `alias.field` form.
    ///
    /// Accepts `*`, `alias.field`, `alias.*`, `null.field`, or a bare field
    /// name, which must occur in exactly one scanned table.
    pub fn disambiguate_name(&self, name: &str) -> PlanResult<String> {
        if name == "*" || name == "null.*" {
            return Ok("null.*".to_string());
        }

        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() > 2 {
            return Err(PlanError::InvalidFieldRef(name.to_string()));
        }

        // explicit alias.field: verify both halves exist
        if parts.len() == 2 && parts[0] != "null" {
            let (alias, field) = (parts[0], parts[1]);
            let table_id = self
                .alias_to_id
                .get(alias)
                .ok_or_else(|| PlanError::UnknownAlias(name.to_string()))?;
            if field == "*" {
                return Ok(name.to_string());
            }
            let desc = self.db.catalog().tuple_desc(*table_id)?;
            if !desc.has_field(field) {
                return Err(PlanError::UnknownField(name.to_string()));
            }
            return Ok(name.to_string());
        }

        // bare (or null-qualified) field: find the one table that has it
        let field = *parts.last().expect("split is non-empty");
        let mut owner: Option<&str> = None;
        for scan in &self.scans {
            let desc = self.db.catalog().tuple_desc(scan.table_id)?;
            if desc.has_field(field) {
                if owner.is_some() {
                    return Err(PlanError::AmbiguousField(field.to_string()));
                }
                owner = Some(&scan.alias);
            }
        }
        match owner {
            Some(alias) => Ok(format!("{}.{}", alias, field)),
            None => Err(PlanError::UnknownField(field.to_string())),
        }
    }

    /// Lower this plan to an executable operator tree, ordering joins with
    /// the cost-based optimizer.
    pub fn physical_plan(self, txn: TransactionId, stats: &StatsCatalog) -> PlanResult<Operator> {
        PhysicalPlanner::plan(self, txn, stats)
    }

    // accessors for the planner internals

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    pub(crate) fn scans(&self) -> &[LogicalScanNode] {
        &self.scans
    }

    pub(crate) fn filters(&self) -> &[LogicalFilterNode] {
        &self.filters
    }

    pub(crate) fn take_joins(&mut self) -> Vec<LogicalJoin> {
        std::mem::take(&mut self.joins)
    }

    pub(crate) fn select_list(&self) -> &[LogicalSelectListNode] {
        &self.select_list
    }

    pub(crate) fn agg(&self) -> Option<&(String, String)> {
        self.agg.as_ref()
    }

    pub(crate) fn group_by(&self) -> Option<&String> {
        self.group_by.as_ref()
    }

    pub(crate) fn order_by(&self) -> Option<&(String, bool)> {
        self.order_by.as_ref()
    }
}

/// Split an `alias.field` name into its halves.
pub(crate) fn split_qualified(name: &str) -> (&str, &str) {
    match name.split_once('.') {
        Some((alias, field)) => (alias, field),
        None => ("", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_node_equality_is_symmetric() {
        let a = LogicalJoinNode::new("t1", "t2", "x", "y", Op::Equals);
        let b = LogicalJoinNode::new("t2", "t1", "p", "q", Op::LessThan);
        let c = LogicalJoinNode::new("t1", "t3", "x", "y", Op::Equals);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_swap_inner_outer_flips_comparisons() {
        let node = LogicalJoinNode::new("t1", "t2", "x", "y", Op::GreaterThan);
        let swapped = node.swap_inner_outer();
        assert_eq!(swapped.t1_alias, "t2");
        assert_eq!(swapped.t2_alias, "t1");
        assert_eq!(swapped.f1_name, "y");
        assert_eq!(swapped.op, Op::LessThan);
        assert_eq!(swapped.f1_qualified, "t2.y");

        let eq = LogicalJoinNode::new("t1", "t2", "x", "y", Op::Equals);
        assert_eq!(eq.swap_inner_outer().op, Op::Equals);
    }

    #[test]
    fn test_split_qualified() {
        assert_eq!(split_qualified("t1.field"), ("t1", "field"));
        assert_eq!(split_qualified("bare"), ("", "bare"));
    }
}
