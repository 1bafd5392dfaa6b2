//! Planner integration tests: name resolution and full logical-to-physical
//! lowering over real tables.

mod test_utils;

use test_utils::{drain, drain_int_rows, Scratch};
use wrendb::executor::{Op, Operator, SeqScan};
use wrendb::planner::{LogicalPlan, PlanError};
use wrendb::stats::StatsCatalog;
use wrendb::txn::TransactionId;
use wrendb::{Field, TupleDesc, Type};

/// Small (10 rows, pk), mid (1000 rows), large (100 rows) tables with
/// equijoins small-mid and mid-large.
fn three_table_fixture(scratch: &Scratch) -> (u64, u64, u64) {
    let small_rows: Vec<Vec<Field>> = (0..10).map(|i| vec![Field::Int(i)]).collect();
    let small = scratch.create_table(
        "small",
        TupleDesc::with_names(vec![Type::Int], vec!["id"]),
        Some("id"),
        small_rows,
    );

    let mid_rows: Vec<Vec<Field>> = (0..1000)
        .map(|i| vec![Field::Int(i), Field::Int(i % 10)])
        .collect();
    let mid = scratch.create_table(
        "mid",
        TupleDesc::with_names(vec![Type::Int, Type::Int], vec!["id", "small_id"]),
        None,
        mid_rows,
    );

    let large_rows: Vec<Vec<Field>> = (0..100).map(|i| vec![Field::Int(i * 10)]).collect();
    let large = scratch.create_table(
        "large",
        TupleDesc::with_names(vec![Type::Int], vec!["mid_id"]),
        None,
        large_rows,
    );

    (small, mid, large)
}

#[test]
fn test_three_way_join_end_to_end() {
    let scratch = Scratch::new();
    let a = scratch.int_table("ta", &["id"], &[&[1], &[2]]);
    let b = scratch.int_table(
        "tb",
        &["id2", "aid"],
        &[&[10, 1], &[11, 1], &[12, 2]],
    );
    let c = scratch.int_table("tc", &["bid"], &[&[10], &[12], &[99]]);
    let stats = StatsCatalog::compute(&scratch.db).unwrap();

    let mut plan = LogicalPlan::new(&scratch.db);
    plan.add_scan(a, "a").unwrap();
    plan.add_scan(b, "b").unwrap();
    plan.add_scan(c, "c").unwrap();
    plan.add_join("a.id", "b.aid", Op::Equals).unwrap();
    plan.add_join("b.id2", "c.bid", Op::Equals).unwrap();
    plan.add_project_field("a.id", None).unwrap();
    plan.add_project_field("b.id2", None).unwrap();
    plan.add_project_field("c.bid", None).unwrap();

    let mut tree = plan.physical_plan(TransactionId::new(), &stats).unwrap();
    tree.open().unwrap();
    assert_eq!(
        drain_int_rows(&mut tree),
        vec![vec![1, 10, 10], vec![2, 12, 12]]
    );
    tree.close().unwrap();
}

#[test]
fn test_scan_filter_project_end_to_end() {
    let scratch = Scratch::new();
    let t = scratch.int_table("t", &["a", "b"], &[&[1, 10], &[2, 20], &[3, 30]]);
    let stats = StatsCatalog::compute(&scratch.db).unwrap();

    let mut plan = LogicalPlan::new(&scratch.db);
    plan.add_scan(t, "t").unwrap();
    plan.add_filter("t.a", Op::GreaterThan, "1").unwrap();
    plan.add_project_field("t.b", None).unwrap();

    let mut tree = plan.physical_plan(TransactionId::new(), &stats).unwrap();
    tree.open().unwrap();
    assert_eq!(drain_int_rows(&mut tree), vec![vec![20], vec![30]]);
}

#[test]
fn test_wildcard_select_and_order_by() {
    let scratch = Scratch::new();
    let t = scratch.int_table("t", &["a", "b"], &[&[2, 20], &[1, 10], &[3, 30]]);
    let stats = StatsCatalog::new();

    let mut plan = LogicalPlan::new(&scratch.db);
    plan.add_scan(t, "t").unwrap();
    plan.add_project_field("*", None).unwrap();
    plan.add_order_by("t.a", false).unwrap();

    let mut tree = plan.physical_plan(TransactionId::new(), &stats).unwrap();
    tree.open().unwrap();
    let rows: Vec<Vec<i32>> = drain(&mut tree)
        .iter()
        .map(|t| t.fields().iter().map(|f| f.as_int().unwrap()).collect())
        .collect();
    assert_eq!(rows, vec![vec![3, 30], vec![2, 20], vec![1, 10]]);
}

#[test]
fn test_aggregate_plan_end_to_end() {
    let scratch = Scratch::new();
    let desc = TupleDesc::with_names(vec![Type::Str, Type::Int], vec!["g", "v"]);
    let rows = [("a", 1), ("a", 3), ("b", 5), ("b", 7), ("b", 9)]
        .iter()
        .map(|(g, v)| vec![Field::string(*g), Field::Int(*v)])
        .collect();
    let t = scratch.create_table("t", desc, None, rows);
    let stats = StatsCatalog::new();

    let mut plan = LogicalPlan::new(&scratch.db);
    plan.add_scan(t, "t").unwrap();
    plan.add_project_field("t.g", None).unwrap();
    plan.add_project_field("t.v", Some("AVG")).unwrap();
    plan.add_aggregate("AVG", "t.v", Some("t.g")).unwrap();

    let mut tree = plan.physical_plan(TransactionId::new(), &stats).unwrap();
    tree.open().unwrap();
    let mut groups: Vec<(String, i32)> = drain(&mut tree)
        .iter()
        .map(|t| {
            (
                t.field(0).unwrap().as_str().unwrap().to_string(),
                t.field(1).unwrap().as_int().unwrap(),
            )
        })
        .collect();
    groups.sort();
    assert_eq!(groups, vec![("a".to_string(), 2), ("b".to_string(), 7)]);
}

#[test]
fn test_aggregate_select_list_validation() {
    let scratch = Scratch::new();
    let t = scratch.int_table("t", &["g", "v"], &[&[1, 2]]);
    let stats = StatsCatalog::new();

    // group-by field must lead the select list
    let mut plan = LogicalPlan::new(&scratch.db);
    plan.add_scan(t, "t").unwrap();
    plan.add_project_field("t.v", Some("SUM")).unwrap();
    plan.add_project_field("t.g", None).unwrap();
    plan.add_aggregate("SUM", "t.v", Some("t.g")).unwrap();
    assert!(matches!(
        plan.physical_plan(TransactionId::new(), &stats),
        Err(PlanError::InvalidSelectList(_))
    ));

    // the aggregate entry must actually carry an aggregate op
    let mut plan = LogicalPlan::new(&scratch.db);
    plan.add_scan(t, "t").unwrap();
    plan.add_project_field("t.g", None).unwrap();
    plan.add_project_field("t.v", None).unwrap();
    plan.add_aggregate("SUM", "t.v", Some("t.g")).unwrap();
    assert!(matches!(
        plan.physical_plan(TransactionId::new(), &stats),
        Err(PlanError::InvalidSelectList(_))
    ));

    // unknown aggregate operator
    let mut plan = LogicalPlan::new(&scratch.db);
    plan.add_scan(t, "t").unwrap();
    plan.add_project_field("t.v", Some("MEDIAN")).unwrap();
    plan.add_aggregate("MEDIAN", "t.v", None).unwrap();
    assert!(matches!(
        plan.physical_plan(TransactionId::new(), &stats),
        Err(PlanError::UnknownAggOp(_))
    ));
}

#[test]
fn test_disconnected_joins_rejected() {
    let scratch = Scratch::new();
    let a = scratch.int_table("a", &["x"], &[&[1]]);
    let b = scratch.int_table("b", &["y"], &[&[1]]);
    let stats = StatsCatalog::compute(&scratch.db).unwrap();

    let mut plan = LogicalPlan::new(&scratch.db);
    plan.add_scan(a, "a").unwrap();
    plan.add_scan(b, "b").unwrap();
    plan.add_project_field("a.x", None).unwrap();

    assert!(matches!(
        plan.physical_plan(TransactionId::new(), &stats),
        Err(PlanError::DisconnectedJoins)
    ));
}

#[test]
fn test_subplan_join() {
    let scratch = Scratch::new();
    let a = scratch.int_table("a", &["id", "x"], &[&[1, 10], &[2, 20], &[3, 30]]);
    let d = scratch.int_table("d", &["val"], &[&[1], &[3], &[7]]);
    let stats = StatsCatalog::compute(&scratch.db).unwrap();

    let subplan = Operator::new(
        SeqScan::new(&scratch.db, TransactionId::new(), d, "d").unwrap(),
    );

    let mut plan = LogicalPlan::new(&scratch.db);
    plan.add_scan(a, "a").unwrap();
    plan.add_subplan_join("a.id", subplan, Op::Equals).unwrap();
    plan.add_project_field("a.x", None).unwrap();

    let mut tree = plan.physical_plan(TransactionId::new(), &stats).unwrap();
    tree.open().unwrap();
    assert_eq!(drain_int_rows(&mut tree), vec![vec![10], vec![30]]);
}

#[test]
fn test_name_resolution_errors() {
    let scratch = Scratch::new();
    let a = scratch.int_table("a", &["x", "shared"], &[&[1, 1]]);
    let b = scratch.int_table("b", &["y", "shared"], &[&[1, 1]]);

    let mut plan = LogicalPlan::new(&scratch.db);
    plan.add_scan(a, "a").unwrap();
    plan.add_scan(b, "b").unwrap();

    // bare unique names resolve to their one owner
    assert_eq!(plan.disambiguate_name("x").unwrap(), "a.x");
    assert_eq!(plan.disambiguate_name("b.y").unwrap(), "b.y");

    assert!(matches!(
        plan.disambiguate_name("shared"),
        Err(PlanError::AmbiguousField(_))
    ));
    assert!(matches!(
        plan.disambiguate_name("missing"),
        Err(PlanError::UnknownField(_))
    ));
    assert!(matches!(
        plan.disambiguate_name("z.x"),
        Err(PlanError::UnknownAlias(_))
    ));
    assert!(matches!(
        plan.disambiguate_name("a.b.c"),
        Err(PlanError::InvalidFieldRef(_))
    ));

    assert!(matches!(
        plan.add_filter("*", Op::Equals, "1"),
        Err(PlanError::InvalidWildcard(_))
    ));
    assert!(matches!(
        plan.add_join("a.x", "a.shared", Op::Equals),
        Err(PlanError::SelfJoinField)
    ));
    assert!(matches!(
        plan.add_scan(a, "a"),
        Err(PlanError::DuplicateAlias(_))
    ));
}

#[test]
fn test_filter_selectivity_feeds_join_order() {
    // with a filter collapsing the mid table to ~nothing, joining through
    // it first becomes attractive; the optimizer should still produce a
    // connected, runnable plan
    let scratch = Scratch::new();
    let (small, mid, large) = three_table_fixture(&scratch);
    let stats = StatsCatalog::compute(&scratch.db).unwrap();

    let mut plan = LogicalPlan::new(&scratch.db);
    plan.add_scan(small, "a").unwrap();
    plan.add_scan(mid, "b").unwrap();
    plan.add_scan(large, "c").unwrap();
    plan.add_filter("b.id", Op::LessThan, "10").unwrap();
    plan.add_join("a.id", "b.small_id", Op::Equals).unwrap();
    plan.add_join("b.id", "c.mid_id", Op::Equals).unwrap();
    plan.add_project_field("b.id", None).unwrap();

    let mut tree = plan.physical_plan(TransactionId::new(), &stats).unwrap();
    tree.open().unwrap();
    // b.id in 0..10 joined against c.mid_id multiples of 10: only b.id = 0
    let rows = drain_int_rows(&mut tree);
    assert_eq!(rows, vec![vec![0]]);
}
