//! Executor integration tests: operator trees over real heap files.

mod test_utils;

use test_utils::{drain, drain_int_rows, Scratch};
use wrendb::executor::{
    AggOp, Aggregate, Delete, Filter, Insert, Join, JoinPredicate, Op, Operator, OrderBy,
    Predicate, Project, SeqScan,
};
use wrendb::txn::TransactionId;
use wrendb::{Field, TupleDesc, Type};

fn scan(scratch: &Scratch, table: u64, alias: &str) -> Operator {
    Operator::new(SeqScan::new(&scratch.db, TransactionId::new(), table, alias).unwrap())
}

#[test]
fn test_scan_filter_greater_than() {
    let scratch = Scratch::new();
    let table = scratch.int_table("t", &["a"], &[&[1], &[2], &[3], &[4], &[5]]);

    let mut filter = Operator::new(Filter::new(
        Predicate::new(0, Op::GreaterThan, Field::Int(2)),
        scan(&scratch, table, "t"),
    ));
    filter.open().unwrap();
    let rows: Vec<i32> = drain(&mut filter)
        .iter()
        .map(|t| t.field(0).unwrap().as_int().unwrap())
        .collect();
    // insertion order survives the filter
    assert_eq!(rows, vec![3, 4, 5]);
    filter.close().unwrap();
}

#[test]
fn test_scan_schema_is_alias_qualified() {
    let scratch = Scratch::new();
    let table = scratch.int_table("t", &["a", "b"], &[&[1, 2]]);

    let op = scan(&scratch, table, "alias");
    let desc = op.tuple_desc();
    assert_eq!(desc.field_name(0), Some("alias.a"));
    assert_eq!(desc.field_name(1), Some("alias.b"));
}

fn join_fixture(scratch: &Scratch) -> (u64, u64) {
    let a = scratch.int_table(
        "a",
        &["id", "x"],
        &[&[1, 10], &[2, 20], &[2, 21], &[3, 30]],
    );
    let b = scratch.int_table("b", &["id", "y"], &[&[2, 200], &[2, 201], &[4, 400]]);
    (a, b)
}

#[test]
fn test_hash_join_over_heap_files() {
    let scratch = Scratch::new();
    let (a, b) = join_fixture(&scratch);

    let mut join = Operator::new(Join::new(
        JoinPredicate::new(0, Op::Equals, 0),
        scan(&scratch, a, "a"),
        scan(&scratch, b, "b"),
    ));
    join.open().unwrap();
    assert_eq!(
        drain_int_rows(&mut join),
        vec![
            vec![2, 20, 2, 200],
            vec![2, 20, 2, 201],
            vec![2, 21, 2, 200],
            vec![2, 21, 2, 201],
        ]
    );
    join.close().unwrap();
}

#[test]
fn test_nested_loop_join_over_heap_files() {
    let scratch = Scratch::new();
    let (a, b) = join_fixture(&scratch);

    let mut join = Operator::new(Join::new(
        JoinPredicate::new(0, Op::LessThan, 0),
        scan(&scratch, a, "a"),
        scan(&scratch, b, "b"),
    ));
    join.open().unwrap();
    assert_eq!(
        drain_int_rows(&mut join),
        vec![
            vec![1, 10, 2, 200],
            vec![1, 10, 2, 201],
            vec![1, 10, 4, 400],
            vec![2, 20, 4, 400],
            vec![2, 21, 4, 400],
            vec![3, 30, 4, 400],
        ]
    );
    join.close().unwrap();
}

#[test]
fn test_join_strategies_yield_same_multiset() {
    // hash join vs nested loop on the same equality predicate, via a
    // predicate the dispatcher will not turn into a hash join
    let scratch = Scratch::new();
    let (a, b) = join_fixture(&scratch);

    let mut hash = Operator::new(Join::new(
        JoinPredicate::new(0, Op::Equals, 0),
        scan(&scratch, a, "a"),
        scan(&scratch, b, "b"),
    ));
    hash.open().unwrap();
    let hash_rows = drain_int_rows(&mut hash);

    let mut ge = Operator::new(Join::new(
        JoinPredicate::new(0, Op::GreaterThanOrEq, 0),
        scan(&scratch, a, "a"),
        scan(&scratch, b, "b"),
    ));
    let mut le = Operator::new(Join::new(
        JoinPredicate::new(0, Op::LessThanOrEq, 0),
        scan(&scratch, a, "a"),
        scan(&scratch, b, "b"),
    ));
    ge.open().unwrap();
    le.open().unwrap();
    let ge_rows = drain_int_rows(&mut ge);
    let le_rows = drain_int_rows(&mut le);
    let intersection: Vec<Vec<i32>> =
        ge_rows.into_iter().filter(|r| le_rows.contains(r)).collect();
    assert_eq!(hash_rows, intersection);
}

#[test]
fn test_aggregate_avg_grouped_by_string() {
    let scratch = Scratch::new();
    let desc = TupleDesc::with_names(vec![Type::Str, Type::Int], vec!["g", "v"]);
    let rows = [("a", 1), ("a", 3), ("b", 5), ("b", 7), ("b", 9)]
        .iter()
        .map(|(g, v)| vec![Field::string(*g), Field::Int(*v)])
        .collect();
    let table = scratch.create_table("t", desc, None, rows);

    let mut agg = Operator::new(
        Aggregate::new(scan(&scratch, table, "t"), 1, Some(0), AggOp::Avg).unwrap(),
    );
    agg.open().unwrap();
    let mut groups: Vec<(String, i32)> = drain(&mut agg)
        .iter()
        .map(|t| {
            (
                t.field(0).unwrap().as_str().unwrap().to_string(),
                t.field(1).unwrap().as_int().unwrap(),
            )
        })
        .collect();
    groups.sort();
    // integer division: (1+3)/2 = 2, (5+7+9)/3 = 7
    assert_eq!(groups, vec![("a".to_string(), 2), ("b".to_string(), 7)]);
    agg.close().unwrap();
}

#[test]
fn test_order_by_over_join() {
    let scratch = Scratch::new();
    let (a, b) = join_fixture(&scratch);

    let join = Operator::new(Join::new(
        JoinPredicate::new(0, Op::Equals, 0),
        scan(&scratch, a, "a"),
        scan(&scratch, b, "b"),
    ));
    let mut sorted = Operator::new(OrderBy::new(3, false, join));
    sorted.open().unwrap();
    let ys: Vec<i32> = drain(&mut sorted)
        .iter()
        .map(|t| t.field(3).unwrap().as_int().unwrap())
        .collect();
    assert_eq!(ys, vec![201, 201, 200, 200]);
    sorted.close().unwrap();
}

#[test]
fn test_project_after_join() {
    let scratch = Scratch::new();
    let (a, b) = join_fixture(&scratch);

    let join = Operator::new(Join::new(
        JoinPredicate::new(0, Op::Equals, 0),
        scan(&scratch, a, "a"),
        scan(&scratch, b, "b"),
    ));
    let mut project =
        Operator::new(Project::new(vec![1, 3], vec![Type::Int, Type::Int], join).unwrap());
    project.open().unwrap();
    assert_eq!(project.tuple_desc().field_name(0), Some("a.x"));
    assert_eq!(project.tuple_desc().field_name(1), Some("b.y"));
    assert_eq!(
        drain_int_rows(&mut project),
        vec![
            vec![20, 200],
            vec![20, 201],
            vec![21, 200],
            vec![21, 201],
        ]
    );
    project.close().unwrap();
}

#[test]
fn test_insert_from_scan_reports_count() {
    let scratch = Scratch::new();
    let source = scratch.int_table("src", &["a", "b"], &[&[1, 2], &[3, 4], &[5, 6]]);
    let target = scratch.int_table("dst", &["a", "b"], &[]);

    let txn = TransactionId::new();
    let mut insert = Operator::new(
        Insert::new(&scratch.db, txn, scan(&scratch, source, "s"), target).unwrap(),
    );
    insert.open().unwrap();
    let result = insert.next().unwrap();
    assert_eq!(result.field(0).unwrap().as_int(), Some(3));
    assert_eq!(insert.tuple_desc().field_name(0), Some("inserted"));
    // one result tuple only
    assert!(!insert.has_next().unwrap());
    insert.close().unwrap();
    scratch.db.buffer_pool().transaction_complete(txn).unwrap();

    let mut check = scan(&scratch, target, "d");
    check.open().unwrap();
    assert_eq!(
        drain_int_rows(&mut check),
        vec![vec![1, 2], vec![3, 4], vec![5, 6]]
    );
}

#[test]
fn test_insert_rejects_mismatched_child() {
    let scratch = Scratch::new();
    let source = scratch.int_table("src", &["a"], &[&[1]]);
    let target = scratch.int_table("dst", &["a", "b"], &[]);

    let err = Insert::new(
        &scratch.db,
        TransactionId::new(),
        scan(&scratch, source, "s"),
        target,
    );
    assert!(matches!(
        err,
        Err(wrendb::executor::ExecutorError::SchemaMismatch(_))
    ));
}

#[test]
fn test_delete_filtered_rows() {
    let scratch = Scratch::new();
    let table = scratch.int_table("t", &["a"], &[&[1], &[2], &[3], &[4], &[5]]);

    let txn = TransactionId::new();
    let filtered = Operator::new(Filter::new(
        Predicate::new(0, Op::GreaterThan, Field::Int(3)),
        Operator::new(SeqScan::new(&scratch.db, txn, table, "t").unwrap()),
    ));
    let mut delete = Operator::new(Delete::new(&scratch.db, txn, filtered));
    delete.open().unwrap();
    assert_eq!(delete.next().unwrap().field(0).unwrap().as_int(), Some(2));
    assert!(!delete.has_next().unwrap());
    delete.close().unwrap();
    scratch.db.buffer_pool().transaction_complete(txn).unwrap();

    let mut check = scan(&scratch, table, "t");
    check.open().unwrap();
    assert_eq!(drain_int_rows(&mut check), vec![vec![1], vec![2], vec![3]]);
}

#[test]
fn test_rewind_full_tree_yields_same_rows() {
    let scratch = Scratch::new();
    let (a, b) = join_fixture(&scratch);

    let join = Operator::new(Join::new(
        JoinPredicate::new(0, Op::Equals, 0),
        scan(&scratch, a, "a"),
        scan(&scratch, b, "b"),
    ));
    let mut tree = Operator::new(Filter::new(
        Predicate::new(1, Op::GreaterThan, Field::Int(20)),
        join,
    ));
    tree.open().unwrap();
    let first = drain_int_rows(&mut tree);
    assert!(!first.is_empty());
    tree.rewind().unwrap();
    assert_eq!(drain_int_rows(&mut tree), first);
    tree.close().unwrap();
}
