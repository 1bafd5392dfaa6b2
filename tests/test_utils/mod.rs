//! Shared helpers for integration tests: scratch databases, table
//! builders, and row collection.

#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;
use wrendb::executor::Operator;
use wrendb::txn::TransactionId;
use wrendb::{Database, Field, Tuple, TupleDesc, Type};

/// Install a log subscriber once, so `RUST_LOG=debug` surfaces engine
/// traces during test runs.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A database plus the temp directory its heap files live in.
pub struct Scratch {
    pub db: Database,
    pub dir: TempDir,
}

impl Scratch {
    pub fn new() -> Self {
        Self::with_db(Database::new())
    }

    pub fn with_db(db: Database) -> Self {
        init_tracing();
        Scratch {
            db,
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    /// Create a heap file, register it, and load `rows` into it.
    pub fn create_table(
        &self,
        name: &str,
        desc: TupleDesc,
        primary_key: Option<&str>,
        rows: Vec<Vec<Field>>,
    ) -> u64 {
        let desc = Arc::new(desc);
        let path = self.dir.path().join(format!("{}.dat", name));
        let table_id = self
            .db
            .add_table(&path, desc.clone(), name, primary_key)
            .expect("register table");

        let txn = TransactionId::new();
        for fields in rows {
            self.db
                .buffer_pool()
                .insert_tuple(txn, table_id, Tuple::new(desc.clone(), fields))
                .expect("insert row");
        }
        self.db
            .buffer_pool()
            .transaction_complete(txn)
            .expect("flush rows");
        table_id
    }

    /// Create an all-integer table named `name` with the given columns.
    pub fn int_table(&self, name: &str, columns: &[&str], rows: &[&[i32]]) -> u64 {
        let desc = TupleDesc::with_names(vec![Type::Int; columns.len()], columns.to_vec());
        let rows = rows
            .iter()
            .map(|r| r.iter().map(|v| Field::Int(*v)).collect())
            .collect();
        self.create_table(name, desc, None, rows)
    }
}

/// Drain an open operator into a vector of tuples.
pub fn drain(op: &mut Operator) -> Vec<Tuple> {
    let mut out = Vec::new();
    while op.has_next().expect("has_next") {
        out.push(op.next().expect("next"));
    }
    out
}

/// Drain an open operator into sorted integer rows, for multiset compares.
pub fn drain_int_rows(op: &mut Operator) -> Vec<Vec<i32>> {
    let mut out: Vec<Vec<i32>> = drain(op)
        .into_iter()
        .map(|t| t.fields().iter().map(|f| f.as_int().expect("int field")).collect())
        .collect();
    out.sort();
    out
}
