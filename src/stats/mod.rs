//! Per-table statistics backing the cost-based optimizer.
//!
//! [`TableStats`] holds one equi-width histogram per column plus page and
//! tuple counts; [`StatsCatalog`] is the explicit registry built once after
//! tables are loaded and read-only from then on.

pub mod histogram;

pub use histogram::{IntHistogram, StringHistogram};

use std::collections::HashMap;
use std::sync::Arc;

use crate::db::Database;
use crate::executor::error::{ExecutorError, ExecutorResult};
use crate::executor::predicate::Op;
use crate::executor::{Operator, SeqScan};
use crate::schema::Type;
use crate::tuple::Field;
use crate::txn::TransactionId;

enum FieldHistogram {
    Int(IntHistogram),
    Str(StringHistogram),
}

/// Statistics over one base table: scan cost, cardinality, and a histogram
/// per column.
pub struct TableStats {
    io_cost_per_page: f64,
    num_pages: usize,
    num_tuples: usize,
    histograms: Vec<FieldHistogram>,
}

impl TableStats {
    /// Build statistics for `table_id` by scanning it twice: once to find
    /// the min/max of every integer column, once to populate the
    /// histograms.
    pub fn build(
        db: &Database,
        table_id: u64,
        io_cost_per_page: f64,
        bins: usize,
    ) -> ExecutorResult<TableStats> {
        let desc = db.catalog().tuple_desc(table_id)?;
        let num_pages = db.catalog().db_file(table_id)?.num_pages()?;
        let txn = TransactionId::new();

        let mut scan = Operator::new(SeqScan::new(db, txn, table_id, "stats")?);
        scan.open()?;

        // pass 1: min/max per integer column
        let num_fields = desc.num_fields();
        let mut mins = vec![i32::MAX; num_fields];
        let mut maxs = vec![i32::MIN; num_fields];
        let mut num_tuples = 0usize;
        while let Some(tuple) = scan.next_opt()? {
            num_tuples += 1;
            for (i, field) in tuple.fields().iter().enumerate() {
                if let Field::Int(v) = field {
                    mins[i] = mins[i].min(*v);
                    maxs[i] = maxs[i].max(*v);
                }
            }
        }

        let mut histograms = Vec::with_capacity(num_fields);
        for i in 0..num_fields {
            match desc.field_type(i) {
                Some(Type::Int) => {
                    // an empty table never saw a value; any range works
                    let (min, max) = if num_tuples == 0 {
                        (0, 0)
                    } else {
                        (mins[i], maxs[i])
                    };
                    histograms.push(FieldHistogram::Int(IntHistogram::new(bins, min, max)));
                }
                _ => histograms.push(FieldHistogram::Str(StringHistogram::new(bins))),
            }
        }

        // pass 2: populate
        scan.rewind()?;
        while let Some(tuple) = scan.next_opt()? {
            for (i, field) in tuple.fields().iter().enumerate() {
                match (&mut histograms[i], field) {
                    (FieldHistogram::Int(h), Field::Int(v)) => h.add_value(*v),
                    (FieldHistogram::Str(h), Field::Str(s)) => h.add_value(s),
                    _ => {}
                }
            }
        }
        scan.close()?;
        db.buffer_pool().transaction_complete(txn)?;

        Ok(TableStats {
            io_cost_per_page,
            num_pages,
            num_tuples,
            histograms,
        })
    }

    /// Estimated cost of a full sequential scan.
    ///
    /// Whole pages are read regardless of how full they are, so this is
    /// simply pages times per-page cost.
    pub fn scan_cost(&self) -> f64 {
        self.num_pages as f64 * self.io_cost_per_page
    }

    /// Estimated row count after applying predicates with the given
    /// combined selectivity.
    pub fn estimate_table_cardinality(&self, selectivity: f64) -> usize {
        (self.num_tuples as f64 * selectivity) as usize
    }

    /// Total number of tuples in the table.
    pub fn total_tuples(&self) -> usize {
        self.num_tuples
    }

    /// Estimated selectivity of `field op constant` over this table.
    pub fn estimate_selectivity(
        &self,
        field: usize,
        op: Op,
        constant: &Field,
    ) -> ExecutorResult<f64> {
        let histogram =
            self.histograms
                .get(field)
                .ok_or(ExecutorError::FieldIndexOutOfBounds {
                    index: field,
                    len: self.histograms.len(),
                })?;
        match (histogram, constant) {
            (FieldHistogram::Int(h), Field::Int(v)) => Ok(h.estimate_selectivity(op, *v)),
            (FieldHistogram::Str(h), Field::Str(s)) => Ok(h.estimate_selectivity(op, s)),
            (FieldHistogram::Int(_), other) => Err(ExecutorError::TypeMismatch {
                expected: Type::Int,
                got: other.field_type(),
            }),
            (FieldHistogram::Str(_), other) => Err(ExecutorError::TypeMismatch {
                expected: Type::Str,
                got: other.field_type(),
            }),
        }
    }
}

/// Registry of [`TableStats`] keyed by base table name.
#[derive(Default)]
pub struct StatsCatalog {
    stats: HashMap<String, Arc<TableStats>>,
}

impl StatsCatalog {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan every catalog table and build its statistics, using the
    /// engine's configured IO cost and histogram bins.
    pub fn compute(db: &Database) -> ExecutorResult<StatsCatalog> {
        tracing::info!("computing table statistics");
        let mut stats = HashMap::new();
        for table_id in db.catalog().table_ids() {
            let name = db.catalog().table_name(table_id)?;
            let table_stats = TableStats::build(
                db,
                table_id,
                db.config().io_cost_per_page,
                db.config().histogram_bins,
            )?;
            tracing::debug!(
                table = %name,
                tuples = table_stats.total_tuples(),
                pages = table_stats.num_pages,
                "built table statistics"
            );
            stats.insert(name, Arc::new(table_stats));
        }
        Ok(StatsCatalog { stats })
    }

    /// Statistics for a base table, by name.
    pub fn get(&self, table: &str) -> Option<&Arc<TableStats>> {
        self.stats.get(table)
    }

    /// Register statistics under a table name.
    pub fn insert(&mut self, table: impl Into<String>, stats: TableStats) {
        self.stats.insert(table.into(), Arc::new(stats));
    }
}
