//! Engine configuration.
//!
//! Environment variables:
//! - `WRENDB_BUFFER_POOL_PAGES` - page budget of the buffer pool
//! - `WRENDB_HISTOGRAM_BINS` - bucket count for column histograms
//! - `WRENDB_IO_COST_PER_PAGE` - optimizer cost of one page read

use std::env;

/// Default buffer pool capacity, in pages.
pub const DEFAULT_BUFFER_POOL_PAGES: usize = 50;

/// Default number of histogram buckets per column.
pub const DEFAULT_HISTOGRAM_BINS: usize = 100;

/// Default optimizer cost of reading one page.
pub const DEFAULT_IO_COST_PER_PAGE: f64 = 1000.0;

/// Engine tunables.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Page budget of the buffer pool.
    pub buffer_pool_pages: usize,
    /// Bucket count for column histograms.
    pub histogram_bins: usize,
    /// Optimizer cost of one page read.
    pub io_cost_per_page: f64,
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            buffer_pool_pages: DEFAULT_BUFFER_POOL_PAGES,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            io_cost_per_page: DEFAULT_IO_COST_PER_PAGE,
        }
    }
}

impl DbConfig {
    /// Read configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = DbConfig::default();
        if let Some(v) = read_env("WRENDB_BUFFER_POOL_PAGES") {
            config.buffer_pool_pages = v;
        }
        if let Some(v) = read_env("WRENDB_HISTOGRAM_BINS") {
            config.histogram_bins = v;
        }
        if let Some(v) = read_env("WRENDB_IO_COST_PER_PAGE") {
            config.io_cost_per_page = v;
        }
        config
    }
}

fn read_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring unparseable config value");
            None
        }
    }
}
