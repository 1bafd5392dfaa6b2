//! Database handle: wires the catalog and buffer pool together.

use std::path::Path;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::DbConfig;
use crate::schema::TupleDesc;
use crate::storage::buffer::BufferPool;
use crate::storage::error::StorageResult;
use crate::storage::heap::HeapFile;

/// Shared handle to one engine instance.
///
/// Cloning is cheap; every clone sees the same catalog and buffer pool.
#[derive(Clone)]
pub struct Database {
    catalog: Arc<Catalog>,
    pool: Arc<BufferPool>,
    config: DbConfig,
}

impl Database {
    /// Create an engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(DbConfig::default())
    }

    /// Create an engine with the given configuration.
    pub fn with_config(config: DbConfig) -> Self {
        let catalog = Arc::new(Catalog::new());
        let pool = Arc::new(BufferPool::new(catalog.clone(), config.buffer_pool_pages));
        Database {
            catalog,
            pool,
            config,
        }
    }

    /// The table registry.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// The shared page cache.
    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Engine configuration.
    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Open (creating if necessary) a heap file and register it as a table.
    ///
    /// Returns the table id.
    pub fn add_table(
        &self,
        path: impl AsRef<Path>,
        desc: Arc<TupleDesc>,
        name: &str,
        primary_key: Option<&str>,
    ) -> StorageResult<u64> {
        let file = Arc::new(HeapFile::open(path, desc)?);
        Ok(self.catalog.add_table(file, name, primary_key))
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}
