//! Catalog - the registry of tables known to the engine.
//!
//! Each entry pairs a heap file with the table's name and an optional
//! primary-key field. Table ids come from the heap file (derived from its
//! path), so re-registering the same file yields the same id.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::schema::TupleDesc;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::heap::HeapFile;

struct TableEntry {
    file: Arc<HeapFile>,
    name: String,
    primary_key: Option<String>,
}

#[derive(Default)]
struct Inner {
    by_id: HashMap<u64, TableEntry>,
    by_name: HashMap<String, u64>,
}

/// Registry of tables: heap file, name, and optional primary key per table.
#[derive(Default)]
pub struct Catalog {
    inner: RwLock<Inner>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table. A table registered under an existing name replaces
    /// the previous entry.
    ///
    /// Returns the table id.
    pub fn add_table(
        &self,
        file: Arc<HeapFile>,
        name: impl Into<String>,
        primary_key: Option<&str>,
    ) -> u64 {
        let name = name.into();
        let id = file.id();
        let mut inner = self.inner.write();
        if let Some(old_id) = inner.by_name.insert(name.clone(), id) {
            if old_id != id {
                inner.by_id.remove(&old_id);
            }
        }
        tracing::debug!(table = %name, id, "registered table");
        inner.by_id.insert(
            id,
            TableEntry {
                file,
                name,
                primary_key: primary_key.map(str::to_string),
            },
        );
        id
    }

    /// Heap file backing a table.
    pub fn db_file(&self, table_id: u64) -> StorageResult<Arc<HeapFile>> {
        self.inner
            .read()
            .by_id
            .get(&table_id)
            .map(|e| e.file.clone())
            .ok_or(StorageError::UnknownTable(table_id))
    }

    /// Schema of a table.
    pub fn tuple_desc(&self, table_id: u64) -> StorageResult<Arc<TupleDesc>> {
        Ok(self.db_file(table_id)?.desc().clone())
    }

    /// Name a table was registered under.
    pub fn table_name(&self, table_id: u64) -> StorageResult<String> {
        self.inner
            .read()
            .by_id
            .get(&table_id)
            .map(|e| e.name.clone())
            .ok_or(StorageError::UnknownTable(table_id))
    }

    /// Id of the table registered under `name`.
    pub fn table_id(&self, name: &str) -> Option<u64> {
        self.inner.read().by_name.get(name).copied()
    }

    /// Primary-key field of a table, if one was declared.
    pub fn primary_key(&self, table_id: u64) -> StorageResult<Option<String>> {
        self.inner
            .read()
            .by_id
            .get(&table_id)
            .map(|e| e.primary_key.clone())
            .ok_or(StorageError::UnknownTable(table_id))
    }

    /// Ids of all registered tables.
    pub fn table_ids(&self) -> Vec<u64> {
        self.inner.read().by_id.keys().copied().collect()
    }
}
