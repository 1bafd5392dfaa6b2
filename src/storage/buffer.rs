//! Buffer pool: a shared, fixed-capacity cache of heap pages.
//!
//! Pages are pinned by [`PageId`] and handed out behind `Arc<RwLock<..>>`;
//! a page stays cached while any caller still holds a reference. Writes go
//! through [`BufferPool::insert_tuple`] / [`BufferPool::delete_tuple`] so
//! dirtied pages are tracked per transaction and flushed on
//! [`BufferPool::transaction_complete`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::catalog::Catalog;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::heap::HeapFile;
use crate::storage::page::{HeapPage, PageId};
use crate::tuple::Tuple;
use crate::txn::TransactionId;

/// Access mode requested when fetching a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// The caller will only read the page.
    ReadOnly,
    /// The caller may mutate the page.
    ReadWrite,
}

/// Shared page cache over the catalog's heap files.
pub struct BufferPool {
    catalog: Arc<Catalog>,
    capacity: usize,
    pages: Mutex<HashMap<PageId, Arc<RwLock<HeapPage>>>>,
}

impl BufferPool {
    /// Create a pool caching at most `capacity` pages.
    pub fn new(catalog: Arc<Catalog>, capacity: usize) -> Self {
        BufferPool {
            catalog,
            capacity,
            pages: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a page, reading it from its heap file on a cache miss.
    ///
    /// When the pool is at capacity an arbitrary clean, unreferenced page is
    /// evicted; if none exists the fetch fails with
    /// [`StorageError::BufferPoolFull`].
    pub fn get_page(
        &self,
        txn: TransactionId,
        pid: PageId,
        perm: Permission,
    ) -> StorageResult<Arc<RwLock<HeapPage>>> {
        tracing::trace!(txn = txn.id(), page = %pid, ?perm, "page fetch");
        let mut pages = self.pages.lock();
        if let Some(page) = pages.get(&pid) {
            return Ok(page.clone());
        }
        if pages.len() >= self.capacity {
            self.evict_clean(&mut pages)?;
        }
        let file = self.catalog.db_file(pid.table_id())?;
        let page = Arc::new(RwLock::new(file.read_page(pid)?));
        pages.insert(pid, page.clone());
        Ok(page)
    }

    /// Route a tuple insert to the owning heap file.
    ///
    /// Returns the pages dirtied by the insert.
    pub fn insert_tuple(
        &self,
        txn: TransactionId,
        table_id: u64,
        tuple: Tuple,
    ) -> StorageResult<Vec<PageId>> {
        let file = self.catalog.db_file(table_id)?;
        file.insert_tuple(self, txn, tuple)
    }

    /// Route a tuple delete to the heap file named by its record id.
    ///
    /// Returns the page dirtied by the delete.
    pub fn delete_tuple(&self, txn: TransactionId, tuple: &Tuple) -> StorageResult<PageId> {
        let rid = tuple.record_id().ok_or(StorageError::MissingRecordId)?;
        let file = self.catalog.db_file(rid.page_id.table_id())?;
        file.delete_tuple(self, txn, tuple)
    }

    /// Flush every page dirtied by `txn` and clear its dirty marks.
    ///
    /// No write-ahead log exists at this layer, so completion forces dirty
    /// pages straight to their heap files.
    pub fn transaction_complete(&self, txn: TransactionId) -> StorageResult<()> {
        let pages = self.pages.lock();
        let mut flushed = 0usize;
        for page in pages.values() {
            let dirty = { page.read().dirtied_by() };
            if dirty == Some(txn) {
                let mut page = page.write();
                let file = self.file_for(page.id())?;
                file.write_page(&page)?;
                page.clear_dirty();
                flushed += 1;
            }
        }
        if flushed > 0 {
            tracing::debug!(txn = txn.id(), pages = flushed, "flushed dirty pages");
        }
        Ok(())
    }

    /// Flush every dirty page regardless of owning transaction.
    pub fn flush_all(&self) -> StorageResult<()> {
        let pages = self.pages.lock();
        for page in pages.values() {
            let mut page = page.write();
            if page.dirtied_by().is_some() {
                let file = self.file_for(page.id())?;
                file.write_page(&page)?;
                page.clear_dirty();
            }
        }
        Ok(())
    }

    /// Number of pages currently cached.
    pub fn cached_pages(&self) -> usize {
        self.pages.lock().len()
    }

    fn file_for(&self, pid: PageId) -> StorageResult<Arc<HeapFile>> {
        self.catalog.db_file(pid.table_id())
    }

    fn evict_clean(
        &self,
        pages: &mut HashMap<PageId, Arc<RwLock<HeapPage>>>,
    ) -> StorageResult<()> {
        let victim = pages
            .iter()
            .find(|(_, page)| Arc::strong_count(page) == 1 && page.read().dirtied_by().is_none())
            .map(|(pid, _)| *pid);
        match victim {
            Some(pid) => {
                pages.remove(&pid);
                tracing::debug!(page = %pid, "evicted clean page");
                Ok(())
            }
            None => Err(StorageError::BufferPoolFull(self.capacity)),
        }
    }
}
