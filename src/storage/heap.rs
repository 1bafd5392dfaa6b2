//! Heap files: tables stored as a sequence of fixed-size slotted pages.

use std::collections::hash_map::DefaultHasher;
use std::fs::{File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::schema::TupleDesc;
use crate::storage::buffer::{BufferPool, Permission};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{HeapPage, PageId, PAGE_SIZE};
use crate::tuple::Tuple;
use crate::txn::TransactionId;

/// A table stored as a file of fixed-size pages.
///
/// The file id is derived from the file's absolute path, so the same path
/// always resolves to the same table id.
pub struct HeapFile {
    path: PathBuf,
    file: Mutex<File>,
    desc: Arc<TupleDesc>,
    id: u64,
}

impl HeapFile {
    /// Open (creating if necessary) a heap file at `path` with the given
    /// schema.
    pub fn open(path: impl AsRef<Path>, desc: Arc<TupleDesc>) -> StorageResult<HeapFile> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path.as_ref())?;
        let path = path.as_ref().canonicalize()?;

        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        let id = hasher.finish();

        Ok(HeapFile {
            path,
            file: Mutex::new(file),
            desc,
            id,
        })
    }

    /// Unique id of this heap file, derived from its absolute path.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Schema of the tuples stored in this file.
    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of whole pages currently in the file.
    pub fn num_pages(&self) -> StorageResult<usize> {
        let len = self.file.lock().metadata()?.len();
        Ok(len as usize / PAGE_SIZE)
    }

    /// Read a page from disk.
    pub fn read_page(&self, pid: PageId) -> StorageResult<HeapPage> {
        if pid.table_id() != self.id {
            return Err(StorageError::WrongPage(pid));
        }
        if pid.page_no() >= self.num_pages()? {
            return Err(StorageError::PageOutOfBounds(pid));
        }
        let mut data = vec![0u8; PAGE_SIZE];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start((pid.page_no() * PAGE_SIZE) as u64))?;
            file.read_exact(&mut data)?;
        }
        HeapPage::from_bytes(pid, self.desc.clone(), &data)
    }

    /// Write a page back to disk at its page offset.
    pub fn write_page(&self, page: &HeapPage) -> StorageResult<()> {
        let pid = page.id();
        if pid.table_id() != self.id {
            return Err(StorageError::WrongPage(pid));
        }
        let data = page.to_bytes();
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start((pid.page_no() * PAGE_SIZE) as u64))?;
        file.write_all(&data)?;
        file.flush()?;
        Ok(())
    }

    /// Insert a tuple into the first page with a free slot, growing the file
    /// by one page if every existing page is full.
    ///
    /// Existing pages are fetched through the buffer pool with read-write
    /// permission and dirtied in place; a freshly allocated page is written
    /// straight to disk. Returns the pages touched.
    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        txn: TransactionId,
        tuple: Tuple,
    ) -> StorageResult<Vec<PageId>> {
        let num_pages = self.num_pages()?;
        for page_no in 0..num_pages {
            let pid = PageId::new(self.id, page_no);
            let page = pool.get_page(txn, pid, Permission::ReadWrite)?;
            let mut page = page.write();
            if page.num_empty_slots() > 0 {
                page.insert_tuple(tuple)?;
                page.mark_dirty(txn);
                return Ok(vec![pid]);
            }
        }

        // every page is full: append a fresh one
        let pid = PageId::new(self.id, num_pages);
        let mut page = HeapPage::empty(pid, self.desc.clone());
        page.insert_tuple(tuple)?;
        self.write_page(&page)?;
        tracing::debug!(page = %pid, "heap file grew by one page");
        Ok(vec![pid])
    }

    /// Delete a tuple located by its record id.
    ///
    /// Returns the page that was dirtied.
    pub fn delete_tuple(
        &self,
        pool: &BufferPool,
        txn: TransactionId,
        tuple: &Tuple,
    ) -> StorageResult<PageId> {
        let rid = tuple.record_id().ok_or(StorageError::MissingRecordId)?;
        if rid.page_id.table_id() != self.id {
            return Err(StorageError::WrongPage(rid.page_id));
        }
        let page = pool.get_page(txn, rid.page_id, Permission::ReadWrite)?;
        let mut page = page.write();
        page.delete_tuple(rid)?;
        page.mark_dirty(txn);
        Ok(rid.page_id)
    }

    /// Sequential iterator over the tuples in this file.
    pub fn iter(self: &Arc<Self>, pool: Arc<BufferPool>, txn: TransactionId) -> HeapFileIterator {
        HeapFileIterator {
            file: self.clone(),
            pool,
            txn,
            num_pages: 0,
            next_page: 0,
            buffer: Vec::new().into_iter(),
            open: false,
        }
    }
}

/// Walks pages `0..num_pages` of a heap file, pinning each through the
/// buffer pool in read-only mode and yielding its occupied slots in order.
///
/// Each page's tuples are buffered on fetch so no page pin is held across
/// calls. The page count is snapshotted at `open`; pages appended afterwards
/// are not visible to the current scan.
pub struct HeapFileIterator {
    file: Arc<HeapFile>,
    pool: Arc<BufferPool>,
    txn: TransactionId,
    num_pages: usize,
    next_page: usize,
    buffer: std::vec::IntoIter<Tuple>,
    open: bool,
}

impl HeapFileIterator {
    /// Start (or restart) iteration from page zero.
    pub fn open(&mut self) -> StorageResult<()> {
        self.num_pages = self.file.num_pages()?;
        self.next_page = 0;
        self.buffer = Vec::new().into_iter();
        self.open = true;
        Ok(())
    }

    /// The next tuple, or `None` when the last page is exhausted or the
    /// iterator is closed.
    pub fn next_tuple(&mut self) -> StorageResult<Option<Tuple>> {
        if !self.open {
            return Ok(None);
        }
        loop {
            if let Some(tuple) = self.buffer.next() {
                return Ok(Some(tuple));
            }
            if self.next_page >= self.num_pages {
                return Ok(None);
            }
            let pid = PageId::new(self.file.id(), self.next_page);
            self.next_page += 1;
            let page = self.pool.get_page(self.txn, pid, Permission::ReadOnly)?;
            self.buffer = page.read().tuples().into_iter();
        }
    }

    /// Restart from page zero, keeping the page-count snapshot from `open`.
    pub fn rewind(&mut self) {
        self.next_page = 0;
        self.buffer = Vec::new().into_iter();
    }

    /// Stop iterating; `next_tuple` returns `None` until reopened.
    pub fn close(&mut self) {
        self.open = false;
        self.buffer = Vec::new().into_iter();
    }
}
