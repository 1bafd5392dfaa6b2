//! Slotted heap pages and their on-disk byte layout.
//!
//! A page is a fixed [`PAGE_SIZE`]-byte block holding a bitmap header of
//! occupied slots followed by a fixed array of equal-sized tuple slots.
//! The slot count is derived from the table schema so that header bits and
//! slot bytes together fit the page:
//!
//! ```text
//! slots_per_page = floor(PAGE_SIZE * 8 / (tuple_bytes * 8 + 1))
//! header_bytes   = ceil(slots_per_page / 8)
//! ```
//!
//! Within a slot each field is serialized in schema order: INT as a 4-byte
//! big-endian signed integer, STRING as a 4-byte big-endian length followed
//! by a zero-padded [`STRING_LEN`](crate::schema::STRING_LEN)-byte body.

use std::fmt;
use std::sync::Arc;

use bytes::{Buf, BufMut};

use crate::schema::{TupleDesc, Type, STRING_LEN};
use crate::storage::error::{StorageError, StorageResult};
use crate::tuple::{Field, RecordId, Tuple};
use crate::txn::TransactionId;

/// Size of a heap page in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Identity of a page: the owning table plus its page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId {
    table_id: u64,
    page_no: usize,
}

impl PageId {
    /// Create a new page id.
    pub fn new(table_id: u64, page_no: usize) -> Self {
        PageId { table_id, page_no }
    }

    /// Id of the table this page belongs to.
    pub fn table_id(&self) -> u64 {
        self.table_id
    }

    /// Zero-based page number within the heap file.
    pub fn page_no(&self) -> usize {
        self.page_no
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}:{}", self.table_id, self.page_no)
    }
}

/// An in-memory heap page: occupancy bitmap plus decoded tuple slots.
#[derive(Debug, Clone)]
pub struct HeapPage {
    pid: PageId,
    desc: Arc<TupleDesc>,
    header: Vec<u8>,
    slots: Vec<Option<Tuple>>,
    dirty: Option<TransactionId>,
}

impl HeapPage {
    /// Number of tuple slots a page holds for the given schema.
    pub fn slots_per_page(desc: &TupleDesc) -> usize {
        (PAGE_SIZE * 8) / (desc.byte_len() * 8 + 1)
    }

    /// Number of header bytes for the given schema.
    pub fn header_len(desc: &TupleDesc) -> usize {
        Self::slots_per_page(desc).div_ceil(8)
    }

    /// Create an empty page.
    pub fn empty(pid: PageId, desc: Arc<TupleDesc>) -> Self {
        let num_slots = Self::slots_per_page(&desc);
        HeapPage {
            pid,
            header: vec![0; Self::header_len(&desc)],
            slots: vec![None; num_slots],
            desc,
            dirty: None,
        }
    }

    /// Decode a page from its on-disk bytes.
    pub fn from_bytes(pid: PageId, desc: Arc<TupleDesc>, data: &[u8]) -> StorageResult<Self> {
        if data.len() != PAGE_SIZE {
            return Err(StorageError::InvalidPage(format!(
                "expected {} bytes, got {}",
                PAGE_SIZE,
                data.len()
            )));
        }

        let num_slots = Self::slots_per_page(&desc);
        let header_len = Self::header_len(&desc);
        let header = data[..header_len].to_vec();

        let mut buf = &data[header_len..];
        let mut slots = Vec::with_capacity(num_slots);
        for slot in 0..num_slots {
            if !bit_set(&header, slot) {
                buf.advance(desc.byte_len());
                slots.push(None);
                continue;
            }
            let mut fields = Vec::with_capacity(desc.num_fields());
            for (ty, _) in desc.iter() {
                fields.push(decode_field(&mut buf, ty)?);
            }
            let mut tuple = Tuple::new(desc.clone(), fields);
            tuple.set_record_id(RecordId::new(pid, slot));
            slots.push(Some(tuple));
        }

        Ok(HeapPage {
            pid,
            desc,
            header,
            slots,
            dirty: None,
        })
    }

    /// Encode this page into its on-disk byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(PAGE_SIZE);
        buf.put_slice(&self.header);
        for slot in &self.slots {
            match slot {
                Some(tuple) => {
                    for field in tuple.fields() {
                        encode_field(&mut buf, field);
                    }
                }
                None => buf.put_bytes(0, self.desc.byte_len()),
            }
        }
        buf.resize(PAGE_SIZE, 0);
        buf
    }

    /// Identity of this page.
    pub fn id(&self) -> PageId {
        self.pid
    }

    /// Schema of the tuples on this page.
    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    /// Iterate over the occupied slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.slots.iter().flatten()
    }

    /// Clone out the occupied tuples in slot order.
    ///
    /// Scans use this to buffer a page's rows so no page latch is held
    /// across `next()` calls.
    pub fn tuples(&self) -> Vec<Tuple> {
        self.iter().cloned().collect()
    }

    /// Number of free slots on this page.
    pub fn num_empty_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    /// Insert a tuple into the first free slot, stamping its record id.
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> StorageResult<RecordId> {
        if !tuple.desc().compatible_with(&self.desc) {
            return Err(StorageError::SchemaMismatch(format!(
                "tuple layout [{}] does not match page layout [{}]",
                tuple.desc(),
                self.desc
            )));
        }
        let slot = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(StorageError::PageFull(self.pid))?;

        let rid = RecordId::new(self.pid, slot);
        tuple.set_record_id(rid);
        self.slots[slot] = Some(tuple);
        set_bit(&mut self.header, slot, true);
        Ok(rid)
    }

    /// Remove the tuple identified by `rid` from this page.
    pub fn delete_tuple(&mut self, rid: RecordId) -> StorageResult<()> {
        if rid.page_id != self.pid {
            return Err(StorageError::WrongPage(self.pid));
        }
        if rid.slot >= self.slots.len() {
            return Err(StorageError::InvalidSlot {
                page: self.pid,
                slot: rid.slot,
            });
        }
        if self.slots[rid.slot].is_none() {
            return Err(StorageError::EmptySlot {
                page: self.pid,
                slot: rid.slot,
            });
        }
        self.slots[rid.slot] = None;
        set_bit(&mut self.header, rid.slot, false);
        Ok(())
    }

    /// Record the transaction that mutated this page.
    pub fn mark_dirty(&mut self, txn: TransactionId) {
        self.dirty = Some(txn);
    }

    /// Clear the dirty mark after the page reaches disk.
    pub fn clear_dirty(&mut self) {
        self.dirty = None;
    }

    /// The transaction that last dirtied this page, if unflushed.
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirty
    }
}

/// Whether bit `index` is set; bit 0 of byte 0 is slot 0.
fn bit_set(header: &[u8], index: usize) -> bool {
    header[index / 8] & (1 << (index % 8)) != 0
}

fn set_bit(header: &mut [u8], index: usize, value: bool) {
    if value {
        header[index / 8] |= 1 << (index % 8);
    } else {
        header[index / 8] &= !(1 << (index % 8));
    }
}

fn encode_field(buf: &mut Vec<u8>, field: &Field) {
    match field {
        Field::Int(v) => buf.put_i32(*v),
        Field::Str(s) => {
            let bytes = s.as_bytes();
            buf.put_u32(bytes.len() as u32);
            buf.put_slice(bytes);
            buf.put_bytes(0, STRING_LEN - bytes.len());
        }
    }
}

fn decode_field(buf: &mut &[u8], ty: Type) -> StorageResult<Field> {
    match ty {
        Type::Int => Ok(Field::Int(buf.get_i32())),
        Type::Str => {
            let len = buf.get_u32() as usize;
            if len > STRING_LEN {
                return Err(StorageError::InvalidPage(format!(
                    "string length {} exceeds maximum {}",
                    len, STRING_LEN
                )));
            }
            let body = &buf[..STRING_LEN];
            let s = std::str::from_utf8(&body[..len])
                .map_err(|e| StorageError::InvalidPage(format!("invalid utf-8: {}", e)))?
                .to_string();
            buf.advance(STRING_LEN);
            Ok(Field::Str(s))
        }
    }
}
