//! Runtime values: fields, tuples, and record identity.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::schema::{TupleDesc, Type, STRING_LEN};
use crate::storage::page::PageId;

/// A single tagged field value.
///
/// Fields are totally ordered within each variant; ordering across variants
/// falls back to a fixed type tag so sorting mixed columns stays stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    /// Integer value
    Int(i32),
    /// String value of at most [`STRING_LEN`] bytes
    Str(String),
}

impl Field {
    /// Build a string field, truncating to [`STRING_LEN`] bytes on a char
    /// boundary.
    pub fn string(s: impl Into<String>) -> Field {
        let mut s = s.into();
        if s.len() > STRING_LEN {
            let mut end = STRING_LEN;
            while !s.is_char_boundary(end) {
                end -= 1;
            }
            s.truncate(end);
        }
        Field::Str(s)
    }

    /// The type of this field.
    pub fn field_type(&self) -> Type {
        match self {
            Field::Int(_) => Type::Int,
            Field::Str(_) => Type::Str,
        }
    }

    /// Integer value, if this is an integer field.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Field::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// String value, if this is a string field.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Str(s) => Some(s),
            _ => None,
        }
    }

    fn type_tag(&self) -> u8 {
        match self {
            Field::Int(_) => 0,
            Field::Str(_) => 1,
        }
    }
}

impl PartialOrd for Field {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Field {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Field::Int(a), Field::Int(b)) => a.cmp(b),
            (Field::Str(a), Field::Str(b)) => a.cmp(b),
            _ => self.type_tag().cmp(&other.type_tag()),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Identity of a stored tuple: its page plus the slot within that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    /// Page the tuple lives on.
    pub page_id: PageId,
    /// Slot number within the page.
    pub slot: usize,
}

impl RecordId {
    /// Create a new record identifier.
    pub fn new(page_id: PageId, slot: usize) -> Self {
        RecordId { page_id, slot }
    }
}

/// A row conforming to a schema.
///
/// Tuples read from a heap file carry a [`RecordId`]; tuples produced by
/// operators (merges, projections, aggregates) do not.
#[derive(Debug, Clone)]
pub struct Tuple {
    desc: Arc<TupleDesc>,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Create a tuple over `desc` with the given field values.
    pub fn new(desc: Arc<TupleDesc>, fields: Vec<Field>) -> Self {
        debug_assert_eq!(desc.num_fields(), fields.len());
        debug_assert!(fields
            .iter()
            .enumerate()
            .all(|(i, f)| desc.field_type(i) == Some(f.field_type())));
        Tuple {
            desc,
            fields,
            record_id: None,
        }
    }

    /// The schema of this tuple.
    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    /// Field value at `index`.
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// All field values in schema order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Overwrite the field at `index`.
    pub fn set_field(&mut self, index: usize, value: Field) {
        debug_assert_eq!(
            self.desc.field_type(index),
            Some(value.field_type()),
            "field type must match the schema"
        );
        self.fields[index] = value;
    }

    /// Storage identity, if this tuple came from a heap page.
    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    /// Attach a storage identity.
    pub fn set_record_id(&mut self, rid: RecordId) {
        self.record_id = Some(rid);
    }

    /// Same values under a different (structurally identical) schema.
    ///
    /// Used by scans to relabel table columns with their alias-qualified
    /// names without copying field data.
    pub fn with_desc(mut self, desc: Arc<TupleDesc>) -> Tuple {
        debug_assert!(desc.compatible_with(&self.desc));
        self.desc = desc;
        self
    }

    /// Concatenate two tuples under a pre-merged schema, left fields first.
    pub fn merge(desc: Arc<TupleDesc>, left: &Tuple, right: &Tuple) -> Tuple {
        let mut fields = Vec::with_capacity(left.fields.len() + right.fields.len());
        fields.extend(left.fields.iter().cloned());
        fields.extend(right.fields.iter().cloned());
        Tuple::new(desc, fields)
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}
