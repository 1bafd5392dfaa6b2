//! Schema model: field types and tuple descriptors.

use std::fmt;

/// Number of bytes reserved for the content of a STRING field.
pub const STRING_LEN: usize = 128;

/// The type of a single tuple field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// 32-bit signed integer
    Int,
    /// Fixed-capacity string of at most [`STRING_LEN`] bytes
    Str,
}

impl Type {
    /// On-disk size of a field of this type, in bytes.
    ///
    /// Strings are stored as a 4-byte length followed by a right-padded
    /// [`STRING_LEN`]-byte body.
    pub fn byte_len(&self) -> usize {
        match self {
            Type::Int => 4,
            Type::Str => 4 + STRING_LEN,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "INT"),
            Type::Str => write!(f, "STRING"),
        }
    }
}

/// Ordered, optionally named field list describing a tuple layout.
///
/// Field names may carry an `alias.field` qualifier; name lookup returns the
/// first match in field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleDesc {
    fields: Vec<(Type, Option<String>)>,
}

impl TupleDesc {
    /// Create a descriptor from `(type, name)` pairs.
    pub fn new(fields: Vec<(Type, Option<String>)>) -> Self {
        debug_assert!(!fields.is_empty(), "a schema must have at least one field");
        TupleDesc { fields }
    }

    /// Create a descriptor with anonymous fields.
    pub fn unnamed(types: Vec<Type>) -> Self {
        Self::new(types.into_iter().map(|t| (t, None)).collect())
    }

    /// Create a descriptor pairing `types` with `names` positionally.
    pub fn with_names(types: Vec<Type>, names: Vec<&str>) -> Self {
        debug_assert_eq!(types.len(), names.len());
        Self::new(
            types
                .into_iter()
                .zip(names)
                .map(|(t, n)| (t, Some(n.to_string())))
                .collect(),
        )
    }

    /// Number of fields in this schema.
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Type of the field at `index`.
    pub fn field_type(&self, index: usize) -> Option<Type> {
        self.fields.get(index).map(|(t, _)| *t)
    }

    /// Name of the field at `index`, if it has one.
    pub fn field_name(&self, index: usize) -> Option<&str> {
        self.fields.get(index).and_then(|(_, n)| n.as_deref())
    }

    /// Index of the first field named `name`.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|(_, n)| n.as_deref() == Some(name))
    }

    /// Whether a field named `name` exists.
    pub fn has_field(&self, name: &str) -> bool {
        self.field_index(name).is_some()
    }

    /// Total on-disk size of a tuple with this schema, in bytes.
    pub fn byte_len(&self) -> usize {
        self.fields.iter().map(|(t, _)| t.byte_len()).sum()
    }

    /// Whether `other` has the same field types in the same order.
    ///
    /// Names are ignored; used to validate rows against a table layout.
    pub fn compatible_with(&self, other: &TupleDesc) -> bool {
        self.num_fields() == other.num_fields()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|((a, _), (b, _))| a == b)
    }

    /// Concatenation of two schemas, left fields first.
    pub fn merge(left: &TupleDesc, right: &TupleDesc) -> TupleDesc {
        let mut fields = left.fields.clone();
        fields.extend(right.fields.iter().cloned());
        TupleDesc { fields }
    }

    /// Copy of this schema with every field renamed to `alias.field`.
    ///
    /// Anonymous fields become `alias.null`, matching how scans label
    /// columns for downstream name resolution.
    pub fn qualify(&self, alias: &str) -> TupleDesc {
        TupleDesc {
            fields: self
                .fields
                .iter()
                .map(|(t, n)| {
                    let name = format!("{}.{}", alias, n.as_deref().unwrap_or("null"));
                    (*t, Some(name))
                })
                .collect(),
        }
    }

    /// Iterate over `(type, name)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (Type, Option<&str>)> {
        self.fields.iter().map(|(t, n)| (*t, n.as_deref()))
    }
}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (ty, name)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}({})", name.as_deref().unwrap_or("null"), ty)?;
        }
        Ok(())
    }
}
