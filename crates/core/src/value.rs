//! Structural snapshots of input property values

use crate::hash::{Blake3Hash, IncrementalHasher};
use serde::{Deserialize, Serialize};

/// Immutable structural capture of a property value
///
/// Two snapshots compare equal exactly when the values they were taken from
/// are structurally equal. Map entries are kept sorted by key, so the
/// iteration order of the source collection never shows up here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueSnapshot {
    /// `None`, `()` and other null-equivalent values
    Null,
    Boolean(bool),
    /// Every integer width, signed or not
    Integer(i128),
    /// IEEE-754 bits of an `f64`; all NaNs share one representation
    Float(u64),
    Char(char),
    String(String),
    Bytes(Vec<u8>),
    /// `Some(..)`
    Some(Box<ValueSnapshot>),
    /// Sequences and tuples
    List(Vec<ValueSnapshot>),
    /// Map entries sorted by key
    Map(Vec<(ValueSnapshot, ValueSnapshot)>),
    /// Named struct, fields in declaration order
    Struct {
        type_name: String,
        fields: Vec<(String, ValueSnapshot)>,
    },
    /// Tuple struct or newtype
    TupleStruct {
        type_name: String,
        elements: Vec<ValueSnapshot>,
    },
    /// Enum variant with its payload (`Null` for unit variants)
    Variant {
        type_name: String,
        variant: String,
        payload: Box<ValueSnapshot>,
    },
}

impl ValueSnapshot {
    /// Snapshot of an `f64`
    pub fn float(value: f64) -> Self {
        let bits = if value.is_nan() {
            f64::NAN.to_bits()
        } else {
            value.to_bits()
        };
        ValueSnapshot::Float(bits)
    }

    /// Stable byte encoding of this snapshot
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Decode a snapshot produced by [`ValueSnapshot::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// Structural hash, equal for equal snapshots
    pub fn structural_hash(&self) -> Blake3Hash {
        let mut hasher = IncrementalHasher::new();
        self.append_to_hasher(&mut hasher);
        hasher.finalize()
    }

    /// Feed this snapshot into `hasher`, tagging every node with its kind
    pub fn append_to_hasher(&self, hasher: &mut IncrementalHasher) {
        match self {
            ValueSnapshot::Null => hasher.update(&[0]),
            ValueSnapshot::Boolean(b) => hasher.update(&[1, u8::from(*b)]),
            ValueSnapshot::Integer(i) => {
                hasher.update(&[2]);
                hasher.update(&i.to_le_bytes());
            }
            ValueSnapshot::Float(bits) => {
                hasher.update(&[3]);
                hasher.update(&bits.to_le_bytes());
            }
            ValueSnapshot::Char(c) => {
                hasher.update(&[4]);
                hasher.update(&u32::from(*c).to_le_bytes());
            }
            ValueSnapshot::String(s) => {
                hasher.update(&[5]);
                hasher.update_str(s);
            }
            ValueSnapshot::Bytes(bytes) => {
                hasher.update(&[6]);
                hasher.update(&(bytes.len() as u64).to_le_bytes());
                hasher.update(bytes);
            }
            ValueSnapshot::Some(inner) => {
                hasher.update(&[7]);
                inner.append_to_hasher(hasher);
            }
            ValueSnapshot::List(elements) => {
                hasher.update(&[8]);
                hasher.update(&(elements.len() as u64).to_le_bytes());
                for element in elements {
                    element.append_to_hasher(hasher);
                }
            }
            ValueSnapshot::Map(entries) => {
                hasher.update(&[9]);
                hasher.update(&(entries.len() as u64).to_le_bytes());
                for (key, value) in entries {
                    key.append_to_hasher(hasher);
                    value.append_to_hasher(hasher);
                }
            }
            ValueSnapshot::Struct { type_name, fields } => {
                hasher.update(&[10]);
                hasher.update_str(type_name);
                hasher.update(&(fields.len() as u64).to_le_bytes());
                for (name, value) in fields {
                    hasher.update_str(name);
                    value.append_to_hasher(hasher);
                }
            }
            ValueSnapshot::TupleStruct { type_name, elements } => {
                hasher.update(&[11]);
                hasher.update_str(type_name);
                hasher.update(&(elements.len() as u64).to_le_bytes());
                for element in elements {
                    element.append_to_hasher(hasher);
                }
            }
            ValueSnapshot::Variant {
                type_name,
                variant,
                payload,
            } => {
                hasher.update(&[12]);
                hasher.update_str(type_name);
                hasher.update_str(variant);
                payload.append_to_hasher(hasher);
            }
        }
    }
}
