//! Value snapshotter: turns any `Serialize` value into a [`ValueSnapshot`]
//!
//! The conversion drives the value's own `Serialize` impl through
//! [`SnapshotSerializer`]. A value whose impl refuses to serialize cannot be
//! snapshotted and surfaces as [`SnapshotError`].

use crate::value::ValueSnapshot;
use serde::ser::{self, Serialize};
use tracing::trace;

/// Error converting a value into a snapshot
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The value's `Serialize` impl reported an error
    #[error("{0}")]
    Custom(String),

    /// A map key serialized to something that cannot be ordered reliably
    #[error("Unsupported map key: {0}")]
    UnsupportedKey(String),
}

impl ser::Error for SnapshotError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        SnapshotError::Custom(msg.to_string())
    }
}

/// Converts property values into structural snapshots
///
/// Stateless; one instance can be shared by any number of threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueSnapshotter;

impl ValueSnapshotter {
    /// Create a new snapshotter
    pub fn new() -> Self {
        Self
    }

    /// Snapshot `value`
    pub fn snapshot<T: Serialize + ?Sized>(&self, value: &T) -> Result<ValueSnapshot> {
        value.serialize(SnapshotSerializer)
    }

    /// Snapshot `value`, handing back `previous` when nothing changed
    ///
    /// The comparison is always structural; returning the previous instance
    /// only spares callers from keeping two equal snapshots around.
    pub fn snapshot_with_previous<T: Serialize + ?Sized>(
        &self,
        value: &T,
        previous: &ValueSnapshot,
    ) -> Result<ValueSnapshot> {
        let current = self.snapshot(value)?;
        if current == *previous {
            trace!("value unchanged, reusing previous snapshot");
            Ok(previous.clone())
        } else {
            Ok(current)
        }
    }
}

/// serde `Serializer` producing [`ValueSnapshot`]s
pub struct SnapshotSerializer;

type Result<T> = std::result::Result<T, SnapshotError>;

impl ser::Serializer for SnapshotSerializer {
    type Ok = ValueSnapshot;
    type Error = SnapshotError;

    type SerializeSeq = SeqBuilder;
    type SerializeTuple = SeqBuilder;
    type SerializeTupleStruct = TupleStructBuilder;
    type SerializeTupleVariant = TupleVariantBuilder;
    type SerializeMap = MapBuilder;
    type SerializeStruct = StructBuilder;
    type SerializeStructVariant = StructVariantBuilder;

    fn serialize_bool(self, v: bool) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Boolean(v))
    }

    fn serialize_i8(self, v: i8) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Integer(i128::from(v)))
    }

    fn serialize_i16(self, v: i16) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Integer(i128::from(v)))
    }

    fn serialize_i32(self, v: i32) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Integer(i128::from(v)))
    }

    fn serialize_i64(self, v: i64) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Integer(i128::from(v)))
    }

    fn serialize_i128(self, v: i128) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Integer(v))
    }

    fn serialize_u8(self, v: u8) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Integer(i128::from(v)))
    }

    fn serialize_u16(self, v: u16) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Integer(i128::from(v)))
    }

    fn serialize_u32(self, v: u32) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Integer(i128::from(v)))
    }

    fn serialize_u64(self, v: u64) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Integer(i128::from(v)))
    }

    fn serialize_u128(self, v: u128) -> Result<ValueSnapshot> {
        i128::try_from(v)
            .map(ValueSnapshot::Integer)
            .map_err(|_| SnapshotError::Custom(format!("integer {v} is out of range")))
    }

    fn serialize_f32(self, v: f32) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::float(f64::from(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::float(v))
    }

    fn serialize_char(self, v: char) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Char(v))
    }

    fn serialize_str(self, v: &str) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Some(Box::new(value.serialize(SnapshotSerializer)?)))
    }

    fn serialize_unit(self) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Null)
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Struct {
            type_name: name.to_string(),
            fields: Vec::new(),
        })
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Variant {
            type_name: name.to_string(),
            variant: variant.to_string(),
            payload: Box::new(ValueSnapshot::Null),
        })
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::TupleStruct {
            type_name: name.to_string(),
            elements: vec![value.serialize(SnapshotSerializer)?],
        })
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Variant {
            type_name: name.to_string(),
            variant: variant.to_string(),
            payload: Box::new(value.serialize(SnapshotSerializer)?),
        })
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder> {
        Ok(SeqBuilder {
            elements: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, name: &'static str, len: usize) -> Result<TupleStructBuilder> {
        Ok(TupleStructBuilder {
            type_name: name,
            elements: Vec::with_capacity(len),
        })
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<TupleVariantBuilder> {
        Ok(TupleVariantBuilder {
            type_name: name,
            variant,
            elements: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapBuilder> {
        Ok(MapBuilder {
            entries: Vec::with_capacity(len.unwrap_or(0)),
            pending_key: None,
        })
    }

    fn serialize_struct(self, name: &'static str, len: usize) -> Result<StructBuilder> {
        Ok(StructBuilder {
            type_name: name,
            fields: Vec::with_capacity(len),
        })
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<StructVariantBuilder> {
        Ok(StructVariantBuilder {
            type_name: name,
            variant,
            fields: Vec::with_capacity(len),
        })
    }
}

pub struct SeqBuilder {
    elements: Vec<ValueSnapshot>,
}

impl ser::SerializeSeq for SeqBuilder {
    type Ok = ValueSnapshot;
    type Error = SnapshotError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.elements.push(value.serialize(SnapshotSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::List(self.elements))
    }
}

impl ser::SerializeTuple for SeqBuilder {
    type Ok = ValueSnapshot;
    type Error = SnapshotError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<ValueSnapshot> {
        ser::SerializeSeq::end(self)
    }
}

pub struct TupleStructBuilder {
    type_name: &'static str,
    elements: Vec<ValueSnapshot>,
}

impl ser::SerializeTupleStruct for TupleStructBuilder {
    type Ok = ValueSnapshot;
    type Error = SnapshotError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.elements.push(value.serialize(SnapshotSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::TupleStruct {
            type_name: self.type_name.to_string(),
            elements: self.elements,
        })
    }
}

pub struct TupleVariantBuilder {
    type_name: &'static str,
    variant: &'static str,
    elements: Vec<ValueSnapshot>,
}

impl ser::SerializeTupleVariant for TupleVariantBuilder {
    type Ok = ValueSnapshot;
    type Error = SnapshotError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.elements.push(value.serialize(SnapshotSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Variant {
            type_name: self.type_name.to_string(),
            variant: self.variant.to_string(),
            payload: Box::new(ValueSnapshot::List(self.elements)),
        })
    }
}

pub struct MapBuilder {
    entries: Vec<(ValueSnapshot, ValueSnapshot)>,
    pending_key: Option<ValueSnapshot>,
}

impl ser::SerializeMap for MapBuilder {
    type Ok = ValueSnapshot;
    type Error = SnapshotError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        let key = key.serialize(SnapshotSerializer)?;
        if let ValueSnapshot::Float(bits) = key {
            if f64::from_bits(bits).is_nan() {
                return Err(SnapshotError::UnsupportedKey("NaN".to_string()));
            }
        }
        self.pending_key = Some(key);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| SnapshotError::Custom("map value serialized before its key".to_string()))?;
        self.entries.push((key, value.serialize(SnapshotSerializer)?));
        Ok(())
    }

    fn end(mut self) -> Result<ValueSnapshot> {
        // Hash maps iterate in arbitrary order; sorting makes equal maps equal.
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(ValueSnapshot::Map(self.entries))
    }
}

pub struct StructBuilder {
    type_name: &'static str,
    fields: Vec<(String, ValueSnapshot)>,
}

impl ser::SerializeStruct for StructBuilder {
    type Ok = ValueSnapshot;
    type Error = SnapshotError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.fields.push((key.to_string(), value.serialize(SnapshotSerializer)?));
        Ok(())
    }

    fn end(self) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Struct {
            type_name: self.type_name.to_string(),
            fields: self.fields,
        })
    }
}

pub struct StructVariantBuilder {
    type_name: &'static str,
    variant: &'static str,
    fields: Vec<(String, ValueSnapshot)>,
}

impl ser::SerializeStructVariant for StructVariantBuilder {
    type Ok = ValueSnapshot;
    type Error = SnapshotError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.fields.push((key.to_string(), value.serialize(SnapshotSerializer)?));
        Ok(())
    }

    fn end(self) -> Result<ValueSnapshot> {
        Ok(ValueSnapshot::Variant {
            type_name: self.type_name.to_string(),
            variant: self.variant.to_string(),
            payload: Box::new(ValueSnapshot::Struct {
                type_name: self.variant.to_string(),
                fields: self.fields,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::{BTreeMap, HashMap};

    #[derive(Serialize)]
    struct CompileOptions {
        debug: bool,
        level: u8,
        flags: Vec<String>,
        target: Option<String>,
    }

    #[derive(Serialize)]
    enum Mode {
        Fast,
        Custom { threads: u32 },
        Named(String),
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> std::result::Result<S::Ok, S::Error> {
            Err(ser::Error::custom("opaque handle cannot be serialized"))
        }
    }

    fn options(level: u8) -> CompileOptions {
        CompileOptions {
            debug: true,
            level,
            flags: vec!["-g".to_string()],
            target: None,
        }
    }

    #[test]
    fn test_unchanged_value_snapshots_equal() {
        let snapshotter = ValueSnapshotter::new();
        let a = snapshotter.snapshot(&options(2)).unwrap();
        let b = snapshotter.snapshot(&options(2)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
    }

    #[test]
    fn test_changed_value_snapshots_differ() {
        let snapshotter = ValueSnapshotter::new();
        let a = snapshotter.snapshot(&options(2)).unwrap();
        let b = snapshotter.snapshot(&options(3)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_struct_shape() {
        let snapshot = ValueSnapshotter::new().snapshot(&options(1)).unwrap();
        match snapshot {
            ValueSnapshot::Struct { type_name, fields } => {
                assert_eq!(type_name, "CompileOptions");
                let names: Vec<_> = fields.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, vec!["debug", "level", "flags", "target"]);
                assert_eq!(fields[3].1, ValueSnapshot::Null);
            }
            other => panic!("unexpected snapshot {other:?}"),
        }
    }

    #[test]
    fn test_hash_map_order_does_not_matter() {
        let snapshotter = ValueSnapshotter::new();
        let mut forward = HashMap::new();
        let mut backward = HashMap::new();
        for i in 0..64 {
            forward.insert(format!("key{i}"), i);
        }
        for i in (0..64).rev() {
            backward.insert(format!("key{i}"), i);
        }
        let sorted: BTreeMap<_, _> = forward.clone().into_iter().collect();

        let a = snapshotter.snapshot(&forward).unwrap();
        let b = snapshotter.snapshot(&backward).unwrap();
        let c = snapshotter.snapshot(&sorted).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_enum_variants() {
        let snapshotter = ValueSnapshotter::new();
        let fast = snapshotter.snapshot(&Mode::Fast).unwrap();
        let custom = snapshotter.snapshot(&Mode::Custom { threads: 4 }).unwrap();
        let named = snapshotter.snapshot(&Mode::Named("x".to_string())).unwrap();
        assert_ne!(fast, custom);
        assert_ne!(custom, named);
        assert_eq!(
            fast,
            ValueSnapshot::Variant {
                type_name: "Mode".to_string(),
                variant: "Fast".to_string(),
                payload: Box::new(ValueSnapshot::Null),
            }
        );
    }

    #[test]
    fn test_option_nesting_is_preserved() {
        let snapshotter = ValueSnapshotter::new();
        let none: Option<Option<u8>> = None;
        let some_none: Option<Option<u8>> = Some(None);
        assert_ne!(
            snapshotter.snapshot(&none).unwrap(),
            snapshotter.snapshot(&some_none).unwrap()
        );
    }

    #[test]
    fn test_integer_widths_unify() {
        let snapshotter = ValueSnapshotter::new();
        assert_eq!(snapshotter.snapshot(&7u8).unwrap(), snapshotter.snapshot(&7i64).unwrap());
        assert_eq!(
            snapshotter.snapshot(&u64::MAX).unwrap(),
            ValueSnapshot::Integer(i128::from(u64::MAX))
        );
    }

    #[test]
    fn test_unserializable_value_fails() {
        let err = ValueSnapshotter::new()
            .snapshot(&vec![Unserializable])
            .unwrap_err();
        assert!(err.to_string().contains("opaque handle"));
    }

    #[test]
    fn test_nan_map_key_rejected() {
        let entries = vec![(f64::NAN, 1)];
        struct FloatKeys(Vec<(f64, i32)>);
        impl Serialize for FloatKeys {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
            }
        }
        let err = ValueSnapshotter::new().snapshot(&FloatKeys(entries)).unwrap_err();
        assert!(matches!(err, SnapshotError::UnsupportedKey(_)));
    }

    #[test]
    fn test_previous_snapshot_reused_when_equal() {
        let snapshotter = ValueSnapshotter::new();
        let previous = snapshotter.snapshot(&options(5)).unwrap();
        let same = snapshotter.snapshot_with_previous(&options(5), &previous).unwrap();
        assert_eq!(same, previous);

        let changed = snapshotter.snapshot_with_previous(&options(6), &previous).unwrap();
        assert_ne!(changed, previous);
    }

    #[test]
    fn test_previous_snapshot_never_masks_a_change() {
        let snapshotter = ValueSnapshotter::new();
        let previous = snapshotter.snapshot("release").unwrap();
        let current = snapshotter.snapshot_with_previous("debug", &previous).unwrap();
        assert_eq!(current, ValueSnapshot::String("debug".to_string()));
    }
}
