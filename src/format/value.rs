//! Typed values stored in the data section.
//!
//! [`DataValue`] covers every data type a caller can store. Maps use a [`BTreeMap`] so keys are
//! unique and always serialized in the same order, which keeps the output of repeated runs
//! byte-identical.
//!
//! # Examples
//!
//! ```rust
//! use mmdbforge::DataValue;
//!
//! let record = DataValue::map()
//!     .entry("city", "Berlin")
//!     .entry("population", 3_850_809_u32)
//!     .entry("tags", vec![DataValue::from("capital")])
//!     .build();
//!
//! assert_eq!(
//!     record.get_path("city").and_then(DataValue::as_str),
//!     Some("Berlin")
//! );
//! ```

use std::collections::BTreeMap;

use crate::format::DataType;

/// A value in the data section.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// Map with unique UTF-8 keys
    Map(BTreeMap<String, DataValue>),
    /// UTF-8 string
    String(String),
    /// 64-bit float
    Double(f64),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Unsigned 16-bit integer
    Uint16(u16),
    /// Unsigned 32-bit integer
    Uint32(u32),
    /// Signed 32-bit integer
    Int32(i32),
    /// Unsigned 64-bit integer
    Uint64(u64),
    /// Unsigned 128-bit integer
    Uint128(u128),
    /// Ordered list of values
    Array(Vec<DataValue>),
    /// Boolean
    Bool(bool),
    /// 32-bit float
    Float(f32),
}

impl DataValue {
    /// Start building a map value.
    #[must_use]
    pub fn map() -> MapBuilder {
        MapBuilder::default()
    }

    /// The data type this value is serialized as.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            DataValue::Map(_) => DataType::Map,
            DataValue::String(_) => DataType::String,
            DataValue::Double(_) => DataType::Double,
            DataValue::Bytes(_) => DataType::Bytes,
            DataValue::Uint16(_) => DataType::Uint16,
            DataValue::Uint32(_) => DataType::Uint32,
            DataValue::Int32(_) => DataType::Int32,
            DataValue::Uint64(_) => DataType::Uint64,
            DataValue::Uint128(_) => DataType::Uint128,
            DataValue::Array(_) => DataType::Array,
            DataValue::Bool(_) => DataType::Bool,
            DataValue::Float(_) => DataType::Float,
        }
    }

    /// Shorthand for `self.data_type().name()`.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.data_type().name()
    }

    /// Number of map/array levels, zero for scalars.
    #[must_use]
    pub fn nesting_depth(&self) -> usize {
        match self {
            DataValue::Map(map) => 1 + map.values().map(DataValue::nesting_depth).max().unwrap_or(0),
            DataValue::Array(items) => {
                1 + items.iter().map(DataValue::nesting_depth).max().unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// Resolve a dot-separated path through maps and arrays.
    ///
    /// Map segments match keys, array segments are decimal indices. An empty path resolves to
    /// the value itself.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&DataValue> {
        if path.is_empty() {
            return Some(self);
        }

        path.split('.').try_fold(self, |current, segment| match current {
            DataValue::Map(map) => map.get(segment),
            DataValue::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index)),
            _ => None,
        })
    }

    /// The string, if this is a [`DataValue::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// The map, if this is a [`DataValue::Map`].
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, DataValue>> {
        match self {
            DataValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// The items, if this is a [`DataValue::Array`].
    #[must_use]
    pub fn as_array(&self) -> Option<&[DataValue]> {
        match self {
            DataValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Any unsigned integer variant widened to `u128`.
    #[must_use]
    pub fn as_unsigned(&self) -> Option<u128> {
        match self {
            DataValue::Uint16(value) => Some(u128::from(*value)),
            DataValue::Uint32(value) => Some(u128::from(*value)),
            DataValue::Uint64(value) => Some(u128::from(*value)),
            DataValue::Uint128(value) => Some(*value),
            _ => None,
        }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for DataValue {
                fn from(value: $ty) -> Self {
                    DataValue::$variant(value)
                }
            }
        )*
    };
}

impl_from_scalar! {
    String => String,
    f64 => Double,
    Vec<u8> => Bytes,
    u16 => Uint16,
    u32 => Uint32,
    i32 => Int32,
    u64 => Uint64,
    u128 => Uint128,
    Vec<DataValue> => Array,
    bool => Bool,
    f32 => Float,
    BTreeMap<String, DataValue> => Map,
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        DataValue::String(value.to_string())
    }
}

impl From<&[u8]> for DataValue {
    fn from(value: &[u8]) -> Self {
        DataValue::Bytes(value.to_vec())
    }
}

/// Fluent builder for [`DataValue::Map`].
///
/// Inserting a key twice keeps the last value.
#[derive(Debug, Clone, Default)]
pub struct MapBuilder {
    entries: BTreeMap<String, DataValue>,
}

impl MapBuilder {
    /// Add or replace an entry.
    #[must_use]
    pub fn entry(mut self, key: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Finish the map.
    #[must_use]
    pub fn build(self) -> DataValue {
        DataValue::Map(self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nesting_depth() {
        assert_eq!(DataValue::from(1_u32).nesting_depth(), 0);
        assert_eq!(DataValue::map().build().nesting_depth(), 1);
        assert_eq!(sample().nesting_depth(), 2);
    }

    fn sample() -> DataValue {
        DataValue::map()
            .entry(
                "test_map",
                DataValue::map()
                    .entry("test_str1", "DistroDefender")
                    .build(),
            )
            .entry(
                "test_array",
                vec![DataValue::from("a"), DataValue::from("b")],
            )
            .entry("test_uint16", 123_u16)
            .build()
    }

    #[test]
    fn builder_replaces_duplicate_keys() {
        let value = DataValue::map().entry("k", 1_u32).entry("k", 2_u32).build();
        assert_eq!(value.as_map().unwrap().len(), 1);
        assert_eq!(value.get_path("k"), Some(&DataValue::Uint32(2)));
    }

    #[test]
    fn path_resolution() {
        let value = sample();

        assert_eq!(
            value.get_path("test_map.test_str1").and_then(DataValue::as_str),
            Some("DistroDefender")
        );
        assert_eq!(
            value.get_path("test_array.1").and_then(DataValue::as_str),
            Some("b")
        );
        assert_eq!(value.get_path(""), Some(&value));
        assert!(value.get_path("test_array.7").is_none());
        assert!(value.get_path("test_array.x").is_none());
        assert!(value.get_path("test_uint16.deeper").is_none());
        assert!(value.get_path("missing").is_none());
    }

    #[test]
    fn data_types() {
        assert_eq!(DataValue::from(1.5_f32).data_type(), DataType::Float);
        assert_eq!(DataValue::from(1.5_f64).data_type(), DataType::Double);
        assert_eq!(DataValue::from(vec![0xAB_u8]).data_type(), DataType::Bytes);
        assert_eq!(DataValue::from(-1_i32).type_name(), "int32");
        assert_eq!(sample().type_name(), "map");
    }

    #[test]
    fn unsigned_widening() {
        assert_eq!(DataValue::Uint16(7).as_unsigned(), Some(7));
        assert_eq!(DataValue::Uint128(u128::MAX).as_unsigned(), Some(u128::MAX));
        assert_eq!(DataValue::Int32(7).as_unsigned(), None);
    }
}
