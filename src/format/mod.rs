//! MaxMind DB binary format: data types, values and the data section codec.
//!
//! A database file is laid out as
//!
//! ```text
//! [search tree][16 zero bytes][data section][\xAB\xCD\xEFMaxMind.com][metadata map]
//! ```
//!
//! This module owns everything below the search tree: the typed values stored at each network
//! ([`value::DataValue`]), their serialization with pointer deduplication
//! ([`encoder::DataEncoder`]), the reverse direction ([`decoder::Decoder`]) and the metadata map
//! describing the file ([`metadata::Metadata`]).
//!
//! # Field Encoding
//!
//! Every field starts with a control byte. The top three bits carry the type; types above 7
//! store `0` there and put `type - 7` in the following byte. The low five bits carry the
//! payload size, with `29`, `30` and `31` announcing one, two or three extra size bytes.

pub mod decoder;
pub mod encoder;
pub mod metadata;
pub mod value;

use strum::{EnumCount, EnumIter, IntoEnumIterator, IntoStaticStr};

/// Marker separating the data section from the metadata map.
pub const METADATA_START_MARKER: &[u8] = b"\xAB\xCD\xEFMaxMind.com";

/// Number of zero bytes between the search tree and the data section.
pub const DATA_SECTION_SEPARATOR_SIZE: usize = 16;

/// The metadata marker must appear within this many bytes of the end of the file.
pub const METADATA_MAX_SIZE: usize = 128 * 1024;

/// Largest payload size a control byte (with three extension bytes) can express.
pub const MAX_FIELD_SIZE: usize = 65_821 + 0x00FF_FFFF;

/// Deepest map/array nesting a record may have.
///
/// Every level may be reached through a pointer, so the decoder allows twice this many hops.
pub const MAX_NESTING: usize = 32;

/// Major version of the binary format written by this crate.
pub const BINARY_FORMAT_MAJOR_VERSION: u16 = 2;

/// Minor version of the binary format written by this crate.
pub const BINARY_FORMAT_MINOR_VERSION: u16 = 0;

/// Field types of the data section, numbered as in the file format.
///
/// `Pointer`, `Container` and `EndMarker` are structural and never appear as a
/// [`value::DataValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, IntoStaticStr)]
#[repr(u8)]
pub enum DataType {
    /// Reference to another field in the data section
    #[strum(serialize = "pointer")]
    Pointer = 1,
    /// UTF-8 string
    #[strum(serialize = "utf8_string")]
    String = 2,
    /// IEEE-754 binary64
    #[strum(serialize = "double")]
    Double = 3,
    /// Raw byte sequence
    #[strum(serialize = "bytes")]
    Bytes = 4,
    /// Unsigned 16-bit integer
    #[strum(serialize = "uint16")]
    Uint16 = 5,
    /// Unsigned 32-bit integer
    #[strum(serialize = "uint32")]
    Uint32 = 6,
    /// Key/value map with string keys
    #[strum(serialize = "map")]
    Map = 7,
    /// Signed 32-bit integer
    #[strum(serialize = "int32")]
    Int32 = 8,
    /// Unsigned 64-bit integer
    #[strum(serialize = "uint64")]
    Uint64 = 9,
    /// Unsigned 128-bit integer
    #[strum(serialize = "uint128")]
    Uint128 = 10,
    /// Ordered list of values
    #[strum(serialize = "array")]
    Array = 11,
    /// Reserved for data cache containers
    #[strum(serialize = "container")]
    Container = 12,
    /// Reserved end marker
    #[strum(serialize = "end_marker")]
    EndMarker = 13,
    /// Boolean, stored in the size bits
    #[strum(serialize = "boolean")]
    Bool = 14,
    /// IEEE-754 binary32
    #[strum(serialize = "float")]
    Float = 15,
}

impl DataType {
    /// The numeric type id used in control bytes.
    #[must_use]
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Resolve a numeric type id.
    #[must_use]
    pub fn from_id(id: u8) -> Option<DataType> {
        DataType::iter().find(|data_type| data_type.id() == id)
    }

    /// The name of the type as used in the format documentation.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// True for types whose id does not fit in the three control bits.
    #[must_use]
    pub fn is_extended(self) -> bool {
        self.id() > 7
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_ids_round_trip() {
        assert_eq!(DataType::COUNT, 15);
        for data_type in DataType::iter() {
            assert_eq!(DataType::from_id(data_type.id()), Some(data_type));
        }
        assert_eq!(DataType::from_id(0), None);
        assert_eq!(DataType::from_id(16), None);
    }

    #[test]
    fn extended_types() {
        assert!(!DataType::Map.is_extended());
        assert!(DataType::Int32.is_extended());
        assert!(DataType::Float.is_extended());
    }

    #[test]
    fn names() {
        assert_eq!(DataType::String.name(), "utf8_string");
        assert_eq!(DataType::Bool.name(), "boolean");
        assert_eq!(DataType::Uint128.name(), "uint128");
    }

    #[test]
    fn limits() {
        assert_eq!(MAX_FIELD_SIZE, 16_843_036);
        assert_eq!(METADATA_START_MARKER.len(), 14);
    }
}
