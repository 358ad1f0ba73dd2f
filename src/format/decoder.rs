//! Decoding of data section fields.
//!
//! [`Decoder`] walks a byte slice (the data section, or the metadata map which uses the same
//! field encoding) and rebuilds [`DataValue`]s. Pointers are resolved relative to the start of
//! the slice the decoder was created with. Every read is bounds checked; structural violations
//! such as a pointer pointing at another pointer or reserved types surface as
//! [`crate::Error::Malformed`].

use std::collections::BTreeMap;

use crate::{
    file::io::{read_be_at, read_be_at_var},
    format::{value::DataValue, DataType, MAX_NESTING},
    Result,
};

/// Maps, arrays and pointer hops nested deeper than this are rejected.
const MAX_DEPTH: usize = 2 * MAX_NESTING;

/// Field decoder over a data section.
pub struct Decoder<'a> {
    data: &'a [u8],
}

impl<'a> Decoder<'a> {
    /// Create a decoder over `data`; offsets and pointers are relative to its start.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Decoder { data }
    }

    /// Decode the field at `offset`.
    ///
    /// Returns the value together with the offset directly after the field. When the field is
    /// a pointer, the returned offset is the one after the pointer, not after its target.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated fields and
    /// [`crate::Error::Malformed`] for invalid structure.
    pub fn decode_at(&self, offset: usize) -> Result<(DataValue, usize)> {
        let mut cursor = offset;
        let value = self.decode_field(&mut cursor, 0, true)?;
        Ok((value, cursor))
    }

    fn decode_field(&self, cursor: &mut usize, depth: usize, follow: bool) -> Result<DataValue> {
        if depth > MAX_DEPTH {
            return Err(malformed_error!(
                "Data nested deeper than {} levels at offset {}",
                MAX_DEPTH,
                *cursor
            ));
        }

        let field_start = *cursor;
        let control: u8 = read_be_at(self.data, cursor)?;
        let mut type_id = control >> 5;

        if type_id == DataType::Pointer.id() {
            if !follow {
                return Err(malformed_error!(
                    "Pointer at offset {} points to another pointer",
                    field_start
                ));
            }
            let mut target = self.decode_pointer(control, cursor)?;
            if target >= self.data.len() {
                return Err(malformed_error!(
                    "Pointer at offset {} targets {} beyond the data section",
                    field_start,
                    target
                ));
            }
            return self.decode_field(&mut target, depth + 1, false);
        }

        if type_id == 0 {
            let extended: u8 = read_be_at(self.data, cursor)?;
            type_id = extended.checked_add(7).ok_or_else(|| {
                malformed_error!("Invalid extended type {} at offset {}", extended, field_start)
            })?;
            if type_id <= 7 {
                return Err(malformed_error!(
                    "Extended type byte {} at offset {} names a basic type",
                    extended,
                    field_start
                ));
            }
        }

        let Some(data_type) = DataType::from_id(type_id) else {
            return Err(malformed_error!(
                "Unknown data type {} at offset {}",
                type_id,
                field_start
            ));
        };

        let size = self.decode_size(control, cursor)?;

        match data_type {
            DataType::Map => {
                let mut map = BTreeMap::new();
                for _ in 0..size {
                    let key = match self.decode_field(cursor, depth + 1, true)? {
                        DataValue::String(key) => key,
                        other => {
                            return Err(malformed_error!(
                                "Map key of type {} at offset {}",
                                other.type_name(),
                                field_start
                            ))
                        }
                    };
                    let value = self.decode_field(cursor, depth + 1, true)?;
                    map.insert(key, value);
                }
                Ok(DataValue::Map(map))
            }
            DataType::Array => {
                let mut items = Vec::with_capacity(size.min(self.data.len()));
                for _ in 0..size {
                    items.push(self.decode_field(cursor, depth + 1, true)?);
                }
                Ok(DataValue::Array(items))
            }
            DataType::String => {
                let bytes = self.take(cursor, size)?;
                let text = std::str::from_utf8(bytes).map_err(|_| {
                    malformed_error!("Invalid UTF-8 string at offset {}", field_start)
                })?;
                Ok(DataValue::String(text.to_string()))
            }
            DataType::Bytes => Ok(DataValue::Bytes(self.take(cursor, size)?.to_vec())),
            DataType::Double => {
                if size != 8 {
                    return Err(malformed_error!("Double of size {} at offset {}", size, field_start));
                }
                Ok(DataValue::Double(read_be_at(self.data, cursor)?))
            }
            DataType::Float => {
                if size != 4 {
                    return Err(malformed_error!("Float of size {} at offset {}", size, field_start));
                }
                Ok(DataValue::Float(read_be_at(self.data, cursor)?))
            }
            DataType::Bool => match size {
                0 => Ok(DataValue::Bool(false)),
                1 => Ok(DataValue::Bool(true)),
                _ => Err(malformed_error!("Boolean of size {} at offset {}", size, field_start)),
            },
            DataType::Uint16 => {
                Ok(DataValue::Uint16(self.read_unsigned(cursor, size, 2, field_start)? as u16))
            }
            DataType::Uint32 => {
                Ok(DataValue::Uint32(self.read_unsigned(cursor, size, 4, field_start)? as u32))
            }
            DataType::Int32 => {
                Ok(DataValue::Int32(self.read_unsigned(cursor, size, 4, field_start)? as u32 as i32))
            }
            DataType::Uint64 => {
                Ok(DataValue::Uint64(self.read_unsigned(cursor, size, 8, field_start)? as u64))
            }
            DataType::Uint128 => {
                Ok(DataValue::Uint128(self.read_unsigned(cursor, size, 16, field_start)?))
            }
            DataType::Pointer | DataType::Container | DataType::EndMarker => Err(malformed_error!(
                "Reserved data type {} at offset {}",
                data_type.name(),
                field_start
            )),
        }
    }

    fn decode_pointer(&self, control: u8, cursor: &mut usize) -> Result<usize> {
        let size = (control >> 3) & 0x03;
        let high = u32::from(control & 0x07);

        let target = match size {
            0 => (high << 8) | u32::from(read_be_at::<u8>(self.data, cursor)?),
            1 => ((high << 16) | read_be_at_var(self.data, cursor, 2)? as u32) + 2048,
            2 => ((high << 24) | read_be_at_var(self.data, cursor, 3)? as u32) + 526_336,
            _ => read_be_at::<u32>(self.data, cursor)?,
        };

        Ok(target as usize)
    }

    fn decode_size(&self, control: u8, cursor: &mut usize) -> Result<usize> {
        let size = usize::from(control & 0x1F);
        Ok(match size {
            29 => 29 + read_be_at_var(self.data, cursor, 1)? as usize,
            30 => 285 + read_be_at_var(self.data, cursor, 2)? as usize,
            31 => 65_821 + read_be_at_var(self.data, cursor, 3)? as usize,
            _ => size,
        })
    }

    fn read_unsigned(
        &self,
        cursor: &mut usize,
        size: usize,
        max: usize,
        field_start: usize,
    ) -> Result<u128> {
        if size > max {
            return Err(malformed_error!(
                "Integer of size {} exceeds {} bytes at offset {}",
                size,
                max,
                field_start
            ));
        }
        read_be_at_var(self.data, cursor, size)
    }

    fn take(&self, cursor: &mut usize, len: usize) -> Result<&'a [u8]> {
        let end = cursor.checked_add(len).ok_or(out_of_bounds_error!())?;
        if end > self.data.len() {
            return Err(out_of_bounds_error!());
        }
        let bytes = &self.data[*cursor..end];
        *cursor = end;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        format::encoder::{encode_plain, DataEncoder},
        Error,
    };

    fn round_trip(value: DataValue) {
        let mut bytes = Vec::new();
        encode_plain(&value, &mut bytes).unwrap();
        let (decoded, next) = Decoder::new(&bytes).decode_at(0).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(next, bytes.len());
    }

    #[test]
    fn decodes_every_type() {
        round_trip(
            DataValue::map()
                .entry("string", "DistroDefender")
                .entry("double", 37.386_f64)
                .entry("float", 122.0838_f32)
                .entry("bytes", vec![0xAB_u8, 0xCD])
                .entry("uint16", 123_u16)
                .entry("uint32", 94043_u32)
                .entry("int32", -5_i32)
                .entry("uint64", 1234567890_u64)
                .entry("uint128", u128::MAX)
                .entry("zero", 0_u32)
                .entry("bool", true)
                .entry(
                    "array",
                    vec![DataValue::from("a"), DataValue::from(false)],
                )
                .build(),
        );
    }

    #[test]
    fn decodes_long_sizes() {
        round_trip(DataValue::from("x".repeat(300)));
        round_trip(DataValue::Bytes(vec![7; 70_000]));
    }

    #[test]
    fn follows_pointers() {
        let mut encoder = DataEncoder::new();
        encoder
            .insert(&DataValue::map().entry("test_str1", "DistroDefender").build())
            .unwrap();
        let shared = DataValue::map()
            .entry("test_str1", "DistroDefender")
            .entry("test_str2", "DistroDefender2")
            .build();
        let offset = encoder.insert(&shared).unwrap();

        let bytes = encoder.into_bytes();
        let (decoded, next) = Decoder::new(&bytes).decode_at(offset as usize).unwrap();
        assert_eq!(decoded, shared);
        assert_eq!(next, bytes.len());
    }

    #[test]
    fn pointer_after_field_returns_cursor_after_pointer() {
        // "ab" at 0, pointer to 0 at 3
        let bytes = [0x42, b'a', b'b', 0x20, 0x00];
        let (value, next) = Decoder::new(&bytes).decode_at(3).unwrap();
        assert_eq!(value, DataValue::from("ab"));
        assert_eq!(next, 5);
    }

    #[test]
    fn rejects_pointer_to_pointer() {
        let bytes = [0x20, 0x02, 0x20, 0x00];
        assert!(matches!(
            Decoder::new(&bytes).decode_at(0),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn rejects_pointer_outside_data() {
        let bytes = [0x20, 0x40];
        assert!(matches!(
            Decoder::new(&bytes).decode_at(0),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn rejects_truncated_fields() {
        assert!(matches!(
            Decoder::new(&[0x45, b'a']).decode_at(0),
            Err(Error::OutOfBounds)
        ));
        assert!(matches!(
            Decoder::new(&[0x68, 0x00]).decode_at(0),
            Err(Error::OutOfBounds)
        ));
        assert!(Decoder::new(&[]).decode_at(0).is_err());
    }

    #[test]
    fn rejects_invalid_structure() {
        // end marker
        assert!(Decoder::new(&[0x00, 0x06]).decode_at(0).is_err());
        // extended byte naming a basic type
        assert!(Decoder::new(&[0x00, 0x00]).decode_at(0).is_err());
        // map key that is not a string
        assert!(Decoder::new(&[0xE1, 0xA1, 0x01, 0xA1, 0x01]).decode_at(0).is_err());
        // uint16 with three bytes
        assert!(Decoder::new(&[0xA3, 0x01, 0x02, 0x03]).decode_at(0).is_err());
        // invalid utf-8
        assert!(Decoder::new(&[0x41, 0xFF]).decode_at(0).is_err());
        // boolean with size 2
        assert!(Decoder::new(&[0x02, 0x07]).decode_at(0).is_err());
    }

    #[test]
    fn rejects_excessive_nesting() {
        let mut bytes: Vec<u8> = std::iter::repeat([0x01_u8, 0x04])
            .take(MAX_DEPTH + 2)
            .flatten()
            .collect();
        bytes.extend_from_slice(&[0x41, b'a']);
        assert!(matches!(
            Decoder::new(&bytes).decode_at(0),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn accepts_nesting_up_to_the_limit() {
        let mut bytes: Vec<u8> = std::iter::repeat([0x01_u8, 0x04])
            .take(MAX_DEPTH)
            .flatten()
            .collect();
        bytes.extend_from_slice(&[0x41, b'a']);
        assert!(Decoder::new(&bytes).decode_at(0).is_ok());
    }

    #[test]
    fn rejects_pointer_cycle() {
        // array of two pointers back to the array itself
        let bytes = [0x02, 0x04, 0x20, 0x00, 0x20, 0x00];
        assert!(matches!(
            Decoder::new(&bytes).decode_at(0),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn rejects_pointer_cycle_inside_map() {
        // {"a": <pointer to the map>}
        let bytes = [0xE1, 0x41, b'a', 0x20, 0x00];
        assert!(matches!(
            Decoder::new(&bytes).decode_at(0),
            Err(Error::Malformed { .. })
        ));
    }
}
