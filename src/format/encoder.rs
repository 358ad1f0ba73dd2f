//! Data section serialization with pointer deduplication.
//!
//! [`DataEncoder`] appends values to a growing data section. Every value it writes, at any
//! nesting level, is remembered by its plain serialization. When the same value shows up again
//! (a repeated record, a map key used by many records, a shared nested map) the encoder emits a
//! pointer to the first copy instead, as long as the pointer is shorter than the value.
//!
//! [`encode_plain`] serializes without pointers. It is used for the metadata map, which readers
//! decode separately from the data section, and as the deduplication key.
//!
//! # Examples
//!
//! ```rust,ignore
//! use mmdbforge::format::encoder::DataEncoder;
//! use mmdbforge::DataValue;
//!
//! let mut encoder = DataEncoder::new();
//! let first = encoder.insert(&DataValue::from("DistroDefender"))?;
//! let second = encoder.insert(&DataValue::from("DistroDefender"))?;
//! assert_eq!(first, second);
//! # Ok::<(), mmdbforge::Error>(())
//! ```

use std::collections::HashMap;

use crate::{
    file::io::be_width,
    format::{value::DataValue, DataType, MAX_FIELD_SIZE},
    Error, Result,
};

/// Pointer payload thresholds: offsets below each limit fit the matching pointer size.
const POINTER_LIMIT_1: u32 = 1 << 11;
const POINTER_LIMIT_2: u32 = POINTER_LIMIT_1 + (1 << 19);
const POINTER_LIMIT_3: u32 = POINTER_LIMIT_2 + (1 << 27);

/// Incremental encoder for the data section.
#[derive(Debug, Default)]
pub struct DataEncoder {
    buffer: Vec<u8>,
    offsets: HashMap<Vec<u8>, u32>,
}

impl DataEncoder {
    /// Create an empty data section.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a top-level value and return its offset within the data section.
    ///
    /// Storing a value equal to one already present returns the earlier offset and writes
    /// nothing.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueTooLarge`] if a field exceeds the format limits and
    /// [`crate::Error::DatabaseTooLarge`] if the data section outgrows 32-bit offsets.
    pub fn insert(&mut self, value: &DataValue) -> Result<u32> {
        let key = plain_bytes(value)?;
        if let Some(&offset) = self.offsets.get(&key) {
            return Ok(offset);
        }

        let offset = self.current_offset()?;
        self.write_value(value)?;
        self.current_offset()?;
        self.offsets.insert(key, offset);
        Ok(offset)
    }

    /// Size of the data section written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The serialized data section.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the encoder and return the serialized data section.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    fn current_offset(&self) -> Result<u32> {
        u32::try_from(self.buffer.len()).map_err(|_| {
            Error::DatabaseTooLarge(format!(
                "data section of {} bytes exceeds 32-bit offsets",
                self.buffer.len()
            ))
        })
    }

    fn write_value(&mut self, value: &DataValue) -> Result<()> {
        match value {
            DataValue::Map(map) => {
                write_control(&mut self.buffer, DataType::Map, map.len())?;
                for (key, item) in map {
                    self.write_child(&DataValue::String(key.clone()))?;
                    self.write_child(item)?;
                }
                Ok(())
            }
            DataValue::Array(items) => {
                write_control(&mut self.buffer, DataType::Array, items.len())?;
                for item in items {
                    self.write_child(item)?;
                }
                Ok(())
            }
            scalar => write_scalar(&mut self.buffer, scalar),
        }
    }

    fn write_child(&mut self, value: &DataValue) -> Result<()> {
        let key = plain_bytes(value)?;
        if let Some(&offset) = self.offsets.get(&key) {
            let pointer = pointer_bytes(offset);
            if pointer.len() < key.len() {
                self.buffer.extend_from_slice(&pointer);
                return Ok(());
            }
        }

        let offset = self.current_offset()?;
        self.write_value(value)?;
        self.offsets.entry(key).or_insert(offset);
        Ok(())
    }
}

/// Serialize `value` without pointers, appending to `out`.
///
/// # Errors
/// Returns [`crate::Error::ValueTooLarge`] if a field exceeds the format limits.
pub fn encode_plain(value: &DataValue, out: &mut Vec<u8>) -> Result<()> {
    match value {
        DataValue::Map(map) => {
            write_control(out, DataType::Map, map.len())?;
            for (key, item) in map {
                write_string(out, key)?;
                encode_plain(item, out)?;
            }
            Ok(())
        }
        DataValue::Array(items) => {
            write_control(out, DataType::Array, items.len())?;
            for item in items {
                encode_plain(item, out)?;
            }
            Ok(())
        }
        scalar => write_scalar(out, scalar),
    }
}

fn plain_bytes(value: &DataValue) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    encode_plain(value, &mut out)?;
    Ok(out)
}

/// Write a control byte (plus extended type and size bytes) for a field of `size`.
///
/// # Errors
/// Returns [`crate::Error::ValueTooLarge`] if `size` exceeds [`MAX_FIELD_SIZE`].
pub fn write_control(out: &mut Vec<u8>, data_type: DataType, size: usize) -> Result<()> {
    let (size_bits, extra): (u8, Vec<u8>) = if size < 29 {
        (size as u8, Vec::new())
    } else if size < 285 {
        (29, vec![(size - 29) as u8])
    } else if size < 65_821 {
        (30, ((size - 285) as u16).to_be_bytes().to_vec())
    } else if size <= MAX_FIELD_SIZE {
        (31, ((size - 65_821) as u32).to_be_bytes()[1..].to_vec())
    } else {
        return Err(Error::ValueTooLarge(size));
    };

    if data_type.is_extended() {
        out.push(size_bits);
        out.push(data_type.id() - 7);
    } else {
        out.push((data_type.id() << 5) | size_bits);
    }
    out.extend_from_slice(&extra);
    Ok(())
}

/// Encode a pointer to `offset` using the smallest of the four pointer sizes.
#[must_use]
pub fn pointer_bytes(offset: u32) -> Vec<u8> {
    let pointer = DataType::Pointer.id() << 5;
    if offset < POINTER_LIMIT_1 {
        vec![pointer | ((offset >> 8) as u8 & 0x07), offset as u8]
    } else if offset < POINTER_LIMIT_2 {
        let value = offset - POINTER_LIMIT_1;
        vec![
            pointer | 0x08 | ((value >> 16) as u8 & 0x07),
            (value >> 8) as u8,
            value as u8,
        ]
    } else if offset < POINTER_LIMIT_3 {
        let value = offset - POINTER_LIMIT_2;
        vec![
            pointer | 0x10 | ((value >> 24) as u8 & 0x07),
            (value >> 16) as u8,
            (value >> 8) as u8,
            value as u8,
        ]
    } else {
        let mut bytes = vec![pointer | 0x18];
        bytes.extend_from_slice(&offset.to_be_bytes());
        bytes
    }
}

fn write_string(out: &mut Vec<u8>, value: &str) -> Result<()> {
    write_control(out, DataType::String, value.len())?;
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

fn write_unsigned(out: &mut Vec<u8>, data_type: DataType, value: u128) -> Result<()> {
    let width = be_width(value);
    write_control(out, data_type, width)?;
    out.extend_from_slice(&value.to_be_bytes()[16 - width..]);
    Ok(())
}

fn write_scalar(out: &mut Vec<u8>, value: &DataValue) -> Result<()> {
    match value {
        DataValue::String(text) => write_string(out, text),
        DataValue::Bytes(bytes) => {
            write_control(out, DataType::Bytes, bytes.len())?;
            out.extend_from_slice(bytes);
            Ok(())
        }
        DataValue::Double(number) => {
            write_control(out, DataType::Double, 8)?;
            out.extend_from_slice(&number.to_be_bytes());
            Ok(())
        }
        DataValue::Float(number) => {
            write_control(out, DataType::Float, 4)?;
            out.extend_from_slice(&number.to_be_bytes());
            Ok(())
        }
        DataValue::Bool(flag) => write_control(out, DataType::Bool, usize::from(*flag)),
        DataValue::Uint16(number) => write_unsigned(out, DataType::Uint16, u128::from(*number)),
        DataValue::Uint32(number) => write_unsigned(out, DataType::Uint32, u128::from(*number)),
        DataValue::Uint64(number) => write_unsigned(out, DataType::Uint64, u128::from(*number)),
        DataValue::Uint128(number) => write_unsigned(out, DataType::Uint128, *number),
        // Negative values keep all four bytes of their two's complement form.
        DataValue::Int32(number) => {
            write_unsigned(out, DataType::Int32, u128::from(*number as u32))
        }
        DataValue::Map(_) | DataValue::Array(_) => encode_plain(value, out),
    }
}
