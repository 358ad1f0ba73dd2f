//! Bounds-checked big-endian reading and writing utilities.
//!
//! Every multi-byte quantity in a MaxMind DB file is stored big-endian: search tree records,
//! pointer payloads, integer and floating point data fields. This module provides the small set
//! of primitives the encoder, the tree serializer and the decoder share, so that no component
//! indexes raw slices on its own.
//!
//! # Key Components
//!
//! - [`crate::file::io::WireIO`] - Trait tying a primitive type to its fixed-size byte array
//! - [`crate::file::io::read_be_at`] - Fixed-width reads
//! - [`crate::file::io::read_be_at_var`] - Variable-width unsigned reads (0 to 16 bytes)
//! - [`crate::file::io::write_be_at`] - Fixed-width writes into a preallocated buffer
//! - [`crate::file::io::write_be_at_var`] - Variable-width unsigned writes
//! - [`crate::file::io::be_width`] - Minimal number of bytes needed for an unsigned value
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use mmdbforge::file::io::{read_be_at, write_be_at};
//!
//! let mut data = [0u8; 6];
//! let mut offset = 0;
//! write_be_at(&mut data, &mut offset, 0x0102_u16)?;
//! write_be_at(&mut data, &mut offset, 0x0304_0506_u32)?;
//! assert_eq!(data, [0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
//!
//! offset = 0;
//! let first: u16 = read_be_at(&data, &mut offset)?;
//! assert_eq!(first, 0x0102);
//! # Ok::<(), mmdbforge::Error>(())
//! ```
//!
//! # Error Handling
//!
//! All functions return [`crate::Result`] and report [`crate::Error::OutOfBounds`] when the
//! buffer is too small, leaving the offset untouched.

use crate::{Error::OutOfBounds, Result};

/// Trait for primitive types that can be moved to and from big-endian byte arrays.
///
/// Each implementation names the fixed-size byte array for the type (e.g. `[u8; 4]` for `u32`).
pub trait WireIO: Sized {
    /// The byte array type matching the size of `Self`.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;
    /// Write T to a byte buffer in big-endian
    fn to_be_bytes(self) -> Self::Bytes;
}

macro_rules! impl_wire_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl WireIO for $ty {
                type Bytes = [u8; $len];

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$ty>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_wire_io! {
    u8 => 1,
    u16 => 2,
    u32 => 4,
    u64 => 8,
    u128 => 16,
    i32 => 4,
    f32 => 4,
    f64 => 8,
}

/// Read a `T` at `offset` and advance the offset past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain.
pub fn read_be_at<T: WireIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_be_bytes(read))
}

/// Read an unsigned big-endian integer of `len` bytes (0..=16) at `offset`.
///
/// A zero-length read yields `0`, which is how the format stores zero-valued integers.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `len` exceeds 16 or the buffer is too short.
pub fn read_be_at_var(data: &[u8], offset: &mut usize, len: usize) -> Result<u128> {
    if len > 16 {
        return Err(OutOfBounds);
    }
    let Some(end) = offset.checked_add(len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let value = data[*offset..end]
        .iter()
        .fold(0_u128, |acc, byte| (acc << 8) | u128::from(*byte));

    *offset = end;
    Ok(value)
}

/// Write `value` at `offset` and advance the offset past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit in the remaining buffer.
pub fn write_be_at<T: WireIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let bytes = value.to_be_bytes();
    data[*offset..end].copy_from_slice(bytes.as_ref());
    *offset = end;

    Ok(())
}

/// Write the low `len` bytes of `value` big-endian at `offset`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `len` exceeds 16, the value needs more than `len`
/// bytes, or the buffer is too short.
pub fn write_be_at_var(data: &mut [u8], offset: &mut usize, value: u128, len: usize) -> Result<()> {
    if len > 16 || be_width(value) > len {
        return Err(OutOfBounds);
    }
    let Some(end) = offset.checked_add(len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let bytes = value.to_be_bytes();
    data[*offset..end].copy_from_slice(&bytes[16 - len..]);
    *offset = end;

    Ok(())
}

/// Number of bytes needed to hold `value` with leading zero bytes stripped.
#[must_use]
pub fn be_width(value: u128) -> usize {
    (128 - value.leading_zeros() as usize).div_ceil(8)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_BUFFER: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    #[test]
    fn read_be_u8() {
        let result = read_be_at::<u8>(&TEST_BUFFER, &mut 0).unwrap();
        assert_eq!(result, 0x1);
    }

    #[test]
    fn read_be_u16() {
        let result = read_be_at::<u16>(&TEST_BUFFER, &mut 0).unwrap();
        assert_eq!(result, 0x102);
    }

    #[test]
    fn read_be_u32() {
        let result = read_be_at::<u32>(&TEST_BUFFER, &mut 0).unwrap();
        assert_eq!(result, 0x0102_0304);
    }

    #[test]
    fn read_be_u64() {
        let result = read_be_at::<u64>(&TEST_BUFFER, &mut 0).unwrap();
        assert_eq!(result, 0x0102030405060708);
    }

    #[test]
    fn read_be_f64() {
        let data = 37.386_f64.to_be_bytes();
        let result = read_be_at::<f64>(&data, &mut 0).unwrap();
        assert_eq!(result, 37.386);
    }

    #[test]
    fn read_be_at_advances() {
        let mut offset = 2;
        let result = read_be_at::<u16>(&TEST_BUFFER, &mut offset).unwrap();
        assert_eq!(result, 0x0304);
        assert_eq!(offset, 4);
    }

    #[test]
    fn read_be_out_of_bounds() {
        let mut offset = 6;
        assert!(matches!(
            read_be_at::<u32>(&TEST_BUFFER, &mut offset),
            Err(OutOfBounds)
        ));
        assert_eq!(offset, 6);

        let mut offset = usize::MAX;
        assert!(read_be_at::<u8>(&TEST_BUFFER, &mut offset).is_err());
    }

    #[test]
    fn read_var_widths() {
        let mut offset = 0;
        assert_eq!(read_be_at_var(&TEST_BUFFER, &mut offset, 0).unwrap(), 0);
        assert_eq!(offset, 0);

        assert_eq!(read_be_at_var(&TEST_BUFFER, &mut offset, 3).unwrap(), 0x010203);
        assert_eq!(offset, 3);

        assert!(read_be_at_var(&TEST_BUFFER, &mut offset, 6).is_err());
        assert!(read_be_at_var(&[0; 20], &mut 0, 17).is_err());
    }

    #[test]
    fn write_be_sequence() {
        let mut data = [0u8; 7];
        let mut offset = 0;

        write_be_at(&mut data, &mut offset, 0x0102_u16).unwrap();
        write_be_at(&mut data, &mut offset, 0x0304_0506_u32).unwrap();
        write_be_at(&mut data, &mut offset, 0x07_u8).unwrap();

        assert_eq!(data, [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);
        assert_eq!(offset, 7);
        assert!(write_be_at(&mut data, &mut offset, 0_u8).is_err());
    }

    #[test]
    fn write_var_width() {
        let mut data = [0u8; 4];
        let mut offset = 1;

        write_be_at_var(&mut data, &mut offset, 0xABCDEF, 3).unwrap();
        assert_eq!(data, [0x00, 0xAB, 0xCD, 0xEF]);
        assert_eq!(offset, 4);

        let mut offset = 0;
        assert!(write_be_at_var(&mut data, &mut offset, 0x1_0000, 2).is_err());
    }

    #[test]
    fn widths() {
        assert_eq!(be_width(0), 0);
        assert_eq!(be_width(1), 1);
        assert_eq!(be_width(0xFF), 1);
        assert_eq!(be_width(0x100), 2);
        assert_eq!(be_width(94043), 3);
        assert_eq!(be_width(0xab54a98ceb1f0ad2), 8);
        assert_eq!(be_width(u128::MAX), 16);
    }
}
