//! Record packing for search tree nodes.
//!
//! A node is two records (left for bit 0, right for bit 1) stored back to back:
//!
//! | record size | node bytes | layout |
//! |-------------|------------|--------|
//! | 24 | 6 | `LLL RRR` |
//! | 28 | 7 | `LLL (L>>24)<<4 \| (R>>24) RRR` |
//! | 32 | 8 | `LLLL RRRR` |

use strum::EnumIter;

use crate::{
    file::io::{read_be_at, read_be_at_var, write_be_at, write_be_at_var},
    Error, Result,
};

/// Supported record sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter)]
pub enum RecordSize {
    /// 24-bit records, 6 bytes per node
    #[default]
    Bits24,
    /// 28-bit records, 7 bytes per node
    Bits28,
    /// 32-bit records, 8 bytes per node
    Bits32,
}

impl RecordSize {
    /// Resolve a record size given in bits.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConfig`] for anything but 24, 28 or 32.
    pub fn from_bits(bits: u16) -> Result<Self> {
        match bits {
            24 => Ok(RecordSize::Bits24),
            28 => Ok(RecordSize::Bits28),
            32 => Ok(RecordSize::Bits32),
            other => Err(Error::InvalidConfig(format!(
                "record size {other} is not one of 24, 28 or 32"
            ))),
        }
    }

    /// Bits per record.
    #[must_use]
    pub fn bits(self) -> u16 {
        match self {
            RecordSize::Bits24 => 24,
            RecordSize::Bits28 => 28,
            RecordSize::Bits32 => 32,
        }
    }

    /// Bytes per node (two records).
    #[must_use]
    pub fn node_bytes(self) -> usize {
        usize::from(self.bits()) / 4
    }

    /// Largest value a record can hold.
    #[must_use]
    pub fn max_value(self) -> u64 {
        (1_u64 << self.bits()) - 1
    }

    /// Write one node at `offset` and advance past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::DatabaseTooLarge`] if a record does not fit and
    /// [`crate::Error::OutOfBounds`] if the buffer is too small.
    pub fn write_node(self, data: &mut [u8], offset: &mut usize, left: u32, right: u32) -> Result<()> {
        for record in [left, right] {
            if u64::from(record) > self.max_value() {
                return Err(Error::DatabaseTooLarge(format!(
                    "record value {record} does not fit in {} bits",
                    self.bits()
                )));
            }
        }

        match self {
            RecordSize::Bits24 => {
                write_be_at_var(data, offset, u128::from(left), 3)?;
                write_be_at_var(data, offset, u128::from(right), 3)
            }
            RecordSize::Bits28 => {
                write_be_at_var(data, offset, u128::from(left & 0x00FF_FFFF), 3)?;
                let middle = (((left >> 24) & 0x0F) << 4) as u8 | ((right >> 24) & 0x0F) as u8;
                write_be_at(data, offset, middle)?;
                write_be_at_var(data, offset, u128::from(right & 0x00FF_FFFF), 3)
            }
            RecordSize::Bits32 => {
                write_be_at(data, offset, left)?;
                write_be_at(data, offset, right)
            }
        }
    }

    /// Read node `node` from a serialized tree.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the node lies outside `tree`.
    pub fn read_node(self, tree: &[u8], node: u32) -> Result<(u32, u32)> {
        let mut offset = (node as usize)
            .checked_mul(self.node_bytes())
            .ok_or(out_of_bounds_error!())?;

        match self {
            RecordSize::Bits24 => {
                let left = read_be_at_var(tree, &mut offset, 3)? as u32;
                let right = read_be_at_var(tree, &mut offset, 3)? as u32;
                Ok((left, right))
            }
            RecordSize::Bits28 => {
                let left_low = read_be_at_var(tree, &mut offset, 3)? as u32;
                let middle: u8 = read_be_at(tree, &mut offset)?;
                let right_low = read_be_at_var(tree, &mut offset, 3)? as u32;
                let left = (u32::from(middle >> 4) << 24) | left_low;
                let right = (u32::from(middle & 0x0F) << 24) | right_low;
                Ok((left, right))
            }
            RecordSize::Bits32 => {
                let left: u32 = read_be_at(tree, &mut offset)?;
                let right: u32 = read_be_at(tree, &mut offset)?;
                Ok((left, right))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn sizes() {
        assert_eq!(RecordSize::Bits24.node_bytes(), 6);
        assert_eq!(RecordSize::Bits28.node_bytes(), 7);
        assert_eq!(RecordSize::Bits32.node_bytes(), 8);
        assert_eq!(RecordSize::Bits28.max_value(), 0x0FFF_FFFF);
        assert_eq!(RecordSize::default(), RecordSize::Bits24);
    }

    #[test]
    fn from_bits() {
        for size in RecordSize::iter() {
            assert_eq!(RecordSize::from_bits(size.bits()).unwrap(), size);
        }
        assert!(matches!(
            RecordSize::from_bits(16),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn layout_24() {
        let mut data = [0u8; 6];
        RecordSize::Bits24
            .write_node(&mut data, &mut 0, 0x010203, 0x0A0B0C)
            .unwrap();
        assert_eq!(data, [0x01, 0x02, 0x03, 0x0A, 0x0B, 0x0C]);
    }

    #[test]
    fn layout_28() {
        let mut data = [0u8; 7];
        RecordSize::Bits28
            .write_node(&mut data, &mut 0, 0x0A10_2030, 0x0B40_5060)
            .unwrap();
        assert_eq!(data, [0x10, 0x20, 0x30, 0xAB, 0x40, 0x50, 0x60]);
        assert_eq!(
            RecordSize::Bits28.read_node(&data, 0).unwrap(),
            (0x0A10_2030, 0x0B40_5060)
        );
    }

    #[test]
    fn layout_32() {
        let mut data = [0u8; 8];
        RecordSize::Bits32
            .write_node(&mut data, &mut 0, 0xDEAD_BEEF, 1)
            .unwrap();
        assert_eq!(data, [0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn round_trip_all_sizes() {
        for size in RecordSize::iter() {
            let max = size.max_value() as u32;
            let mut data = vec![0u8; size.node_bytes() * 2];
            let mut offset = 0;
            size.write_node(&mut data, &mut offset, 1, max).unwrap();
            size.write_node(&mut data, &mut offset, max, 0).unwrap();

            assert_eq!(size.read_node(&data, 0).unwrap(), (1, max));
            assert_eq!(size.read_node(&data, 1).unwrap(), (max, 0));
            assert!(size.read_node(&data, 2).is_err());
        }
    }

    #[test]
    fn rejects_oversized_records() {
        let mut data = [0u8; 6];
        assert!(matches!(
            RecordSize::Bits24.write_node(&mut data, &mut 0, 1 << 24, 0),
            Err(Error::DatabaseTooLarge(_))
        ));
    }
}
