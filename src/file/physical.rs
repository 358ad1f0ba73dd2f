//! Physical file backend for memory-mapped I/O.
//!
//! [`Physical`] maps a database file read-only so lookups touch only the pages they need.

use super::Backend;
use crate::{
    Error::{FileError, WriteMmapFailed},
    Result,
};

use memmap2::Mmap;
use std::{fs, path::Path};

/// A [`Backend`] backed by a read-only memory mapping of a file on disk.
#[derive(Debug)]
pub struct Physical {
    data: Mmap,
}

impl Physical {
    /// Open and map the file at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened and
    /// [`crate::Error::WriteMmapFailed`] if it cannot be mapped.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(error) => return Err(FileError(error)),
        };

        // Empty files cannot be mapped on every platform.
        if file.metadata().map_err(FileError)?.len() == 0 {
            return Err(malformed_error!("Database file is empty"));
        }

        let mmap = match unsafe { Mmap::map(&file) } {
            Ok(mmap) => mmap,
            Err(error) => {
                return Err(WriteMmapFailed {
                    message: format!("Failed to map database file: {error}"),
                })
            }
        };

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(out_of_bounds_error!());
        };

        if offset_end > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(&self.data[offset..offset_end])
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
