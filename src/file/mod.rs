//! Byte-level file access.
//!
//! This module holds everything that touches raw bytes or the filesystem, so the format and
//! tree code above it only deals with offsets and slices.
//!
//! # Key Components
//!
//! - [`crate::file::Backend`] - Trait for read-only data sources (mapped files, memory buffers)
//! - [`crate::file::physical::Physical`] - Memory-mapped file backend for disk access
//! - [`crate::file::memory::Memory`] - Owned in-memory buffer backend
//! - [`crate::file::output::Output`] - Memory-mapped output file with cleanup on failure
//! - [`crate::file::io`] - Bounds-checked big-endian read and write helpers
//!
//! # Examples
//!
//! ```rust,ignore
//! use mmdbforge::file::{memory::Memory, Backend};
//!
//! let backend = Memory::new(vec![0xAB, 0xCD, 0xEF]);
//! assert_eq!(backend.data_slice(1, 2)?, &[0xCD, 0xEF]);
//! # Ok::<(), mmdbforge::Error>(())
//! ```

pub mod io;
pub mod memory;
pub mod output;
pub mod physical;

use crate::Result;

/// Backend trait for read-only data sources.
///
/// Implementations provide bounds-checked access to an immutable byte buffer. The reader keeps
/// a boxed backend so that databases loaded from disk and databases produced in memory share
/// the same lookup code.
pub trait Backend: Send + Sync {
    /// Returns a slice of `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the data.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the complete data.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data.
    fn len(&self) -> usize;

    /// Returns true if the backend holds no data.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
