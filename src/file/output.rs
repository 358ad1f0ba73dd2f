//! Memory-mapped output file for writing finished databases.
//!
//! [`Output`] creates the target file at its final size, maps it writable and lets the writer
//! copy the serialized database into place. If the output is dropped before
//! [`Output::finalize`] succeeds, the partially written file is removed so a failed run never
//! leaves a truncated database behind.
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use mmdbforge::file::output::Output;
//!
//! let mut output = Output::create("testdb.mmdb", 4096)?;
//! output.write_at(0, &tree_bytes)?;
//! output.finalize()?;
//! # Ok::<(), mmdbforge::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! [`Output`] is meant to be owned by the single thread producing the file.

use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};

use crate::{Error, Result};

/// A memory-mapped output file that is removed unless finalized.
pub struct Output {
    /// The memory mapping of the target file
    mmap: MmapMut,

    /// The target path
    target_path: PathBuf,

    /// Whether the file has been finalized
    finalized: bool,
}

impl Output {
    /// Creates the file at `target_path` with `size` bytes and maps it into memory.
    ///
    /// An existing file at the path is truncated.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be created and
    /// [`crate::Error::WriteMmapFailed`] if it cannot be sized or mapped.
    pub fn create<P: AsRef<Path>>(target_path: P, size: u64) -> Result<Self> {
        let target_path = target_path.as_ref().to_path_buf();

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&target_path)?;

        if let Err(e) = file.set_len(size) {
            let _ = std::fs::remove_file(&target_path);
            return Err(Error::WriteMmapFailed {
                message: format!("Failed to set file size: {e}"),
            });
        }

        let mmap = match unsafe { MmapOptions::new().map_mut(&file) } {
            Ok(mmap) => mmap,
            Err(e) => {
                let _ = std::fs::remove_file(&target_path);
                return Err(Error::WriteMmapFailed {
                    message: format!("Failed to create memory mapping: {e}"),
                });
            }
        };

        Ok(Self {
            mmap,
            target_path,
            finalized: false,
        })
    }

    /// Copy `data` into the file at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteMmapFailed`] if the write would exceed the file size.
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let start = usize::try_from(offset).map_err(|_| Error::WriteMmapFailed {
            message: format!("Offset {offset} does not fit in memory"),
        })?;
        let end = start.checked_add(data.len()).unwrap_or(usize::MAX);

        if end > self.mmap.len() {
            return Err(Error::WriteMmapFailed {
                message: format!(
                    "Write would exceed file size: offset={}, len={}, file_size={}",
                    offset,
                    data.len(),
                    self.mmap.len()
                ),
            });
        }

        self.mmap[start..end].copy_from_slice(data);
        Ok(())
    }

    /// Size of the mapped file in bytes.
    pub fn size(&self) -> u64 {
        self.mmap.len() as u64
    }

    /// Flush the mapping and keep the file.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteFinalizationFailed`] if the flush fails; the file is then
    /// removed when the output is dropped.
    pub fn finalize(mut self) -> Result<()> {
        self.mmap
            .flush()
            .map_err(|e| Error::WriteFinalizationFailed {
                message: format!("Failed to flush memory mapping: {e}"),
            })?;

        self.finalized = true;
        Ok(())
    }

    /// The path the output is written to.
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        if !self.finalized {
            let _ = std::fs::remove_file(&self.target_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_mmap_file_creation() {
        let temp_dir = tempdir().unwrap();
        let target_path = temp_dir.path().join("test.mmdb");

        let output = Output::create(&target_path, 1024).unwrap();
        assert_eq!(output.size(), 1024);
        assert!(!output.finalized);
        assert_eq!(output.target_path(), target_path.as_path());
    }

    #[test]
    fn test_write_operations() {
        let temp_dir = tempdir().unwrap();
        let target_path = temp_dir.path().join("test.mmdb");

        let mut output = Output::create(&target_path, 64).unwrap();
        output.write_at(0, &[0xAB, 0xCD, 0xEF]).unwrap();
        output.write_at(3, b"MaxMind.com").unwrap();
        output.finalize().unwrap();

        let data = std::fs::read(&target_path).unwrap();
        assert_eq!(data.len(), 64);
        assert_eq!(&data[0..3], &[0xAB, 0xCD, 0xEF]);
        assert_eq!(&data[3..14], b"MaxMind.com");
    }

    #[test]
    fn test_finalization() {
        let temp_dir = tempdir().unwrap();
        let target_path = temp_dir.path().join("test.mmdb");

        {
            let mut output = Output::create(&target_path, 12).unwrap();
            output.write_at(0, b"Test content").unwrap();
            output.finalize().unwrap();
        }

        assert_eq!(std::fs::read(&target_path).unwrap(), b"Test content");
    }

    #[test]
    fn test_unfinalized_file_is_removed() {
        let temp_dir = tempdir().unwrap();
        let target_path = temp_dir.path().join("partial.mmdb");

        {
            let mut output = Output::create(&target_path, 16).unwrap();
            output.write_at(0, b"partial").unwrap();
        }

        assert!(!target_path.exists());
    }

    #[test]
    fn test_bounds_checking() {
        let temp_dir = tempdir().unwrap();
        let target_path = temp_dir.path().join("test.mmdb");

        let mut output = Output::create(&target_path, 10).unwrap();

        assert!(output.write_at(8, b"too long").is_err());
        assert!(output.write_at(u64::MAX, b"x").is_err());
    }

    #[test]
    fn test_create_in_missing_directory() {
        let temp_dir = tempdir().unwrap();
        let target_path = temp_dir.path().join("missing").join("test.mmdb");

        assert!(matches!(
            Output::create(&target_path, 10),
            Err(Error::FileError(_))
        ));
    }
}
