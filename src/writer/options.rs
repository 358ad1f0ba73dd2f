//! # Writer Options
//!
//! Provides a fluent API for describing the database a [`crate::Writer`] produces: its type
//! string, localized descriptions, the languages its records carry, the IP version of the
//! search tree and the record size used to pack tree nodes.
//!
//! ## Usage
//!
//! ```rust
//! use mmdbforge::Options;
//!
//! let options = Options::new("My-IP-Data")
//!     .description("en", "Test database")
//!     .description("es", "Base de datos de prueba")
//!     .ip_version(4)
//!     .record_size(24);
//! assert_eq!(options.description.len(), 2);
//! ```
//!
//! ## Validation
//!
//! Options are plain data until they reach [`crate::Writer::new`], which checks them:
//! - **Database type**: must not be empty
//! - **IP version**: 4 or 6
//! - **Record size**: 24, 28 or 32 bits

use std::collections::BTreeMap;

use crate::{tree::record::RecordSize, Error, Result};

/// Address family of the search tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    /// 32-bit keys
    V4,
    /// 128-bit keys, IPv4 networks live under `::/96`
    V6,
}

impl IpVersion {
    /// Resolve the numeric IP version stored in metadata.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConfig`] for anything but 4 or 6.
    pub fn from_number(version: u16) -> Result<Self> {
        match version {
            4 => Ok(IpVersion::V4),
            6 => Ok(IpVersion::V6),
            other => Err(Error::InvalidConfig(format!(
                "IP version {other} is not 4 or 6"
            ))),
        }
    }

    /// The number written to metadata.
    #[must_use]
    pub fn number(self) -> u16 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }

    /// Key width of the search tree in bits.
    #[must_use]
    pub fn depth(self) -> u8 {
        match self {
            IpVersion::V4 => 32,
            IpVersion::V6 => 128,
        }
    }
}

/// Configuration of a database under construction.
///
/// # Examples
///
/// ```rust
/// use mmdbforge::{Options, Writer};
///
/// let writer = Writer::new(Options::new("My-IP-Data").ip_version(4))?;
/// assert!(writer.is_empty());
/// # Ok::<(), mmdbforge::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Free-form database type, written to metadata as `database_type`
    pub database_type: String,
    /// Descriptions keyed by language code
    pub description: BTreeMap<String, String>,
    /// Locale codes the records may carry
    pub languages: Vec<String>,
    /// 4 or 6
    pub ip_version: u16,
    /// Bits per record: 24, 28 or 32
    pub record_size: u16,
    /// Build time in seconds since the Unix epoch; the current time when unset
    pub build_epoch: Option<u64>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            database_type: String::new(),
            description: BTreeMap::new(),
            languages: Vec::new(),
            ip_version: 6,
            record_size: 28,
            build_epoch: None,
        }
    }
}

impl Options {
    /// Options for a database of the given type, IPv6 with 28-bit records.
    #[must_use]
    pub fn new(database_type: impl Into<String>) -> Self {
        Options {
            database_type: database_type.into(),
            ..Self::default()
        }
    }

    /// Add or replace the description for `language`.
    #[must_use]
    pub fn description(mut self, language: impl Into<String>, text: impl Into<String>) -> Self {
        self.description.insert(language.into(), text.into());
        self
    }

    /// Declare a locale code the records use.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.languages.push(language.into());
        self
    }

    /// Set the IP version, 4 or 6.
    #[must_use]
    pub fn ip_version(mut self, version: u16) -> Self {
        self.ip_version = version;
        self
    }

    /// Set the record size in bits, 24, 28 or 32.
    #[must_use]
    pub fn record_size(mut self, bits: u16) -> Self {
        self.record_size = bits;
        self
    }

    /// Pin the build timestamp so repeated builds produce identical files.
    #[must_use]
    pub fn build_epoch(mut self, epoch: u64) -> Self {
        self.build_epoch = Some(epoch);
        self
    }

    /// Check the options and resolve the typed IP version and record size.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConfig`] if any option is out of range.
    pub fn validate(&self) -> Result<(IpVersion, RecordSize)> {
        if self.database_type.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "database type must not be empty".to_string(),
            ));
        }

        let ip_version = IpVersion::from_number(self.ip_version)?;
        let record_size = RecordSize::from_bits(self.record_size)?;
        Ok((ip_version, record_size))
    }
}
