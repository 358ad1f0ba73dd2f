//! Reading MMDB databases.
//!
//! [`Reader`] loads a database from disk (memory-mapped) or from an owned buffer, validates
//! the metadata and the section boundaries, and answers address lookups by walking the search
//! tree and decoding the record it lands on.
//!
//! # Architecture
//!
//! Loading happens in three steps:
//! - Find the last metadata marker within the final [`METADATA_MAX_SIZE`] bytes
//! - Decode the metadata map following it
//! - Derive the tree size from `node_count` and `record_size` and check it fits before the
//!   marker
//!
//! Lookups never allocate beyond the decoded record and return errors instead of panicking on
//! corrupt trees or data sections.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mmdbforge::Reader;
//!
//! let reader = Reader::open("testdb.mmdb")?;
//! let city = reader.get_string("1.2.3.4".parse().unwrap(), "test_map.test_str1")?;
//! println!("{} ({})", city, reader.metadata().database_type);
//! # Ok::<(), mmdbforge::Error>(())
//! ```

use std::{net::IpAddr, path::Path};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

use crate::{
    file::{memory::Memory, physical::Physical, Backend},
    format::{
        decoder::Decoder, metadata::Metadata, value::DataValue, BINARY_FORMAT_MAJOR_VERSION,
        DATA_SECTION_SEPARATOR_SIZE, METADATA_MAX_SIZE, METADATA_START_MARKER,
    },
    tree::record::RecordSize,
    writer::IpVersion,
    Error, Result,
};

/// A loaded database.
pub struct Reader {
    backend: Box<dyn Backend>,
    metadata: Metadata,
    ip_version: IpVersion,
    record_size: RecordSize,
    node_count: u32,
    tree_size: usize,
    data_start: usize,
    data_end: usize,
    /// Node reached after 96 zero bits, where IPv4 lookups start in IPv6 trees
    ipv4_start: u32,
    /// Bits walked to reach `ipv4_start`; below 96 when a record covers all of `::/96`
    ipv4_start_depth: u8,
}

impl Reader {
    /// Map the database at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened and
    /// [`crate::Error::Malformed`] if it is not a valid database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_backend(Box::new(Physical::new(path)?))
    }

    /// Load a database from an owned buffer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `data` is not a valid database.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_backend(Box::new(Memory::new(data)))
    }

    fn from_backend(backend: Box<dyn Backend>) -> Result<Self> {
        let data = backend.data();
        let search_start = data.len().saturating_sub(METADATA_MAX_SIZE);
        let Some(marker) = data[search_start..]
            .windows(METADATA_START_MARKER.len())
            .rposition(|window| window == METADATA_START_MARKER)
            .map(|position| search_start + position)
        else {
            return Err(malformed_error!("Metadata marker not found"));
        };

        let metadata = Metadata::from_bytes(&data[marker + METADATA_START_MARKER.len()..])?;
        if metadata.binary_format_major_version != BINARY_FORMAT_MAJOR_VERSION {
            return Err(malformed_error!(
                "Unsupported binary format version {}.{}",
                metadata.binary_format_major_version,
                metadata.binary_format_minor_version
            ));
        }

        let record_size = RecordSize::from_bits(metadata.record_size)
            .map_err(|_| malformed_error!("Unsupported record size {}", metadata.record_size))?;
        let ip_version = IpVersion::from_number(metadata.ip_version)
            .map_err(|_| malformed_error!("Unsupported IP version {}", metadata.ip_version))?;

        let node_count = metadata.node_count;
        let tree_size = (node_count as usize)
            .checked_mul(record_size.node_bytes())
            .ok_or_else(|| malformed_error!("Search tree of {} nodes is too large", node_count))?;
        let data_start = tree_size + DATA_SECTION_SEPARATOR_SIZE;
        if data_start > marker {
            return Err(malformed_error!(
                "Search tree of {} bytes does not fit before the metadata at {}",
                tree_size,
                marker
            ));
        }
        if data[tree_size..data_start].iter().any(|&byte| byte != 0) {
            return Err(malformed_error!("Data section separator is not zeroed"));
        }

        let mut reader = Reader {
            backend,
            metadata,
            ip_version,
            record_size,
            node_count,
            tree_size,
            data_start,
            data_end: marker,
            ipv4_start: 0,
            ipv4_start_depth: 0,
        };

        if ip_version == IpVersion::V6 {
            let mut node = 0_u32;
            let mut depth = 0_u8;
            while depth < 96 && node < node_count {
                node = reader.read_node(node)?.0;
                depth += 1;
            }
            reader.ipv4_start = node;
            reader.ipv4_start_depth = depth;
        }

        log::debug!(
            "Loaded {} database: {} nodes, {}-bit records, data section {} bytes",
            reader.metadata.database_type,
            node_count,
            record_size.bits(),
            reader.data_end - reader.data_start
        );

        Ok(reader)
    }

    /// The decoded metadata map.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Size of the database in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    /// True if the backing buffer is empty (never the case for a loaded database).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }

    /// Find the record for `address`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidNetwork`] for an IPv6 address in an IPv4 database and
    /// [`crate::Error::Malformed`] if the tree or data section is corrupt.
    pub fn lookup(&self, address: IpAddr) -> Result<Option<DataValue>> {
        Ok(self.lookup_prefix(address)?.map(|(value, _)| value))
    }

    /// Find the record for `address` along with the network holding it.
    ///
    /// IPv4 addresses in IPv6 databases get an IPv4 network, unless the record spans more than
    /// `::/96`; then the IPv6 network is returned.
    ///
    /// # Errors
    /// Same as [`Reader::lookup`].
    pub fn lookup_prefix(&self, address: IpAddr) -> Result<Option<(DataValue, IpNet)>> {
        let (key, bits, start) = match (self.ip_version, address) {
            (IpVersion::V4, IpAddr::V4(v4)) => (u128::from(u32::from(v4)), 32_u8, 0),
            (IpVersion::V6, IpAddr::V4(v4)) => (u128::from(u32::from(v4)), 32_u8, self.ipv4_start),
            (IpVersion::V6, IpAddr::V6(v6)) => (u128::from(v6), 128_u8, 0),
            (IpVersion::V4, IpAddr::V6(v6)) => {
                return Err(Error::InvalidNetwork(format!(
                    "cannot look up IPv6 address {v6} in an IPv4 database"
                )))
            }
        };

        let mut node = start;
        let mut depth = 0_u8;
        while depth < bits && node < self.node_count {
            let (left, right) = self.read_node(node)?;
            node = if (key >> (bits - 1 - depth)) & 1 == 1 {
                right
            } else {
                left
            };
            depth += 1;
        }

        if node == self.node_count {
            return Ok(None);
        }
        if node < self.node_count {
            return Err(malformed_error!(
                "Search tree deeper than {} bits at node {}",
                bits,
                node
            ));
        }

        let network = match address {
            IpAddr::V4(v4) if self.ip_version == IpVersion::V6 && self.ipv4_start_depth < 96 => {
                Ipv6Net::new(v4.to_ipv6_compatible(), self.ipv4_start_depth).map(IpNet::V6)
            }
            IpAddr::V4(v4) => Ipv4Net::new(v4, depth).map(IpNet::V4),
            IpAddr::V6(v6) => Ipv6Net::new(v6, depth).map(IpNet::V6),
        }
        .map_err(|e| malformed_error!("Prefix of {} bits for {}: {}", depth, address, e))?;

        Ok(Some((self.resolve(node)?, network.trunc())))
    }

    /// Value at the dot-separated `path` in the record for `address`.
    ///
    /// An empty path returns the whole record.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotFound`] if there is no record or nothing at `path`, plus the
    /// errors of [`Reader::lookup`].
    pub fn get(&self, address: IpAddr, path: &str) -> Result<DataValue> {
        let Some(record) = self.lookup(address)? else {
            return Err(Error::NotFound(format!("no record for {address}")));
        };
        record
            .get_path(path)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("no value at '{path}' for {address}")))
    }

    /// String at `path` in the record for `address`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeMismatch`] if the value is not a string, plus the errors of
    /// [`Reader::get`].
    pub fn get_string(&self, address: IpAddr, path: &str) -> Result<String> {
        match self.get(address, path)? {
            DataValue::String(text) => Ok(text),
            other => Err(type_mismatch("utf8_string", &other)),
        }
    }

    /// Unsigned 32-bit integer at `path` in the record for `address`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeMismatch`] if the value is not a `uint32`, plus the errors
    /// of [`Reader::get`].
    pub fn get_u32(&self, address: IpAddr, path: &str) -> Result<u32> {
        match self.get(address, path)? {
            DataValue::Uint32(number) => Ok(number),
            other => Err(type_mismatch("uint32", &other)),
        }
    }

    /// Double at `path` in the record for `address`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeMismatch`] if the value is not a `double`, plus the errors
    /// of [`Reader::get`].
    pub fn get_f64(&self, address: IpAddr, path: &str) -> Result<f64> {
        match self.get(address, path)? {
            DataValue::Double(number) => Ok(number),
            other => Err(type_mismatch("double", &other)),
        }
    }

    fn read_node(&self, node: u32) -> Result<(u32, u32)> {
        let tree = self.backend.data_slice(0, self.tree_size)?;
        self.record_size.read_node(tree, node)
    }

    fn resolve(&self, record: u32) -> Result<DataValue> {
        let offset = (record - self.node_count) as usize;
        let Some(offset) = offset.checked_sub(DATA_SECTION_SEPARATOR_SIZE) else {
            return Err(malformed_error!(
                "Record {} points into the data section separator",
                record
            ));
        };

        let data = self
            .backend
            .data_slice(self.data_start, self.data_end - self.data_start)?;
        if offset >= data.len() {
            return Err(malformed_error!(
                "Record {} points beyond the data section",
                record
            ));
        }

        let (value, _) = Decoder::new(data).decode_at(offset)?;
        Ok(value)
    }
}

fn type_mismatch(expected: &'static str, found: &DataValue) -> Error {
    Error::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}
