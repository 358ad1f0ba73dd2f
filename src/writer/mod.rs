//! Building MMDB databases.
//!
//! A [`Writer`] collects networks and their records in a [`SearchTree`], then serializes the
//! whole database in one pass:
//!
//! 1. Number the reachable tree nodes breadth-first
//! 2. Encode the referenced records into the data section, deduplicating as it goes
//! 3. Pack the tree with the final data offsets
//! 4. Append the separator, data section, metadata marker and metadata map
//!
//! Output depends only on the options and the sequence of inserts, so identical input with a
//! pinned [`Options::build_epoch`] yields identical bytes.
//!
//! # Examples
//!
//! ```rust
//! use mmdbforge::{DataValue, Options, Writer};
//!
//! let mut writer = Writer::new(
//!     Options::new("My-IP-Data").ip_version(4).record_size(24).build_epoch(0),
//! )?;
//! writer.insert_cidr("1.2.3.0/24", DataValue::map().entry("name", "example").build())?;
//!
//! let mut bytes = Vec::new();
//! let written = writer.write_to(&mut bytes)?;
//! assert_eq!(written as usize, bytes.len());
//! # Ok::<(), mmdbforge::Error>(())
//! ```

pub mod options;

use std::{
    collections::HashMap,
    io::Write,
    net::IpAddr,
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use ipnet::IpNet;

use crate::{
    file::output::Output,
    format::{
        encoder::{encode_plain, DataEncoder},
        metadata::Metadata,
        value::DataValue,
        DATA_SECTION_SEPARATOR_SIZE, MAX_NESTING, METADATA_START_MARKER,
    },
    tree::{record::RecordSize, SearchTree},
    Error, Result,
};

pub use options::{IpVersion, Options};

/// In-memory database under construction.
#[derive(Debug, Clone)]
pub struct Writer {
    options: Options,
    ip_version: IpVersion,
    record_size: RecordSize,
    build_epoch: u64,
    tree: SearchTree,
    /// Distinct records; the tree stores indices into this list
    records: Vec<DataValue>,
    /// Plain serialization of each record to its index
    record_ids: HashMap<Vec<u8>, u32>,
    inserted: usize,
}

impl Writer {
    /// Create a writer after validating `options`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConfig`] for an empty database type, an IP version other
    /// than 4 or 6, or a record size other than 24, 28 or 32.
    pub fn new(options: Options) -> Result<Self> {
        let (ip_version, record_size) = options.validate()?;
        let build_epoch = options.build_epoch.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or_default()
        });

        Ok(Writer {
            ip_version,
            record_size,
            build_epoch,
            tree: SearchTree::new(ip_version.depth()),
            records: Vec::new(),
            record_ids: HashMap::new(),
            inserted: 0,
            options,
        })
    }

    /// The options this writer was created with.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Build timestamp written to metadata.
    #[must_use]
    pub fn build_epoch(&self) -> u64 {
        self.build_epoch
    }

    /// Number of successful inserts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inserted
    }

    /// True if nothing has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inserted == 0
    }

    /// Associate `value` with every address in `network`.
    ///
    /// Host bits below the prefix are ignored. Inserting the same or a covering network again
    /// replaces the earlier data; inserting a network inside an existing one splits it.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidNetwork`] for an IPv6 network in an IPv4 database and
    /// [`crate::Error::InsertFailed`] if the value cannot be serialized or is nested deeper
    /// than [`crate::format::MAX_NESTING`].
    pub fn insert(&mut self, network: IpNet, value: DataValue) -> Result<()> {
        let network = network.trunc();
        let (key, prefix_len) = self.tree_key(&network)?;

        if value.nesting_depth() > MAX_NESTING {
            return Err(Error::InsertFailed {
                network: network.to_string(),
                message: format!("value nested deeper than {MAX_NESTING} levels"),
            });
        }

        let mut plain = Vec::new();
        encode_plain(&value, &mut plain).map_err(|e| Error::InsertFailed {
            network: network.to_string(),
            message: e.to_string(),
        })?;

        let record = match self.record_ids.get(&plain) {
            Some(&id) => id,
            None => {
                let id = u32::try_from(self.records.len()).map_err(|_| Error::InsertFailed {
                    network: network.to_string(),
                    message: "too many distinct records".to_string(),
                })?;
                self.records.push(value);
                self.record_ids.insert(plain, id);
                id
            }
        };

        self.tree.insert(key, prefix_len, record)?;
        self.inserted += 1;
        log::debug!("Inserted {network} as record {record}");
        Ok(())
    }

    /// Parse `cidr` and insert it.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidNetwork`] if `cidr` is not valid CIDR notation, plus the
    /// errors of [`Writer::insert`].
    pub fn insert_cidr(&mut self, cidr: &str, value: DataValue) -> Result<()> {
        let network: IpNet = cidr
            .trim()
            .parse()
            .map_err(|e| Error::InvalidNetwork(format!("'{cidr}': {e}")))?;
        self.insert(network, value)
    }

    /// Find the record stored for `address`, as it would be read back from the file.
    #[must_use]
    pub fn get(&self, address: IpAddr) -> Option<&DataValue> {
        let key = match (self.ip_version, address) {
            (_, IpAddr::V4(v4)) => u128::from(u32::from(v4)),
            (IpVersion::V6, IpAddr::V6(v6)) => u128::from(v6),
            (IpVersion::V4, IpAddr::V6(_)) => return None,
        };
        let record = self.tree.lookup(key)?;
        self.records.get(record as usize)
    }

    /// Serialize the complete database.
    ///
    /// # Errors
    /// Returns [`crate::Error::DatabaseTooLarge`] if node indices or data offsets exceed the
    /// record size.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let layout = self.tree.layout();
        let node_count = u32::try_from(layout.node_count()).map_err(|_| {
            Error::DatabaseTooLarge(format!("{} nodes exceed 32-bit indices", layout.node_count()))
        })?;

        let mut encoder = DataEncoder::new();
        let mut offsets = HashMap::new();
        for record in layout.records() {
            let Some(value) = self.records.get(record as usize) else {
                return Err(malformed_error!("Tree references unknown record {}", record));
            };
            offsets.insert(record, encoder.insert(value)?);
        }

        let tree = layout.to_bytes(self.record_size, |record| {
            offsets
                .get(&record)
                .copied()
                .ok_or_else(|| malformed_error!("Record {} was not encoded", record))
        })?;

        let metadata = Metadata::new(
            &self.options.database_type,
            &self.options.description,
            &self.options.languages,
            self.ip_version.number(),
            self.record_size.bits(),
            node_count,
            self.build_epoch,
        )
        .to_bytes()?;

        log::debug!(
            "Serialized {} nodes ({} bytes), {} records, data section {} bytes",
            node_count,
            tree.len(),
            offsets.len(),
            encoder.len()
        );

        let data = encoder.into_bytes();
        let mut out = Vec::with_capacity(
            tree.len()
                + DATA_SECTION_SEPARATOR_SIZE
                + data.len()
                + METADATA_START_MARKER.len()
                + metadata.len(),
        );
        out.extend_from_slice(&tree);
        out.extend_from_slice(&[0_u8; DATA_SECTION_SEPARATOR_SIZE]);
        out.extend_from_slice(&data);
        out.extend_from_slice(METADATA_START_MARKER);
        out.extend_from_slice(&metadata);
        Ok(out)
    }

    /// Serialize the database into `sink` and return the number of bytes written.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the sink fails, plus the errors of
    /// [`Writer::to_bytes`].
    pub fn write_to<W: Write>(&self, mut sink: W) -> Result<u64> {
        let bytes = self.to_bytes()?;
        sink.write_all(&bytes)?;
        sink.flush()?;
        Ok(bytes.len() as u64)
    }

    /// Serialize the database into a new file at `path`.
    ///
    /// The file is removed again if writing fails part way.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] or [`crate::Error::WriteMmapFailed`] if the file
    /// cannot be created, plus the errors of [`Writer::to_bytes`].
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<u64> {
        let bytes = self.to_bytes()?;
        let size = bytes.len() as u64;

        let mut output = Output::create(path.as_ref(), size)?;
        output.write_at(0, &bytes)?;
        log::info!(
            "Wrote {} ({} bytes)",
            output.target_path().display(),
            output.size()
        );
        output.finalize()?;
        Ok(size)
    }

    fn tree_key(&self, network: &IpNet) -> Result<(u128, u8)> {
        match (self.ip_version, network) {
            (IpVersion::V4, IpNet::V4(net)) => {
                Ok((u128::from(u32::from(net.addr())), net.prefix_len()))
            }
            (IpVersion::V4, IpNet::V6(net)) => Err(Error::InvalidNetwork(format!(
                "{net} is an IPv6 network in an IPv4 database"
            ))),
            (IpVersion::V6, IpNet::V4(net)) => {
                Ok((u128::from(u32::from(net.addr())), net.prefix_len() + 96))
            }
            (IpVersion::V6, IpNet::V6(net)) => Ok((u128::from(net.addr()), net.prefix_len())),
        }
    }
}
