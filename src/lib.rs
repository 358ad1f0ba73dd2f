// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
// - 'file/physical.rs' and 'file/output.rs' use mmap to map files into memory

//! # mmdbforge
//!
//! Build and read MaxMind DB (`.mmdb`) files: the binary format geolocation databases ship in.
//! A database maps IP networks to typed records through a binary search tree over address
//! bits, followed by a deduplicated data section and a metadata map.
//!
//! The crate is primarily a fixture generator. [`fixture::generate`] writes `testdb.mmdb`, a
//! small deterministic database covering every field type, which test suites of lookup code
//! load and inspect. The [`Writer`] and [`Reader`] behind it are general purpose.
//!
//! ## Features
//!
//! - **Writer** - IPv4 and IPv6 trees, 24/28/32-bit records, pointer deduplication
//! - **Reader** - memory-mapped loading, lookups, dot-path access with typed getters
//! - **Deterministic output** - identical inserts and a pinned build epoch give identical bytes
//! - **No panics on bad input** - every read is bounds checked and reported through [`Error`]
//!
//! ## Quick Start
//!
//! ### Writing a database
//!
//! ```rust,no_run
//! use mmdbforge::{DataValue, Options, Writer};
//!
//! let mut writer = Writer::new(
//!     Options::new("My-IP-Data")
//!         .description("en", "Test database")
//!         .ip_version(4)
//!         .record_size(24),
//! )?;
//!
//! writer.insert_cidr(
//!     "1.2.3.4/32",
//!     DataValue::map()
//!         .entry("city", "Springfield")
//!         .entry("population", 30_720_u32)
//!         .build(),
//! )?;
//!
//! writer.write_file("cities.mmdb")?;
//! # Ok::<(), mmdbforge::Error>(())
//! ```
//!
//! ### Reading it back
//!
//! ```rust,no_run
//! use mmdbforge::Reader;
//!
//! let reader = Reader::open("cities.mmdb")?;
//! let address = "1.2.3.4".parse().unwrap();
//! assert_eq!(reader.get_string(address, "city")?, "Springfield");
//! assert_eq!(reader.get_u32(address, "population")?, 30_720);
//! # Ok::<(), mmdbforge::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`format`] - data types, [`DataValue`], the data section encoder and decoder, metadata
//! - [`tree`] - the prefix tree and node packing for each record size
//! - [`writer`] - [`Options`] and [`Writer`]
//! - [`reader`] - [`Reader`]
//! - [`fixture`] - the `testdb.mmdb` fixture
//! - [`Error`] and [`Result`] - error handling
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result):
//!
//! ```rust,no_run
//! use mmdbforge::{Error, Reader};
//!
//! match Reader::open("testdb.mmdb") {
//!     Ok(reader) => println!("{} nodes", reader.metadata().node_count),
//!     Err(Error::Malformed { message, .. }) => println!("Malformed file: {}", message),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust,no_run
/// use mmdbforge::prelude::*;
///
/// let reader = Reader::open("testdb.mmdb")?;
/// let record: Option<DataValue> = reader.lookup("1.2.3.4".parse().unwrap())?;
/// # Ok::<(), Error>(())
/// ```
pub mod prelude;

/// The MaxMind DB binary format.
///
/// # Key Types
///
/// - [`format::DataType`] - field type ids
/// - [`format::value::DataValue`] - typed values
/// - [`format::encoder::DataEncoder`] - data section serialization with deduplication
/// - [`format::decoder::Decoder`] - data section decoding
/// - [`format::metadata::Metadata`] - the metadata map
pub mod format;

/// Search tree construction and node packing.
pub mod tree;

/// Database construction.
pub mod writer;

/// Database loading and lookups.
pub mod reader;

/// The `testdb.mmdb` test fixture.
pub mod fixture;

/// `mmdbforge` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `mmdbforge` Error type
///
/// The main error type for all operations in this crate. See [`Error`] for the variants.
pub use error::Error;

/// Typed value stored in a database record.
pub use format::value::DataValue;

/// Decoded database metadata.
pub use format::metadata::Metadata;

/// Supported record sizes.
pub use tree::record::RecordSize;

/// Database construction.
pub use writer::{IpVersion, Options, Writer};

/// Database loading and lookups.
pub use reader::Reader;
