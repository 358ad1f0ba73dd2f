//! The test database fixture.
//!
//! Builds `testdb.mmdb`, a small IPv4 database with two host records that exercise every
//! field type: a nested map, strings, all unsigned widths, both floating point types, bytes,
//! a boolean and an array. Test suites of lookup code load it and check each field.
//!
//! The contents are fixed, including the build timestamp, so every run produces the same file.
//!
//! Each step reports its failure through the `log` facade. A record that cannot be parsed or
//! inserted is skipped and the remaining records still go in; failing to create the writer
//! or the output file ends the run.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mmdbforge::fixture;
//!
//! let written = fixture::generate(fixture::OUTPUT_FILE)?;
//! println!("{} has now been created ({written} bytes)", fixture::OUTPUT_FILE);
//! # Ok::<(), mmdbforge::Error>(())
//! ```

use std::{fs::File, path::Path};

use ipnet::IpNet;

use crate::{DataValue, Error, Options, Result, Writer};

/// File name the fixture is written to.
pub const OUTPUT_FILE: &str = "testdb.mmdb";

/// Database type in the fixture metadata.
pub const DATABASE_TYPE: &str = "My-IP-Data";

/// Build timestamp in the fixture metadata (2024-01-01T00:00:00Z).
pub const BUILD_EPOCH: u64 = 1_704_067_200;

/// Writer options of the fixture.
#[must_use]
pub fn options() -> Options {
    Options::new(DATABASE_TYPE)
        .description("en", "Test database")
        .description("es", "Base de datos de prueba")
        .ip_version(4)
        .record_size(24)
        .build_epoch(BUILD_EPOCH)
}

/// The fixture records, keyed by CIDR.
#[must_use]
pub fn records() -> Vec<(&'static str, DataValue)> {
    let full = DataValue::map()
        .entry(
            "test_map",
            DataValue::map()
                .entry("test_str1", "DistroDefender")
                .entry("test_str2", "DistroDefender2")
                .build(),
        )
        .entry("test_uint32", 94043_u32)
        .entry("test_double", 37.386_f64)
        .entry("test_float", 122.0838_f32)
        .entry("test_bytes", vec![0xAB_u8, 0xCD])
        .entry("test_uint16", 123_u16)
        .entry("test_uint64", 1_234_567_890_u64)
        .entry("test_uint128", 0xab54_a98c_eb1f_0ad2_u128)
        .entry("test_boolean", true)
        .entry(
            "test_array",
            vec![
                DataValue::from("a"),
                DataValue::from("b"),
                DataValue::from("c"),
            ],
        )
        .build();

    let partial = DataValue::map()
        .entry(
            "test_map",
            DataValue::map().entry("test_str1", "Missing values").build(),
        )
        .build();

    vec![("1.2.3.4/32", full), ("1.2.3.5/32", partial)]
}

/// Outcome of [`populate`].
#[derive(Debug, Default)]
pub struct InsertReport {
    /// Records inserted
    pub inserted: usize,
    /// CIDR and error of every skipped record
    pub failures: Vec<(String, Error)>,
}

impl InsertReport {
    /// True if every record went in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Insert `records` into `writer`, skipping the ones that fail.
pub fn populate<'a, I>(writer: &mut Writer, records: I) -> InsertReport
where
    I: IntoIterator<Item = (&'a str, DataValue)>,
{
    let mut report = InsertReport::default();

    for (cidr, value) in records {
        let network = match cidr.parse::<IpNet>() {
            Ok(network) => network,
            Err(e) => {
                log::error!("Invalid CIDR {cidr}: {e}");
                report.failures.push((
                    cidr.to_string(),
                    Error::InvalidNetwork(format!("'{cidr}': {e}")),
                ));
                continue;
            }
        };

        match writer.insert(network, value) {
            Ok(()) => report.inserted += 1,
            Err(e) => {
                log::error!("Failed to insert data for {cidr}: {e}");
                report.failures.push((cidr.to_string(), e));
            }
        }
    }

    report
}

/// Build the fixture and write it to `path`, returning the number of bytes written.
///
/// # Errors
/// Returns the error of the step that ended the run: writer construction, output file
/// creation or serialization. Skipped records are logged but do not fail the run.
pub fn generate<P: AsRef<Path>>(path: P) -> Result<u64> {
    let path = path.as_ref();

    let mut writer = Writer::new(options()).inspect_err(|e| {
        log::error!("Error creating writer: {e}");
    })?;

    let report = populate(&mut writer, records());
    if !report.is_complete() {
        log::warn!(
            "{} of {} records skipped",
            report.failures.len(),
            report.inserted + report.failures.len()
        );
    }

    let mut out = File::create(path).inspect_err(|e| {
        log::error!("Failed to create output file: {e}");
    })?;

    let written = writer.write_to(&mut out).inspect_err(|e| {
        log::error!("Failed to write MMDB: {e}");
    })?;

    log::info!("Wrote {} ({written} bytes)", path.display());
    Ok(written)
}
