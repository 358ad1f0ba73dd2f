use std::{net::IpAddr, path::Path};

use anyhow::Context;
use mmdbforge::Reader;
use serde::Serialize;
use serde_json::Value;

use crate::{
    app::GlobalOptions,
    commands::common::{flatten, load_database, parse_ip, to_json},
    output::{print_output, TabWriter},
};

#[derive(Debug, Serialize)]
pub struct LookupResult {
    pub ip: String,
    pub network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub value: Value,
    #[serde(skip)]
    pub rows: Vec<super::common::FieldRow>,
}

/// Look up `address` and select `field` from its record.
fn lookup(reader: &Reader, address: IpAddr, field: Option<&str>) -> anyhow::Result<LookupResult> {
    let (record, network) = reader
        .lookup_prefix(address)
        .with_context(|| format!("lookup of {address} failed"))?
        .with_context(|| format!("no record for {address}"))?;

    let selected = field.unwrap_or("");
    let value = record
        .get_path(selected)
        .with_context(|| format!("no value at '{selected}' for {address}"))?;

    Ok(LookupResult {
        ip: address.to_string(),
        network: network.to_string(),
        path: field.map(str::to_string),
        value: to_json(value),
        rows: flatten(selected, value),
    })
}

pub fn run(path: &Path, ip: &str, field: Option<&str>, opts: &GlobalOptions) -> anyhow::Result<()> {
    let reader = load_database(path)?;
    let result = lookup(&reader, parse_ip(ip)?, field)?;

    print_output(&result, opts, |result| {
        println!("Network: {}", result.network);
        println!();
        let mut tw = TabWriter::new(&["Path", "Type", "Value"]);
        for row in &result.rows {
            tw.row(vec![row.path.clone(), row.r#type.to_string(), row.value.clone()]);
        }
        tw.print();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmdbforge::{fixture, Writer};
    use serde_json::json;

    fn fixture_reader() -> Reader {
        let mut writer = Writer::new(fixture::options()).unwrap();
        fixture::populate(&mut writer, fixture::records());
        Reader::from_bytes(writer.to_bytes().unwrap()).unwrap()
    }

    #[test]
    fn lookup_whole_record() {
        let reader = fixture_reader();
        let result = lookup(&reader, "1.2.3.4".parse().unwrap(), None).unwrap();

        assert_eq!(result.network, "1.2.3.4/32");
        assert_eq!(result.value["test_uint64"], json!("1234567890"));
        assert_eq!(result.rows.len(), 13);
        assert_eq!(result.rows[0].path, "test_array.0");
    }

    #[test]
    fn lookup_single_field() {
        let reader = fixture_reader();
        let result = lookup(
            &reader,
            "1.2.3.5".parse().unwrap(),
            Some("test_map.test_str1"),
        )
        .unwrap();

        assert_eq!(result.value, json!("Missing values"));
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].path, "test_map.test_str1");
    }

    #[test]
    fn lookup_misses_are_errors() {
        let reader = fixture_reader();
        assert!(lookup(&reader, "1.2.3.6".parse().unwrap(), None).is_err());
        assert!(lookup(&reader, "1.2.3.5".parse().unwrap(), Some("test_uint32")).is_err());
        assert!(lookup(&reader, "::1".parse().unwrap(), None).is_err());
    }
}
