use std::{net::IpAddr, path::Path};

use anyhow::Context;
use mmdbforge::{DataValue, Reader};
use serde_json::{json, Map, Value};

/// Load a database, memory-mapped.
pub fn load_database(path: &Path) -> anyhow::Result<Reader> {
    Reader::open(path).with_context(|| format!("failed to load database: {}", path.display()))
}

/// Parse an IPv4 or IPv6 address argument.
pub fn parse_ip(text: &str) -> anyhow::Result<IpAddr> {
    text.trim()
        .parse()
        .with_context(|| format!("invalid IP address: {text}"))
}

/// Lowercase hex without prefix or separators.
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// `0x` followed by all 32 hex digits.
pub fn hex_u128(value: u128) -> String {
    format!("0x{value:032x}")
}

/// Convert a record to JSON.
///
/// Bytes become lowercase hex, `uint64` a decimal string and `uint128` a `0x` hex string, so
/// values that JSON numbers cannot carry exactly survive the conversion.
pub fn to_json(value: &DataValue) -> Value {
    match value {
        DataValue::Map(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), to_json(item)))
                .collect::<Map<String, Value>>(),
        ),
        DataValue::Array(items) => Value::Array(items.iter().map(to_json).collect()),
        DataValue::String(text) => json!(text),
        DataValue::Bytes(bytes) => json!(hex(bytes)),
        DataValue::Double(number) => json!(number),
        DataValue::Float(number) => json!(number),
        DataValue::Uint16(number) => json!(number),
        DataValue::Uint32(number) => json!(number),
        DataValue::Int32(number) => json!(number),
        DataValue::Uint64(number) => json!(number.to_string()),
        DataValue::Uint128(number) => json!(hex_u128(*number)),
        DataValue::Bool(flag) => json!(flag),
    }
}

/// One leaf of a flattened record.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FieldRow {
    pub path: String,
    pub r#type: &'static str,
    pub value: String,
}

/// Flatten a record into dot-path rows, maps sorted by key and arrays by index.
///
/// `prefix` is the path of `value` itself. Empty maps and arrays produce a row of their own.
pub fn flatten(prefix: &str, value: &DataValue) -> Vec<FieldRow> {
    let mut rows = Vec::new();
    flatten_into(prefix, value, &mut rows);
    rows
}

fn flatten_into(prefix: &str, value: &DataValue, rows: &mut Vec<FieldRow>) {
    let join = |segment: &str| {
        if prefix.is_empty() {
            segment.to_string()
        } else {
            format!("{prefix}.{segment}")
        }
    };

    match value {
        DataValue::Map(map) if !map.is_empty() => {
            for (key, item) in map {
                flatten_into(&join(key), item, rows);
            }
        }
        DataValue::Array(items) if !items.is_empty() => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(&join(&index.to_string()), item, rows);
            }
        }
        leaf => rows.push(FieldRow {
            path: prefix.to_string(),
            r#type: leaf.type_name(),
            value: display(leaf),
        }),
    }
}

fn display(value: &DataValue) -> String {
    match value {
        DataValue::Map(_) => "{}".to_string(),
        DataValue::Array(_) => "[]".to_string(),
        DataValue::String(text) => text.clone(),
        DataValue::Bytes(bytes) => hex(bytes),
        DataValue::Double(number) => number.to_string(),
        DataValue::Float(number) => number.to_string(),
        DataValue::Uint16(number) => number.to_string(),
        DataValue::Uint32(number) => number.to_string(),
        DataValue::Int32(number) => number.to_string(),
        DataValue::Uint64(number) => number.to_string(),
        DataValue::Uint128(number) => hex_u128(*number),
        DataValue::Bool(flag) => flag.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DataValue {
        DataValue::map()
            .entry("test_bytes", vec![0xAB_u8, 0xCD])
            .entry("test_uint64", 1_234_567_890_u64)
            .entry("test_uint128", 0xab54_a98c_eb1f_0ad2_u128)
            .entry("test_array", vec![DataValue::from("a"), DataValue::from("b")])
            .entry("test_map", DataValue::map().entry("test_str1", "x").build())
            .entry("empty", DataValue::map().build())
            .build()
    }

    #[test]
    fn json_conventions() {
        let value = to_json(&record());
        assert_eq!(value["test_bytes"], json!("abcd"));
        assert_eq!(value["test_uint64"], json!("1234567890"));
        assert_eq!(
            value["test_uint128"],
            json!("0x0000000000000000ab54a98ceb1f0ad2")
        );
        assert_eq!(value["test_array"], json!(["a", "b"]));
        assert_eq!(value["test_map"]["test_str1"], json!("x"));
        assert_eq!(to_json(&DataValue::Uint16(123)), json!(123));
        assert_eq!(to_json(&DataValue::Bool(true)), json!(true));
    }

    #[test]
    fn flatten_paths() {
        let rows = flatten("", &record());
        let paths: Vec<&str> = rows.iter().map(|row| row.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "empty",
                "test_array.0",
                "test_array.1",
                "test_bytes",
                "test_map.test_str1",
                "test_uint128",
                "test_uint64",
            ]
        );
        assert_eq!(rows[3].r#type, "bytes");
        assert_eq!(rows[3].value, "abcd");
        assert_eq!(rows[0].value, "{}");
    }

    #[test]
    fn flatten_scalar_keeps_prefix() {
        let rows = flatten("test_map.test_str1", &DataValue::from("x"));
        assert_eq!(
            rows,
            vec![FieldRow {
                path: "test_map.test_str1".to_string(),
                r#type: "utf8_string",
                value: "x".to_string(),
            }]
        );
    }

    #[test]
    fn parse_ip_accepts_both_families() {
        assert!(parse_ip("1.2.3.4").unwrap().is_ipv4());
        assert!(parse_ip(" 2001:db8::1 ").unwrap().is_ipv6());
        assert!(parse_ip("1.2.3").is_err());
    }
}
