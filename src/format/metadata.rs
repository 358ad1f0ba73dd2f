//! The metadata map stored after the data section.
//!
//! Readers locate the map through [`crate::format::METADATA_START_MARKER`] and need it before
//! anything else: it carries the node count and record size required to walk the search tree.

use std::collections::BTreeMap;

use crate::{
    format::{
        decoder::Decoder, encoder::encode_plain, value::DataValue, BINARY_FORMAT_MAJOR_VERSION,
        BINARY_FORMAT_MINOR_VERSION,
    },
    Result,
};

/// Database metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Major format version, always 2
    pub binary_format_major_version: u16,
    /// Minor format version
    pub binary_format_minor_version: u16,
    /// Build time as seconds since the Unix epoch
    pub build_epoch: u64,
    /// Free-form database type, e.g. `GeoIP2-City`
    pub database_type: String,
    /// Descriptions keyed by language code
    pub description: BTreeMap<String, String>,
    /// 4 or 6
    pub ip_version: u16,
    /// Locale codes the records may carry
    pub languages: Vec<String>,
    /// Number of nodes in the search tree
    pub node_count: u32,
    /// Bits per record: 24, 28 or 32
    pub record_size: u16,
}

impl Metadata {
    /// Build metadata for a freshly written database.
    #[must_use]
    pub fn new(
        database_type: &str,
        description: &BTreeMap<String, String>,
        languages: &[String],
        ip_version: u16,
        record_size: u16,
        node_count: u32,
        build_epoch: u64,
    ) -> Self {
        Metadata {
            binary_format_major_version: BINARY_FORMAT_MAJOR_VERSION,
            binary_format_minor_version: BINARY_FORMAT_MINOR_VERSION,
            build_epoch,
            database_type: database_type.to_string(),
            description: description.clone(),
            ip_version,
            languages: languages.to_vec(),
            node_count,
            record_size,
        }
    }

    /// The metadata as a map value.
    #[must_use]
    pub fn to_value(&self) -> DataValue {
        let description = self
            .description
            .iter()
            .map(|(language, text)| (language.clone(), DataValue::from(text.as_str())))
            .collect::<BTreeMap<_, _>>();
        let languages = self
            .languages
            .iter()
            .map(|language| DataValue::from(language.as_str()))
            .collect::<Vec<_>>();

        DataValue::map()
            .entry("binary_format_major_version", self.binary_format_major_version)
            .entry("binary_format_minor_version", self.binary_format_minor_version)
            .entry("build_epoch", self.build_epoch)
            .entry("database_type", self.database_type.as_str())
            .entry("description", description)
            .entry("ip_version", self.ip_version)
            .entry("languages", languages)
            .entry("node_count", self.node_count)
            .entry("record_size", self.record_size)
            .build()
    }

    /// Serialize the metadata map (without pointers).
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueTooLarge`] for oversized descriptions.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        encode_plain(&self.to_value(), &mut out)?;
        Ok(out)
    }

    /// Decode the metadata map starting at the beginning of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if required keys are missing or have the wrong type.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let (value, _) = Decoder::new(data).decode_at(0)?;
        Self::from_value(&value)
    }

    /// Interpret a decoded metadata map.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if required keys are missing or have the wrong type.
    pub fn from_value(value: &DataValue) -> Result<Self> {
        let Some(map) = value.as_map() else {
            return Err(malformed_error!(
                "Metadata is a {}, expected a map",
                value.type_name()
            ));
        };

        let description = match map.get("description") {
            None => BTreeMap::new(),
            Some(DataValue::Map(entries)) => entries
                .iter()
                .map(|(language, text)| match text {
                    DataValue::String(text) => Ok((language.clone(), text.clone())),
                    other => Err(malformed_error!(
                        "Metadata description '{}' is a {}",
                        language,
                        other.type_name()
                    )),
                })
                .collect::<Result<_>>()?,
            Some(other) => {
                return Err(malformed_error!(
                    "Metadata description is a {}",
                    other.type_name()
                ))
            }
        };

        let languages = match map.get("languages") {
            None => Vec::new(),
            Some(DataValue::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| malformed_error!("Metadata language is a {}", item.type_name()))
                })
                .collect::<Result<_>>()?,
            Some(other) => {
                return Err(malformed_error!(
                    "Metadata languages is a {}",
                    other.type_name()
                ))
            }
        };

        let database_type = match map.get("database_type") {
            Some(DataValue::String(text)) => text.clone(),
            _ => return Err(malformed_error!("Metadata database_type is missing")),
        };

        Ok(Metadata {
            binary_format_major_version: unsigned_field(map, "binary_format_major_version")?,
            binary_format_minor_version: unsigned_field(map, "binary_format_minor_version")?,
            build_epoch: unsigned_field(map, "build_epoch")?,
            database_type,
            description,
            ip_version: unsigned_field(map, "ip_version")?,
            languages,
            node_count: unsigned_field(map, "node_count")?,
            record_size: unsigned_field(map, "record_size")?,
        })
    }
}

fn unsigned_field<T: TryFrom<u128>>(map: &BTreeMap<String, DataValue>, key: &str) -> Result<T> {
    let Some(value) = map.get(key) else {
        return Err(malformed_error!("Metadata {} is missing", key));
    };
    let Some(number) = value.as_unsigned() else {
        return Err(malformed_error!(
            "Metadata {} is a {}, expected an unsigned integer",
            key,
            value.type_name()
        ));
    };
    T::try_from(number).map_err(|_| malformed_error!("Metadata {} value {} is out of range", key, number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn sample() -> Metadata {
        let description = BTreeMap::from([
            ("en".to_string(), "Test database".to_string()),
            ("es".to_string(), "Base de datos de prueba".to_string()),
        ]);
        Metadata::new("My-IP-Data", &description, &[], 4, 24, 42, 1_704_067_200)
    }

    #[test]
    fn round_trip() {
        let metadata = sample();
        let bytes = metadata.to_bytes().unwrap();
        assert_eq!(Metadata::from_bytes(&bytes).unwrap(), metadata);
        assert_eq!(metadata.binary_format_major_version, 2);
    }

    #[test]
    fn value_field_types() {
        let value = sample().to_value();
        assert_eq!(value.get_path("node_count"), Some(&DataValue::Uint32(42)));
        assert_eq!(value.get_path("record_size"), Some(&DataValue::Uint16(24)));
        assert_eq!(value.get_path("ip_version"), Some(&DataValue::Uint16(4)));
        assert_eq!(
            value.get_path("build_epoch"),
            Some(&DataValue::Uint64(1_704_067_200))
        );
        assert_eq!(
            value.get_path("description.es").and_then(DataValue::as_str),
            Some("Base de datos de prueba")
        );
        assert_eq!(value.get_path("languages"), Some(&DataValue::Array(vec![])));
    }

    #[test]
    fn accepts_other_unsigned_widths() {
        let mut value = sample().to_value();
        if let DataValue::Map(map) = &mut value {
            map.insert("node_count".to_string(), DataValue::Uint64(42));
            map.insert("record_size".to_string(), DataValue::Uint32(24));
        }
        assert_eq!(Metadata::from_value(&value).unwrap(), sample());
    }

    #[test]
    fn rejects_missing_or_invalid_fields() {
        let mut value = sample().to_value();
        if let DataValue::Map(map) = &mut value {
            map.remove("node_count");
        }
        assert!(matches!(
            Metadata::from_value(&value),
            Err(Error::Malformed { .. })
        ));

        let mut value = sample().to_value();
        if let DataValue::Map(map) = &mut value {
            map.insert("record_size".to_string(), DataValue::Uint32(1 << 20));
        }
        assert!(Metadata::from_value(&value).is_err());

        assert!(Metadata::from_value(&DataValue::from("metadata")).is_err());
    }
}
