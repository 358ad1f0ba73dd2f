use std::path::Path;

use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::load_database,
    output::{print_output, TabWriter},
};

#[derive(Debug, Serialize)]
pub struct DatabaseInfo {
    pub database_type: String,
    pub binary_format: String,
    pub ip_version: u16,
    pub record_size: u16,
    pub node_count: u32,
    pub build_epoch: u64,
    pub file_size: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub descriptions: Vec<DescriptionInfo>,
}

#[derive(Debug, Serialize)]
pub struct DescriptionInfo {
    pub language: String,
    pub text: String,
}

pub fn run(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let reader = load_database(path)?;
    let metadata = reader.metadata();

    let info = DatabaseInfo {
        database_type: metadata.database_type.clone(),
        binary_format: format!(
            "{}.{}",
            metadata.binary_format_major_version, metadata.binary_format_minor_version
        ),
        ip_version: metadata.ip_version,
        record_size: metadata.record_size,
        node_count: metadata.node_count,
        build_epoch: metadata.build_epoch,
        file_size: reader.len(),
        languages: metadata.languages.clone(),
        descriptions: metadata
            .description
            .iter()
            .map(|(language, text)| DescriptionInfo {
                language: language.clone(),
                text: text.clone(),
            })
            .collect(),
    };

    print_output(&info, opts, |info| {
        println!("Database type:   {}", info.database_type);
        println!("Binary format:   {}", info.binary_format);
        println!("IP version:      {}", info.ip_version);
        println!("Record size:     {} bits", info.record_size);
        println!("Nodes:           {}", info.node_count);
        println!("Build epoch:     {}", info.build_epoch);
        println!("File size:       {} bytes", info.file_size);
        if !info.languages.is_empty() {
            println!("Languages:       {}", info.languages.join(", "));
        }

        if !info.descriptions.is_empty() {
            println!("\nDescriptions:");
            let mut tw = TabWriter::new(&["Language", "Text"]).indent("  ");
            for description in &info.descriptions {
                tw.row(vec![description.language.clone(), description.text.clone()]);
            }
            tw.print();
        }
    })
}
