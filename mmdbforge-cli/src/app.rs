use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// mmdbforge - generate and inspect MaxMind DB files
#[derive(Debug, Parser)]
#[command(name = "mmdbforge", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write the test fixture database testdb.mmdb to the current directory.
    Generate,

    /// Look up the record stored for an IP address.
    Lookup {
        /// Path to the .mmdb file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// IPv4 or IPv6 address.
        #[arg(value_name = "IP")]
        ip: String,

        /// Show only the value at a dot-separated path (e.g., test_map.test_str1).
        #[arg(long = "path", value_name = "PATH")]
        field: Option<String>,
    },

    /// Display database metadata: type, IP version, record size, node count, descriptions.
    Info {
        /// Path to the .mmdb file.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}
