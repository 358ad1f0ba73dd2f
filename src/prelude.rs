//! # mmdbforge Prelude
//!
//! This module provides a convenient prelude for the most commonly used types from the
//! mmdbforge library. Import this module to get quick access to everything needed to build
//! and read databases.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all mmdbforge operations
pub use crate::Error;

/// The result type used throughout mmdbforge
pub use crate::Result;

// ================================================================================================
// Values
// ================================================================================================

/// Typed record value
pub use crate::format::value::{DataValue, MapBuilder};

/// Field type ids of the data section
pub use crate::format::DataType;

// ================================================================================================
// Writing and Reading
// ================================================================================================

/// Database construction
pub use crate::writer::{IpVersion, Options, Writer};

/// Database loading and lookups
pub use crate::reader::Reader;

/// Decoded database metadata
pub use crate::format::metadata::Metadata;

/// Search tree record sizes
pub use crate::tree::record::RecordSize;
