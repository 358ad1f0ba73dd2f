use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants follow the steps of producing and consuming a database: configuring a writer,
/// parsing networks, inserting records, serializing the file and reading it back.
///
/// # Error Categories
///
/// ## Writer Errors
/// - [`Error::InvalidConfig`] - Writer options rejected at construction
/// - [`Error::InvalidNetwork`] - CIDR text could not be parsed, or the address family does not fit
/// - [`Error::InsertFailed`] - A record could not be placed in the search tree
/// - [`Error::ValueTooLarge`] - A data field exceeds the size the format can express
/// - [`Error::DatabaseTooLarge`] - Tree or data section no longer fits the record size
///
/// ## I/O Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::WriteMmapFailed`] - Output mapping could not be created or written
/// - [`Error::WriteFinalizationFailed`] - Output file could not be flushed
///
/// ## Reader Errors
/// - [`Error::Malformed`] - Corrupted or invalid file structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond buffer boundaries
/// - [`Error::NotFound`] - No record, or no value at the requested path
/// - [`Error::TypeMismatch`] - The value at a path has a different type than requested
///
/// # Examples
///
/// ```rust,no_run
/// use mmdbforge::{Error, Reader};
///
/// match Reader::open("testdb.mmdb") {
///     Ok(reader) => println!("Loaded {} nodes", reader.metadata().node_count),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed file: {} ({}:{})", message, file, line);
///     }
///     Err(Error::FileError(io_err)) => eprintln!("I/O error: {}", io_err),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The writer options are invalid.
    ///
    /// Raised by [`crate::Writer::new`] for an empty database type or an
    /// unsupported record size or IP version.
    #[error("Invalid writer configuration - {0}")]
    InvalidConfig(String),

    /// A network could not be parsed or does not fit the database.
    ///
    /// Covers malformed CIDR text as well as IPv6 networks or addresses used
    /// against an IPv4-only database.
    #[error("Invalid network - {0}")]
    InvalidNetwork(String),

    /// A record could not be inserted into the search tree.
    #[error("Failed to insert data for {network}: {message}")]
    InsertFailed {
        /// The network the record was keyed to
        network: String,
        /// What went wrong
        message: String,
    },

    /// A single data field is too large to be encoded.
    ///
    /// The format limits payload sizes to 16843036 bytes (or entries for maps
    /// and arrays).
    #[error("Data field of size {0} exceeds the maximum encodable size")]
    ValueTooLarge(usize),

    /// The database no longer fits the configured record size.
    #[error("Database too large - {0}")]
    DatabaseTooLarge(String),

    /// The file is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was
    /// detected for debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while reading or writing a buffer.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// No record exists for an address, or the path does not resolve.
    #[error("Not found - {0}")]
    NotFound(String),

    /// The value at a path exists but has another type.
    #[error("Type mismatch - expected {expected}, found {found}")]
    TypeMismatch {
        /// The requested type
        expected: &'static str,
        /// The type actually stored
        found: &'static str,
    },

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Memory-mapped output operation failed.
    ///
    /// Creation, resizing, mapping or a bounds-checked write on the output
    /// file failed.
    #[error("Memory-mapped output failed - {message}")]
    WriteMmapFailed {
        /// Details of the failure
        message: String,
    },

    /// Finalizing the output file failed.
    #[error("Output finalization failed - {message}")]
    WriteFinalizationFailed {
        /// Details of the failure
        message: String,
    },
}
