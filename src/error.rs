//! Error taxonomy for opening, reading and writing archives
//!
//! Schema-construction problems are fatal and surface when a package is
//! opened, before any record is produced. Row-level read problems are not
//! raised through this type; they are carried per item by the star-record
//! iterator as [`crate::reader::ReadError`].

/// Error type for archive operations
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Malformed or self-contradictory descriptor: multi-character quote,
    /// unresolved row type, non-numeric column index, missing core.
    #[error("Unsupported archive: {0}")]
    UnsupportedArchive(String),

    /// Encoding sniffing produced no confident guess for a schema-less file.
    #[error("Unknown character set: {0}")]
    UnknownCharset(String),

    /// No delimiter/quote combination scored above zero during detection.
    #[error("Unknown delimiters: {0}")]
    UnknownDelimiters(String),

    /// An operation was called outside its valid lifecycle window, e.g.
    /// introducing a new writer column after headers were emitted.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// XML error while parsing or generating a descriptor document.
    #[error("Descriptor error: {0}")]
    Descriptor(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for ArchiveError {
    fn from(err: quick_xml::Error) -> Self {
        ArchiveError::Descriptor(err.to_string())
    }
}
