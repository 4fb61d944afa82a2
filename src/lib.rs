//! Star Archive SDK - read and write self-describing tabular packages
//!
//! A package is a directory of delimited text data files plus a descriptor
//! document (`meta.xml`) mapping file columns to namespace-qualified terms.
//! One core file and any number of extension files related many-to-one via
//! a shared id column form a star schema.
//!
//! Provides:
//! - Schema model (terms, fields, file schemas, the archive)
//! - Namespace-tolerant descriptor parsing and generation
//! - Dialect detection (encoding, delimiter, quote) for schema-less files
//! - Lazy star-record join over pre-sorted files, with an external-sort stage
//! - Incremental archive writing with a generated descriptor
//!
//! Reading is single-threaded and pull-based; each open session owns its
//! file handles exclusively, and dropping a reader or iterator releases
//! them.

pub mod dialect;
pub mod error;
pub mod meta;
pub mod model;
pub mod reader;
pub mod tokenizer;
pub mod writer;

// Re-export commonly used types
pub use dialect::{ByteSniffer, CharsetSniffer, Dialect};
pub use error::ArchiveError;
pub use model::{
    Archive, DataType, Field, FileSchema, ID_TERM, Record, StarRecord, Term, TermRegistry,
};
pub use reader::{ReadError, RowCursor, StarRecordIter};
pub use tokenizer::tokenize;
pub use writer::ArchiveWriter;
