//! Schema model for the archive package
//!
//! In-memory representation of a package: terms, fields, per-file schemas,
//! the archive itself and the transient row views produced while reading.
//! Entities here are built once (by the descriptor parser or a writer) and
//! stay immutable for the duration of a read session.

pub mod archive;
pub mod field;
pub mod file_schema;
pub mod record;
pub mod term;

pub use archive::Archive;
pub use field::{DataType, Field};
pub use file_schema::FileSchema;
pub use record::{Record, StarRecord};
pub use term::{ID_TERM, Term, TermRegistry};
