//! Row views: single-file records and joined star records

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ArchiveError;

use super::file_schema::FileSchema;
use super::term::Term;

/// Collapse empty, whitespace-only and literal null tokens to absence.
pub(crate) fn clean(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("null") || value == "\\N" {
        None
    } else {
        Some(value)
    }
}

/// View of one raw row against its file schema
///
/// Records own their cells and are cheap to produce per row; the schema is
/// shared. A record stays valid after the iterator advances, but callers
/// streaming large files should not accumulate them.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<FileSchema>,
    cells: Vec<Option<String>>,
}

impl Record {
    pub fn new(schema: Arc<FileSchema>, cells: Vec<Option<String>>) -> Self {
        Self { schema, cells }
    }

    pub fn schema(&self) -> &FileSchema {
        &self.schema
    }

    pub fn row_type(&self) -> &Term {
        &self.schema.row_type
    }

    /// Raw cell at a physical column position, uncleaned.
    pub fn column(&self, index: usize) -> Option<&str> {
        self.cells.get(index).and_then(|c| c.as_deref())
    }

    /// Id column value, cleaned.
    pub fn id(&self) -> Option<&str> {
        self.schema
            .id_field
            .as_ref()
            .and_then(|f| f.index)
            .and_then(|i| self.column(i))
            .and_then(clean)
    }

    /// Value for a term: the cell at the field's index, cleaned, falling
    /// back to the field default when the cell is absent or the field has
    /// no column position. Unmapped terms resolve to nothing.
    pub fn value(&self, term: &Term) -> Option<&str> {
        let field = self.schema.field(term)?;
        let cell = field.index.and_then(|i| self.column(i)).and_then(clean);
        cell.or(field.default_value.as_deref())
    }
}

/// One core row joined with all of its related extension rows
///
/// The set of extension row types is fixed at construction and never grows.
#[derive(Debug)]
pub struct StarRecord {
    core: Record,
    extensions: HashMap<Term, Vec<Record>>,
}

impl StarRecord {
    /// Build an empty star record around a core row, declaring the full set
    /// of extension row types up front.
    pub fn new<'a>(core: Record, row_types: impl IntoIterator<Item = &'a Term>) -> Self {
        let extensions = row_types
            .into_iter()
            .map(|t| (t.clone(), Vec::new()))
            .collect();
        Self { core, extensions }
    }

    pub fn core(&self) -> &Record {
        &self.core
    }

    pub fn core_id(&self) -> Option<&str> {
        self.core.id()
    }

    /// Extension rows for a declared row type; asking for an undeclared
    /// type is an error, a declared-but-empty type yields an empty slice.
    pub fn extensions(&self, row_type: &Term) -> Result<&[Record], ArchiveError> {
        self.extensions
            .get(row_type)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                ArchiveError::IllegalState(format!(
                    "row type {row_type} is not declared by this archive"
                ))
            })
    }

    pub(crate) fn attach(&mut self, row_type: &Term, record: Record) {
        if let Some(rows) = self.extensions.get_mut(row_type) {
            rows.push(record);
        }
    }
}
