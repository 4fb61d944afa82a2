//! Schema for one data file (core or extension) inside a package

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::field::Field;
use super::term::Term;

pub const DEFAULT_ENCODING: &str = "utf8";
pub const DEFAULT_FIELD_DELIMITER: &str = "\t";
pub const DEFAULT_QUOTE: Option<char> = Some('"');
pub const DEFAULT_LINE_TERMINATOR: &str = "\n";

/// In-memory schema of one delimited data file
///
/// Built once by the descriptor parser (or programmatically by the archive
/// writer) and immutable for the duration of a read session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSchema {
    /// Term identifying what kind of entity this file's rows represent
    pub row_type: Term,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_field_delimiter")]
    pub field_delimiter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_char: Option<char>,
    #[serde(default = "default_line_terminator")]
    pub line_terminator: String,
    #[serde(default)]
    pub header_line_count: usize,
    /// Id (core) or foreign-key (extension) column
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_field: Option<Field>,
    /// Term-keyed column mapping; at most one field per term
    pub fields: HashMap<Term, Field>,
    /// File paths relative to the package root; the first is canonical
    #[serde(default)]
    pub locations: Vec<String>,
    /// Display title, defaulted from the first location's file name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

fn default_encoding() -> String {
    DEFAULT_ENCODING.to_string()
}

fn default_field_delimiter() -> String {
    DEFAULT_FIELD_DELIMITER.to_string()
}

fn default_line_terminator() -> String {
    DEFAULT_LINE_TERMINATOR.to_string()
}

impl FileSchema {
    pub fn new(row_type: Term) -> Self {
        Self {
            row_type,
            encoding: DEFAULT_ENCODING.to_string(),
            field_delimiter: DEFAULT_FIELD_DELIMITER.to_string(),
            quote_char: DEFAULT_QUOTE,
            line_terminator: DEFAULT_LINE_TERMINATOR.to_string(),
            header_line_count: 0,
            id_field: None,
            fields: HashMap::new(),
            locations: Vec::new(),
            title: None,
        }
    }

    /// Add a field; a term already present is replaced with a warning.
    pub fn add_field(&mut self, field: Field) {
        if self.fields.contains_key(&field.term) {
            warn!(
                "duplicate field for term {} in {}, keeping the last one",
                field.term,
                self.row_type.simple_name()
            );
        }
        self.fields.insert(field.term.clone(), field);
    }

    pub fn field(&self, term: &Term) -> Option<&Field> {
        self.fields.get(term)
    }

    pub fn has_term(&self, term: &Term) -> bool {
        self.fields.contains_key(term)
    }

    /// Fields ordered by column index, index-less fields last.
    pub fn fields_sorted(&self) -> Vec<&Field> {
        let mut fields: Vec<&Field> = self.fields.values().collect();
        fields.sort_by_key(|f| (f.index.is_none(), f.index, f.term.qualified_name.clone()));
        fields
    }

    /// Append a file path; the first location's final path segment becomes
    /// the schema title when none is set.
    pub fn add_location(&mut self, location: impl Into<String>) {
        let location = location.into();
        if self.title.is_none() {
            let name = location
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or(location.as_str());
            if !name.is_empty() {
                self.title = Some(name.to_string());
            }
        }
        self.locations.push(location);
    }

    pub fn first_location(&self) -> Option<&str> {
        self.locations.first().map(String::as_str)
    }

    /// Canonical data file path resolved against the package root.
    pub fn resolve_location(&self, base_dir: &Path) -> Option<PathBuf> {
        self.first_location().map(|loc| base_dir.join(loc))
    }

    /// True when the id field exists and is bound to a column position.
    /// Extensions failing this cannot participate in the star join.
    pub fn has_indexed_id(&self) -> bool {
        self.id_field.as_ref().is_some_and(|f| f.index.is_some())
    }
}
