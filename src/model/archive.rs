//! The archive: one core schema plus extension schemas under a base directory

use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dialect;
use crate::error::ArchiveError;
use crate::meta;
use crate::reader::star::StarRecordIter;
use crate::reader::{self, RowCursor};
use crate::tokenizer::tokenize;

use super::field::Field;
use super::file_schema::FileSchema;
use super::term::{ID_TERM, Term, TermRegistry};

/// An opened package: core file schema, extension file schemas and the
/// optional metadata document reference, rooted at a base directory.
///
/// Immutable once constructed; reading sessions borrow it.
#[derive(Debug, Clone)]
pub struct Archive {
    base_dir: PathBuf,
    metadata_location: Option<String>,
    core: FileSchema,
    extensions: Vec<FileSchema>,
}

impl Archive {
    pub fn new(base_dir: impl Into<PathBuf>, core: FileSchema) -> Self {
        Self {
            base_dir: base_dir.into(),
            metadata_location: None,
            core,
            extensions: Vec::new(),
        }
    }

    /// Open a package directory by parsing its descriptor document.
    ///
    /// All schema-construction problems surface here, before any record is
    /// produced.
    pub fn open(dir: impl AsRef<Path>, registry: &TermRegistry) -> Result<Self, ArchiveError> {
        let dir = dir.as_ref();
        let descriptor = dir.join(meta::DESCRIPTOR_FILENAME);
        if !descriptor.is_file() {
            return Err(ArchiveError::UnsupportedArchive(format!(
                "no {} found in {}",
                meta::DESCRIPTOR_FILENAME,
                dir.display()
            )));
        }
        let xml = fs::read_to_string(&descriptor)?;
        meta::parser::parse_descriptor(&xml, dir, registry)
    }

    /// Open a bare delimited data file with no descriptor.
    ///
    /// The dialect is inferred by sampling the file, the first line is taken
    /// as a header row and each header cell is resolved to a term; column 0
    /// doubles as the id. The result is a single-core archive rooted at the
    /// file's parent directory.
    pub fn from_data_file(
        path: impl AsRef<Path>,
        registry: &TermRegistry,
    ) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let detected = dialect::detect_with(path, 1, &dialect::ByteSniffer)?;
        if !reader::supports_encoding(&detected.encoding) {
            return Err(ArchiveError::UnsupportedArchive(format!(
                "cannot stream {} encoded data",
                detected.encoding
            )));
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ArchiveError::UnsupportedArchive("not a file path".to_string()))?;
        let stem = file_name.rsplit_once('.').map_or(file_name, |(s, _)| s);
        let row_type = registry.resolve(stem)?;

        let mut schema = FileSchema::new(row_type);
        schema.encoding = detected.encoding.clone();
        schema.field_delimiter = detected.delimiter.clone();
        schema.quote_char = detected.quote;
        schema.header_line_count = 1;
        schema.id_field = Some(Field::new(ID_TERM.clone()).with_index(0));
        schema.add_location(file_name);

        let header = first_line(path, &detected.encoding)?;
        for (index, cell) in tokenize(&header, &detected.delimiter, detected.quote)
            .into_iter()
            .enumerate()
        {
            let Some(name) = cell else { continue };
            let term = registry.resolve(&name)?;
            schema.add_field(Field::new(term).with_index(index));
        }
        if schema.fields.is_empty() {
            return Err(ArchiveError::UnsupportedArchive(format!(
                "{file_name} has no usable header row"
            )));
        }

        let base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        Ok(Archive::new(base_dir, schema))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn core(&self) -> &FileSchema {
        &self.core
    }

    pub fn extensions(&self) -> &[FileSchema] {
        &self.extensions
    }

    pub fn extension(&self, row_type: &Term) -> Option<&FileSchema> {
        self.extensions.iter().find(|e| &e.row_type == row_type)
    }

    pub fn metadata_location(&self) -> Option<&str> {
        self.metadata_location.as_deref()
    }

    /// Absolute path of the metadata document, when one is referenced.
    pub fn metadata_path(&self) -> Option<PathBuf> {
        self.metadata_location
            .as_ref()
            .map(|loc| self.base_dir.join(loc))
    }

    pub fn set_metadata_location(&mut self, location: impl Into<String>) {
        self.metadata_location = Some(location.into());
    }

    /// Add an extension schema. The caller must have verified the id field
    /// is indexed; the descriptor parser drops unindexed extensions before
    /// reaching this point.
    pub fn add_extension(&mut self, extension: FileSchema) {
        self.extensions.push(extension);
    }

    /// Lazy star-join iterator over the package data.
    ///
    /// All data files must already be sorted by their id column (ordinal,
    /// ascending); see [`Archive::presorted`] for the preprocessing stage.
    pub fn iter(&self) -> Result<StarRecordIter, ArchiveError> {
        let core = RowCursor::open(&self.base_dir, Arc::new(self.core.clone()))?;
        let mut extensions = Vec::with_capacity(self.extensions.len());
        for schema in &self.extensions {
            extensions.push(RowCursor::open(&self.base_dir, Arc::new(schema.clone()))?);
        }
        Ok(StarRecordIter::new(core, extensions))
    }

    /// Clone of this archive whose unsorted data files are replaced by
    /// sorted companion files, produced by the external-sort stage.
    pub fn presorted(&self) -> Result<Self, ArchiveError> {
        let mut sorted = self.clone();
        reader::sort::ensure_sorted(&self.base_dir, &mut sorted.core)?;
        for extension in &mut sorted.extensions {
            reader::sort::ensure_sorted(&self.base_dir, extension)?;
        }
        Ok(sorted)
    }
}

/// First physical line of a file, decoded. Used for header-row inspection.
fn first_line(path: &Path, encoding: &str) -> Result<String, ArchiveError> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file.take(64 * 1024));
    let mut bytes = Vec::new();
    reader.read_until(b'\n', &mut bytes)?;
    while bytes.last().is_some_and(|b| *b == b'\n' || *b == b'\r') {
        bytes.pop();
    }
    Ok(dialect::decode(&bytes, encoding))
}
