//! Incremental archive writing
//!
//! Builds a new package record by record: one data file per row type, a
//! generated descriptor on close, and an optional metadata document. Output
//! always uses the fixed writer dialect (tab-delimited, no quoting, utf8,
//! `\n`) regardless of how the data were originally read.
//!
//! The core row is buffered with a one-row look-behind so values can be set
//! after [`ArchiveWriter::start_core_record`]; extension rows are written
//! immediately with the current core id as their foreign key.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::ArchiveError;
use crate::meta::{self, emitter};
use crate::model::{Archive, Field, FileSchema, Term, term::ID_TERM};

/// Header display names for the id column of well-known row types; anything
/// else falls back to a generic name. Affects only the optional header row.
static ID_COLUMN_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("http://rs.tdwg.org/dwc/terms/Occurrence", "occurrenceID"),
        ("http://rs.tdwg.org/dwc/terms/Taxon", "taxonID"),
        ("http://rs.tdwg.org/dwc/terms/Event", "eventID"),
        ("http://rs.tdwg.org/dwc/terms/Identification", "identificationID"),
        ("http://rs.tdwg.org/dwc/terms/MeasurementOrFact", "measurementID"),
    ])
});

fn id_column_name(row_type: &Term) -> &'static str {
    ID_COLUMN_NAMES
        .get(row_type.qualified_name())
        .copied()
        .unwrap_or("identifier")
}

/// Tab, newline and carriage return inside a value would break the writer
/// dialect; they become a single space.
fn scrub(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}

struct PendingRow {
    id: String,
    values: HashMap<Term, String>,
}

/// One open per-row-type output sink with its first-seen column order
struct DataFileWriter {
    row_type: Term,
    file_name: String,
    out: BufWriter<File>,
    columns: Vec<Term>,
    header_written: bool,
    rows_written: u64,
}

impl DataFileWriter {
    fn create(dir: &Path, row_type: Term) -> Result<Self, ArchiveError> {
        let file_name = format!("{}.txt", row_type.simple_name().to_lowercase());
        let out = BufWriter::new(File::create(dir.join(&file_name))?);
        Ok(Self {
            row_type,
            file_name,
            out,
            columns: Vec::new(),
            header_written: false,
            rows_written: 0,
        })
    }

    /// Register a column, first-seen order. Introducing a new column once
    /// headers are on disk cannot be honored any more.
    fn ensure_column(&mut self, term: &Term) -> Result<(), ArchiveError> {
        if self.columns.contains(term) {
            return Ok(());
        }
        if self.header_written {
            return Err(ArchiveError::IllegalState(format!(
                "cannot add column {term} to {} after headers were written",
                self.file_name
            )));
        }
        self.columns.push(term.clone());
        Ok(())
    }

    /// Write one row: id cell first, then the registered columns. A row
    /// with every cell empty is suppressed rather than written blank.
    fn write_row(
        &mut self,
        id: &str,
        values: &HashMap<Term, String>,
        with_headers: bool,
    ) -> Result<(), ArchiveError> {
        let mut cells: Vec<String> = Vec::with_capacity(self.columns.len() + 1);
        cells.push(scrub(id.trim()));
        for column in &self.columns {
            cells.push(values.get(column).map(|v| scrub(v)).unwrap_or_default());
        }
        if cells.iter().all(|c| c.trim().is_empty()) {
            return Ok(());
        }

        if with_headers && !self.header_written {
            let mut header: Vec<&str> = Vec::with_capacity(self.columns.len() + 1);
            header.push(id_column_name(&self.row_type));
            header.extend(self.columns.iter().map(|t| t.simple_name()));
            writeln!(self.out, "{}", header.join("\t"))?;
            self.header_written = true;
        }

        writeln!(self.out, "{}", cells.join("\t"))?;
        self.rows_written += 1;
        Ok(())
    }

    /// Schema describing what this writer produced, in the writer dialect.
    fn schema(&self, with_headers: bool) -> FileSchema {
        let mut schema = FileSchema::new(self.row_type.clone());
        schema.encoding = "utf8".to_string();
        schema.field_delimiter = "\t".to_string();
        schema.quote_char = None;
        schema.line_terminator = "\n".to_string();
        schema.header_line_count = usize::from(with_headers);
        schema.id_field = Some(Field::new(ID_TERM.clone()).with_index(0));
        for (i, term) in self.columns.iter().enumerate() {
            schema.add_field(Field::new(term.clone()).with_index(i + 1));
        }
        schema.add_location(self.file_name.clone());
        schema
    }
}

/// Incremental builder of a new package in a directory
///
/// Call [`start_core_record`](Self::start_core_record) /
/// [`set_core_value`](Self::set_core_value) /
/// [`add_extension_record`](Self::add_extension_record) repeatedly, then
/// [`close`](Self::close) to flush the look-behind row and generate the
/// descriptor.
pub struct ArchiveWriter {
    dir: PathBuf,
    with_headers: bool,
    core: DataFileWriter,
    extensions: Vec<DataFileWriter>,
    pending: Option<PendingRow>,
    last_core_id: Option<String>,
    metadata_document: Option<String>,
}

impl ArchiveWriter {
    /// Open a writer for a new package rooted at `dir` (created when
    /// missing) with the given core row type.
    pub fn new(dir: impl Into<PathBuf>, core_row_type: Term) -> Result<Self, ArchiveError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let core = DataFileWriter::create(&dir, core_row_type)?;
        Ok(Self {
            dir,
            with_headers: false,
            core,
            extensions: Vec::new(),
            pending: None,
            last_core_id: None,
            metadata_document: None,
        })
    }

    /// Emit a header row per data file. Locks each file's column set once
    /// its first row reaches disk.
    pub fn with_headers(mut self) -> Self {
        self.with_headers = true;
        self
    }

    /// Supply the metadata document content, written on close.
    pub fn set_metadata_document(&mut self, content: impl Into<String>) {
        self.metadata_document = Some(content.into());
    }

    /// Flush the previously buffered core row, then begin buffering a new
    /// one under the given id.
    pub fn start_core_record(&mut self, id: impl Into<String>) -> Result<(), ArchiveError> {
        self.flush_pending()?;
        self.pending = Some(PendingRow {
            id: id.into(),
            values: HashMap::new(),
        });
        Ok(())
    }

    /// Record a value on the core row in progress.
    pub fn set_core_value(
        &mut self,
        term: &Term,
        value: impl Into<String>,
    ) -> Result<(), ArchiveError> {
        let Some(pending) = self.pending.as_mut() else {
            return Err(ArchiveError::IllegalState(
                "no core record in progress".to_string(),
            ));
        };
        self.core.ensure_column(term)?;
        pending.values.insert(term.clone(), value.into());
        Ok(())
    }

    /// Write one extension row immediately, keyed by the current core id.
    /// Values are ordered pairs; their first appearance fixes the column
    /// order of that row type's file. Without any core record started the
    /// row has no foreign key and is dropped.
    pub fn add_extension_record(
        &mut self,
        row_type: &Term,
        values: &[(Term, String)],
    ) -> Result<(), ArchiveError> {
        let Some(core_id) = self
            .pending
            .as_ref()
            .map(|p| p.id.clone())
            .or_else(|| self.last_core_id.clone())
        else {
            warn!(
                "dropping {} extension row: no core record has been started",
                row_type
            );
            return Ok(());
        };

        if !self.extensions.iter().any(|w| &w.row_type == row_type) {
            self.extensions
                .push(DataFileWriter::create(&self.dir, row_type.clone())?);
        }
        let writer = self
            .extensions
            .iter_mut()
            .find(|w| &w.row_type == row_type)
            .unwrap();

        let mut row: HashMap<Term, String> = HashMap::with_capacity(values.len());
        for (term, value) in values {
            writer.ensure_column(term)?;
            row.insert(term.clone(), value.clone());
        }
        writer.write_row(&core_id, &row, self.with_headers)
    }

    /// Flush the last buffered core row, close every sink and generate the
    /// descriptor (plus the metadata document when supplied). Returns the
    /// archive describing the package just written.
    pub fn close(mut self) -> Result<Archive, ArchiveError> {
        self.flush_pending()?;
        self.core.out.flush()?;
        for extension in &mut self.extensions {
            extension.out.flush()?;
        }

        let core_schema = self.core.schema(self.with_headers);
        let mut archive = Archive::new(self.dir.clone(), core_schema);
        for extension in &self.extensions {
            archive.add_extension(extension.schema(self.with_headers));
        }

        if let Some(content) = &self.metadata_document {
            fs::write(self.dir.join(meta::METADATA_FILENAME), content)?;
            archive.set_metadata_location(meta::METADATA_FILENAME);
        }
        emitter::write_descriptor(&archive)?;

        info!(
            dir = %self.dir.display(),
            core_rows = self.core.rows_written,
            extension_files = self.extensions.len(),
            "archive written"
        );
        Ok(archive)
    }

    fn flush_pending(&mut self) -> Result<(), ArchiveError> {
        if let Some(pending) = self.pending.take() {
            self.core
                .write_row(&pending.id, &pending.values, self.with_headers)?;
            self.last_core_id = Some(pending.id);
        }
        Ok(())
    }
}
