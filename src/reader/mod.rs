//! Streaming row access to the package data files
//!
//! A [`RowCursor`] is a single-pass cursor over one data file, producing
//! [`Record`]s. [`star`] joins one core cursor with the extension cursors
//! into star records; [`sort`] is the external-sort preprocessing stage for
//! packages whose files are not already id-ordered.

pub mod sort;
pub mod star;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use crate::dialect;
use crate::error::ArchiveError;
use crate::model::{FileSchema, Record};
use crate::tokenizer::tokenize;

pub use star::StarRecordIter;

/// Row-level read failure, carried per item by the iterators rather than
/// thrown. Encountering one ends the affected iteration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Row error in {file} line {line}: {message}")]
pub struct ReadError {
    pub file: String,
    pub line: u64,
    pub message: String,
}

/// True for encodings the streaming reader can decode line by line.
/// Detection may report UTF-16, but byte-wise line splitting is not sound
/// there, so such files cannot be streamed.
pub fn supports_encoding(encoding: &str) -> bool {
    matches!(
        dialect::normalize_encoding(encoding).as_str(),
        "utf8" | "latin1"
    )
}

/// Read one physical line as raw bytes, trailing terminator stripped.
/// `Ok(None)` signals end of file.
pub(crate) fn read_raw_line<R: BufRead>(reader: &mut R) -> std::io::Result<Option<Vec<u8>>> {
    let mut bytes = Vec::new();
    let n = reader.read_until(b'\n', &mut bytes)?;
    if n == 0 {
        return Ok(None);
    }
    while bytes.last().is_some_and(|b| *b == b'\n' || *b == b'\r') {
        bytes.pop();
    }
    Ok(Some(bytes))
}

/// Single-pass streaming cursor over one data file
///
/// Owns its file handle exclusively; dropping the cursor releases it.
/// Blank lines are skipped. A read failure is reported once, after which
/// the cursor acts exhausted.
pub struct RowCursor {
    schema: Arc<FileSchema>,
    reader: BufReader<File>,
    file_name: String,
    line: u64,
    done: bool,
}

impl RowCursor {
    /// Open the schema's canonical data file under `base_dir` and position
    /// the cursor past any declared header lines.
    pub fn open(base_dir: &Path, schema: Arc<FileSchema>) -> Result<Self, ArchiveError> {
        if !supports_encoding(&schema.encoding) {
            return Err(ArchiveError::UnsupportedArchive(format!(
                "cannot stream {} encoded data for {}",
                schema.encoding, schema.row_type
            )));
        }
        let location = schema.first_location().ok_or_else(|| {
            ArchiveError::UnsupportedArchive(format!(
                "schema {} declares no file location",
                schema.row_type
            ))
        })?;
        let path = base_dir.join(location);
        let file = File::open(&path)?;
        let mut cursor = Self {
            file_name: location.to_string(),
            schema,
            reader: BufReader::new(file),
            line: 0,
            done: false,
        };
        for _ in 0..cursor.schema.header_line_count {
            if read_raw_line(&mut cursor.reader)?.is_none() {
                break;
            }
            cursor.line += 1;
        }
        Ok(cursor)
    }

    pub fn schema(&self) -> &Arc<FileSchema> {
        &self.schema
    }

    /// Next record, or `None` when the file is exhausted. After an error
    /// item the cursor is exhausted.
    pub fn next_record(&mut self) -> Option<Result<Record, ReadError>> {
        if self.done {
            return None;
        }
        loop {
            match read_raw_line(&mut self.reader) {
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Ok(Some(bytes)) => {
                    self.line += 1;
                    let text = dialect::decode(&bytes, &self.schema.encoding);
                    if text.trim().is_empty() {
                        continue;
                    }
                    let cells = tokenize(
                        &text,
                        &self.schema.field_delimiter,
                        self.schema.quote_char,
                    );
                    return Some(Ok(Record::new(self.schema.clone(), cells)));
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(ReadError {
                        file: self.file_name.clone(),
                        line: self.line + 1,
                        message: e.to_string(),
                    }));
                }
            }
        }
    }
}
