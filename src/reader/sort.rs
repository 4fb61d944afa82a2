//! External-sort preprocessing for unsorted data files
//!
//! The star join requires every file to be ordered by its id column. This
//! stage produces a sorted companion file next to the source instead of
//! sorting in memory, so memory stays bounded regardless of file size. It
//! is composable and separate from the join iterator itself.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::dialect;
use crate::error::ArchiveError;
use crate::model::FileSchema;
use crate::tokenizer::tokenize;

use super::read_raw_line;

/// Rows buffered per run before spilling to disk
const RUN_ROWS: usize = 50_000;
/// Suffix of the sorted companion file
const COMPANION_SUFFIX: &str = ".sorted";

/// Check whether a schema's data file is already ordered by its id column.
pub fn is_sorted(base_dir: &Path, schema: &FileSchema) -> Result<bool, ArchiveError> {
    let (path, id_index) = source_of(base_dir, schema)?;
    let mut reader = BufReader::new(File::open(&path)?);
    for _ in 0..schema.header_line_count {
        if read_raw_line(&mut reader)?.is_none() {
            return Ok(true);
        }
    }
    let mut previous: Option<String> = None;
    while let Some(bytes) = read_raw_line(&mut reader)? {
        let key = row_key(&bytes, schema, id_index);
        if previous.as_deref() > Some(key.as_str()) {
            return Ok(false);
        }
        previous = Some(key);
    }
    Ok(true)
}

/// Sort a schema's data file by its id column into `<file>.sorted` next to
/// the source, header lines copied through verbatim. Returns the companion
/// path.
pub fn sort_to_companion(base_dir: &Path, schema: &FileSchema) -> Result<PathBuf, ArchiveError> {
    let (path, id_index) = source_of(base_dir, schema)?;
    let companion = PathBuf::from(format!("{}{COMPANION_SUFFIX}", path.display()));
    let scratch = tempfile::tempdir()?;

    let mut reader = BufReader::new(File::open(&path)?);
    let mut output = BufWriter::new(File::create(&companion)?);

    for _ in 0..schema.header_line_count {
        match read_raw_line(&mut reader)? {
            Some(bytes) => {
                output.write_all(&bytes)?;
                output.write_all(b"\n")?;
            }
            None => break,
        }
    }

    // phase 1: sorted runs
    let mut runs: Vec<PathBuf> = Vec::new();
    let mut chunk: Vec<(String, Vec<u8>)> = Vec::with_capacity(RUN_ROWS);
    loop {
        let line = read_raw_line(&mut reader)?;
        if let Some(bytes) = &line {
            if !bytes.is_empty() {
                chunk.push((row_key(bytes, schema, id_index), bytes.clone()));
            }
        }
        if chunk.len() == RUN_ROWS || (line.is_none() && !chunk.is_empty()) {
            chunk.sort_by(|a, b| a.0.cmp(&b.0));
            let run_path = scratch.path().join(format!("run-{}", runs.len()));
            let mut run = BufWriter::new(File::create(&run_path)?);
            for (_, bytes) in chunk.drain(..) {
                run.write_all(&bytes)?;
                run.write_all(b"\n")?;
            }
            run.flush()?;
            runs.push(run_path);
        }
        if line.is_none() {
            break;
        }
    }
    debug!(runs = runs.len(), file = %path.display(), "spilled sorted runs");

    // phase 2: k-way merge of the runs
    let mut readers: Vec<BufReader<File>> = runs
        .iter()
        .map(|p| File::open(p).map(BufReader::new))
        .collect::<Result<_, _>>()?;
    let mut heap: BinaryHeap<Reverse<(String, usize, Vec<u8>)>> = BinaryHeap::new();
    for (i, run) in readers.iter_mut().enumerate() {
        if let Some(bytes) = read_raw_line(run)? {
            heap.push(Reverse((row_key(&bytes, schema, id_index), i, bytes)));
        }
    }
    while let Some(Reverse((_, i, bytes))) = heap.pop() {
        output.write_all(&bytes)?;
        output.write_all(b"\n")?;
        if let Some(next) = read_raw_line(&mut readers[i])? {
            heap.push(Reverse((row_key(&next, schema, id_index), i, next)));
        }
    }
    output.flush()?;

    info!(file = %companion.display(), "wrote sorted companion");
    Ok(companion)
}

/// Replace a schema's canonical location with its sorted companion when the
/// source file is not already ordered.
pub fn ensure_sorted(base_dir: &Path, schema: &mut FileSchema) -> Result<(), ArchiveError> {
    if is_sorted(base_dir, schema)? {
        return Ok(());
    }
    sort_to_companion(base_dir, schema)?;
    let location = schema
        .first_location()
        .map(|loc| format!("{loc}{COMPANION_SUFFIX}"))
        .unwrap_or_default();
    schema.locations[0] = location;
    Ok(())
}

fn source_of(base_dir: &Path, schema: &FileSchema) -> Result<(PathBuf, usize), ArchiveError> {
    let path = schema.resolve_location(base_dir).ok_or_else(|| {
        ArchiveError::UnsupportedArchive(format!(
            "schema {} declares no file location",
            schema.row_type
        ))
    })?;
    let id_index = schema
        .id_field
        .as_ref()
        .and_then(|f| f.index)
        .ok_or_else(|| {
            ArchiveError::UnsupportedArchive(format!(
                "schema {} has no indexed id column to sort by",
                schema.row_type
            ))
        })?;
    Ok((path, id_index))
}

/// Ordinal sort key of a raw row: the id column's string value.
fn row_key(bytes: &[u8], schema: &FileSchema, id_index: usize) -> String {
    let text = dialect::decode(bytes, &schema.encoding);
    tokenize(&text, &schema.field_delimiter, schema.quote_char)
        .into_iter()
        .nth(id_index)
        .flatten()
        .unwrap_or_default()
}
