//! Lazy star-record join over pre-sorted data files
//!
//! A k-way merge: one cursor per extension file, each positioned at its
//! next unconsumed row. All files must be ordered by their id column
//! (ascending, ordinal comparison); [`super::sort`] is the preprocessing
//! stage that establishes this.

use tracing::warn;

use crate::model::{Record, StarRecord, Term};

use super::{ReadError, RowCursor};

struct ExtensionCursor {
    row_type: Term,
    cursor: RowCursor,
    pending: Option<Record>,
}

/// Lazy, finite, single-pass sequence of star records
///
/// Yields `Result` per item. A row-level read failure is yielded once and
/// the iterator is fused afterwards: the failing source ends the whole
/// iteration rather than skipping the bad row.
pub struct StarRecordIter {
    core: RowCursor,
    extensions: Vec<ExtensionCursor>,
    row_types: Vec<Term>,
    finished: bool,
}

impl StarRecordIter {
    pub fn new(core: RowCursor, extensions: Vec<RowCursor>) -> Self {
        let extensions: Vec<ExtensionCursor> = extensions
            .into_iter()
            .map(|cursor| ExtensionCursor {
                row_type: cursor.schema().row_type.clone(),
                cursor,
                pending: None,
            })
            .collect();
        let row_types = extensions.iter().map(|e| e.row_type.clone()).collect();
        Self {
            core,
            extensions,
            row_types,
            finished: false,
        }
    }

    /// Attach every extension row matching `core_id`, discarding orphans
    /// whose id sorts before it. Rows with a greater id stay pending for a
    /// later star record.
    fn gather(
        extension: &mut ExtensionCursor,
        core_id: &str,
        star: &mut StarRecord,
    ) -> Result<(), ReadError> {
        loop {
            if extension.pending.is_none() {
                match extension.cursor.next_record() {
                    None => return Ok(()),
                    Some(Err(e)) => return Err(e),
                    Some(Ok(record)) => extension.pending = Some(record),
                }
            }
            let pending_id = extension
                .pending
                .as_ref()
                .and_then(|r| r.id())
                .unwrap_or("")
                .to_string();
            if pending_id.as_str() < core_id {
                warn!(
                    row_type = %extension.row_type,
                    id = %pending_id,
                    "orphan extension row with no matching core id"
                );
                extension.pending = None;
            } else if pending_id == core_id {
                let record = extension.pending.take().unwrap();
                star.attach(&extension.row_type, record);
            } else {
                return Ok(());
            }
        }
    }
}

impl Iterator for StarRecordIter {
    type Item = Result<StarRecord, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let core = match self.core.next_record() {
            None => {
                // remaining extension rows are orphans past the last core id
                self.finished = true;
                return None;
            }
            Some(Err(e)) => {
                self.finished = true;
                return Some(Err(e));
            }
            Some(Ok(record)) => record,
        };

        let core_id = core.id().unwrap_or("").to_string();
        let mut star = StarRecord::new(core, self.row_types.iter());
        for extension in &mut self.extensions {
            if let Err(e) = Self::gather(extension, &core_id, &mut star) {
                self.finished = true;
                return Some(Err(e));
            }
        }
        Some(Ok(star))
    }
}
