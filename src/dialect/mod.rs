//! Dialect detection for schema-less delimited files
//!
//! Samples a bounded prefix of a file to infer its text encoding, column
//! delimiter and quote character. The encoding guess is delegated to a
//! [`CharsetSniffer`]; the delimiter/quote search scores a fixed candidate
//! list against the column-count consistency of the sampled rows.

pub mod sniffer;

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::error::ArchiveError;
use crate::tokenizer::tokenize;

pub use sniffer::{ByteSniffer, CharsetSniffer, decode, normalize_encoding};

/// Number of bytes sampled from the head of the file
const SAMPLE_BYTES: usize = 16 * 1024;
/// Number of data rows scored per candidate
const SAMPLE_ROWS: usize = 10;
/// Candidate delimiters, in evaluation order
const CANDIDATE_DELIMITERS: [&str; 4] = [",", "\t", ";", "|"];

/// How to tokenize a delimited text file: encoding, delimiter, quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialect {
    pub encoding: String,
    pub delimiter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<char>,
}

/// Detect the dialect of a file with no header rows declared.
pub fn detect(path: impl AsRef<Path>) -> Result<Dialect, ArchiveError> {
    detect_with(path, 0, &ByteSniffer)
}

/// Detect the dialect of a file, skipping `header_lines` declared header
/// rows before scoring and using the supplied charset sniffer.
pub fn detect_with(
    path: impl AsRef<Path>,
    header_lines: usize,
    sniffer: &dyn CharsetSniffer,
) -> Result<Dialect, ArchiveError> {
    let path = path.as_ref();
    let bytes = sample_bytes(path)?;
    let encoding = sniffer.sniff(&bytes).ok_or_else(|| {
        ArchiveError::UnknownCharset(format!("no confident guess for {}", path.display()))
    })?;

    let text = decode(&bytes, &encoding);
    let mut lines: Vec<&str> = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.is_empty())
        .collect();
    // the sample may have cut the final line short
    if bytes.len() == SAMPLE_BYTES {
        lines.pop();
    }
    let rows: Vec<&str> = lines
        .into_iter()
        .skip(header_lines)
        .take(SAMPLE_ROWS)
        .collect();
    if rows.is_empty() {
        return Err(ArchiveError::UnknownDelimiters(format!(
            "{} has no sampleable rows",
            path.display()
        )));
    }

    let mut best_score = i64::MIN;
    let mut best: Option<(&str, Option<char>)> = None;
    for delimiter in CANDIDATE_DELIMITERS {
        for quote in quote_candidates(delimiter, likely_quote(&rows, delimiter)) {
            let score = score(&rows, delimiter, quote);
            debug!(delimiter, ?quote, score, "dialect candidate");
            // first candidate wins on ties
            if score > best_score {
                best_score = score;
                best = Some((delimiter, quote));
            }
        }
    }

    match best {
        Some((delimiter, quote)) if best_score > 0 => Ok(Dialect {
            encoding,
            delimiter: delimiter.to_string(),
            quote,
        }),
        _ => Err(ArchiveError::UnknownDelimiters(format!(
            "no viable delimiter for {}",
            path.display()
        ))),
    }
}

fn sample_bytes(path: &Path) -> Result<Vec<u8>, ArchiveError> {
    let mut file = File::open(path)?;
    let mut bytes = vec![0u8; SAMPLE_BYTES];
    let mut read = 0;
    loop {
        let n = file.read(&mut bytes[read..])?;
        if n == 0 {
            break;
        }
        read += n;
        if read == SAMPLE_BYTES {
            break;
        }
    }
    bytes.truncate(read);
    Ok(bytes)
}

/// Quote heuristic: tokenize without a quote character and look for fields
/// whose first and last character are the same non-alphanumeric character,
/// consistently across the whole sample.
fn likely_quote(rows: &[&str], delimiter: &str) -> Option<char> {
    let mut candidate: Option<char> = None;
    for row in rows {
        for token in tokenize(row, delimiter, None).into_iter().flatten() {
            let first = token.chars().next()?;
            let last = token.chars().next_back()?;
            if token.chars().count() < 2 || first != last || first.is_alphanumeric() {
                continue;
            }
            match candidate {
                None => candidate = Some(first),
                Some(c) if c == first => {}
                // inconsistent wrapping characters, no confident quote
                Some(_) => return None,
            }
        }
    }
    candidate
}

/// Candidate quotes for a delimiter, in evaluation order. Comma-delimited
/// files are usually quoted, so quoting is tried first there; elsewhere the
/// unquoted reading is preferred.
fn quote_candidates(delimiter: &str, likely: Option<char>) -> Vec<Option<char>> {
    let mut ordered: Vec<Option<char>> = Vec::with_capacity(4);
    if delimiter == "," {
        if likely.is_some() {
            ordered.push(likely);
        }
        ordered.extend([Some('"'), Some('\''), None]);
    } else {
        ordered.extend([None, Some('"'), Some('\'')]);
        if likely.is_some() {
            ordered.push(likely);
        }
    }
    let mut seen = Vec::with_capacity(ordered.len());
    for quote in ordered {
        if !seen.contains(&quote) {
            seen.push(quote);
        }
    }
    seen
}

/// Column-count consistency score for one (delimiter, quote) pair. The first
/// row's column count anchors the score: any row off by more than one
/// rejects the pair, an exact match across the sample scores the full column
/// count, off-by-one rows are penalized by two.
fn score(rows: &[&str], delimiter: &str, quote: Option<char>) -> i64 {
    let c0 = tokenize(rows[0], delimiter, quote).len() as i64;
    let mut all_exact = true;
    for row in rows {
        let c = tokenize(row, delimiter, quote).len() as i64;
        if (c - c0).abs() > 1 {
            return -1;
        }
        if c != c0 {
            all_exact = false;
        }
    }
    if all_exact { c0 } else { c0 - 2 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_likely_quote_consistent() {
        let rows = vec!["\"a\",\"b\"", "\"c\",\"d\""];
        assert_eq!(likely_quote(&rows, ","), Some('"'));
    }

    #[test]
    fn test_likely_quote_inconsistent() {
        let rows = vec!["\"a\",'b'"];
        assert_eq!(likely_quote(&rows, ","), None);
    }

    #[test]
    fn test_likely_quote_alphanumeric_rejected() {
        let rows = vec!["aba,cdc"];
        assert_eq!(likely_quote(&rows, ","), None);
    }

    #[test]
    fn test_score_exact_match() {
        let rows = vec!["a,b,c", "1,2,3", "4,5,6"];
        assert_eq!(score(&rows, ",", None), 3);
    }

    #[test]
    fn test_score_off_by_one_penalized() {
        let rows = vec!["a,b,c", "1,2", "4,5,6"];
        assert_eq!(score(&rows, ",", None), 1);
    }

    #[test]
    fn test_score_rejects_wild_rows() {
        let rows = vec!["a,b,c", "1"];
        assert_eq!(score(&rows, ",", None), -1);
    }

    #[test]
    fn test_quote_candidates_order() {
        assert_eq!(
            quote_candidates(",", Some('\'')),
            vec![Some('\''), Some('"'), None]
        );
        assert_eq!(
            quote_candidates("\t", None),
            vec![None, Some('"'), Some('\'')]
        );
    }
}
