//! Descriptor document support
//!
//! The descriptor maps data-file columns to terms. This module holds the
//! shared constants and the attribute escape syntax; [`parser`] builds the
//! schema model from a document, [`emitter`] generates one from a model.

pub mod emitter;
pub mod parser;

use crate::error::ArchiveError;

/// Descriptor file name inside a package directory
pub const DESCRIPTOR_FILENAME: &str = "meta.xml";
/// Default file name for a generated metadata document
pub const METADATA_FILENAME: &str = "metadata.xml";
/// Archive-description namespace; documents with or without it are accepted
pub const ARCHIVE_NAMESPACE: &str = "http://rs.tdwg.org/dwc/text/";

/// Unescape the two-character sequences `\t`, `\n`, `\r`, `\f`
/// (case-insensitive letter) in a delimiter/terminator attribute value.
pub(crate) fn unescape_delimiter(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek().map(|c| c.to_ascii_lowercase()) {
                Some('t') => {
                    chars.next();
                    out.push('\t');
                    continue;
                }
                Some('n') => {
                    chars.next();
                    out.push('\n');
                    continue;
                }
                Some('r') => {
                    chars.next();
                    out.push('\r');
                    continue;
                }
                Some('f') => {
                    chars.next();
                    out.push('\u{0C}');
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}

/// Escape control characters back to their two-character attribute form.
pub(crate) fn escape_delimiter(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{0C}' => out.push_str("\\f"),
            _ => out.push(c),
        }
    }
    out
}

/// Interpret a present `fieldsEnclosedBy` value. An empty value explicitly
/// disables quoting; a single character is literal; the two-character
/// escapes `\t`, `\n`, `\r` unescape; anything longer is unsupported
/// because only one quotation character is allowed.
pub(crate) fn parse_quote_attr(value: &str) -> Result<Option<char>, ArchiveError> {
    if value.is_empty() {
        return Ok(None);
    }
    let mut chars = value.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(Some(c));
    }
    let unescaped = unescape_delimiter(value);
    let mut chars = unescaped.chars();
    match (chars.next(), chars.next()) {
        (Some(c @ ('\t' | '\n' | '\r')), None) => Ok(Some(c)),
        _ => Err(ArchiveError::UnsupportedArchive(format!(
            "fieldsEnclosedBy {value:?}: only one quotation character is supported"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_delimiter() {
        assert_eq!(unescape_delimiter("\\t"), "\t");
        assert_eq!(unescape_delimiter("\\T"), "\t");
        assert_eq!(unescape_delimiter("\\r\\n"), "\r\n");
        assert_eq!(unescape_delimiter("\\f"), "\u{0C}");
        assert_eq!(unescape_delimiter(";"), ";");
        assert_eq!(unescape_delimiter("\\x"), "\\x");
    }

    #[test]
    fn test_escape_roundtrip() {
        assert_eq!(escape_delimiter("\t"), "\\t");
        assert_eq!(unescape_delimiter(&escape_delimiter("\r\n")), "\r\n");
    }

    #[test]
    fn test_parse_quote_attr() {
        assert_eq!(parse_quote_attr("").unwrap(), None);
        assert_eq!(parse_quote_attr("\"").unwrap(), Some('"'));
        assert_eq!(parse_quote_attr("\\t").unwrap(), Some('\t'));
        assert!(parse_quote_attr("ab").is_err());
        assert!(parse_quote_attr("\\q").is_err());
    }
}
