//! Byte-pattern charset sniffing
//!
//! The detector treats charset sniffing as an external collaborator behind
//! the [`CharsetSniffer`] trait; [`ByteSniffer`] is the built-in guess based
//! on byte-order marks, UTF-8 validity and Latin-1 plausibility. Test suites
//! can substitute their own sniffer.

/// Best-guess text encoding from a bounded byte sample.
pub trait CharsetSniffer {
    /// Encoding name ("utf8", "latin1", "utf16le", "utf16be"), or `None`
    /// when there is no confident guess.
    fn sniff(&self, bytes: &[u8]) -> Option<String>;
}

/// Default byte-pattern sniffer
#[derive(Debug, Default)]
pub struct ByteSniffer;

impl CharsetSniffer for ByteSniffer {
    fn sniff(&self, bytes: &[u8]) -> Option<String> {
        if bytes.is_empty() {
            return None;
        }
        if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
            return Some("utf8".to_string());
        }
        if bytes.starts_with(&[0xFF, 0xFE]) {
            return Some("utf16le".to_string());
        }
        if bytes.starts_with(&[0xFE, 0xFF]) {
            return Some("utf16be".to_string());
        }
        // NUL bytes without a UTF-16 BOM: binary data, refuse to guess
        if bytes.contains(&0) {
            return None;
        }
        if valid_utf8_prefix(bytes) {
            return Some("utf8".to_string());
        }
        if bytes
            .iter()
            .all(|b| *b >= 0x20 || matches!(b, b'\t' | b'\n' | b'\r' | 0x0C))
        {
            return Some("latin1".to_string());
        }
        None
    }
}

/// UTF-8 validity check tolerating a multi-byte sequence cut off at the end
/// of the sample.
fn valid_utf8_prefix(bytes: &[u8]) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && bytes.len() - e.valid_up_to() < 4,
    }
}

/// Decode bytes under a detected encoding, skipping any byte-order mark.
/// Undecodable input degrades to replacement characters rather than failing;
/// the sniffer has already vouched for the encoding.
pub fn decode(bytes: &[u8], encoding: &str) -> String {
    match normalize_encoding(encoding).as_str() {
        "latin1" => bytes.iter().map(|b| *b as char).collect(),
        "utf16le" => decode_utf16(bytes.strip_prefix(&[0xFF, 0xFE]).unwrap_or(bytes), true),
        "utf16be" => decode_utf16(bytes.strip_prefix(&[0xFE, 0xFF]).unwrap_or(bytes), false),
        _ => {
            let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Canonical spelling for the encoding names accepted in descriptors.
pub fn normalize_encoding(encoding: &str) -> String {
    let name: String = encoding
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    match name.as_str() {
        "utf8" => "utf8".to_string(),
        "latin1" | "iso88591" | "windows1252" | "cp1252" => "latin1".to_string(),
        "utf16le" | "utf16" => "utf16le".to_string(),
        "utf16be" => "utf16be".to_string(),
        _ => name,
    }
}

fn decode_utf16(bytes: &[u8], little_endian: bool) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_plain_ascii_is_utf8() {
        assert_eq!(ByteSniffer.sniff(b"a,b,c\n1,2,3\n").as_deref(), Some("utf8"));
    }

    #[test]
    fn test_sniff_bom() {
        assert_eq!(
            ByteSniffer.sniff(&[0xEF, 0xBB, 0xBF, b'a']).as_deref(),
            Some("utf8")
        );
        assert_eq!(
            ByteSniffer.sniff(&[0xFF, 0xFE, b'a', 0]).as_deref(),
            Some("utf16le")
        );
    }

    #[test]
    fn test_sniff_latin1_fallback() {
        // 0xE9 is 'é' in Latin-1 but invalid standalone UTF-8
        assert_eq!(
            ByteSniffer.sniff(b"caf\xE9,1\n").as_deref(),
            Some("latin1")
        );
    }

    #[test]
    fn test_sniff_binary_refused() {
        assert_eq!(ByteSniffer.sniff(&[b'a', 0, b'b', 1, 2]), None);
        assert_eq!(ByteSniffer.sniff(&[]), None);
    }

    #[test]
    fn test_decode_latin1() {
        assert_eq!(decode(b"caf\xE9", "latin1"), "café");
    }

    #[test]
    fn test_decode_truncated_utf8_sample() {
        // 'é' is 0xC3 0xA9; cut after the lead byte
        assert!(valid_utf8_prefix(b"abc\xC3"));
        assert!(!valid_utf8_prefix(b"abc\xC3\x28"));
    }

    #[test]
    fn test_normalize_encoding() {
        assert_eq!(normalize_encoding("UTF-8"), "utf8");
        assert_eq!(normalize_encoding("ISO-8859-1"), "latin1");
        assert_eq!(normalize_encoding("UTF-16LE"), "utf16le");
    }
}
