//! Delimited-row tokenizer
//!
//! Splits one physical line into ordered field values given a literal
//! delimiter and an optional quote character. Input is consumed one line at
//! a time, so embedded newlines inside a quoted field are not supported.
//! Malformed quoting never raises; it yields a best-effort split.

/// Tokenize one line. Empty tokens (consecutive delimiters, or a delimiter
/// at line start/end) become `None` rather than an empty string.
///
/// A field beginning and ending with the quote character has its outer
/// quotes stripped and everything between them, delimiters included,
/// preserved verbatim. Unquoted delimiters always split.
pub fn tokenize(line: &str, delimiter: &str, quote: Option<char>) -> Vec<Option<String>> {
    if delimiter.is_empty() {
        return vec![finish_token(line.to_string())];
    }

    let mut tokens = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut i = 0;

    while i < line.len() {
        if !in_quotes && line[i..].starts_with(delimiter) {
            tokens.push(finish_token(std::mem::take(&mut buf)));
            at_field_start = true;
            i += delimiter.len();
            continue;
        }

        let c = line[i..].chars().next().unwrap_or('\0');
        if let Some(q) = quote {
            if c == q {
                if at_field_start && !in_quotes {
                    in_quotes = true;
                    at_field_start = false;
                    i += c.len_utf8();
                    continue;
                }
                if in_quotes {
                    let rest = &line[i + c.len_utf8()..];
                    if rest.is_empty() || rest.starts_with(delimiter) {
                        // closing quote; the delimiter or line end follows
                        in_quotes = false;
                        i += c.len_utf8();
                        continue;
                    }
                    // stray quote mid-field, keep it literally
                }
            }
        }

        at_field_start = false;
        buf.push(c);
        i += c.len_utf8();
    }

    tokens.push(finish_token(buf));
    tokens
}

fn finish_token(token: String) -> Option<String> {
    if token.is_empty() { None } else { Some(token) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(tokens: Vec<Option<String>>) -> Vec<Option<&'static str>> {
        tokens
            .into_iter()
            .map(|t| t.map(|s| &*Box::leak(s.into_boxed_str())))
            .collect()
    }

    #[test]
    fn test_quoted_field_keeps_delimiter() {
        let tokens = tokenize("1,\"a,b\",3", ",", Some('"'));
        assert_eq!(strs(tokens), vec![Some("1"), Some("a,b"), Some("3")]);
    }

    #[test]
    fn test_unquoted_split() {
        let tokens = tokenize("a\tb\tc", "\t", None);
        assert_eq!(strs(tokens), vec![Some("a"), Some("b"), Some("c")]);
    }

    #[test]
    fn test_empty_tokens_become_none() {
        let tokens = tokenize(",a,,b,", ",", None);
        assert_eq!(strs(tokens), vec![None, Some("a"), None, Some("b"), None]);
    }

    #[test]
    fn test_quote_char_ignored_when_unset() {
        let tokens = tokenize("\"a\",b", ",", None);
        assert_eq!(strs(tokens), vec![Some("\"a\""), Some("b")]);
    }

    #[test]
    fn test_stray_quote_is_literal() {
        let tokens = tokenize("it\"s,fine", ",", Some('"'));
        assert_eq!(strs(tokens), vec![Some("it\"s"), Some("fine")]);
    }

    #[test]
    fn test_quoted_empty_field_is_none() {
        let tokens = tokenize("a,\"\",c", ",", Some('"'));
        assert_eq!(strs(tokens), vec![Some("a"), None, Some("c")]);
    }

    #[test]
    fn test_single_column_line() {
        let tokens = tokenize("only", ",", Some('"'));
        assert_eq!(strs(tokens), vec![Some("only")]);
    }
}
