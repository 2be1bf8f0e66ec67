//! Logical-line assembly and entry splitting.

use std::str::Lines;

use crate::error::PropertiesError;

const fn is_blank(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\u{000C}')
}

/// Yields every `(key, value)` entry in `text`, in order of appearance.
pub(crate) fn entries(
    text: &str,
) -> impl Iterator<Item = Result<(String, String), PropertiesError>> + '_ {
    LogicalLines::new(text).map(|(line, content)| parse_entry(line, &content))
}

/// Joins continued physical lines and drops comments and blank lines.
struct LogicalLines<'a> {
    lines: Lines<'a>,
    next_line: usize,
}

impl<'a> LogicalLines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            next_line: 1,
        }
    }

    fn next_physical(&mut self) -> Option<&'a str> {
        let line = self.lines.next()?;
        self.next_line += 1;
        Some(line.trim_start_matches(is_blank))
    }
}

impl Iterator for LogicalLines<'_> {
    type Item = (usize, String);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let start = self.next_line;
            let first = self.next_physical()?;
            if first.is_empty() || first.starts_with(['#', '!']) {
                continue;
            }

            let mut logical = String::new();
            let mut current = first;
            loop {
                match strip_continuation(current) {
                    Some(body) => {
                        logical.push_str(body);
                        match self.next_physical() {
                            Some(following) => current = following,
                            None => break,
                        }
                    }
                    None => {
                        logical.push_str(current);
                        break;
                    }
                }
            }
            return Some((start, logical));
        }
    }
}

/// Returns the line without its continuation marker when it ends in an odd
/// number of backslashes.
fn strip_continuation(line: &str) -> Option<&str> {
    let trailing = line.chars().rev().take_while(|ch| *ch == '\\').count();
    if trailing.is_multiple_of(2) {
        None
    } else {
        line.strip_suffix('\\')
    }
}

fn parse_entry(line: usize, logical: &str) -> Result<(String, String), PropertiesError> {
    let (raw_key, rest) = logical.split_at(key_end(logical));
    let after_blanks = rest.trim_start_matches(is_blank);
    let raw_value = after_blanks
        .strip_prefix(['=', ':'])
        .map_or(after_blanks, |value| value.trim_start_matches(is_blank));
    Ok((unescape(raw_key, line)?, unescape(raw_value, line)?))
}

fn key_end(logical: &str) -> usize {
    let mut escaped = false;
    for (index, ch) in logical.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '=' || ch == ':' || is_blank(ch) {
            return index;
        }
    }
    logical.len()
}

fn unescape(raw: &str, line: usize) -> Result<String, PropertiesError> {
    let mut decoded = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            decoded.push(ch);
            continue;
        }
        match chars.next() {
            Some('t') => decoded.push('\t'),
            Some('n') => decoded.push('\n'),
            Some('r') => decoded.push('\r'),
            Some('f') => decoded.push('\u{000C}'),
            Some('u') => {
                let digits: String = chars.by_ref().take(4).collect();
                decoded.push(decode_unicode(&digits, line)?);
            }
            Some(other) => decoded.push(other),
            // A dangling backslash at the end of input carries no character.
            None => {}
        }
    }
    Ok(decoded)
}

fn decode_unicode(digits: &str, line: usize) -> Result<char, PropertiesError> {
    let invalid = |message: String| PropertiesError::InvalidEscape { line, message };
    if digits.len() != 4 || !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(invalid(format!(
            "expected four hex digits after \\u, got '{digits}'"
        )));
    }
    let code = u32::from_str_radix(digits, 16)
        .map_err(|_| invalid(format!("'{digits}' is not hexadecimal")))?;
    char::from_u32(code).ok_or_else(|| invalid(format!("U+{code:04X} is not a valid character")))
}
