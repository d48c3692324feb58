/*
 * lexical.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Spans of stylesheet text that are not expressions.
//!
//! Both the function rewrite (on SCSS input) and precision rounding (on CSS
//! output) must leave comments, quoted strings and `url(...)` tokens alone.
//! Interpolation inside a quoted string (`"#{...}"`) is code again.

use std::ops::Range;

/// Byte ranges of comments, quoted strings and unquoted `url(...)` tokens.
///
/// `//` comments are only recognized when `line_comments` is set; CSS has
/// none, and a bare `//` there is part of a value.
pub fn inert_spans(source: &str, line_comments: bool) -> Vec<Range<usize>> {
    let bytes = source.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = source[i + 2..]
                    .find("*/")
                    .map_or(bytes.len(), |at| i + 2 + at + 2);
                spans.push(i..end);
                i = end;
            }
            b'/' if line_comments && bytes.get(i + 1) == Some(&b'/') => {
                let end = source[i..].find('\n').map_or(bytes.len(), |at| i + at);
                spans.push(i..end);
                i = end;
            }
            quote @ (b'"' | b'\'') => i = quoted(source, i, quote, &mut spans),
            b'u' | b'U' if is_url_start(source, i) => {
                let open = i + 4;
                match unquoted_url_end(bytes, open) {
                    Some(end) => {
                        spans.push(i..end);
                        i = end;
                    }
                    None => i = open,
                }
            }
            _ => i += 1,
        }
    }
    spans
}

/// Whether byte `at` falls inside one of `spans` (sorted, disjoint).
pub fn in_spans(spans: &[Range<usize>], at: usize) -> bool {
    let idx = spans.partition_point(|span| span.end <= at);
    spans.get(idx).is_some_and(|span| span.start <= at)
}

/// Record the string starting at `start`, splitting around `#{...}`. Returns
/// the index just past the closing quote.
fn quoted(source: &str, start: usize, quote: u8, spans: &mut Vec<Range<usize>>) -> usize {
    let bytes = source.as_bytes();
    let mut segment = start;
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'#' if bytes.get(i + 1) == Some(&b'{') => {
                spans.push(segment..i);
                let end = interpolation_end(bytes, i + 2);
                segment = end;
                i = end;
            }
            b if b == quote => {
                spans.push(segment..i + 1);
                return i + 1;
            }
            _ => i += 1,
        }
    }
    let end = bytes.len();
    spans.push(segment..end);
    end
}

fn interpolation_end(bytes: &[u8], from: usize) -> usize {
    let mut depth = 0usize;
    for (offset, b) in bytes[from..].iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' if depth == 0 => return from + offset,
            b'}' => depth -= 1,
            _ => {}
        }
    }
    bytes.len()
}

fn is_url_start(source: &str, at: usize) -> bool {
    let Some(head) = source.get(at..at + 4) else {
        return false;
    };
    if !head.eq_ignore_ascii_case("url(") {
        return false;
    }
    source[..at]
        .chars()
        .next_back()
        .is_none_or(|c| !(c.is_alphanumeric() || c == '-' || c == '_'))
}

/// End of an unquoted `url(...)` whose contents start at `open`; `None` for
/// quoted or interpolated urls, which are handled as ordinary tokens.
fn unquoted_url_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut i = open;
    while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
        i += 1;
    }
    if matches!(bytes.get(i), Some(b'"' | b'\'')) {
        return None;
    }
    while i < bytes.len() {
        match bytes[i] {
            b')' => return Some(i + 1),
            b'#' if bytes.get(i + 1) == Some(&b'{') => return None,
            b'\\' => i += 2,
            _ => i += 1,
        }
    }
    None
}
