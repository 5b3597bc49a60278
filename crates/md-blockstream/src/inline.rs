//! Inline reference scanning for annotation events.
//!
//! Spans are not tokenized - block content is passed through verbatim.
//! This only spots references worth surfacing alongside it.

use crate::event::Annotation;

/// Find `[text](url)` links in a single committed line.
///
/// Code spans are skipped, and images (`![alt](src)`) are not links.
pub fn scan_links(line: &str) -> Vec<Annotation> {
    let mut found = Vec::new();
    let bytes = line.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'`' => {
                let count = bytes[i..].iter().take_while(|&&b| b == b'`').count();
                let start = i + count;
                match find_closing_backticks(&line[start..], count) {
                    Some(end) => i = start + end + count,
                    // Unclosed code span, rest of the line is literal
                    None => i = start,
                }
            }
            b'\\' => i += 2,
            b'!' if bytes.get(i + 1) == Some(&b'[') => {
                // Skip over the image so its alt text isn't read as a link
                i += match parse_link(&line[i + 1..]) {
                    Some((_, _, len)) => 1 + len,
                    None => 2,
                };
            }
            b'[' => match parse_link(&line[i..]) {
                Some((text, url, len)) => {
                    found.push(Annotation::Link { text, url });
                    i += len;
                }
                None => i += 1,
            },
            _ => i += 1,
        }
    }

    found
}

/// Find closing backticks matching the opening count.
fn find_closing_backticks(text: &str, count: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'`' {
            let run = bytes[i..].iter().take_while(|&&b| b == b'`').count();
            if run == count {
                return Some(i);
            }
            i += run;
        } else {
            i += 1;
        }
    }
    None
}

/// Parse a link starting with `[`.
/// Returns `(text, url, total_bytes_consumed)`.
fn parse_link(text: &str) -> Option<(String, String, usize)> {
    if !text.starts_with('[') {
        return None;
    }

    let mut bracket_depth = 0;
    let mut bracket_end = None;

    for (i, c) in text.char_indices() {
        match c {
            '[' => bracket_depth += 1,
            ']' => {
                bracket_depth -= 1;
                if bracket_depth == 0 {
                    bracket_end = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }

    let bracket_end = bracket_end?;
    let link_text = &text[1..bracket_end];

    let rest = &text[bracket_end + 1..];
    if !rest.starts_with('(') {
        return None;
    }

    let mut paren_depth = 0;
    let mut paren_end = None;

    for (i, c) in rest.char_indices() {
        match c {
            '(' => paren_depth += 1,
            ')' => {
                paren_depth -= 1;
                if paren_depth == 0 {
                    paren_end = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }

    let paren_end = paren_end?;
    let url = rest[1..paren_end].trim();
    if url.is_empty() || url.contains(char::is_whitespace) {
        return None;
    }

    // [ + text + ] + ( + url + )
    let total = bracket_end + 1 + paren_end + 1;

    Some((link_text.to_string(), url.to_string(), total))
}
