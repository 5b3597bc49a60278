//! Block detectors.
//!
//! Every detector looks at the buffer from a line start and answers
//! `Matched`, `NoMatch`, or `Undecided` when the available prefix could still
//! go either way. Answers are monotone in the input: appending text never
//! turns a `Matched` into a `NoMatch` or vice versa, which is what keeps the
//! event stream independent of chunk boundaries.

use std::sync::Arc;

use crate::element::{Alignment, BlockKind};
use crate::matcher::{BlockMatcher, DetectedElement, Detection};
use crate::table::{is_separator_row, split_row};

/// Language reported for fences without an info string.
pub const DEFAULT_LANGUAGE: &str = "text";

/// One line at the front of the unconsumed buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Line<'a> {
    /// Line content without its terminator
    pub text: &'a str,

    /// Bytes covered, terminator included
    pub consumed: usize,

    /// Terminated by a newline, or the input has ended
    pub complete: bool,
}

impl Line<'_> {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

pub(crate) fn next_line(remaining: &str, eof: bool) -> Line<'_> {
    match remaining.find('\n') {
        Some(nl) => {
            let text = &remaining[..nl];
            Line {
                text: text.strip_suffix('\r').unwrap_or(text),
                consumed: nl + 1,
                complete: true,
            }
        }
        None if eof => Line {
            text: remaining.strip_suffix('\r').unwrap_or(remaining),
            consumed: remaining.len(),
            complete: true,
        },
        None => Line {
            text: remaining,
            consumed: remaining.len(),
            complete: false,
        },
    }
}

/// Leading indentation as `(columns, bytes)`. Tabs count as four columns.
pub(crate) fn indentation(text: &str) -> (usize, usize) {
    let mut columns = 0;
    let mut bytes = 0;
    for b in text.bytes() {
        match b {
            b' ' => columns += 1,
            b'\t' => columns += 4,
            _ => break,
        }
        bytes += 1;
    }
    (columns, bytes)
}

/// Decide whether a new block starts at the front of `remaining`.
///
/// Plugin matchers go first, then the builtins in fixed priority:
/// code fence, math, table, header, horizontal rule, list, quote.
/// When `eof` is set nothing can be undecided any more.
pub fn detect_block(remaining: &str, eof: bool, matchers: &[Arc<dyn BlockMatcher>]) -> Detection {
    for matcher in matchers {
        match matcher.detect(remaining) {
            Detection::NoMatch => continue,
            Detection::Undecided if eof => continue,
            found => return found,
        }
    }

    detect_builtin(remaining, eof)
}

/// True when `remaining` is a strict prefix of something a detector could
/// still match given more input.
pub fn might_be_block(remaining: &str, matchers: &[Arc<dyn BlockMatcher>]) -> bool {
    !remaining.is_empty() && detect_block(remaining, false, matchers).is_undecided()
}

fn detect_builtin(remaining: &str, eof: bool) -> Detection {
    let line = next_line(remaining, eof);
    let (indent, indent_bytes) = indentation(line.text);
    let body = &line.text[indent_bytes..];

    if body.is_empty() {
        // Whitespace so far: an indented marker may still follow.
        return if line.complete {
            Detection::NoMatch
        } else {
            Detection::Undecided
        };
    }

    if indent > 3 {
        return Detection::NoMatch;
    }

    let detectors: [fn(&Opening<'_>) -> Detection; 7] = [
        detect_fence,
        detect_math,
        detect_table,
        detect_header,
        detect_rule,
        detect_list,
        detect_quote,
    ];

    let opening = Opening {
        remaining,
        line,
        body,
        indent,
        indent_bytes,
        eof,
    };

    for detector in detectors {
        match detector(&opening) {
            Detection::NoMatch => continue,
            found => return found,
        }
    }

    Detection::NoMatch
}

/// Shared input of the builtin detectors.
struct Opening<'a> {
    remaining: &'a str,
    line: Line<'a>,
    /// First line after its indentation
    body: &'a str,
    indent: usize,
    indent_bytes: usize,
    eof: bool,
}

impl Opening<'_> {
    fn matched(&self, kind: BlockKind, start_marker: &str, consumed: usize) -> Detection {
        Detection::Matched(DetectedElement {
            kind,
            start_marker: start_marker.to_string(),
            consumed,
            indent: self.indent,
        })
    }
}

/// A fence opening or closing line: `(fence char, run length, info string)`.
pub(crate) fn parse_fence(body: &str) -> Option<(u8, usize, &str)> {
    let fence_char = *body.as_bytes().first()?;
    if fence_char != b'`' && fence_char != b'~' {
        return None;
    }
    let run = body.bytes().take_while(|&b| b == fence_char).count();
    if run < 3 {
        return None;
    }
    let info = body[run..].trim();
    if fence_char == b'`' && info.contains('`') {
        return None;
    }
    Some((fence_char, run, info))
}

fn detect_fence(o: &Opening<'_>) -> Detection {
    let first = o.body.as_bytes()[0];
    if first != b'`' && first != b'~' {
        return Detection::NoMatch;
    }

    let Some((_, _, info)) = parse_fence(o.body) else {
        // A short run with nothing after it may still grow into a fence.
        let run = o.body.bytes().take_while(|&b| b == first).count();
        return if !o.line.complete && run == o.body.len() {
            Detection::Undecided
        } else {
            Detection::NoMatch
        };
    };

    // Language runs to end of line.
    if !o.line.complete {
        return Detection::Undecided;
    }

    let language = if info.is_empty() {
        DEFAULT_LANGUAGE.to_string()
    } else {
        info.to_string()
    };

    o.matched(
        BlockKind::Code { language },
        o.body.trim_end(),
        o.line.consumed,
    )
}

fn detect_math(o: &Opening<'_>) -> Detection {
    if !o.body.starts_with('$') {
        return Detection::NoMatch;
    }
    if !o.body.starts_with("$$") {
        return if o.body.len() == 1 && !o.line.complete {
            Detection::Undecided
        } else {
            Detection::NoMatch
        };
    }
    if !o.line.complete {
        return Detection::Undecided;
    }

    let rest = o.body[2..].trim();
    let single_line = rest.len() >= 2 && rest.ends_with("$$");
    if rest.is_empty() || single_line {
        o.matched(BlockKind::Math, o.body.trim_end(), o.line.consumed)
    } else {
        Detection::NoMatch
    }
}

fn detect_table(o: &Opening<'_>) -> Detection {
    if !o.body.starts_with('|') {
        return Detection::NoMatch;
    }
    if !o.line.complete {
        return Detection::Undecided;
    }

    let header = split_row(o.body);
    if header.iter().all(|cell| cell.is_empty()) {
        return Detection::NoMatch;
    }

    let after_header = &o.remaining[o.line.consumed..];
    if after_header.is_empty() {
        return if o.eof {
            Detection::NoMatch
        } else {
            Detection::Undecided
        };
    }

    let sep = next_line(after_header, o.eof);
    let (_, sep_indent_bytes) = indentation(sep.text);
    let sep_body = sep.text[sep_indent_bytes..].trim_end();

    if !sep.complete {
        let plausible = sep_body
            .bytes()
            .all(|b| matches!(b, b'|' | b':' | b'-' | b' ' | b'\t'));
        return if plausible {
            Detection::Undecided
        } else {
            Detection::NoMatch
        };
    }

    if !sep_body.contains('|') || !is_separator_row(sep_body) {
        return Detection::NoMatch;
    }

    let cells = split_row(sep_body);
    if cells.len() != header.len() {
        return Detection::NoMatch;
    }

    let alignments: Vec<Alignment> = cells
        .iter()
        .map(|cell| Alignment::from_separator_cell(cell))
        .collect();

    let marker = format!("{}\n{}", o.body.trim_end(), sep_body);
    o.matched(
        BlockKind::Table { alignments },
        &marker,
        o.line.consumed + sep.consumed,
    )
}

fn detect_header(o: &Opening<'_>) -> Detection {
    let level = o.body.bytes().take_while(|&b| b == b'#').count();
    if level == 0 || level > 6 {
        return Detection::NoMatch;
    }

    let marker = &o.body[..level];
    match o.body.as_bytes().get(level) {
        None if o.line.complete => o.matched(
            BlockKind::Header { level: level as u8 },
            marker,
            o.indent_bytes + level,
        ),
        None => Detection::Undecided,
        Some(b' ') | Some(b'\t') => o.matched(
            BlockKind::Header { level: level as u8 },
            marker,
            o.indent_bytes + level + 1,
        ),
        Some(_) => Detection::NoMatch,
    }
}

/// A complete thematic break line such as `---` or `* * *`.
pub(crate) fn is_rule(body: &str) -> bool {
    let body = body.trim();
    let Some(marker) = body.bytes().next() else {
        return false;
    };
    if !matches!(marker, b'-' | b'*' | b'_') {
        return false;
    }
    let mut count = 0;
    for b in body.bytes() {
        if b == marker {
            count += 1;
        } else if b != b' ' && b != b'\t' {
            return false;
        }
    }
    count >= 3
}

fn detect_rule(o: &Opening<'_>) -> Detection {
    let marker = o.body.as_bytes()[0];
    if !matches!(marker, b'-' | b'*' | b'_') {
        return Detection::NoMatch;
    }

    if !o.line.complete {
        let plausible = o
            .body
            .bytes()
            .all(|b| b == marker || b == b' ' || b == b'\t');
        return if plausible {
            Detection::Undecided
        } else {
            Detection::NoMatch
        };
    }

    if is_rule(o.body) {
        o.matched(BlockKind::HorizontalRule, o.body.trim(), o.line.consumed)
    } else {
        Detection::NoMatch
    }
}

/// Maximum digits in an ordered list marker.
const MAX_LIST_MARKER_DIGITS: usize = 9;

/// Outcome of looking for a list marker at the start of `body`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListMarker {
    /// Marker found: `(ordered, marker length in bytes)`
    Found(bool, usize),
    /// A prefix of a marker, needs more input
    Partial,
    None,
}

pub(crate) fn list_marker(body: &str) -> ListMarker {
    let bytes = body.as_bytes();
    let (ordered, marker_len) = match bytes.first() {
        Some(b'-' | b'*' | b'+') => (false, 1),
        Some(b'0'..=b'9') => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits > MAX_LIST_MARKER_DIGITS {
                return ListMarker::None;
            }
            match bytes.get(digits) {
                Some(b'.' | b')') => (true, digits + 1),
                None => return ListMarker::Partial,
                Some(_) => return ListMarker::None,
            }
        }
        _ => return ListMarker::None,
    };

    match bytes.get(marker_len) {
        Some(b' ' | b'\t') => ListMarker::Found(ordered, marker_len),
        None => ListMarker::Partial,
        Some(_) => ListMarker::None,
    }
}

fn detect_list(o: &Opening<'_>) -> Detection {
    match list_marker(o.body) {
        ListMarker::Found(ordered, len) => {
            o.matched(BlockKind::List { ordered }, &o.body[..len], 0)
        }
        ListMarker::Partial if !o.line.complete => Detection::Undecided,
        _ => Detection::NoMatch,
    }
}

fn detect_quote(o: &Opening<'_>) -> Detection {
    if o.body.starts_with('>') {
        o.matched(BlockKind::Quote, ">", 0)
    } else {
        Detection::NoMatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> Detection {
        detect_block(text, false, &[])
    }

    fn kind(text: &str) -> Option<BlockKind> {
        match detect(text) {
            Detection::Matched(found) => Some(found.kind),
            _ => None,
        }
    }

    #[test]
    fn fence_needs_full_line() {
        assert!(detect("`").is_undecided());
        assert!(detect("``").is_undecided());
        assert!(detect("```py").is_undecided());
        assert_eq!(detect("``x"), Detection::NoMatch);
        assert_eq!(
            kind("```python\n"),
            Some(BlockKind::Code {
                language: "python".to_string()
            })
        );
        assert_eq!(
            kind("~~~\nx"),
            Some(BlockKind::Code {
                language: DEFAULT_LANGUAGE.to_string()
            })
        );
    }

    #[test]
    fn fence_keeps_custom_language() {
        assert_eq!(
            kind("```my-custom-tag\n"),
            Some(BlockKind::Code {
                language: "my-custom-tag".to_string()
            })
        );
    }

    #[test]
    fn header_detection() {
        assert!(detect("#").is_undecided());
        assert!(detect("   ##").is_undecided());
        assert_eq!(kind("## Title"), Some(BlockKind::Header { level: 2 }));
        assert_eq!(detect("#hashtag"), Detection::NoMatch);
        assert_eq!(detect("####### seven"), Detection::NoMatch);
        assert_eq!(kind("#\n"), Some(BlockKind::Header { level: 1 }));
    }

    #[test]
    fn rule_beats_list() {
        assert!(detect("-").is_undecided());
        assert!(detect("- ").is_undecided());
        assert!(detect("* * ").is_undecided());
        assert_eq!(kind("* * *\n"), Some(BlockKind::HorizontalRule));
        assert_eq!(kind("---\n"), Some(BlockKind::HorizontalRule));
        assert_eq!(kind("- item"), Some(BlockKind::List { ordered: false }));
        assert_eq!(kind("12. twelve"), Some(BlockKind::List { ordered: true }));
        assert!(detect("12").is_undecided());
        assert!(detect("12.").is_undecided());
        assert_eq!(detect("12a"), Detection::NoMatch);
        assert_eq!(detect("-x"), Detection::NoMatch);
    }

    #[test]
    fn table_needs_separator() {
        assert!(detect("|").is_undecided());
        assert!(detect("| A | B |").is_undecided());
        assert!(detect("| A | B |\n").is_undecided());
        assert!(detect("| A | B |\n|--").is_undecided());
        assert_eq!(detect("| A | B |\nnot a table\n"), Detection::NoMatch);
        assert_eq!(detect("| A | B |\n|---|\n"), Detection::NoMatch);
        assert_eq!(
            kind("| A | B |\n|:---|---:|\n"),
            Some(BlockKind::Table {
                alignments: vec![Alignment::Left, Alignment::Right]
            })
        );
        assert_eq!(detect_block("| A | B |\n", true, &[]), Detection::NoMatch);
    }

    #[test]
    fn math_detection() {
        assert!(detect("$").is_undecided());
        assert!(detect("$$").is_undecided());
        assert_eq!(detect("$5 bill"), Detection::NoMatch);
        assert_eq!(kind("$$\n"), Some(BlockKind::Math));
        assert_eq!(kind("$$ x^2 $$\n"), Some(BlockKind::Math));
        assert_eq!(detect("$$ x^2\n"), Detection::NoMatch);
    }

    #[test]
    fn quote_and_text() {
        assert_eq!(kind(">"), Some(BlockKind::Quote));
        assert_eq!(detect("Hello"), Detection::NoMatch);
        assert_eq!(detect("    # indented"), Detection::NoMatch);
        assert!(detect("   ").is_undecided());
    }

    #[test]
    fn might_be_block_is_strict_prefix() {
        assert!(might_be_block("`", &[]));
        assert!(might_be_block("|", &[]));
        assert!(!might_be_block("", &[]));
        assert!(!might_be_block("plain", &[]));
        assert!(!might_be_block("# done", &[]));
    }

    #[test]
    fn eof_resolves_everything() {
        for text in ["`", "#", "-", "| A |", "$$", "1.", "   "] {
            assert!(
                !detect_block(text, true, &[]).is_undecided(),
                "{text:?} still undecided at eof"
            );
        }
    }
}
