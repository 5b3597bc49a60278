//! Pluggable block matchers, consulted before the builtin detectors.

use std::fmt;

use crate::element::BlockKind;

/// What a detector found at a block boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedElement {
    /// Must be a kind that opens a block. `Text` and the table parts are
    /// produced by the parser itself; a detector returning one panics.
    pub kind: BlockKind,

    /// Literal opening delimiter text (fence line, list marker, `#` run, ...)
    pub start_marker: String,

    /// Bytes of the remaining buffer taken by the opening marker
    pub consumed: usize,

    /// Leading indentation of the opening line, in columns
    pub indent: usize,
}

/// Result of inspecting the remaining buffer at a block boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    Matched(DetectedElement),

    /// More input could change the answer. Not the same as `NoMatch`.
    Undecided,

    NoMatch,
}

impl Detection {
    pub fn is_undecided(&self) -> bool {
        matches!(self, Detection::Undecided)
    }
}

/// A user-supplied block kind.
///
/// Matchers see the buffer from a line start. `detect` must be monotone:
/// once it answers `Matched` or `NoMatch` for some text, it must give the
/// same answer for every extension of that text. Anything else breaks
/// chunk-boundary independence.
///
/// A matched plugin block owns every following line verbatim until
/// [`BlockMatcher::closes`] accepts one; the closing line is consumed and
/// not part of the content.
pub trait BlockMatcher: Send + Sync {
    /// Element type reported in `begin` events.
    fn name(&self) -> &str;

    fn detect(&self, remaining: &str) -> Detection;

    /// `line` has its line terminator removed.
    fn closes(&self, line: &str) -> bool;

    /// Inline references this matcher recognises in ordinary text lines,
    /// as `(name, value)` pairs.
    fn annotations(&self, _line: &str) -> Vec<(String, String)> {
        Vec::new()
    }
}

impl fmt::Debug for dyn BlockMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockMatcher")
            .field("name", &self.name())
            .finish()
    }
}

/// A fenced container such as `:::note` ... `:::`.
///
/// The text after the opening fence becomes the block's `info`.
#[derive(Debug, Clone)]
pub struct FencedContainer {
    name: String,
    fence: String,
}

impl FencedContainer {
    pub fn new(name: impl Into<String>, fence: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fence: fence.into(),
        }
    }
}

impl BlockMatcher for FencedContainer {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&self, remaining: &str) -> Detection {
        let (line, terminated) = match remaining.find('\n') {
            Some(nl) => (&remaining[..nl], true),
            None => (remaining, false),
        };

        if line.len() < self.fence.len() {
            return if !terminated && self.fence.starts_with(line) {
                Detection::Undecided
            } else {
                Detection::NoMatch
            };
        }

        if !line.starts_with(&self.fence) {
            return Detection::NoMatch;
        }

        if !terminated {
            return Detection::Undecided;
        }

        Detection::Matched(DetectedElement {
            kind: BlockKind::Custom {
                name: self.name.clone(),
                info: line[self.fence.len()..].trim().to_string(),
            },
            start_marker: line.to_string(),
            consumed: line.len() + 1,
            indent: 0,
        })
    }

    fn closes(&self, line: &str) -> bool {
        line.trim_end() == self.fence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_container_waits_for_line() {
        let m = FencedContainer::new("note", ":::");
        assert_eq!(m.detect(":"), Detection::Undecided);
        assert_eq!(m.detect(":::warn"), Detection::Undecided);
        assert_eq!(m.detect(":x"), Detection::NoMatch);

        let Detection::Matched(found) = m.detect(":::warn\nbody") else {
            panic!("expected match");
        };
        assert_eq!(found.consumed, 8);
        assert_eq!(
            found.kind,
            BlockKind::Custom {
                name: "note".to_string(),
                info: "warn".to_string()
            }
        );
        assert!(m.closes(":::"));
        assert!(!m.closes("::: more"));
    }
}
