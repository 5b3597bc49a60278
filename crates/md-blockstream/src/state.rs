//! Parser state: the unconsumed buffer, the cursor and the open block stack.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::detect::next_line;
use crate::element::{Alignment, BlockKind};
use crate::event::{Annotation, ElementId, IdGenerator, ParseEvent};
use crate::inline::scan_links;
use crate::matcher::BlockMatcher;

/// Consumed bytes kept before the buffer is compacted.
const COMPACT_THRESHOLD: usize = 8 * 1024;

/// An open fence within a code block. Nested fences stack up so the
/// innermost one is matched first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fence {
    pub fence_char: u8,
    pub len: usize,
    pub indent: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct CodeState {
    /// Outermost fence first
    pub fences: Vec<Fence>,

    /// Lines carry a `>` prefix; the enclosing quote sits below on the stack
    pub quoted: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TableState {
    pub columns: usize,
    pub alignments: Vec<Alignment>,
    pub body: Option<ElementId>,
}

/// Processor state, one variant per block kind that needs any.
#[derive(Debug, Clone)]
pub(crate) enum Detail {
    Text,
    Header,
    Code(CodeState),
    List { indent: usize, pending_blanks: usize },
    Quote { pending_blanks: usize },
    Table(TableState),
    Math,
    Custom(Arc<dyn BlockMatcher>),
    Atomic,
}

/// An open block on the stack.
#[derive(Debug, Clone)]
pub(crate) struct BlockState {
    pub id: ElementId,
    pub kind: BlockKind,
    pub start_marker: String,

    /// Buffer offset where the block's raw content begins
    pub content_start: usize,

    /// Content committed so far, before the per-kind view is applied
    pub content: String,

    /// Bytes of `view()` already surfaced as deltas
    pub last_emitted: usize,

    /// Start of the line currently being committed, for annotations
    pub line_mark: usize,

    pub detail: Detail,
}

impl BlockState {
    /// The block's transformed content. Every view is a prefix of the view
    /// the same block will have once more input is committed.
    pub fn view(&self) -> &str {
        match &self.detail {
            Detail::Text | Detail::List { .. } | Detail::Quote { .. } => {
                self.content.trim_end_matches('\n')
            }
            Detail::Header => header_view(&self.content),
            Detail::Code(_) | Detail::Math | Detail::Custom(_) => self
                .content
                .strip_suffix('\n')
                .unwrap_or(&self.content),
            Detail::Table(_) | Detail::Atomic => &self.content,
        }
    }

    /// Push whatever part of the view has not been emitted yet.
    pub fn emit_delta(&mut self, out: &mut VecDeque<ParseEvent>) {
        let view = self.view();
        if view.len() <= self.last_emitted {
            return;
        }
        let Some(fresh) = view.get(self.last_emitted..) else {
            unreachable!("delta split inside a character");
        };
        out.push_back(ParseEvent::Delta {
            element_id: self.id,
            content: fresh.to_string(),
        });
        self.last_emitted = view.len();
    }

    /// Annotate everything committed since the last mark, then move the mark.
    pub fn annotate_pending(
        &mut self,
        matchers: &[Arc<dyn BlockMatcher>],
        out: &mut VecDeque<ParseEvent>,
    ) {
        if self.line_mark >= self.content.len() {
            return;
        }
        let line = &self.content[self.line_mark..];
        let mut found = scan_links(line);
        for matcher in matchers {
            found.extend(
                matcher
                    .annotations(line)
                    .into_iter()
                    .map(|(name, value)| Annotation::Custom { name, value }),
            );
        }
        self.line_mark = self.content.len();

        if found.is_empty() {
            return;
        }
        self.emit_delta(out);
        out.extend(found.into_iter().map(|annotation| ParseEvent::Annotation {
            element_id: self.id,
            annotation,
        }));
    }

    pub fn annotates(&self) -> bool {
        matches!(
            self.detail,
            Detail::Text | Detail::Header | Detail::List { .. } | Detail::Quote { .. }
        )
    }
}

/// Heading text without surrounding whitespace or a closing `#` sequence.
fn header_view(raw: &str) -> &str {
    let text = raw.trim();
    let without_hashes = text.trim_end_matches('#');
    if without_hashes.len() == text.len() {
        return text;
    }
    if without_hashes.is_empty() {
        return without_hashes;
    }
    if without_hashes.ends_with([' ', '\t']) {
        return without_hashes.trim_end();
    }
    text
}

/// Everything one parser instance owns.
#[derive(Debug)]
pub(crate) struct ParserState {
    pub buffer: String,

    /// Offset up to which the buffer has been assigned to blocks
    pub processed: usize,

    pub at_line_start: bool,

    pub stack: Vec<BlockState>,

    pub ids: IdGenerator,

    /// Set by `complete()`: no more input is coming
    pub eof: bool,
}

impl Default for ParserState {
    fn default() -> Self {
        Self {
            buffer: String::new(),
            processed: 0,
            at_line_start: true,
            stack: Vec::new(),
            ids: IdGenerator::default(),
            eof: false,
        }
    }
}

impl ParserState {
    pub fn remaining(&self) -> &str {
        &self.buffer[self.processed..]
    }

    /// Advance the cursor by `n` bytes.
    pub fn advance(&mut self, n: usize) {
        assert!(self.processed + n <= self.buffer.len(), "advance past buffered input");
        if n == 0 {
            return;
        }
        self.processed += n;
        self.at_line_start = self.buffer.as_bytes()[self.processed - 1] == b'\n';
    }

    /// The next line when it is complete, owned so the stack can be
    /// mutated while it is in hand. `None` when more input is needed.
    pub fn complete_line(&self) -> Option<(String, usize)> {
        let remaining = self.remaining();
        if remaining.is_empty() {
            return None;
        }
        let line = next_line(remaining, self.eof);
        line.complete.then(|| (line.text.to_string(), line.consumed))
    }

    /// Push a new block and announce it.
    pub fn open(
        &mut self,
        kind: BlockKind,
        start_marker: &str,
        detail: Detail,
        out: &mut VecDeque<ParseEvent>,
    ) -> ElementId {
        let id = self.ids.next_id();
        debug!("open {} {} at {}", kind.name(), id, self.processed);
        out.push_back(ParseEvent::Begin {
            element_id: id,
            element: kind.clone(),
        });
        self.stack.push(BlockState {
            id,
            kind,
            start_marker: start_marker.to_string(),
            content_start: self.processed,
            content: String::new(),
            last_emitted: 0,
            line_mark: 0,
            detail,
        });
        id
    }

    /// Pop the innermost block, flushing its remaining content.
    pub fn close_top(
        &mut self,
        matchers: &[Arc<dyn BlockMatcher>],
        out: &mut VecDeque<ParseEvent>,
    ) {
        let Some(mut block) = self.stack.pop() else {
            unreachable!("close with empty block stack");
        };

        if block.annotates() {
            block.annotate_pending(matchers, out);
        }
        if let Detail::Table(table) = &block.detail {
            if let Some(body) = table.body {
                out.push_back(ParseEvent::End {
                    element_id: body,
                    final_content: String::new(),
                });
            }
        }

        block.emit_delta(out);
        debug!(
            "close {} {} opened by {:?}",
            block.kind.name(),
            block.id,
            block.start_marker
        );
        out.push_back(ParseEvent::End {
            element_id: block.id,
            final_content: block.view().to_string(),
        });
    }

    /// Drop the consumed prefix once nothing open points into it.
    pub fn compact(&mut self) {
        let floor = self
            .stack
            .iter()
            .map(|block| block.content_start)
            .fold(self.processed, usize::min);

        if floor < COMPACT_THRESHOLD {
            return;
        }

        trace!("compacting {} consumed bytes", floor);
        self.buffer.drain(..floor);
        self.processed -= floor;
        for block in &mut self.stack {
            block.content_start -= floor;
        }
    }

    /// Forget the session's text and blocks. Ids keep counting.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.processed = 0;
        self.at_line_start = true;
        self.stack.clear();
        self.eof = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_view_strips_closing_sequence() {
        assert_eq!(header_view("  Title  "), "Title");
        assert_eq!(header_view("Title ##"), "Title");
        assert_eq!(header_view("Title#"), "Title#");
        assert_eq!(header_view("C# and F# "), "C# and F#");
        assert_eq!(header_view("###"), "");
    }

    #[test]
    fn compaction_keeps_open_content() {
        let mut state = ParserState::default();
        state.buffer = "x".repeat(COMPACT_THRESHOLD + 10);
        state.processed = COMPACT_THRESHOLD + 5;
        state.compact();
        assert_eq!(state.processed, 0);
        assert_eq!(state.buffer.len(), 5);
    }

    #[test]
    #[should_panic(expected = "close with empty block stack")]
    fn close_without_open_block() {
        let mut state = ParserState::default();
        state.close_top(&[], &mut VecDeque::new());
    }

    #[test]
    #[should_panic(expected = "advance past buffered input")]
    fn advance_past_buffer() {
        let mut state = ParserState::default();
        state.buffer.push_str("ab");
        state.advance(3);
    }
}
