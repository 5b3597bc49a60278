//! Fenced code blocks.
//!
//! An open code block owns the cursor until its fence stack empties. Only a
//! bare fence of the innermost fence's character and length, no deeper than
//! it, closes that fence. Any other fence line opens a nested fence when it
//! carries an info string, uses the other fence character, or is longer.
//! Nested fence lines stay in the content verbatim.
//!
//! A nested fence that is never closed keeps the whole block open: inside
//! `~~~`, an unmatched ```` ```rust ```` line means a later `~~~` nests
//! again instead of closing, and the block runs until `complete()`.

use std::collections::VecDeque;

use tracing::trace;

use crate::config::ParserConfig;
use crate::detect::{indentation, parse_fence};
use crate::event::ParseEvent;
use crate::state::{CodeState, Detail, Fence, ParserState};

/// Fence state for a block opened by `marker`, the trimmed opening line.
pub(crate) fn code_state(marker: &str, indent: usize, quoted: bool) -> CodeState {
    let fences = parse_fence(marker)
        .map(|(fence_char, len, _)| Fence {
            fence_char,
            len,
            indent,
        })
        .into_iter()
        .collect();
    CodeState { fences, quoted }
}

/// Text after a `>` marker and one optional space.
pub(crate) fn strip_quote_marker(line: &str) -> Option<&str> {
    let (indent, indent_bytes) = indentation(line);
    if indent > 3 {
        return None;
    }
    let inner = line[indent_bytes..].strip_prefix('>')?;
    Some(inner.strip_prefix(' ').unwrap_or(inner))
}

enum FenceLine {
    Content,
    Closes,
}

/// Classify one line against the fence stack, updating it.
fn track_fences(code: &mut CodeState, line: &str) -> FenceLine {
    let (indent, indent_bytes) = indentation(line);
    let Some((fence_char, len, info)) = parse_fence(&line[indent_bytes..]) else {
        return FenceLine::Content;
    };

    let Some(top) = code.fences.last().copied() else {
        return FenceLine::Content;
    };

    let same_marker = top.fence_char == fence_char && top.len == len;
    if info.is_empty() && same_marker && indent <= top.indent {
        code.fences.pop();
        return if code.fences.is_empty() {
            FenceLine::Closes
        } else {
            FenceLine::Content
        };
    }

    if !info.is_empty() || top.fence_char != fence_char || len > top.len {
        code.fences.push(Fence {
            fence_char,
            len,
            indent,
        });
    }
    FenceLine::Content
}

/// Commit one complete line of the innermost code block.
///
/// The trailing partial line is held back: it may be the start of the
/// closing fence.
pub(crate) fn process(
    state: &mut ParserState,
    config: &ParserConfig,
    out: &mut VecDeque<ParseEvent>,
) {
    let Some((text, consumed)) = state.complete_line() else {
        return;
    };

    let depth = state.stack.len();
    let Some(block) = state.stack.last_mut() else {
        unreachable!("block processor with an empty stack");
    };
    let Detail::Code(code) = &mut block.detail else {
        unreachable!("code processor on {}", block.kind.name());
    };

    let line = if code.quoted {
        match strip_quote_marker(&text) {
            Some(inner) => inner,
            None => {
                // Quote ended; the enclosing quote decides what this line is.
                trace!("quoted code {} ends with its quote", block.id);
                state.close_top(&config.matchers, out);
                return;
            }
        }
    } else {
        text.as_str()
    };

    let quoted = code.quoted;
    let closes = matches!(track_fences(code, line), FenceLine::Closes);
    if !closes {
        block.content.push_str(line);
        block.content.push('\n');
        block.emit_delta(out);
    }

    if quoted && depth >= 2 {
        let quote = &mut state.stack[depth - 2];
        quote.content.push_str(line);
        quote.content.push('\n');
        quote.line_mark = quote.content.len();
    }

    state.advance(consumed);
    if closes {
        state.close_top(&config.matchers, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::BlockKind;

    #[test]
    fn nested_fences_close_innermost_first() {
        let mut code = code_state("````markdown", 0, false);
        assert!(matches!(track_fences(&mut code, "```python"), FenceLine::Content));
        assert_eq!(code.fences.len(), 2);
        assert!(matches!(track_fences(&mut code, "```"), FenceLine::Content));
        assert_eq!(code.fences.len(), 1);
        assert!(matches!(track_fences(&mut code, "```"), FenceLine::Content));
        assert!(matches!(track_fences(&mut code, "````"), FenceLine::Closes));
    }

    #[test]
    fn closing_fence_rules() {
        let mut code = code_state("~~~~", 0, false);
        assert!(matches!(track_fences(&mut code, "~~~"), FenceLine::Content));
        assert_eq!(code.fences.len(), 1);
        assert!(matches!(track_fences(&mut code, "~~~~~"), FenceLine::Content));
        assert_eq!(code.fences.len(), 2);
        assert!(matches!(track_fences(&mut code, "~~~~~"), FenceLine::Content));
        assert_eq!(code.fences.len(), 1);
        assert!(matches!(track_fences(&mut code, "~~~~"), FenceLine::Closes));

        let mut code = code_state("```", 2, false);
        assert!(matches!(track_fences(&mut code, "   ```"), FenceLine::Content));
        assert!(matches!(track_fences(&mut code, " ```"), FenceLine::Closes));
    }

    #[test]
    fn bare_longer_fence_nests() {
        let mut code = code_state("```", 0, false);
        assert!(matches!(track_fences(&mut code, "````"), FenceLine::Content));
        assert_eq!(code.fences.len(), 2);
        assert!(matches!(track_fences(&mut code, "```"), FenceLine::Content));
        assert_eq!(code.fences.len(), 2);
        assert!(matches!(track_fences(&mut code, "````"), FenceLine::Content));
        assert!(matches!(track_fences(&mut code, "```"), FenceLine::Closes));
    }

    #[test]
    fn other_fence_char_nests() {
        let mut code = code_state("~~~", 0, false);
        assert!(matches!(track_fences(&mut code, "```rust"), FenceLine::Content));
        assert!(matches!(track_fences(&mut code, "~~~"), FenceLine::Content));
        assert_eq!(code.fences.len(), 3);

        let mut code = code_state("~~~", 0, false);
        assert!(matches!(track_fences(&mut code, "```"), FenceLine::Content));
        assert!(matches!(track_fences(&mut code, "```"), FenceLine::Content));
        assert!(matches!(track_fences(&mut code, "~~~"), FenceLine::Closes));
    }

    #[test]
    #[should_panic(expected = "code processor on text")]
    fn code_processor_needs_code_block() {
        let mut state = ParserState::default();
        let mut out = VecDeque::new();
        state.buffer.push_str("plain\n");
        state.open(BlockKind::Text, "", Detail::Text, &mut out);
        process(&mut state, &ParserConfig::default(), &mut out);
    }

    #[test]
    fn quote_marker() {
        assert_eq!(strip_quote_marker("> code"), Some("code"));
        assert_eq!(strip_quote_marker(">  two"), Some(" two"));
        assert_eq!(strip_quote_marker(">"), Some(""));
        assert_eq!(strip_quote_marker("plain"), None);
        assert_eq!(strip_quote_marker("    > deep"), None);
    }
}
