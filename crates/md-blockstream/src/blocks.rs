//! Processors for every block kind other than code and tables.

use std::collections::VecDeque;

use tracing::{trace, warn};

use crate::code;
use crate::config::ParserConfig;
use crate::detect::{
    detect_block, indentation, is_rule, list_marker, next_line, parse_fence, ListMarker,
    DEFAULT_LANGUAGE,
};
use crate::element::BlockKind;
use crate::event::ParseEvent;
use crate::matcher::{DetectedElement, Detection};
use crate::state::{BlockState, Detail, ParserState};
use crate::table;

/// Push a block for a detector match and consume its opening marker.
pub(crate) fn open_detected(
    state: &mut ParserState,
    config: &ParserConfig,
    found: DetectedElement,
    out: &mut VecDeque<ParseEvent>,
) {
    let DetectedElement {
        kind,
        start_marker,
        consumed,
        indent,
    } = found;

    match kind {
        BlockKind::Table { alignments } => {
            table::open(state, config, alignments, &start_marker, consumed, out);
        }
        BlockKind::Code { .. } => {
            let detail = Detail::Code(code::code_state(&start_marker, indent, false));
            state.open(kind, &start_marker, detail, out);
            state.advance(consumed);
        }
        BlockKind::Math => {
            let expr = start_marker
                .strip_prefix("$$")
                .and_then(|rest| rest.strip_suffix("$$"))
                .map(str::trim);
            match expr {
                Some(expr) => {
                    open_atomic(state, config, kind, &start_marker, expr, consumed, out);
                }
                None => {
                    state.open(kind, &start_marker, Detail::Math, out);
                    state.advance(consumed);
                }
            }
        }
        BlockKind::HorizontalRule => {
            open_atomic(state, config, kind, &start_marker, "", consumed, out);
        }
        BlockKind::Header { .. } => {
            state.open(kind, &start_marker, Detail::Header, out);
            state.advance(consumed);
        }
        BlockKind::List { .. } => {
            let detail = Detail::List {
                indent,
                pending_blanks: 0,
            };
            state.open(kind, &start_marker, detail, out);
            state.advance(consumed);
        }
        BlockKind::Quote => {
            state.open(kind, &start_marker, Detail::Quote { pending_blanks: 0 }, out);
            state.advance(consumed);
        }
        BlockKind::Custom { ref name, .. } => {
            let matcher = config.matchers.iter().find(|m| m.name() == name).cloned();
            match matcher {
                Some(matcher) => {
                    state.open(kind, &start_marker, Detail::Custom(matcher), out);
                    state.advance(consumed);
                }
                None => {
                    warn!("no matcher named {} is configured", name);
                    open_atomic(state, config, kind, &start_marker, "", consumed, out);
                }
            }
        }
        BlockKind::Text
        | BlockKind::TableHead
        | BlockKind::TableBody
        | BlockKind::Column { .. } => {
            unreachable!("detector produced {}", kind.name());
        }
    }
}

/// A single-line block: begins, carries `content` and ends at once.
fn open_atomic(
    state: &mut ParserState,
    config: &ParserConfig,
    kind: BlockKind,
    start_marker: &str,
    content: &str,
    consumed: usize,
    out: &mut VecDeque<ParseEvent>,
) {
    state.open(kind, start_marker, Detail::Atomic, out);
    let Some(block) = state.stack.last_mut() else {
        unreachable!("atomic block missing right after open");
    };
    block.content.push_str(content);
    state.advance(consumed);
    state.close_top(&config.matchers, out);
}

/// Advance whichever non-code block is innermost.
pub(crate) fn process(
    state: &mut ParserState,
    config: &ParserConfig,
    out: &mut VecDeque<ParseEvent>,
) {
    let Some(top) = state.stack.last() else {
        unreachable!("block processor with an empty stack");
    };

    match top.detail {
        Detail::Text => text(state, config, out),
        Detail::Header => header(state, config, out),
        Detail::List { .. } => list(state, config, out),
        Detail::Quote { .. } => quote(state, config, out),
        Detail::Table(_) => table::process(state, config, out),
        Detail::Math | Detail::Custom(_) => verbatim(state, config, out),
        Detail::Code(_) => code::process(state, config, out),
        Detail::Atomic => state.close_top(&config.matchers, out),
    }
}

/// The rest of the current line, or the partial line when nothing ends it
/// yet. Returns `(text, consumed, ends_line)`. A trailing `\r` is left
/// unconsumed until it is known whether a `\n` follows.
fn line_piece(remaining: &str, eof: bool) -> (&str, usize, bool) {
    match remaining.find('\n') {
        Some(nl) => {
            let text = &remaining[..nl];
            (text.strip_suffix('\r').unwrap_or(text), nl + 1, true)
        }
        None => {
            let text = remaining.strip_suffix('\r').unwrap_or(remaining);
            let consumed = if eof { remaining.len() } else { text.len() };
            (text, consumed, false)
        }
    }
}

/// Append the next piece of the current line to the innermost block.
/// Returns whether the line ended.
fn consume_inline(
    state: &mut ParserState,
    config: &ParserConfig,
    out: &mut VecDeque<ParseEvent>,
) -> bool {
    let (piece, consumed, ends_line) = line_piece(state.remaining(), state.eof);
    if consumed == 0 {
        return false;
    }
    let piece = piece.to_string();

    let Some(block) = state.stack.last_mut() else {
        unreachable!("block processor with an empty stack");
    };
    block.content.push_str(&piece);
    if ends_line {
        block.content.push('\n');
        block.annotate_pending(&config.matchers, out);
    }
    state.advance(consumed);
    ends_line
}

fn text(state: &mut ParserState, config: &ParserConfig, out: &mut VecDeque<ParseEvent>) {
    if state.at_line_start {
        let remaining = state.remaining();
        if remaining.is_empty() {
            return;
        }

        let line = next_line(remaining, state.eof);
        if line.is_blank() {
            if line.complete {
                let consumed = line.consumed;
                state.close_top(&config.matchers, out);
                state.advance(consumed);
            }
            return;
        }

        match detect_block(remaining, state.eof, &config.matchers) {
            Detection::Matched(found) => {
                trace!("{} interrupts text", found.kind.name());
                state.close_top(&config.matchers, out);
                return;
            }
            Detection::Undecided => {
                trace!("text continuation undecided at {}", state.processed);
                return;
            }
            Detection::NoMatch => {}
        }
    }

    consume_inline(state, config, out);
}

fn header(state: &mut ParserState, config: &ParserConfig, out: &mut VecDeque<ParseEvent>) {
    if consume_inline(state, config, out) {
        state.close_top(&config.matchers, out);
    }
}

/// Append a committed line, restoring blank lines held back before it.
fn push_line(block: &mut BlockState, pending_blanks: usize, line: &str) {
    for _ in 0..pending_blanks {
        block.content.push('\n');
    }
    block.content.push_str(line);
    block.content.push('\n');
}

fn list(state: &mut ParserState, config: &ParserConfig, out: &mut VecDeque<ParseEvent>) {
    let Some((text, consumed)) = state.complete_line() else {
        return;
    };
    let Some(block) = state.stack.last_mut() else {
        unreachable!("block processor with an empty stack");
    };
    let Detail::List {
        indent: base,
        pending_blanks,
    } = &mut block.detail
    else {
        unreachable!("list processor on {}", block.kind.name());
    };

    if text.trim().is_empty() {
        *pending_blanks += 1;
        state.advance(consumed);
        return;
    }

    // A marker of the other kind at the base indent starts a new list.
    let ordered = matches!(block.kind, BlockKind::List { ordered: true });
    let (indent, indent_bytes) = indentation(&text);
    let body = &text[indent_bytes..];
    let is_item = indent >= *base
        && matches!(list_marker(body), ListMarker::Found(o, _) if o == ordered)
        && !is_rule(body);
    let first = block.content.is_empty();

    if !(first || is_item || indent > *base) {
        state.close_top(&config.matchers, out);
        return;
    }

    let blanks = std::mem::take(pending_blanks);
    push_line(block, blanks, &text);
    block.annotate_pending(&config.matchers, out);
    block.emit_delta(out);
    state.advance(consumed);
}

fn quote(state: &mut ParserState, config: &ParserConfig, out: &mut VecDeque<ParseEvent>) {
    let Some((text, consumed)) = state.complete_line() else {
        return;
    };
    let Some(block) = state.stack.last_mut() else {
        unreachable!("block processor with an empty stack");
    };
    let Detail::Quote { pending_blanks } = &mut block.detail else {
        unreachable!("quote processor on {}", block.kind.name());
    };

    let Some(inner) = code::strip_quote_marker(&text) else {
        if text.trim().is_empty() {
            *pending_blanks += 1;
            state.advance(consumed);
        } else {
            state.close_top(&config.matchers, out);
        }
        return;
    };

    let blanks = std::mem::take(pending_blanks);
    push_line(block, blanks, inner);
    block.annotate_pending(&config.matchers, out);
    block.emit_delta(out);
    state.advance(consumed);

    // A fence inside the quote opens a code block above it.
    let (indent, indent_bytes) = indentation(inner);
    let body = inner[indent_bytes..].trim_end();
    if indent <= 3 {
        if let Some((_, _, info)) = parse_fence(body) {
            let language = if info.is_empty() {
                DEFAULT_LANGUAGE.to_string()
            } else {
                info.to_string()
            };
            let detail = Detail::Code(code::code_state(body, indent, true));
            state.open(BlockKind::Code { language }, body, detail, out);
        }
    }
}

/// Math and plugin blocks: every line verbatim until the closing line.
fn verbatim(state: &mut ParserState, config: &ParserConfig, out: &mut VecDeque<ParseEvent>) {
    let Some((text, consumed)) = state.complete_line() else {
        return;
    };
    let Some(block) = state.stack.last_mut() else {
        unreachable!("block processor with an empty stack");
    };

    let closes = match &block.detail {
        Detail::Math => text.trim() == "$$",
        Detail::Custom(matcher) => matcher.closes(&text),
        _ => unreachable!("verbatim processor on {}", block.kind.name()),
    };

    if closes {
        state.advance(consumed);
        state.close_top(&config.matchers, out);
        return;
    }

    block.content.push_str(&text);
    block.content.push('\n');
    block.emit_delta(out);
    state.advance(consumed);
}
