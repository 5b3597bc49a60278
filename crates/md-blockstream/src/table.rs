//! Pipe tables.
//!
//! The flat `table` element carries the normalized rows. In structured mode
//! the same rows are also surfaced as `thead`/`tbody` sections of `col`
//! elements, one per cell.

use std::collections::VecDeque;

use tracing::trace;

use crate::config::ParserConfig;
use crate::detect::indentation;
use crate::element::{Alignment, BlockKind};
use crate::event::{ElementId, IdGenerator, ParseEvent};
use crate::state::{Detail, ParserState, TableState};

/// Split a row into trimmed cells. Outer pipes are optional and `\|` is a
/// literal pipe inside a cell.
pub fn split_row(row: &str) -> Vec<String> {
    let row = row.trim();
    let row = row.strip_prefix('|').unwrap_or(row);
    let row = match row.strip_suffix('|') {
        Some(inner) if !inner.ends_with('\\') => inner,
        _ => row,
    };

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = row.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                cell.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());

    cells
}

/// A delimiter row such as `|:---|---:|`.
pub fn is_separator_row(row: &str) -> bool {
    split_row(row).iter().all(|cell| {
        let dashes = cell.strip_prefix(':').unwrap_or(cell);
        let dashes = dashes.strip_suffix(':').unwrap_or(dashes);
        !dashes.is_empty() && dashes.bytes().all(|b| b == b'-')
    })
}

/// Pad or truncate to the table's column count.
fn normalize(mut cells: Vec<String>, columns: usize) -> Vec<String> {
    cells.resize(columns, String::new());
    cells
}

fn format_row(cells: &[String]) -> String {
    let cells: Vec<String> = cells
        .iter()
        .map(|cell| cell.replace('|', "\\|"))
        .collect();
    format!("| {} |", cells.join(" | "))
}

/// Emit a complete `col` element for every cell of a row.
fn emit_columns(
    ids: &mut IdGenerator,
    cells: &[String],
    alignments: &[Alignment],
    out: &mut VecDeque<ParseEvent>,
) {
    for (index, (cell, alignment)) in cells.iter().zip(alignments).enumerate() {
        let element_id = ids.next_id();
        out.push_back(ParseEvent::Begin {
            element_id,
            element: BlockKind::Column {
                index,
                alignment: *alignment,
            },
        });
        if !cell.is_empty() {
            out.push_back(ParseEvent::Delta {
                element_id,
                content: cell.clone(),
            });
        }
        out.push_back(ParseEvent::End {
            element_id,
            final_content: cell.clone(),
        });
    }
}

fn open_section(
    ids: &mut IdGenerator,
    kind: BlockKind,
    out: &mut VecDeque<ParseEvent>,
) -> ElementId {
    let element_id = ids.next_id();
    out.push_back(ParseEvent::Begin {
        element_id,
        element: kind,
    });
    element_id
}

/// Open a table from its detected header and separator rows.
pub(crate) fn open(
    state: &mut ParserState,
    config: &ParserConfig,
    alignments: Vec<Alignment>,
    start_marker: &str,
    consumed: usize,
    out: &mut VecDeque<ParseEvent>,
) {
    let columns = alignments.len();
    let header_line = start_marker
        .split_once('\n')
        .map_or(start_marker, |(header, _)| header);
    let header = normalize(split_row(header_line), columns);
    let separator: Vec<String> = alignments
        .iter()
        .map(|alignment| alignment.separator().to_string())
        .collect();

    let detail = Detail::Table(TableState {
        columns,
        alignments: alignments.clone(),
        body: None,
    });
    state.open(
        BlockKind::Table {
            alignments: alignments.clone(),
        },
        start_marker,
        detail,
        out,
    );
    state.advance(consumed);

    let ParserState { stack, ids, .. } = &mut *state;
    let Some(block) = stack.last_mut() else {
        unreachable!("table missing right after open");
    };
    block.content = format!("{}\n{}", format_row(&header), format_row(&separator));
    block.emit_delta(out);

    if config.structured_tables() {
        let head = open_section(ids, BlockKind::TableHead, out);
        emit_columns(ids, &header, &alignments, out);
        out.push_back(ParseEvent::End {
            element_id: head,
            final_content: String::new(),
        });
    }
}

/// Commit body rows until a line that is blank or not a pipe row.
pub(crate) fn process(
    state: &mut ParserState,
    config: &ParserConfig,
    out: &mut VecDeque<ParseEvent>,
) {
    let Some((text, consumed)) = state.complete_line() else {
        return;
    };

    let (indent, indent_bytes) = indentation(&text);
    let body = text[indent_bytes..].trim_end();
    if indent > 3 || !body.starts_with('|') {
        trace!("table ends at {:?}", body);
        state.close_top(&config.matchers, out);
        return;
    }

    let ParserState { stack, ids, .. } = &mut *state;
    let Some(block) = stack.last_mut() else {
        unreachable!("block processor with an empty stack");
    };
    let Detail::Table(table) = &mut block.detail else {
        unreachable!("table processor on {}", block.kind.name());
    };

    let cells = normalize(split_row(body), table.columns);
    if config.structured_tables() {
        if table.body.is_none() {
            table.body = Some(open_section(ids, BlockKind::TableBody, out));
        }
        let alignments = table.alignments.clone();
        emit_columns(ids, &cells, &alignments, out);
    }

    block.content.push('\n');
    block.content.push_str(&format_row(&cells));
    block.emit_delta(out);
    state.advance(consumed);
}
