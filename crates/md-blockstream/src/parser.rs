//! Core streaming parser implementation.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::blocks;
use crate::code;
use crate::config::ParserConfig;
use crate::detect::{detect_block, next_line};
use crate::element::BlockKind;
use crate::event::{ElementId, ParseEvent};
use crate::matcher::Detection;
use crate::state::{Detail, ParserState};

/// Incremental block parser for streaming markdown.
///
/// Text arrives through [`StreamParser::process_chunk`] in pieces of any
/// size. Each call returns a lazy iterator of [`ParseEvent`]s; the parser
/// only does work while that iterator is pulled. The sequence of blocks
/// and their final content never depends on where chunk boundaries fall.
///
/// A session ends with [`StreamParser::complete`], which closes every open
/// block. Blocks still open when the caller simply stops feeding input are
/// never ended.
pub struct StreamParser {
    config: ParserConfig,

    state: ParserState,

    /// Events computed but not yet pulled
    queue: VecDeque<ParseEvent>,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config,
            state: ParserState::default(),
            queue: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Append a chunk and return the events it makes available.
    pub fn process_chunk(&mut self, chunk: &str) -> Events<'_> {
        self.state.buffer.push_str(chunk);
        Events {
            parser: self,
            finishing: false,
            done: false,
        }
    }

    /// End the session: flush and close every open block.
    ///
    /// Afterwards the parser is ready for a new session. Element ids keep
    /// counting up.
    pub fn complete(&mut self) -> Events<'_> {
        self.state.eof = true;
        Events {
            parser: self,
            finishing: true,
            done: false,
        }
    }

    /// Discard all state, including open blocks, without emitting anything.
    pub fn reset(&mut self) {
        self.state.clear();
        self.state.ids.reset();
        self.queue.clear();
    }

    /// Parse a complete document in one go.
    pub fn parse(text: &str) -> Vec<ParseEvent> {
        Self::parse_with_config(text, ParserConfig::default())
    }

    pub fn parse_with_config(text: &str, config: ParserConfig) -> Vec<ParseEvent> {
        let mut parser = Self::with_config(config);
        let mut events: Vec<ParseEvent> = parser.process_chunk(text).collect();
        events.extend(parser.complete());
        events
    }

    /// Check if we're currently inside a code block.
    pub fn in_code_block(&self) -> bool {
        self.state.stack.iter().any(|block| block.kind.is_code())
    }

    /// Blocks opened but not yet ended, outermost first.
    pub fn open_blocks(&self) -> impl Iterator<Item = (ElementId, &BlockKind)> + '_ {
        self.state.stack.iter().map(|block| (block.id, &block.kind))
    }

    /// Bytes received but not yet assigned to any block.
    pub fn buffered_len(&self) -> usize {
        self.state.buffer.len() - self.state.processed
    }

    /// One iteration of the driving loop. Returns whether anything moved.
    fn step(&mut self) -> bool {
        let before = (
            self.state.processed,
            self.state.stack.len(),
            self.state.at_line_start,
        );

        let Self {
            config,
            state,
            queue,
        } = &mut *self;

        // An open fence owns the cursor; nothing may interrupt it.
        match state.stack.last().map(|top| top.kind.is_code()) {
            Some(true) => code::process(state, config, queue),
            Some(false) => blocks::process(state, config, queue),
            None => idle(state, config, queue),
        }

        before
            != (
                self.state.processed,
                self.state.stack.len(),
                self.state.at_line_start,
            )
    }

    /// Chunk exhausted: surface what is safe to show before more arrives.
    fn flush(&mut self) {
        for block in &mut self.state.stack {
            if !block.kind.needs_line_boundary() {
                block.emit_delta(&mut self.queue);
            }
        }
        self.state.compact();
    }

    /// Input ended: close everything, innermost first, and start over.
    fn finish(&mut self) {
        debug!(
            "completing with {} open blocks, {} bytes unconsumed",
            self.state.stack.len(),
            self.buffered_len()
        );
        while !self.state.stack.is_empty() {
            self.state.close_top(&self.config.matchers, &mut self.queue);
        }
        self.state.clear();
    }
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}

/// No block is open: skip blank lines, then detect what starts here.
fn idle(state: &mut ParserState, config: &ParserConfig, out: &mut VecDeque<ParseEvent>) {
    let remaining = state.remaining();
    if remaining.is_empty() {
        return;
    }

    let line = next_line(remaining, state.eof);
    if line.is_blank() {
        if line.complete {
            let consumed = line.consumed;
            state.advance(consumed);
        }
        return;
    }

    match detect_block(remaining, state.eof, &config.matchers) {
        Detection::Matched(found) => blocks::open_detected(state, config, found, out),
        Detection::Undecided => {
            trace!("lookahead stall at {}: {:?}", state.processed, state.remaining());
        }
        Detection::NoMatch => {
            state.open(BlockKind::Text, "", Detail::Text, out);
            state.at_line_start = false;
        }
    }
}

/// Events produced by one [`StreamParser::process_chunk`] or
/// [`StreamParser::complete`] call.
///
/// Work happens as the iterator is pulled. Dropping it early still
/// finishes the call's work; unpulled events are handed out by the next
/// call instead.
pub struct Events<'a> {
    parser: &'a mut StreamParser,
    finishing: bool,
    done: bool,
}

impl Iterator for Events<'_> {
    type Item = ParseEvent;

    fn next(&mut self) -> Option<ParseEvent> {
        loop {
            if let Some(event) = self.parser.queue.pop_front() {
                return Some(event);
            }
            if self.done {
                return None;
            }
            if !self.parser.step() {
                self.wrap_up();
            }
        }
    }
}

impl Events<'_> {
    fn wrap_up(&mut self) {
        if self.finishing {
            self.parser.finish();
        } else {
            self.parser.flush();
        }
        self.done = true;
    }
}

impl Drop for Events<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        while self.parser.step() {}
        self.wrap_up();
    }
}
