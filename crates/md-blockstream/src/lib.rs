//! Streaming block parser for markdown arriving in chunks.
//!
//! Designed for chat interfaces where markdown arrives token-by-token and
//! needs to be rendered progressively. Input is turned into a stream of
//! `begin`/`delta`/`end` events per block; inline spans are passed through
//! verbatim.

mod blocks;
mod code;
mod config;
mod detect;
mod element;
mod event;
mod inline;
mod matcher;
mod parser;
mod state;
mod table;

pub use config::{ConfigError, ParserConfig, TableOutputMode};
pub use detect::{detect_block, might_be_block, DEFAULT_LANGUAGE};
pub use element::{Alignment, BlockKind};
pub use event::{Annotation, ElementId, ParseEvent};
pub use inline::scan_links;
pub use matcher::{BlockMatcher, DetectedElement, Detection, FencedContainer};
pub use parser::{Events, StreamParser};
pub use table::{is_separator_row, split_row};
