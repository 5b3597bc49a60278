//! Parser configuration.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::matcher::BlockMatcher;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown table output mode '{0}', expected 'flat' or 'structured'")]
    UnknownTableMode(String),
}

/// How tables are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableOutputMode {
    /// One `table` element whose content is the normalized rows
    #[default]
    Flat,

    /// Flat output plus nested `thead`/`tbody`/`col` elements
    Structured,
}

impl FromStr for TableOutputMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(TableOutputMode::Flat),
            "structured" => Ok(TableOutputMode::Structured),
            _ => Err(ConfigError::UnknownTableMode(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParserConfig {
    pub table_output_mode: TableOutputMode,

    /// Tried in order before any builtin detector
    pub matchers: Vec<Arc<dyn BlockMatcher>>,
}

impl ParserConfig {
    pub fn with_table_output_mode(mut self, mode: TableOutputMode) -> Self {
        self.table_output_mode = mode;
        self
    }

    pub fn with_matcher(mut self, matcher: impl BlockMatcher + 'static) -> Self {
        self.matchers.push(Arc::new(matcher));
        self
    }

    pub fn structured_tables(&self) -> bool {
        self.table_output_mode == TableOutputMode::Structured
    }
}
