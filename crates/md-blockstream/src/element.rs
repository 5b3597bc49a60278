//! Block kinds - what a `begin` event announces.

use serde::{Deserialize, Serialize};

/// Column alignment for table cells, taken from the separator row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// `---` or `:---`
    #[default]
    Left,
    /// `:---:`
    Center,
    /// `---:`
    Right,
}

impl Alignment {
    /// Alignment of a single separator cell such as `:---:`.
    pub fn from_separator_cell(cell: &str) -> Self {
        let cell = cell.trim();
        match (cell.starts_with(':'), cell.ends_with(':') && cell.len() > 1) {
            (true, true) => Alignment::Center,
            (false, true) => Alignment::Right,
            _ => Alignment::Left,
        }
    }

    /// The separator cell that reproduces this alignment.
    pub fn separator(self) -> &'static str {
        match self {
            Alignment::Left => "---",
            Alignment::Center => ":---:",
            Alignment::Right => "---:",
        }
    }
}

/// A block being streamed, with only the metadata relevant to its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "element_type", rename_all = "snake_case")]
pub enum BlockKind {
    /// Ordinary prose, the fallback container
    Text,

    /// ATX heading with level (1-6)
    Header { level: u8 },

    /// Fenced code block. `language` is the info string, `"text"` when absent.
    Code { language: String },

    /// Bullet or numbered list
    List { ordered: bool },

    /// Blockquote
    Quote,

    /// Pipe table
    Table { alignments: Vec<Alignment> },

    /// Thematic break (---, ***, ___)
    HorizontalRule,

    /// Display math between `$$` lines
    Math,

    /// Structured table header section
    #[serde(rename = "thead")]
    TableHead,

    /// Structured table body section
    #[serde(rename = "tbody")]
    TableBody,

    /// Structured table cell
    #[serde(rename = "col")]
    Column { index: usize, alignment: Alignment },

    /// Block opened by a plugin matcher
    Custom { name: String, info: String },
}

impl BlockKind {
    /// The element type tag reported to consumers.
    pub fn name(&self) -> &str {
        match self {
            BlockKind::Text => "text",
            BlockKind::Header { .. } => "header",
            BlockKind::Code { .. } => "code",
            BlockKind::List { .. } => "list",
            BlockKind::Quote => "quote",
            BlockKind::Table { .. } => "table",
            BlockKind::HorizontalRule => "horizontal_rule",
            BlockKind::Math => "math",
            BlockKind::TableHead => "thead",
            BlockKind::TableBody => "tbody",
            BlockKind::Column { .. } => "col",
            BlockKind::Custom { name, .. } => name,
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self, BlockKind::Code { .. })
    }

    /// Kinds whose partial lines are never flushed at a chunk boundary;
    /// they only surface content once a full line boundary is seen.
    pub fn needs_line_boundary(&self) -> bool {
        matches!(
            self,
            BlockKind::Code { .. } | BlockKind::List { .. } | BlockKind::Quote
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_from_separator() {
        assert_eq!(Alignment::from_separator_cell("---"), Alignment::Left);
        assert_eq!(Alignment::from_separator_cell(" :--- "), Alignment::Left);
        assert_eq!(Alignment::from_separator_cell(":---:"), Alignment::Center);
        assert_eq!(Alignment::from_separator_cell("---:"), Alignment::Right);
        assert_eq!(Alignment::from_separator_cell(":"), Alignment::Left);
    }

    #[test]
    fn kind_names() {
        assert_eq!(BlockKind::HorizontalRule.name(), "horizontal_rule");
        assert_eq!(
            BlockKind::Column {
                index: 0,
                alignment: Alignment::Left
            }
            .name(),
            "col"
        );
        let custom = BlockKind::Custom {
            name: "callout".to_string(),
            info: String::new(),
        };
        assert_eq!(custom.name(), "callout");
    }
}
