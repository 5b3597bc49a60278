//! Parse events - the observable output of the streaming parser.

use std::fmt;

use serde::Serialize;

use crate::element::BlockKind;

/// Identifier of a block, unique for the lifetime of a parser instance
/// (until [`crate::StreamParser::reset`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Monotonic id source.
#[derive(Debug, Default)]
pub(crate) struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn next_id(&mut self) -> ElementId {
        self.next += 1;
        ElementId(self.next)
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// Inline reference recognised while a line was committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    /// `[text](url)`
    Link { text: String, url: String },

    /// Produced by a plugin matcher
    Custom { name: String, value: String },
}

/// One event in the ordered output stream.
///
/// For any element id there is exactly one `Begin`, then any number of
/// `Delta`s, then exactly one `End`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParseEvent {
    Begin {
        element_id: ElementId,
        element: BlockKind,
    },
    Delta {
        element_id: ElementId,
        content: String,
    },
    End {
        element_id: ElementId,
        final_content: String,
    },
    Annotation {
        element_id: ElementId,
        #[serde(flatten)]
        annotation: Annotation,
    },
}

impl ParseEvent {
    pub fn element_id(&self) -> ElementId {
        match self {
            ParseEvent::Begin { element_id, .. }
            | ParseEvent::Delta { element_id, .. }
            | ParseEvent::End { element_id, .. }
            | ParseEvent::Annotation { element_id, .. } => *element_id,
        }
    }

    pub fn is_begin(&self) -> bool {
        matches!(self, ParseEvent::Begin { .. })
    }

    pub fn is_end(&self) -> bool {
        matches!(self, ParseEvent::End { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic() {
        let mut ids = IdGenerator::default();
        let a = ids.next_id();
        let b = ids.next_id();
        assert!(b > a);
        ids.reset();
        assert_eq!(ids.next_id(), ElementId(1));
    }

    #[test]
    fn event_json_shape() {
        let begin = ParseEvent::Begin {
            element_id: ElementId(3),
            element: BlockKind::Header { level: 2 },
        };
        let json = serde_json::to_value(&begin).unwrap();
        assert_eq!(json["type"], "begin");
        assert_eq!(json["element_id"], 3);
        assert_eq!(json["element"]["element_type"], "header");
        assert_eq!(json["element"]["level"], 2);

        let note = ParseEvent::Annotation {
            element_id: ElementId(1),
            annotation: Annotation::Link {
                text: "docs".to_string(),
                url: "https://example.com".to_string(),
            },
        };
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "annotation",
                "element_id": 1,
                "kind": "link",
                "text": "docs",
                "url": "https://example.com",
            })
        );
    }
}
