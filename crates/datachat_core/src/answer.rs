use serde::{Deserialize, Serialize};

use crate::render::{render_answer, ThinkingDisplay};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Plain,
    Thinking,
}

/// Running answer for one message.
///
/// Text only ever grows; the buffer is dropped when its stream closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerBuffer {
    message_id: String,
    text: String,
    fragments: usize,
    kind: ContentKind,
}

impl AnswerBuffer {
    /// Start a buffer from its first fragment.
    pub fn new(message_id: impl Into<String>, first: &str, kind: ContentKind) -> Self {
        let mut buffer = Self {
            message_id: message_id.into(),
            text: String::new(),
            fragments: 0,
            kind: ContentKind::Plain,
        };
        buffer.push(first, kind);
        buffer
    }

    /// Append a fragment in arrival order.
    ///
    /// Once any fragment is marked thinking the buffer stays thinking, so a
    /// later plain fragment does not un-collapse an already rendered block.
    pub fn push(&mut self, fragment: &str, kind: ContentKind) {
        self.text.push_str(fragment);
        self.fragments += 1;
        if kind == ContentKind::Thinking {
            self.kind = ContentKind::Thinking;
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    /// Render the whole accumulated text, not just the latest delta.
    pub fn render(&self, display: &ThinkingDisplay) -> String {
        render_answer(&self.text, self.kind, display)
    }
}
