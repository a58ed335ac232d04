//! Answer text to sanitized HTML.
//!
//! Model text is escaped before any markup is produced, so nothing the
//! model returns can inject a raw tag. Fenced code blocks and inline code
//! spans are lifted out into placeholders before the emphasis rules run
//! and are put back last.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::answer::ContentKind;

const MARK: char = '\u{E000}';

lazy_static! {
    static ref FENCED_CODE: Regex = Regex::new(r"(?s)```(.*?)```").expect("valid regex");
    static ref FENCE_LANGUAGE: Regex = Regex::new(r"^([a-zA-Z0-9]+)\n").expect("valid regex");
    static ref INLINE_CODE: Regex = Regex::new(r"`([^`\x{E000}]+)`").expect("valid regex");
    static ref HEADING: Regex = Regex::new(r"(?m)^#+ (.*)$").expect("valid regex");
    static ref BOLD: Regex = Regex::new(r"\*\*(.*?)\*\*").expect("valid regex");
    static ref ITALIC: Regex = Regex::new(r"\*(.*?)\*").expect("valid regex");
    static ref BLANK_LINE: Regex = Regex::new(r"\n\s*\n").expect("valid regex");
    static ref PLACEHOLDER: Regex = Regex::new(r"\x{E000}([BC])(\d+)\x{E000}").expect("valid regex");
    static ref THINKING_BLOCK: Regex =
        Regex::new(r"(?is)&lt;(thinking|think)&gt;(.*?)&lt;/(thinking|think)&gt;").expect("valid regex");
}

pub fn escape_html(unsafe_text: &str) -> String {
    let mut out = String::with_capacity(unsafe_text.len());
    for ch in unsafe_text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

/// Display state of one thinking block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThinkingState {
    Expanded,
    Collapsed,
}

impl ThinkingState {
    /// Label of the toggle control.
    pub fn label(&self) -> &'static str {
        match self {
            ThinkingState::Expanded => "Collapse",
            ThinkingState::Collapsed => "Expand",
        }
    }
}

/// Presentation-only collapse state of thinking blocks, by ordinal.
///
/// Blocks default to expanded. Toggling never touches answer text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThinkingDisplay {
    collapsed: BTreeSet<usize>,
}

impl ThinkingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, index: usize) -> ThinkingState {
        if self.collapsed.contains(&index) {
            ThinkingState::Collapsed
        } else {
            ThinkingState::Expanded
        }
    }

    /// Flip one block and return its new state.
    pub fn toggle(&mut self, index: usize) -> ThinkingState {
        if !self.collapsed.remove(&index) {
            self.collapsed.insert(index);
        }
        self.state(index)
    }
}

/// Render basic markdown to HTML.
pub fn render_markdown(text: &str) -> String {
    let mut lifted = Lifted::default();
    let body = lifted.markdown_body(text);
    lifted.restore(&body)
}

/// Render an accumulated answer, wrapping thinking regions when `kind` is
/// [`ContentKind::Thinking`].
pub fn render_answer(text: &str, kind: ContentKind, display: &ThinkingDisplay) -> String {
    let mut lifted = Lifted::default();
    let mut body = lifted.markdown_body(text);
    if kind == ContentKind::Thinking {
        body = wrap_thinking(&body, display);
    }
    lifted.restore(&body)
}

#[derive(Default)]
struct Lifted {
    blocks: Vec<String>,
    spans: Vec<String>,
}

impl Lifted {
    fn markdown_body(&mut self, text: &str) -> String {
        let text: String = text.chars().filter(|c| *c != MARK).collect();

        let text = FENCED_CODE.replace_all(&text, |caps: &Captures| {
            let code = &caps[1];
            let html = match FENCE_LANGUAGE.captures(code) {
                Some(lang) => {
                    let language = &lang[1];
                    let content = &code[lang[0].len()..];
                    format!(
                        "<pre><code class=\"language-{language}\">{}</code></pre>",
                        escape_html(content)
                    )
                }
                None => format!("<pre><code>{}</code></pre>", escape_html(code)),
            };
            self.blocks.push(html);
            format!("{MARK}B{}{MARK}", self.blocks.len() - 1)
        });

        let text = escape_html(&text);

        let text = INLINE_CODE.replace_all(&text, |caps: &Captures| {
            self.spans.push(format!("<code>{}</code>", &caps[1]));
            format!("{MARK}C{}{MARK}", self.spans.len() - 1)
        });

        let text = HEADING.replace_all(&text, "<h2>${1}</h2>");
        let text = BOLD.replace_all(&text, "<strong>${1}</strong>");
        let text = ITALIC.replace_all(&text, "<em>${1}</em>");
        let text = BLANK_LINE.replace_all(&text, "<br><br>");
        text.replace('\n', "<br>")
    }

    fn restore(&self, body: &str) -> String {
        PLACEHOLDER
            .replace_all(body, |caps: &Captures| {
                let index: usize = caps[2].parse().unwrap_or(usize::MAX);
                let stash = if &caps[1] == "B" { &self.blocks } else { &self.spans };
                stash.get(index).cloned().unwrap_or_default()
            })
            .into_owned()
    }
}

fn wrap_thinking(body: &str, display: &ThinkingDisplay) -> String {
    let mut index = 0usize;
    THINKING_BLOCK
        .replace_all(body, |caps: &Captures| {
            let state = display.state(index);
            index += 1;
            let class = match state {
                ThinkingState::Expanded => "thinking-content",
                ThinkingState::Collapsed => "thinking-content collapsed",
            };
            format!(
                "<div class=\"{class}\" data-thinking-index=\"{}\">{}<button class=\"toggle-thinking\" type=\"button\">{}</button></div>",
                index - 1,
                caps[2].trim(),
                state.label()
            )
        })
        .into_owned()
}
