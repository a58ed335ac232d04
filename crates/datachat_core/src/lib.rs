//! datachat_core - Core types for the data chat client
//!
//! This crate has no I/O. It provides:
//! - `context` - DataContext, the preview snapshot a question is grounded on
//! - `prompt` - deterministic prompt composition
//! - `session` - Model, SessionRequest, ChatSession
//! - `event` - decoding of stream payloads into StreamEvent
//! - `answer` - AnswerBuffer accumulation
//! - `render` - sanitized markdown and thinking-block rendering
//! - `report` - report listing types
//! - `error` - the error taxonomy

pub mod answer;
pub mod context;
pub mod error;
pub mod event;
pub mod prompt;
pub mod render;
pub mod report;
pub mod session;

// Re-export commonly used types
pub use answer::{AnswerBuffer, ContentKind};
pub use context::{DataContext, PreviewResponse, DEFAULT_SAMPLE_ROWS};
pub use error::{
    ChatError, ContextFetchError, SessionCreateError, StreamParseError, StreamPayloadError,
    StreamTransportError,
};
pub use event::{DecodeRoute, StreamEvent, DONE_SENTINEL};
pub use prompt::build_prompt;
pub use render::{escape_html, render_answer, render_markdown, ThinkingDisplay, ThinkingState};
pub use report::{Report, ReportFile, ReportKind};
pub use session::{ChatSession, Model, SessionRequest, SessionResponse};
