use datachat_core::{AnswerBuffer, Model};

/// The conversation surface a controller drives.
///
/// Implementations own presentation only. They never see raw stream
/// payloads, just decoded fragments as rendered HTML.
pub trait ChatView {
    fn add_user_message(&mut self, text: &str);

    /// A complete AI message that did not come from a stream (the greeting).
    fn add_ai_message(&mut self, model: Model, text: &str, html: &str);

    fn show_typing_indicator(&mut self);

    /// Create the element an answer renders into. Replaces the typing indicator.
    fn create_answer(&mut self, message_id: &str, model: Model);

    /// Replace the answer element's content with `html`, the rendering of
    /// the whole of `buffer`.
    fn update_answer(&mut self, buffer: &AnswerBuffer, html: &str);

    /// Distinct error element. Replaces the typing indicator.
    fn show_error(&mut self, message: &str);

    /// Recoverable problem that does not end the answer.
    fn warn(&mut self, message: &str);

    fn set_input_enabled(&mut self, enabled: bool);

    fn focus_input(&mut self);
}
