//! Per-answer state machine over raw channel events.

use datachat_core::{
    AnswerBuffer, ChatError, DecodeRoute, Model, StreamEvent, StreamPayloadError,
    StreamTransportError, ThinkingDisplay,
};

use crate::view::ChatView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Init,
    Open,
    Closed,
}

/// How a closed stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    Failed(ChatError),
}

/// What the channel owner must do after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The event arrived after close and had no effect.
    Ignored,
    Close(StreamOutcome),
}

pub struct StreamConsumer {
    session_id: String,
    message_id: String,
    model: Model,
    state: ConsumerState,
    buffer: Option<AnswerBuffer>,
    display: ThinkingDisplay,
    dropped: usize,
}

impl StreamConsumer {
    pub fn new(session_id: impl Into<String>, message_id: impl Into<String>, model: Model) -> Self {
        Self {
            session_id: session_id.into(),
            message_id: message_id.into(),
            model,
            state: ConsumerState::Init,
            buffer: None,
            display: ThinkingDisplay::new(),
            dropped: 0,
        }
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn buffer(&self) -> Option<&AnswerBuffer> {
        self.buffer.as_ref()
    }

    /// Number of events dropped as unparseable.
    pub fn dropped_events(&self) -> usize {
        self.dropped
    }

    /// Channel is open. `Init -> Open`; later calls are no-ops.
    pub fn on_open(&mut self) {
        if self.state == ConsumerState::Init {
            log::debug!("[{}] Stream open", self.session_id);
            self.state = ConsumerState::Open;
        }
    }

    pub fn on_event(&mut self, raw: &str, view: &mut dyn ChatView) -> Flow {
        if self.state != ConsumerState::Open {
            log::debug!(
                "[{}] Ignoring event in {:?} state",
                self.session_id,
                self.state
            );
            return Flow::Ignored;
        }
        log::trace!("[{}] Raw event: {}", self.session_id, raw);

        let event = match StreamEvent::decode(raw) {
            Ok((event, DecodeRoute::Direct)) => event,
            Ok((event, DecodeRoute::Recovered)) => {
                log::info!("[{}] Parsed event after stripping framing", self.session_id);
                event
            }
            Err(err) => {
                self.dropped += 1;
                log::warn!(
                    "[{}] Dropping unparseable event ({}): {:?}",
                    self.session_id,
                    err.reason,
                    err.raw
                );
                view.warn(&err.to_string());
                return Flow::Continue;
            }
        };

        match event {
            StreamEvent::Done => {
                log::info!("[{}] Received [DONE]", self.session_id);
                self.close(StreamOutcome::Completed)
            }
            StreamEvent::Error(message) => {
                log::error!("[{}] Stream payload error: {}", self.session_id, message);
                view.show_error(&message);
                self.close(StreamOutcome::Failed(StreamPayloadError { message }.into()))
            }
            StreamEvent::Fragment { text, kind } => {
                if text.is_empty() {
                    return Flow::Continue;
                }
                match self.buffer.as_mut() {
                    Some(buffer) => buffer.push(&text, kind),
                    None => {
                        view.create_answer(&self.message_id, self.model);
                        self.buffer = Some(AnswerBuffer::new(self.message_id.clone(), &text, kind));
                    }
                }
                if let Some(buffer) = self.buffer.as_ref() {
                    let html = buffer.render(&self.display);
                    view.update_answer(buffer, &html);
                }
                Flow::Continue
            }
        }
    }

    pub fn on_transport_error(&mut self, err: StreamTransportError, view: &mut dyn ChatView) -> Flow {
        if self.state == ConsumerState::Closed {
            return Flow::Ignored;
        }
        log::error!("[{}] Stream transport error: {}", self.session_id, err.detail());
        view.show_error(&err.to_string());
        self.close(StreamOutcome::Failed(err.into()))
    }

    fn close(&mut self, outcome: StreamOutcome) -> Flow {
        self.state = ConsumerState::Closed;
        Flow::Close(outcome)
    }

    /// Flip a thinking block and re-render the current answer.
    pub fn toggle_thinking(&mut self, index: usize, view: &mut dyn ChatView) {
        self.display.toggle(index);
        if let Some(buffer) = self.buffer.as_ref() {
            let html = buffer.render(&self.display);
            view.update_answer(buffer, &html);
        }
    }

    /// Consume the consumer, returning the final answer text if any arrived.
    pub fn into_answer(self) -> Option<String> {
        self.buffer.map(|buffer| buffer.text().to_string())
    }

    /// The answer and its thinking display state, kept past close so the
    /// rendered answer can still be re-rendered.
    pub fn into_parts(self) -> Option<(AnswerBuffer, ThinkingDisplay)> {
        let display = self.display;
        self.buffer.map(|buffer| (buffer, display))
    }
}
