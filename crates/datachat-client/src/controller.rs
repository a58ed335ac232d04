//! Lifecycle controller: owns the single stream slot and the input state.

use std::collections::HashMap;
use std::future::Future;

use datachat_core::{
    build_prompt, render_markdown, AnswerBuffer, ChatError, ChatSession, Model, SessionRequest,
    StreamTransportError, ThinkingDisplay,
};
use tokio_util::sync::CancellationToken;

use crate::backend::{ChatBackend, EventChannel};
use crate::config::ClientConfig;
use crate::consumer::{Flow, StreamConsumer, StreamOutcome};
use crate::view::ChatView;

/// One open channel bound to the session of a single question.
pub struct StreamHandle {
    session: ChatSession,
    channel: Box<dyn EventChannel>,
    consumer: StreamConsumer,
}

impl StreamHandle {
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn consumer(&self) -> &StreamConsumer {
        &self.consumer
    }
}

/// Result of one `submit`. Errors have already been shown in the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty text, or a question was already in flight.
    Ignored,
    Completed {
        message_id: String,
        answer: Option<String>,
    },
    Failed(ChatError),
    /// Torn down before the answer finished.
    Cancelled,
}

enum Begin {
    Opened,
    Ignored,
    Cancelled,
    Failed(ChatError),
}

pub struct ChatController<B: ChatBackend, V: ChatView> {
    backend: B,
    view: V,
    model: Model,
    task_id: String,
    file_name: String,
    active: Option<StreamHandle>,
    /// Closed answers by message id, for re-rendering on toggle.
    answers: HashMap<String, (AnswerBuffer, ThinkingDisplay)>,
    last_answer_id: Option<String>,
    waiting: bool,
    message_counter: u64,
}

async fn unless_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}

impl<B: ChatBackend, V: ChatView> ChatController<B, V> {
    pub fn new(
        backend: B,
        view: V,
        model: Model,
        task_id: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            view,
            model,
            task_id: task_id.into(),
            file_name: file_name.into(),
            active: None,
            answers: HashMap::new(),
            last_answer_id: None,
            waiting: false,
            message_counter: 0,
        }
    }

    /// Build from configuration. A missing task id or file name is shown as
    /// an error element and returned along with the view.
    pub fn from_config(backend: B, mut view: V, config: &ClientConfig) -> Result<Self, (ChatError, V)> {
        match config.target() {
            Ok((task_id, file_name)) => {
                Ok(Self::new(backend, view, config.model, task_id, file_name))
            }
            Err(err) => {
                log::error!("{}", err);
                view.show_error(&err.to_string());
                Err((err, view))
            }
        }
    }

    /// Greet the user and hand them the input.
    pub fn start(&mut self) {
        let greeting = format!(
            "I am your AI assistant and can help you analyze the data file \"{}\". Ask me anything about the data!",
            self.file_name
        );
        self.view
            .add_ai_message(self.model, &greeting, &render_markdown(&greeting));
        self.restore_input();
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn set_model(&mut self, model: Model) {
        log::info!("Selected model: {}", model);
        self.model = model;
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn active(&self) -> Option<&StreamHandle> {
        self.active.as_ref()
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// Message id of the most recent answer that rendered any text.
    pub fn last_answer_id(&self) -> Option<&str> {
        self.last_answer_id.as_deref()
    }

    /// Ask one question and drive its answer to completion.
    ///
    /// `cancel` is the teardown signal: observed while negotiating (the
    /// in-flight response is discarded) and while streaming (the channel
    /// is closed).
    pub async fn submit(&mut self, text: &str, cancel: &CancellationToken) -> SendOutcome {
        match self.begin(text, cancel).await {
            Begin::Opened => self.drive(cancel).await,
            Begin::Ignored => SendOutcome::Ignored,
            Begin::Cancelled => SendOutcome::Cancelled,
            Begin::Failed(err) => SendOutcome::Failed(err),
        }
    }

    async fn begin(&mut self, text: &str, cancel: &CancellationToken) -> Begin {
        let message = text.trim();
        if message.is_empty() || self.waiting {
            return Begin::Ignored;
        }

        self.view.add_user_message(message);
        self.message_counter += 1;
        let message_id = format!("response-{}", self.message_counter);
        self.view.show_typing_indicator();
        self.waiting = true;
        self.view.set_input_enabled(false);

        let context = match unless_cancelled(
            cancel,
            self.backend.fetch_context(&self.task_id, &self.file_name),
        )
        .await
        {
            None => return self.cancelled_during_negotiation(),
            Some(Ok(context)) => context,
            Some(Err(err)) => return self.fail(err.into()),
        };

        let request = SessionRequest {
            message: build_prompt(message, &context, &self.file_name),
            model: self.model,
            task_id: self.task_id.clone(),
            file_name: self.file_name.clone(),
        };

        self.close_active();

        let session = match unless_cancelled(cancel, self.backend.create_session(&request)).await {
            None => return self.cancelled_during_negotiation(),
            Some(Ok(session)) => session,
            Some(Err(err)) => return self.fail(err.into()),
        };

        if cancel.is_cancelled() {
            return self.cancelled_during_negotiation();
        }

        match self.open_stream(session, message_id).await {
            Ok(()) => Begin::Opened,
            Err(err) => self.fail(err.into()),
        }
    }

    /// Open a channel for `session`, closing any existing one first.
    pub async fn open_stream(
        &mut self,
        session: ChatSession,
        message_id: String,
    ) -> Result<(), StreamTransportError> {
        self.close_active();

        let channel = self.backend.open_stream(&session).await?;
        let mut consumer = StreamConsumer::new(session.session_id(), message_id, session.model());
        consumer.on_open();
        self.active = Some(StreamHandle {
            session,
            channel,
            consumer,
        });
        Ok(())
    }

    /// Pump the active channel until it closes or `cancel` fires.
    pub async fn drive(&mut self, cancel: &CancellationToken) -> SendOutcome {
        let flow = {
            let Some(handle) = self.active.as_mut() else {
                return SendOutcome::Ignored;
            };
            let view: &mut dyn ChatView = &mut self.view;

            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    next = handle.channel.next_event() => Some(next),
                };

                let flow = match next {
                    None => break None,
                    Some(Some(Ok(raw))) => handle.consumer.on_event(&raw, view),
                    Some(Some(Err(err))) => handle.consumer.on_transport_error(err, view),
                    Some(None) => handle
                        .consumer
                        .on_transport_error(StreamTransportError::EndedWithoutSentinel, view),
                };

                if let Flow::Close(outcome) = flow {
                    break Some(outcome);
                }
            }
        };

        let outcome = match flow {
            None => {
                log::info!("Teardown while streaming, closing channel");
                self.teardown();
                return SendOutcome::Cancelled;
            }
            Some(outcome) => outcome,
        };

        let message_id = self
            .active
            .as_ref()
            .map(|handle| handle.consumer.message_id().to_string())
            .unwrap_or_default();
        self.close_active();
        self.restore_input();

        match outcome {
            StreamOutcome::Completed => SendOutcome::Completed {
                answer: self
                    .answers
                    .get(&message_id)
                    .map(|(buffer, _)| buffer.text().to_string()),
                message_id,
            },
            StreamOutcome::Failed(err) => SendOutcome::Failed(err),
        }
    }

    /// Flip thinking block `index` of answer `message_id` and re-render it.
    /// Returns false when no such answer is known.
    pub fn toggle_thinking(&mut self, message_id: &str, index: usize) -> bool {
        if let Some(handle) = self.active.as_mut() {
            if handle.consumer.message_id() == message_id {
                handle.consumer.toggle_thinking(index, &mut self.view);
                return true;
            }
        }

        let Some((buffer, display)) = self.answers.get_mut(message_id) else {
            return false;
        };
        let state = display.toggle(index);
        log::debug!("Thinking block {} of {} now {:?}", index, message_id, state);
        let html = buffer.render(display);
        self.view.update_answer(buffer, &html);
        true
    }

    /// Page teardown: close any open channel and give input back.
    pub fn teardown(&mut self) {
        self.close_active();
        self.restore_input();
    }

    /// Close the open channel, keeping whatever answer it rendered.
    fn close_active(&mut self) {
        let Some(mut handle) = self.active.take() else {
            return;
        };
        log::info!("[{}] Closing stream", handle.session.session_id());
        handle.channel.close();

        let message_id = handle.consumer.message_id().to_string();
        if let Some(parts) = handle.consumer.into_parts() {
            self.answers.insert(message_id.clone(), parts);
            self.last_answer_id = Some(message_id);
        }
    }

    fn restore_input(&mut self) {
        self.waiting = false;
        self.view.set_input_enabled(true);
        self.view.focus_input();
    }

    fn fail(&mut self, err: ChatError) -> Begin {
        log::error!("Send failed: {}", err);
        self.view.show_error(&err.to_string());
        self.close_active();
        self.restore_input();
        Begin::Failed(err)
    }

    fn cancelled_during_negotiation(&mut self) -> Begin {
        log::info!("Teardown during negotiation, discarding in-flight response");
        self.teardown();
        Begin::Cancelled
    }
}

impl<B: ChatBackend, V: ChatView> Drop for ChatController<B, V> {
    fn drop(&mut self) {
        if self.active.is_some() {
            self.teardown();
        }
    }
}
