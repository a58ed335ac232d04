//! SSE body -> [`EventChannel`] adapter.

use std::pin::Pin;

use async_trait::async_trait;
use datachat_core::StreamTransportError;
use eventsource_stream::Eventsource;
use futures::{future, Stream};
use futures_util::StreamExt;
use reqwest::Response;

use crate::backend::EventChannel;

type RawEventStream = Pin<Box<dyn Stream<Item = Result<String, StreamTransportError>> + Send>>;

/// Event channel over a `text/event-stream` response body.
pub struct SseChannel {
    session_id: String,
    stream: Option<RawEventStream>,
}

impl SseChannel {
    pub fn new(session_id: impl Into<String>, response: Response) -> Self {
        let stream = response
            .bytes_stream()
            .eventsource()
            .filter_map(|event| {
                future::ready(match event {
                    Ok(event) if event.event.is_empty() || event.event == "message" => {
                        Some(Ok(event.data))
                    }
                    Ok(event) => {
                        log::debug!("Skipping named event {:?}", event.event);
                        None
                    }
                    Err(e) => Some(Err(StreamTransportError::Dropped(e.to_string()))),
                })
            });

        Self {
            session_id: session_id.into(),
            stream: Some(Box::pin(stream)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

#[async_trait]
impl EventChannel for SseChannel {
    async fn next_event(&mut self) -> Option<Result<String, StreamTransportError>> {
        let stream = self.stream.as_mut()?;
        stream.next().await
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            log::debug!("[{}] SSE channel closed", self.session_id);
        }
    }
}

impl Drop for SseChannel {
    fn drop(&mut self) {
        self.close();
    }
}
