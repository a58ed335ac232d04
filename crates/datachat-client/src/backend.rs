use async_trait::async_trait;
use datachat_core::{
    ChatSession, ContextFetchError, DataContext, SessionCreateError, SessionRequest,
    StreamTransportError,
};

/// One open server-push channel.
///
/// `next_event` yields raw event payloads in server-send order. `None`
/// means the server closed the channel.
#[async_trait]
pub trait EventChannel: Send {
    async fn next_event(&mut self) -> Option<Result<String, StreamTransportError>>;

    /// Release the channel. Must be idempotent.
    fn close(&mut self);
}

/// Server operations the chat pipeline depends on.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn fetch_context(
        &self,
        task_id: &str,
        file_name: &str,
    ) -> Result<DataContext, ContextFetchError>;

    /// Exactly one attempt, no retry.
    async fn create_session(
        &self,
        request: &SessionRequest,
    ) -> Result<ChatSession, SessionCreateError>;

    async fn open_stream(
        &self,
        session: &ChatSession,
    ) -> Result<Box<dyn EventChannel>, StreamTransportError>;
}
