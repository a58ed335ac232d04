//! datachat-client - the streaming chat pipeline
//!
//! Context fetch, prompt, session negotiation, server-push consumption and
//! the lifecycle that guarantees at most one open stream.

pub mod backend;
pub mod config;
pub mod consumer;
pub mod controller;
pub mod error;
pub mod http;
pub mod sse;
pub mod view;

pub use backend::{ChatBackend, EventChannel};
pub use config::ClientConfig;
pub use consumer::{ConsumerState, Flow, StreamConsumer, StreamOutcome};
pub use controller::{ChatController, SendOutcome, StreamHandle};
pub use error::ServiceError;
pub use http::{BackendStatus, HttpBackend};
pub use sse::SseChannel;
pub use view::ChatView;
