use thiserror::Error;

/// Failure fetching the data preview for a task/file pair.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextFetchError {
    #[error("Failed to fetch data: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to fetch data: {0}")]
    Network(String),

    #[error("Failed to fetch data: invalid preview payload: {0}")]
    InvalidPayload(String),
}

/// Failure negotiating a chat session. Nothing has been opened yet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionCreateError {
    #[error("Failed to create session: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to create session: {0}")]
    Network(String),

    #[error("Failed to create session: invalid response body: {0}")]
    InvalidBody(String),

    #[error("Server did not return a valid session id")]
    MissingSessionId,
}

/// Channel-level failure after the stream was requested.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamTransportError {
    #[error("Connection error, please try again later")]
    Connect(String),

    #[error("Connection error, please try again later")]
    Dropped(String),

    #[error("Connection error, please try again later")]
    EndedWithoutSentinel,
}

impl StreamTransportError {
    /// Underlying cause, for logs. The `Display` text stays generic.
    pub fn detail(&self) -> &str {
        match self {
            Self::Connect(detail) | Self::Dropped(detail) => detail,
            Self::EndedWithoutSentinel => "stream ended before [DONE]",
        }
    }
}

/// Application-level error reported by the server inside a well-formed event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StreamPayloadError {
    pub message: String,
}

/// A single event that could not be decoded. Never terminates a stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unparseable stream event: {reason}")]
pub struct StreamParseError {
    pub raw: String,
    pub reason: String,
}

/// Everything that ends the current question.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ContextFetch(#[from] ContextFetchError),

    #[error(transparent)]
    SessionCreate(#[from] SessionCreateError),

    #[error(transparent)]
    StreamTransport(#[from] StreamTransportError),

    #[error(transparent)]
    StreamPayload(#[from] StreamPayloadError),
}

pub type Result<T> = std::result::Result<T, ChatError>;
