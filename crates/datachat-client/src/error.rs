use thiserror::Error;

/// Failures of the auxiliary read-only calls (reports, backend status).
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid URL: {0}")]
    Url(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
