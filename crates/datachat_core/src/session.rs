use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SessionCreateError;

/// AI backend the server routes a session to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    #[default]
    Deepseek,
    Ollama,
}

impl Model {
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Deepseek => "deepseek",
            Model::Ollama => "ollama",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deepseek" => Ok(Model::Deepseek),
            "ollama" => Ok(Model::Ollama),
            other => Err(format!("unknown model {other:?} (expected deepseek or ollama)")),
        }
    }
}

/// Body of `POST /api/create_session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRequest {
    pub message: String,
    pub model: Model,
    pub task_id: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionResponse {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Server-issued handle for one question. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    session_id: String,
    model: Model,
    task_id: String,
    file_name: String,
}

impl ChatSession {
    /// Bind a negotiated response to the request that produced it.
    pub fn from_response(
        request: &SessionRequest,
        response: SessionResponse,
    ) -> Result<Self, SessionCreateError> {
        let session_id = response
            .session_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(SessionCreateError::MissingSessionId)?;

        Ok(Self {
            session_id,
            model: request.model,
            task_id: request.task_id.clone(),
            file_name: request.file_name.clone(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}
