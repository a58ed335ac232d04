use std::time::Duration;

use async_trait::async_trait;
use datachat_core::{
    ChatSession, ContextFetchError, DataContext, PreviewResponse, Report, SessionCreateError,
    SessionRequest, SessionResponse, StreamTransportError,
};
use reqwest::{header, Client, Proxy, Response, StatusCode, Url};
use serde::Deserialize;

use crate::backend::{ChatBackend, EventChannel};
use crate::config::ClientConfig;
use crate::error::{Result, ServiceError};
use crate::sse::SseChannel;

/// `GET /api/ollama/status`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendStatus {
    pub status: String,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl BackendStatus {
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }
}

/// reqwest-backed implementation of the server endpoints.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
    request_timeout: Duration,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Self::build_http_client(config)?;
        let base = Url::parse(&config.server_url)
            .map_err(|e| ServiceError::Url(format!("{}: {e}", config.server_url)))?;
        if base.cannot_be_a_base() {
            return Err(ServiceError::Url(config.server_url.clone()));
        }

        Ok(Self {
            client,
            base,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    fn build_http_client(config: &ClientConfig) -> Result<Client> {
        let mut builder = Client::builder();
        if !config.http_proxy.is_empty() {
            builder = builder.proxy(Proxy::http(&config.http_proxy)?);
        }
        if !config.https_proxy.is_empty() {
            builder = builder.proxy(Proxy::https(&config.https_proxy)?);
        }
        Ok(builder.build()?)
    }

    /// Base URL with percent-encoded path segments appended.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn list_reports(&self) -> Result<Vec<Report>> {
        let url = self.url(&["api", "reports"]);
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        Ok(serde_json::from_str(&success_body(response).await?)?)
    }

    pub async fn backend_status(&self) -> Result<BackendStatus> {
        let url = self.url(&["api", "ollama", "status"]);
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        Ok(serde_json::from_str(&success_body(response).await?)?)
    }
}

async fn success_body(response: Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ServiceError::Status {
            status: status.as_u16(),
            message: error_message(status, &body),
        });
    }
    Ok(body)
}

/// Server error text: the JSON `error` field, the raw body, or the reason phrase.
fn error_message(status: StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.error;
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

fn cache_buster() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn fetch_context(
        &self,
        task_id: &str,
        file_name: &str,
    ) -> std::result::Result<DataContext, ContextFetchError> {
        let url = self.url(&["api", "preview_data", task_id, file_name]);
        log::info!("Fetching data context: task={}, file={}", task_id, file_name);

        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| ContextFetchError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ContextFetchError::Network(e.to_string()))?;

        if !status.is_success() {
            log::error!("Data preview failed: {} {}", status, body);
            return Err(ContextFetchError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        let preview: PreviewResponse = serde_json::from_str(&body)
            .map_err(|e| ContextFetchError::InvalidPayload(e.to_string()))?;
        log::debug!(
            "Data context: {} columns, {} rows, {} samples",
            preview.columns.len(),
            preview.total_rows,
            preview.data.len()
        );
        DataContext::try_from(preview)
    }

    async fn create_session(
        &self,
        request: &SessionRequest,
    ) -> std::result::Result<ChatSession, SessionCreateError> {
        let url = self.url(&["api", "create_session"]);
        log::info!(
            "Creating session: model={}, task={}, file={}, prompt {} chars",
            request.model,
            request.task_id,
            request.file_name,
            request.message.chars().count()
        );

        let response = self
            .client
            .post(url)
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| SessionCreateError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SessionCreateError::Network(e.to_string()))?;

        if !status.is_success() {
            log::error!("Create session failed: HTTP {} {}", status, body);
            return Err(SessionCreateError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        let parsed: SessionResponse = serde_json::from_str(&body)
            .map_err(|e| SessionCreateError::InvalidBody(e.to_string()))?;
        let session = ChatSession::from_response(request, parsed)?;
        log::info!("[{}] Session created", session.session_id());
        Ok(session)
    }

    async fn open_stream(
        &self,
        session: &ChatSession,
    ) -> std::result::Result<Box<dyn EventChannel>, StreamTransportError> {
        let mut url = self.url(&["api", "stream", session.session_id()]);
        url.query_pairs_mut().append_pair("_", &cache_buster());
        log::info!("[{}] Opening stream: {}", session.session_id(), url);

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| StreamTransportError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamTransportError::Connect(format!(
                "HTTP {}: {}",
                status,
                error_message(status, &body)
            )));
        }

        Ok(Box::new(SseChannel::new(session.session_id(), response)))
    }
}
