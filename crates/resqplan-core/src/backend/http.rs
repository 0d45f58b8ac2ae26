//! HTTP implementation of [`Backend`].
//!
//! Uses a blocking `ureq` agent; every request runs on tokio's blocking pool
//! so callers stay async.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use super::trait_def::Backend;
use super::types::{
    ActionResponse, BackendError, ConvertResponse, ErrorBody, OptimizeResponse, ViewResponse,
};

/// Where the backend lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl HttpConfig {
    pub const DEFAULT_URL: &str = "http://127.0.0.1:5000";
    pub const ENV_VAR: &str = "RESQPLAN_API_URL";
    /// Solving can take a while; keep this generous.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Read the base URL from `RESQPLAN_API_URL`, falling back to
    /// [`Self::DEFAULT_URL`].
    pub fn from_env() -> Self {
        let url = std::env::var(Self::ENV_VAR).unwrap_or_else(|_| Self::DEFAULT_URL.to_string());
        Self::new(url)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_URL)
    }
}

/// JSON-over-HTTP transport shared by [`HttpBackend`] and
/// [`super::HttpProjectStore`].
#[derive(Clone)]
pub(crate) struct HttpClient {
    base_url: String,
    agent: ureq::Agent,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    pub(crate) fn new(config: &HttpConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Self {
            base_url: config.base_url.clone(),
            agent,
        }
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and return the raw response body.
    pub(crate) async fn send(
        &self,
        method: &'static str,
        path: &str,
        body: Option<Value>,
    ) -> Result<String, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        let agent = self.agent.clone();
        debug!(method, url = %url, "backend request");

        tokio::task::spawn_blocking(move || {
            let request = agent.request(method, &url).set("Accept", "application/json");
            let response = match body {
                Some(body) => request
                    .set("Content-Type", "application/json")
                    .send_string(&body.to_string()),
                None => request.call(),
            };
            match response {
                Ok(resp) => resp
                    .into_string()
                    .map_err(|e| BackendError::Transport(format!("failed reading response: {e}"))),
                Err(ureq::Error::Status(code, resp)) => {
                    let raw = resp.into_string().unwrap_or_default();
                    Err(BackendError::Status {
                        code,
                        message: error_message(code, &raw),
                    })
                }
                Err(ureq::Error::Transport(t)) => Err(BackendError::Transport(t.to_string())),
            }
        })
        .await
        .map_err(|e| BackendError::Transport(format!("request task failed: {e}")))?
    }

    /// Send a request and decode a JSON response.
    pub(crate) async fn json<T>(
        &self,
        method: &'static str,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let raw = self.send(method, path, body).await?;
        serde_json::from_str(&raw).map_err(|e| BackendError::Decode(format!("{path}: {e}")))
    }
}

fn error_message(code: u16, raw: &str) -> String {
    if let Ok(body) = serde_json::from_str::<ErrorBody>(raw) {
        return body.error;
    }
    let raw = raw.trim();
    if raw.is_empty() {
        format!("HTTP {code}")
    } else {
        raw.to_string()
    }
}

/// `Backend` over the HTTP API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: HttpClient,
}

impl HttpBackend {
    pub fn new(config: &HttpConfig) -> Self {
        Self {
            client: HttpClient::new(config),
        }
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }
}

/// `/api/translate` wraps the variables in `{"result": ...}`.
#[derive(serde::Deserialize)]
struct TranslateResponse {
    result: Value,
}

#[async_trait]
impl Backend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn translate(&self, context: &str) -> Result<Value, BackendError> {
        let resp: TranslateResponse = self
            .client
            .json("POST", "/api/translate", Some(json!({ "input_data": context })))
            .await?;
        Ok(resp.result)
    }

    async fn convert(&self, constraint: &str) -> Result<ConvertResponse, BackendError> {
        self.client
            .json("POST", "/api/convert", Some(json!({ "constraint": constraint })))
            .await
    }

    async fn optimize(
        &self,
        active_constraints: &[String],
    ) -> Result<OptimizeResponse, BackendError> {
        self.client
            .json(
                "POST",
                "/api/optimize",
                Some(json!({ "active_constraints": active_constraints })),
            )
            .await
    }

    async fn edit_constraint(
        &self,
        old_nl: &str,
        new_nl: &str,
    ) -> Result<ActionResponse, BackendError> {
        self.client
            .json(
                "POST",
                "/api/edit_constraint",
                Some(json!({ "old_nl": old_nl, "new_nl": new_nl })),
            )
            .await
    }

    async fn delete_constraint(&self, nl: &str) -> Result<ActionResponse, BackendError> {
        self.client
            .json("POST", "/api/delete_constraint", Some(json!({ "nl": nl })))
            .await
    }

    async fn view_constraint(&self, nl: &str) -> Result<ViewResponse, BackendError> {
        self.client
            .json("POST", "/api/view_constraint", Some(json!({ "nl": nl })))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_trims_trailing_slash() {
        let config = HttpConfig::new("http://localhost:5000/");
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.timeout, HttpConfig::DEFAULT_TIMEOUT);
    }

    #[test]
    fn error_message_prefers_error_field() {
        assert_eq!(
            error_message(400, r#"{"error": "No constraint provided"}"#),
            "No constraint provided"
        );
        assert_eq!(error_message(502, "  "), "HTTP 502");
        assert_eq!(error_message(500, "boom"), "boom");
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        // Port 9 (discard) on localhost is essentially never listening.
        let backend = HttpBackend::new(
            &HttpConfig::new("http://127.0.0.1:9").with_timeout(Duration::from_secs(2)),
        );
        let err = backend.convert("anything").await.unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)), "got: {err}");
    }
}
