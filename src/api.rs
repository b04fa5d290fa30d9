use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub const CREW_PATH: &str = "/api/crew";
pub const HEALTH_PATH: &str = "/api/health";

/// Shown when a successful response carries neither result field.
pub const NO_RESULTS: &str = "No results available";
pub const GENERIC_FAILURE: &str = "Failed to connect to the server. Please try again.";

#[derive(Debug, Serialize)]
struct CrewRequest<'a> {
    user_request: &'a str,
}

/// Body returned by `POST /api/crew` on success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CrewResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub user_request: Option<String>,
    #[serde(default)]
    pub combined_result: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
}

impl CrewResponse {
    /// `combined_result`, then `result`, then the fixed fallback. Empty
    /// strings are skipped.
    pub fn display_text(&self) -> &str {
        [&self.combined_result, &self.result]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|text| !text.is_empty())
            .unwrap_or(NO_RESULTS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with `{"error": "..."}`.
    #[error("backend error ({status}): {message}")]
    Server { status: StatusCode, message: String },

    #[error("connection refused by {url}")]
    ConnectionRefused { url: String, port: Option<u16> },

    #[error("backend returned {0} without an error message")]
    Status(StatusCode),

    #[error("request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("request task ended unexpectedly: {0}")]
    Task(String),
}

impl ApiError {
    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Server { message, .. } => message.clone(),
            ApiError::ConnectionRefused { port, .. } => match port {
                Some(port) => format!(
                    "Cannot connect to server. Make sure the backend is running on port {}.",
                    port
                ),
                None => "Cannot connect to server. Make sure the backend is running.".to_string(),
            },
            ApiError::Status(_)
            | ApiError::Network(_)
            | ApiError::Decode(_)
            | ApiError::Task(_) => GENERIC_FAILURE.to_string(),
        }
    }
}

/// Client for the crew backend. One request per call, no retries, no timeout.
#[derive(Debug, Clone)]
pub struct CrewClient {
    client: Client,
    base_url: Url,
}

impl CrewClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn submit(&self, token: &str, user_request: &str) -> Result<CrewResponse, ApiError> {
        let url = self.endpoint(CREW_PATH);
        debug!(%url, chars = user_request.chars().count(), "submitting crew request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .json(&CrewRequest { user_request })
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(ApiError::Network)?;

        if !status.is_success() {
            return Err(error_from_body(status, &body));
        }

        // A 2xx body that is not the expected JSON still counts as success
        Ok(serde_json::from_str(&body).unwrap_or_else(|e| {
            warn!(error = %e, "crew response was not the expected JSON");
            CrewResponse::default()
        }))
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        let url = self.endpoint(HEALTH_PATH);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(ApiError::Network)?;

        if !status.is_success() {
            return Err(error_from_body(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    fn classify_send_error(&self, err: reqwest::Error) -> ApiError {
        if is_connection_refused(&err) {
            ApiError::ConnectionRefused {
                url: self.base_url.to_string(),
                port: self.base_url.port_or_known_default(),
            }
        } else {
            ApiError::Network(err)
        }
    }
}

fn error_from_body(status: StatusCode, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error: Some(message) }) if !message.is_empty() => {
            ApiError::Server { status, message }
        }
        _ => ApiError::Status(status),
    }
}

/// Walk the source chain looking for the OS-level refusal.
fn is_connection_refused(err: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(inner) = source {
        if let Some(io) = inner.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        source = inner.source();
    }
    false
}
