//! Shared HTTP plumbing for the service clients.

use std::time::{Duration, Instant};

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{OwnmarkError, Result};

/// Default base URL of the extraction and registry API.
const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration shared by the extraction and ledger clients.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL; endpoint paths are appended to it.
    pub api_base: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_base: std::env::var("OWNMARK_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            timeout: env_timeout().unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}

impl ServiceConfig {
    /// Join `path` onto the base URL, tolerating stray slashes on either side.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.api_base.trim().trim_end_matches('/');
        let path = path.trim().trim_start_matches('/');
        format!("{base}/{path}")
    }
}

pub(crate) fn env_timeout() -> Option<Duration> {
    std::env::var("OWNMARK_REQUEST_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
}

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("ownmark/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            warn!(error = %e, "Failed to create HTTP client");
            OwnmarkError::Service(format!("Failed to create HTTP client: {e}"))
        })
}

/// Turn a non-success response into an error, keeping the response body.
pub(crate) async fn check_status(
    response: Response,
    service: &str,
    start: Instant,
) -> Result<Response> {
    let status = response.status();
    let latency_ms = start.elapsed().as_millis() as u64;
    debug!(status = %status, latency_ms, "Received HTTP response");

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if is_transient_status(status) {
        warn!(status = %status, latency_ms, "Transient HTTP status from {service}");
    } else {
        warn!(status = %status, latency_ms, "HTTP error from {service}");
    }

    Err(status_error(status, service, &body))
}

/// Error for a non-success status. Callers map statuses with a
/// service-specific meaning before getting here.
pub(crate) fn status_error(status: StatusCode, service: &str, body: &str) -> OwnmarkError {
    OwnmarkError::Service(format!("{service} returned status {status}: {}", body.trim()))
}

pub(crate) async fn read_json<R: DeserializeOwned>(response: Response, service: &str) -> Result<R> {
    response.json().await.map_err(|e| {
        warn!(error = %e, "Failed to parse JSON response");
        OwnmarkError::Serialization(format!("Failed to parse {service} response: {e}"))
    })
}

/// Check if an HTTP status code indicates a transient error.
pub fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::BAD_GATEWAY
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_cleanly() {
        let config = ServiceConfig {
            api_base: "http://localhost:8000/api/".into(),
            timeout: DEFAULT_TIMEOUT,
        };
        assert_eq!(
            config.endpoint("/watermark/image/extract"),
            "http://localhost:8000/api/watermark/image/extract"
        );
        assert_eq!(
            config.endpoint("registry/v2/anchor"),
            "http://localhost:8000/api/registry/v2/anchor"
        );
    }

    #[test]
    fn test_transient_status_codes() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_transient_status(StatusCode::GATEWAY_TIMEOUT));
        assert!(is_transient_status(StatusCode::BAD_GATEWAY));
        assert!(!is_transient_status(StatusCode::NOT_FOUND));
        assert!(!is_transient_status(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_conflict_is_a_service_error() {
        let err = status_error(StatusCode::CONFLICT, "explorer", " busy ");
        assert!(matches!(err, OwnmarkError::Service(_)));
        assert_eq!(
            err.to_string(),
            "Service error: explorer returned status 409 Conflict: busy"
        );
    }

    #[test]
    fn test_build_client() {
        assert!(build_client(Duration::from_secs(5)).is_ok());
    }
}
