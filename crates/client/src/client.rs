//! Blocking HTTP client for the metadata catalog.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::proposal::{proposals_for, IngestRequest};
use chrono::Utc;
use reqwest::blocking::Response;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tabula_emitter::{CatalogSink, SinkError};
use tabula_lineage::{RunEvent, UpsertFact};

/// Protocol header expected by the ingestion endpoint.
const RESTLI_PROTOCOL_VERSION: &str = "x-restli-protocol-version";

/// Error body returned by the catalog.
#[derive(Debug, Clone, Deserialize)]
struct ApiError {
    #[serde(alias = "message")]
    error: String,
    #[serde(default)]
    request_id: Option<String>,
}

/// Catalog client posting run events and upsert facts.
///
/// Every call is a single blocking request. Failures are returned to the
/// caller as-is; nothing is retried.
pub struct CatalogClient {
    http: reqwest::blocking::Client,
    config: ClientConfig,
}

impl CatalogClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("tabula-client")),
        );

        if let Some(ref api_key) = config.api_key {
            let auth_value = format!("Bearer {}", api_key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|_| ClientError::Config("Invalid API key format".to_string()))?,
            );
        }

        let http = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.tls_verify)
            .build()?;

        Ok(Self { http, config })
    }

    /// Post a lineage run event.
    pub fn send_event(&self, event: &RunEvent) -> Result<()> {
        self.post(&self.config.lineage_url(), event, HeaderMap::new())
    }

    /// Post an upsert fact as one ingestion proposal per aspect, in order.
    ///
    /// Stops at the first rejected proposal; earlier ones stay applied.
    pub fn send_fact(&self, fact: &UpsertFact) -> Result<()> {
        let proposals = proposals_for(fact, Utc::now().timestamp_millis())?;
        let url = self.config.facts_url();
        for proposal in proposals {
            tracing::debug!(
                entity = %proposal.entity_urn,
                aspect = %proposal.aspect_name,
                "Sending proposal"
            );
            let mut headers = HeaderMap::new();
            headers.insert(RESTLI_PROTOCOL_VERSION, HeaderValue::from_static("2.0.0"));
            self.post(&url, &IngestRequest { proposal }, headers)?;
        }
        Ok(())
    }

    fn post<B: Serialize>(&self, url: &str, body: &B, headers: HeaderMap) -> Result<()> {
        let start = std::time::Instant::now();
        let payload = serde_json::to_vec(body)?;

        tracing::debug!(url = %url, bytes = payload.len(), "Sending request");

        let response = self.http.post(url).headers(headers).body(payload).send()?;
        let status = response.status();
        let duration = start.elapsed();

        tracing::debug!(
            url = %url,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Received response"
        );

        if status.is_success() {
            return Ok(());
        }

        let err = Self::error_from_response(response);
        tracing::warn!(
            url = %url,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            request_id = ?err.request_id(),
            error = %err,
            "Request failed"
        );
        Err(err)
    }

    fn error_from_response(response: Response) -> ClientError {
        let status = response.status();
        let header_request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let error_body = response.bytes().ok();
        let api_error: Option<ApiError> = error_body
            .as_ref()
            .and_then(|b| serde_json::from_slice(b).ok());

        let message = api_error
            .as_ref()
            .map(|e| e.error.clone())
            .unwrap_or_else(|| {
                error_body
                    .filter(|b| !b.is_empty())
                    .map(|b| String::from_utf8_lossy(&b).to_string())
                    .unwrap_or_else(|| status.to_string())
            });

        let request_id = api_error
            .and_then(|e| e.request_id)
            .or(header_request_id);

        Self::status_to_error(status, message, request_id)
    }

    /// Convert HTTP status to appropriate error type.
    fn status_to_error(status: StatusCode, message: String, request_id: Option<String>) -> ClientError {
        match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            s if s.is_server_error() => ClientError::ServerError {
                status: s.as_u16(),
                message,
                request_id,
            },
            _ => ClientError::Rejected {
                status: status.as_u16(),
                message,
                request_id,
            },
        }
    }
}

impl CatalogSink for CatalogClient {
    fn emit_event(&self, event: &RunEvent) -> std::result::Result<(), SinkError> {
        self.send_event(event).map_err(SinkError::from)
    }

    fn upsert(&self, fact: &UpsertFact) -> std::result::Result<(), SinkError> {
        self.send_fact(fact).map_err(SinkError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_to_error() {
        let err = CatalogClient::status_to_error(StatusCode::UNAUTHORIZED, "no".to_string(), None);
        assert!(matches!(err, ClientError::Unauthorized(_)));

        let err = CatalogClient::status_to_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "down".to_string(),
            Some("req-1".to_string()),
        );
        assert!(matches!(err, ClientError::ServerError { status: 503, .. }));
        assert_eq!(err.request_id(), Some("req-1"));

        let err = CatalogClient::status_to_error(StatusCode::BAD_REQUEST, "bad".to_string(), None);
        assert!(matches!(err, ClientError::Rejected { status: 400, .. }));
    }

    #[test]
    fn test_api_error_accepts_message_key() {
        let parsed: ApiError = serde_json::from_str(r#"{"message":"invalid event"}"#).unwrap();
        assert_eq!(parsed.error, "invalid event");
        assert!(parsed.request_id.is_none());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = ClientConfig::default();
        config.base_url = String::new();
        assert!(CatalogClient::new(config).is_err());
    }
}
