//! Catalog connection settings.

use crate::error::{ClientError, Result};
use std::fmt;
use std::time::Duration;

/// Where and how the client reaches the catalog.
///
/// Both endpoints hang off `base_url`. `Debug` output masks the API key.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Run events are posted here
    pub lineage_path: String,
    /// Metadata change proposals are posted here
    pub facts_path: String,
    pub api_key: Option<String>,
    /// Per-request timeout, at least [`ClientConfig::MIN_TIMEOUT`]
    pub timeout: Duration,
    pub tls_verify: bool,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            lineage_path: "api/v1/lineage".to_string(),
            facts_path: "api/gms/aspects?action=ingestProposal".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            tls_verify: true,
            user_agent: format!("tabula-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("lineage_path", &self.lineage_path)
            .field("facts_path", &self.facts_path)
            .field("api_key", &self.api_key.as_ref().map(|_| "***REDACTED***"))
            .field("timeout", &self.timeout)
            .field("tls_verify", &self.tls_verify)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder::new(base_url)
    }

    /// Minimum allowed timeout value.
    pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ClientError::Config(msg));

        if self.base_url.is_empty() {
            return invalid("catalog base URL is empty".to_string());
        }
        if let Err(e) = url::Url::parse(&self.base_url) {
            return invalid(format!("catalog base URL '{}' is invalid: {}", self.base_url, e));
        }
        for (name, path) in [("lineage", &self.lineage_path), ("facts", &self.facts_path)] {
            if path.trim_matches('/').is_empty() {
                return invalid(format!("{} endpoint path is empty", name));
            }
        }
        if self.timeout < Self::MIN_TIMEOUT {
            return invalid(format!(
                "timeout {:?} is below the {:?} minimum",
                self.timeout,
                Self::MIN_TIMEOUT
            ));
        }
        Ok(())
    }

    /// Full URL of the lineage endpoint.
    pub fn lineage_url(&self) -> String {
        join_url(&self.base_url, &self.lineage_path)
    }

    /// Full URL of the upsert-fact endpoint.
    pub fn facts_url(&self) -> String {
        join_url(&self.base_url, &self.facts_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Builder for [`ClientConfig`], obtained from [`ClientConfig::builder`].
///
/// Settings without a setter keep their defaults and can be changed on the
/// built config directly.
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        let config = ClientConfig {
            base_url: base_url.into(),
            ..Default::default()
        };
        Self { config }
    }

    /// Path of the OpenLineage endpoint, e.g. `openapi/openlineage/api/v1/lineage`.
    pub fn lineage_path(mut self, path: impl Into<String>) -> Self {
        self.config.lineage_path = path.into();
        self
    }

    /// Path of the proposal ingestion endpoint.
    pub fn facts_path(mut self, path: impl Into<String>) -> Self {
        self.config.facts_path = path.into();
        self
    }

    /// Bearer token sent with every request.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = Some(api_key.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
