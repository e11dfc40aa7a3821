//! Pipeline configuration file.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tabula_client::ClientConfig;
use tabula_emitter::{FailurePolicy, LineageSource};
use tabula_lineage::DEFAULT_JOB_NAMESPACE;

/// Environment variable overriding `api_url`.
pub const ENV_API_URL: &str = "TABULA_API_URL";
/// Environment variable overriding `access_token`.
pub const ENV_ACCESS_TOKEN: &str = "TABULA_ACCESS_TOKEN";

/// Settings for one `tabula run` / `tabula glossary` invocation.
///
/// The `Debug` implementation masks the access token.
#[derive(Clone, Deserialize)]
pub struct PipelineConfig {
    /// Catalog base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Prefix of the OpenLineage endpoint, relative to `api_url`
    #[serde(default)]
    pub api_endpoint: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_job_namespace")]
    pub job_namespace: String,
    #[serde(default)]
    pub emit_dataset_facts: bool,
    /// Stop at the first failing source instead of reporting it and moving on
    #[serde(default)]
    pub fail_fast: bool,
    #[serde(default, alias = "linage_csv_s3_paths")]
    pub lineage_sources: Vec<LineageSource>,
    /// Owner recorded on glossary terms
    #[serde(default)]
    pub glossary_owner: Option<String>,
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_job_namespace() -> String {
    DEFAULT_JOB_NAMESPACE.to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_endpoint: String::new(),
            access_token: None,
            job_namespace: default_job_namespace(),
            emit_dataset_facts: false,
            fail_fast: false,
            lineage_sources: Vec::new(),
            glossary_owner: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("api_url", &self.api_url)
            .field("api_endpoint", &self.api_endpoint)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "***REDACTED***"),
            )
            .field("job_namespace", &self.job_namespace)
            .field("emit_dataset_facts", &self.emit_dataset_facts)
            .field("fail_fast", &self.fail_fast)
            .field("lineage_sources", &self.lineage_sources)
            .field("glossary_owner", &self.glossary_owner)
            .finish()
    }
}

impl PipelineConfig {
    /// Read a JSON config file and apply environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override settings from `lookup`, typically the process environment.
    ///
    /// Reads:
    /// - `TABULA_API_URL`: replaces `api_url`
    /// - `TABULA_ACCESS_TOKEN`: replaces `access_token`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.api_url = url;
        }
        if let Some(token) = lookup(ENV_ACCESS_TOKEN).filter(|v| !v.is_empty()) {
            self.access_token = Some(token);
        }
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        if self.fail_fast {
            FailurePolicy::Abort
        } else {
            FailurePolicy::Isolate
        }
    }

    /// Path of the OpenLineage run-event endpoint, relative to `api_url`.
    pub fn lineage_path(&self) -> String {
        let prefix = self.api_endpoint.trim_matches('/');
        if prefix.is_empty() {
            "api/v1/lineage".to_string()
        } else {
            format!("{}/api/v1/lineage", prefix)
        }
    }

    /// HTTP client settings for the catalog.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut builder = ClientConfig::builder(&self.api_url).lineage_path(self.lineage_path());
        if let Some(token) = &self.access_token {
            builder = builder.api_key(token);
        }
        builder.build().context("invalid catalog connection settings")
    }
}
