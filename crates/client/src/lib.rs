//! Tabula Catalog Client
//!
//! A blocking HTTP implementation of [`tabula_emitter::CatalogSink`]. Run
//! events are posted to an OpenLineage-compatible endpoint. Upsert facts are
//! translated into metadata change proposals (one per aspect) and posted to
//! the catalog's ingestion endpoint.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tabula_client::{CatalogClient, ClientConfig};
//! use tabula_emitter::{Emitter, LineageSource};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CatalogClient::new(
//!         ClientConfig::builder("https://catalog.example.com")
//!             .lineage_path("openapi/openlineage/api/v1/lineage")
//!             .api_key("token")
//!             .timeout(Duration::from_secs(30))
//!             .build()?,
//!     )?;
//!
//!     let emitter = Emitter::new(client);
//!     let report = emitter.process_batch(&[LineageSource::new("etl1", "etl1.csv")])?;
//!     println!("{} events emitted", report.emitted_count());
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return `Result<T, ClientError>`. Errors include:
//!
//! - `Unauthorized` / `Forbidden`: invalid or missing API key (401/403)
//! - `Rejected`: the catalog refused the payload (other 4xx)
//! - `ServerError`: server-side failures (5xx)
//!
//! Nothing is retried. Through the sink trait, transport failures and 5xx
//! responses surface as [`tabula_emitter::SinkError::Unavailable`].

pub mod client;
pub mod config;
pub mod error;
pub mod proposal;

// Re-exports for convenience
pub use client::CatalogClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ClientError, Result};
pub use proposal::{proposals_for, IngestRequest, MetadataChangeProposal};
