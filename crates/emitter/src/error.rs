//! Error types for lineage emission.

use std::path::PathBuf;

use tabula_lineage::LineageError;
use thiserror::Error;

use crate::sink::SinkError;

/// Errors that stop a processing pass.
#[derive(Debug, Error)]
pub enum EmitError {
    /// A lineage source could not be loaded or validated
    #[error("Lineage source '{job}' ({}) failed: {source}", path.display())]
    Source {
        /// Job name configured for the source
        job: String,
        /// Table file
        path: PathBuf,
        #[source]
        source: LineageError,
    },

    /// The catalog sink refused or could not take a fact or event
    #[error("Emission failed for {context}: {source}")]
    Sink {
        /// What was being emitted (job name, fact key)
        context: String,
        #[source]
        source: SinkError,
    },
}

impl EmitError {
    /// Returns true if the failure came from the catalog sink.
    pub fn is_sink(&self) -> bool {
        matches!(self, EmitError::Sink { .. })
    }
}

/// A specialized Result type for emission.
pub type Result<T> = std::result::Result<T, EmitError>;
