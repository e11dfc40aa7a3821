//! Catalog sink abstraction.
//!
//! The sink is the only way lineage leaves this process. Implementations send
//! facts and events to a metadata catalog; [`MemorySink`] keeps them in memory.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tabula_lineage::{RunEvent, UpsertFact};
use thiserror::Error;

/// Errors a sink reports when emission fails. Never retried by the emitter.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The catalog could not be reached
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    /// Credentials were missing or refused
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The catalog answered but refused the payload
    #[error("Catalog rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Error message from the catalog
        message: String,
    },

    /// The payload could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Destination for upsert facts and lineage run events.
///
/// Calls are blocking: one call per fact or event, returning once the catalog
/// has accepted it or failed.
pub trait CatalogSink {
    /// Send one lineage run event.
    fn emit_event(&self, event: &RunEvent) -> Result<(), SinkError>;

    /// Send one upsert fact.
    fn upsert(&self, fact: &UpsertFact) -> Result<(), SinkError>;
}

impl<T: CatalogSink + ?Sized> CatalogSink for &T {
    fn emit_event(&self, event: &RunEvent) -> Result<(), SinkError> {
        (**self).emit_event(event)
    }

    fn upsert(&self, fact: &UpsertFact) -> Result<(), SinkError> {
        (**self).upsert(fact)
    }
}

impl<T: CatalogSink + ?Sized> CatalogSink for Box<T> {
    fn emit_event(&self, event: &RunEvent) -> Result<(), SinkError> {
        (**self).emit_event(event)
    }

    fn upsert(&self, fact: &UpsertFact) -> Result<(), SinkError> {
        (**self).upsert(fact)
    }
}

impl<T: CatalogSink + ?Sized> CatalogSink for Arc<T> {
    fn emit_event(&self, event: &RunEvent) -> Result<(), SinkError> {
        (**self).emit_event(event)
    }

    fn upsert(&self, fact: &UpsertFact) -> Result<(), SinkError> {
        (**self).upsert(fact)
    }
}

/// In-memory sink that records everything it receives.
///
/// Can be switched unavailable to exercise failure paths.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RunEvent>>,
    facts: Mutex<Vec<UpsertFact>>,
    unavailable: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that fails every call with [`SinkError::Unavailable`].
    pub fn unavailable() -> Self {
        let sink = Self::default();
        sink.set_available(false);
        sink
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Events received so far, in order.
    pub fn events(&self) -> Vec<RunEvent> {
        lock(&self.events).clone()
    }

    /// Facts received so far, in order.
    pub fn facts(&self) -> Vec<UpsertFact> {
        lock(&self.facts).clone()
    }

    fn check_available(&self) -> Result<(), SinkError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(SinkError::Unavailable("memory sink switched off".to_string()))
        } else {
            Ok(())
        }
    }
}

impl CatalogSink for MemorySink {
    fn emit_event(&self, event: &RunEvent) -> Result<(), SinkError> {
        self.check_available()?;
        lock(&self.events).push(event.clone());
        Ok(())
    }

    fn upsert(&self, fact: &UpsertFact) -> Result<(), SinkError> {
        self.check_available()?;
        lock(&self.facts).push(fact.clone());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
