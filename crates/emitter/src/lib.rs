//! Tabula Lineage Emitter
//!
//! Drives a processing pass: load each lineage source, validate it, derive one
//! run event per job and hand facts and events to a [`CatalogSink`].

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tabula_lineage::{
    assemble, group_by_job, validate, DatasetFact, GlossaryPlan, LineageError, RawTable,
    Record, RunEvent, UpsertFact, DEFAULT_JOB_NAMESPACE,
};
use uuid::Uuid;

mod error;
mod sink;

pub use error::{EmitError, Result};
pub use sink::{CatalogSink, MemorySink, SinkError};

/// A lineage table to process, labelled with the job it describes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LineageSource {
    /// Job name reported when the table cannot be processed
    pub name: String,
    pub path: PathBuf,
}

impl LineageSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// What to do when a lineage source fails to load or validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Emit a `FAIL` event for the source and continue with the next one
    #[default]
    Isolate,
    /// Stop the whole batch with the error, emitting nothing for the source
    Abort,
}

/// A run event that reached the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedRun {
    pub job_name: String,
    pub run_id: Uuid,
    pub inputs: usize,
    pub outputs: usize,
    pub edges: usize,
}

/// A source that failed and was reported with a `FAIL` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedSource {
    pub job_name: String,
    pub run_id: Uuid,
    pub message: String,
}

/// Outcome of processing one lineage source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub source: LineageSource,
    pub emitted: Vec<EmittedRun>,
    pub failure: Option<FailedSource>,
}

impl SourceReport {
    fn new(source: &LineageSource) -> Self {
        Self {
            source: source.clone(),
            emitted: Vec::new(),
            failure: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Outcome of a whole processing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub sources: Vec<SourceReport>,
}

impl BatchReport {
    /// Number of `COMPLETE` events emitted.
    pub fn emitted_count(&self) -> usize {
        self.sources.iter().map(|s| s.emitted.len()).sum()
    }

    /// Number of sources reported as failed.
    pub fn failed_count(&self) -> usize {
        self.sources.iter().filter(|s| !s.is_success()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Emitter API for publishing lineage to a catalog
///
/// # Example
/// ```
/// use tabula_emitter::{Emitter, FailurePolicy, LineageSource, MemorySink};
///
/// let emitter = Emitter::new(MemorySink::new())
///     .with_job_namespace("nightly")
///     .with_failure_policy(FailurePolicy::Isolate);
///
/// let report = emitter
///     .process_batch(&[LineageSource::new("etl1", "/nonexistent/etl1.csv")])
///     .unwrap();
///
/// // The unreadable table is reported with a FAIL event instead of aborting
/// assert_eq!(report.failed_count(), 1);
/// assert_eq!(emitter.sink().events().len(), 1);
/// ```
pub struct Emitter<S: CatalogSink> {
    sink: S,
    job_namespace: String,
    emit_dataset_facts: bool,
    failure_policy: FailurePolicy,
}

impl<S: CatalogSink> Emitter<S> {
    /// Create a new emitter with the given sink
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            job_namespace: DEFAULT_JOB_NAMESPACE.to_string(),
            emit_dataset_facts: false,
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Namespace of every job this emitter reports.
    pub fn with_job_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.job_namespace = namespace.into();
        self
    }

    /// Also send one dataset upsert fact per dataset entity before each event.
    pub fn with_dataset_facts(mut self, enabled: bool) -> Self {
        self.emit_dataset_facts = enabled;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Process sources in order, stopping at the first propagated error.
    pub fn process_batch(&self, sources: &[LineageSource]) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        for source in sources {
            report.sources.push(self.process_source(source)?);
        }

        tracing::info!(
            sources = report.sources.len(),
            emitted = report.emitted_count(),
            failed = report.failed_count(),
            "Lineage batch finished"
        );
        Ok(report)
    }

    /// Load, validate and emit one lineage source.
    ///
    /// Load and validation failures are handled per the failure policy. Sink
    /// failures always propagate and are never retried.
    pub fn process_source(&self, source: &LineageSource) -> Result<SourceReport> {
        tracing::info!(
            job = %source.name,
            path = %source.path.display(),
            "Processing lineage source"
        );

        let records = match load_records(&source.path) {
            Ok(records) => records,
            Err(e) => return self.contain_failure(source, e),
        };

        let mut report = SourceReport::new(source);
        for group in group_by_job(&records) {
            let event = assemble(&self.job_namespace, &group);
            self.emit_run(&event)?;

            tracing::info!(
                job = %group.job_name,
                run_id = %event.run_id(),
                edges = event.edge_count(),
                "Lineage emitted"
            );
            report.emitted.push(EmittedRun {
                job_name: group.job_name,
                run_id: event.run_id(),
                inputs: event.inputs.len(),
                outputs: event.outputs.len(),
                edges: event.edge_count(),
            });
        }

        Ok(report)
    }

    /// Send a run event, preceded by its dataset facts when enabled.
    pub fn emit_run(&self, event: &RunEvent) -> Result<()> {
        if self.emit_dataset_facts {
            for dataset in event.inputs.iter().chain(event.outputs.iter()) {
                let fact = UpsertFact::Dataset(DatasetFact::from(dataset));
                self.upsert(&fact)?;
            }
        }

        self.sink
            .emit_event(event)
            .map_err(|source| EmitError::Sink {
                context: format!("job '{}' run {}", event.job.name, event.run_id()),
                source,
            })
    }

    /// Send every fact of a glossary plan, in order. Returns the number sent.
    pub fn emit_glossary(&self, plan: &GlossaryPlan) -> Result<usize> {
        for fact in &plan.facts {
            self.upsert(fact)?;
            tracing::info!(kind = fact.kind(), entity = %fact.entity_key(), "Glossary fact emitted");
        }
        Ok(plan.len())
    }

    fn upsert(&self, fact: &UpsertFact) -> Result<()> {
        self.sink.upsert(fact).map_err(|source| EmitError::Sink {
            context: format!("{} '{}'", fact.kind(), fact.entity_key()),
            source,
        })
    }

    fn contain_failure(&self, source: &LineageSource, error: LineageError) -> Result<SourceReport> {
        match self.failure_policy {
            FailurePolicy::Abort => Err(EmitError::Source {
                job: source.name.clone(),
                path: source.path.clone(),
                source: error,
            }),
            FailurePolicy::Isolate => {
                let message = match error.column() {
                    Some(column) => format!("{} (file {}, column {})", error, source.path.display(), column),
                    None => format!("{} (file {})", error, source.path.display()),
                };
                tracing::warn!(
                    job = %source.name,
                    path = %source.path.display(),
                    error = %error,
                    "Lineage source failed, emitting FAIL event"
                );

                let event = RunEvent::failed(&self.job_namespace, &source.name, &message);
                self.emit_run(&event)?;

                let mut report = SourceReport::new(source);
                report.failure = Some(FailedSource {
                    job_name: source.name.clone(),
                    run_id: event.run_id(),
                    message,
                });
                Ok(report)
            }
        }
    }

    /// Get a reference to the sink
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

fn load_records(path: &Path) -> std::result::Result<Vec<Record>, LineageError> {
    let table = RawTable::from_path(path)?;
    validate(&table)
}
