//! Lineage run events.
//!
//! A [`RunEvent`] is the unit handed to the catalog: one job run with its input
//! and output datasets, the outputs carrying column-level lineage. Events
//! serialize as OpenLineage run events.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::grouping::{group_by_job, group_inputs, group_outputs, InputGroup, JobGroup, OutputGroup};
use crate::inference::{infer_edge, ColumnLineageEdge, InputField, TransformationType};
use crate::record::{DatasetKey, Record};

/// Job namespace used when none is configured.
pub const DEFAULT_JOB_NAMESPACE: &str = "local-test";

/// Producer URI stamped on every event and facet.
pub const PRODUCER: &str = concat!(
    "https://github.com/tabula-lineage/tabula/tree/v",
    env!("CARGO_PKG_VERSION"),
    "/crates/lineage"
);

pub const RUN_EVENT_SCHEMA_URL: &str =
    "https://openlineage.io/spec/2-0-2/OpenLineage.json#/$defs/RunEvent";
pub const SCHEMA_FACET_URL: &str =
    "https://openlineage.io/spec/facets/1-1-1/SchemaDatasetFacet.json#/$defs/SchemaDatasetFacet";
pub const COLUMN_LINEAGE_FACET_URL: &str = "https://openlineage.io/spec/facets/1-2-0/ColumnLineageDatasetFacet.json#/$defs/ColumnLineageDatasetFacet";
pub const ERROR_MESSAGE_FACET_URL: &str = "https://openlineage.io/spec/facets/1-0-1/ErrorMessageRunFacet.json#/$defs/ErrorMessageRunFacet";

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Start,
    Running,
    Complete,
    Abort,
    Fail,
    Other,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Start => "START",
            EventType::Running => "RUNNING",
            EventType::Complete => "COMPLETE",
            EventType::Abort => "ABORT",
            EventType::Fail => "FAIL",
            EventType::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub run_id: Uuid,
    #[serde(skip_serializing_if = "RunFacets::is_empty")]
    pub facets: RunFacets,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFacets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<ErrorMessageFacet>,
}

impl RunFacets {
    pub fn is_empty(&self) -> bool {
        self.error_message.is_none()
    }
}

/// Why a run failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessageFacet {
    #[serde(rename = "_producer")]
    pub producer: String,
    #[serde(rename = "_schemaURL")]
    pub schema_url: String,
    pub message: String,
    pub programming_language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    pub namespace: String,
    pub name: String,
}

/// A column in a schema facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaFacet {
    #[serde(rename = "_producer")]
    pub producer: String,
    #[serde(rename = "_schemaURL")]
    pub schema_url: String,
    pub fields: Vec<SchemaField>,
}

impl SchemaFacet {
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Self {
            producer: PRODUCER.to_string(),
            schema_url: SCHEMA_FACET_URL.to_string(),
            fields,
        }
    }
}

/// Column-level lineage of an output dataset, one edge per output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnLineageFacet {
    #[serde(rename = "_producer")]
    pub producer: String,
    #[serde(rename = "_schemaURL")]
    pub schema_url: String,
    /// Serialized as a map keyed by output column, in edge order
    #[serde(serialize_with = "serialize_lineage_fields")]
    pub fields: Vec<ColumnLineageEdge>,
}

impl ColumnLineageFacet {
    pub fn new(fields: Vec<ColumnLineageEdge>) -> Self {
        Self {
            producer: PRODUCER.to_string(),
            schema_url: COLUMN_LINEAGE_FACET_URL.to_string(),
            fields,
        }
    }

    /// Edge for an output column, if present.
    pub fn edge(&self, column: &str) -> Option<&ColumnLineageEdge> {
        self.fields.iter().find(|e| e.column == column)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldLineage<'a> {
    input_fields: &'a [InputField],
    transformation_type: TransformationType,
    transformation_description: Option<&'a str>,
}

fn serialize_lineage_fields<S>(
    edges: &[ColumnLineageEdge],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(edges.len()))?;
    for edge in edges {
        map.serialize_entry(
            &edge.column,
            &FieldLineage {
                input_fields: &edge.input_fields,
                transformation_type: edge.transformation,
                transformation_description: None,
            },
        )?;
    }
    map.end()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetFacets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaFacet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_lineage: Option<ColumnLineageFacet>,
}

/// A dataset entity as it appears in a run event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dataset {
    pub namespace: String,
    pub name: String,
    pub facets: DatasetFacets,
}

impl Dataset {
    pub fn new(key: DatasetKey) -> Self {
        Self {
            namespace: key.namespace,
            name: key.name,
            facets: DatasetFacets::default(),
        }
    }

    /// Schema columns, if the schema facet is attached.
    pub fn schema_fields(&self) -> Option<&[SchemaField]> {
        self.facets.schema.as_ref().map(|s| s.fields.as_slice())
    }

    pub fn column_lineage(&self) -> Option<&ColumnLineageFacet> {
        self.facets.column_lineage.as_ref()
    }
}

impl From<&InputGroup> for Dataset {
    fn from(group: &InputGroup) -> Self {
        let mut dataset = Dataset::new(group.key.clone());
        if group.wants_schema() {
            dataset.facets.schema = Some(SchemaFacet::new(
                group
                    .columns
                    .iter()
                    .map(|c| SchemaField {
                        name: c.name.clone(),
                        data_type: c.data_type.clone(),
                    })
                    .collect(),
            ));
        }
        dataset
    }
}

impl From<&OutputGroup> for Dataset {
    fn from(group: &OutputGroup) -> Self {
        let mut dataset = Dataset::new(group.key.clone());
        dataset.facets.column_lineage = Some(ColumnLineageFacet::new(
            group.columns.iter().map(infer_edge).collect(),
        ));
        if group.wants_schema() {
            dataset.facets.schema = Some(SchemaFacet::new(
                group
                    .columns
                    .iter()
                    .map(|c| SchemaField {
                        name: c.spec.name.clone(),
                        data_type: c.spec.data_type.clone(),
                    })
                    .collect(),
            ));
        }
        dataset
    }
}

/// One immutable lineage event for a job run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEvent {
    pub event_type: EventType,
    pub event_time: DateTime<Utc>,
    pub run: Run,
    pub job: Job,
    pub inputs: Vec<Dataset>,
    pub outputs: Vec<Dataset>,
    pub producer: String,
    #[serde(rename = "schemaURL")]
    pub schema_url: String,
}

impl RunEvent {
    /// Create an event with a fresh run id, stamped with the current UTC time.
    pub fn new(
        event_type: EventType,
        job_namespace: impl Into<String>,
        job_name: impl Into<String>,
        inputs: Vec<Dataset>,
        outputs: Vec<Dataset>,
    ) -> Self {
        Self {
            event_type,
            event_time: Utc::now(),
            run: Run {
                run_id: Uuid::new_v4(),
                facets: RunFacets::default(),
            },
            job: Job {
                namespace: job_namespace.into(),
                name: job_name.into(),
            },
            inputs,
            outputs,
            producer: PRODUCER.to_string(),
            schema_url: RUN_EVENT_SCHEMA_URL.to_string(),
        }
    }

    /// A `FAIL` event with no datasets, carrying the failure message.
    pub fn failed(
        job_namespace: impl Into<String>,
        job_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut event = Self::new(EventType::Fail, job_namespace, job_name, vec![], vec![]);
        event.run.facets.error_message = Some(ErrorMessageFacet {
            producer: PRODUCER.to_string(),
            schema_url: ERROR_MESSAGE_FACET_URL.to_string(),
            message: message.into(),
            programming_language: "rust".to_string(),
        });
        event
    }

    pub fn run_id(&self) -> Uuid {
        self.run.run_id
    }

    /// Total number of column lineage edges across all outputs.
    pub fn edge_count(&self) -> usize {
        self.outputs
            .iter()
            .filter_map(|o| o.column_lineage())
            .map(|f| f.fields.len())
            .sum()
    }

    /// Find an output dataset by name.
    pub fn output(&self, name: &str) -> Option<&Dataset> {
        self.outputs.iter().find(|d| d.name == name)
    }
}

/// Assemble the `COMPLETE` event for one job group.
pub fn assemble(job_namespace: &str, group: &JobGroup) -> RunEvent {
    let inputs = group_inputs(&group.records).iter().map(Dataset::from).collect();
    let outputs = group_outputs(&group.records)
        .iter()
        .map(Dataset::from)
        .collect();

    RunEvent::new(
        EventType::Complete,
        job_namespace,
        group.job_name.clone(),
        inputs,
        outputs,
    )
}

/// Derive one `COMPLETE` event per job found in validated records, in
/// first-appearance order of the job name.
pub fn derive_events(job_namespace: &str, records: &[Record]) -> Vec<RunEvent> {
    group_by_job(records)
        .iter()
        .map(|group| assemble(job_namespace, group))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(job: &str, input: (&str, &str), output: (&str, &str), transformation: bool) -> Record {
        Record {
            job_name: job.to_string(),
            input_table_source: "raw_ns".to_string(),
            input_table: input.0.to_string(),
            input_column: input.1.to_string(),
            input_column_data_type: "string".to_string(),
            output_table_destination: "cur_ns".to_string(),
            output_table: output.0.to_string(),
            output_column: output.1.to_string(),
            output_column_data_type: "string".to_string(),
            transformation,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_row_scenario() {
        let records = vec![mapping("etl1", ("raw", "x"), ("curated", "y"), false)];
        let events = derive_events(DEFAULT_JOB_NAMESPACE, &records);

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.event_type, EventType::Complete);
        assert_eq!(event.job.name, "etl1");
        assert_eq!(event.job.namespace, "local-test");
        assert_eq!(event.inputs.len(), 1);
        assert_eq!(event.inputs[0].name, "raw");
        assert_eq!(event.outputs.len(), 1);

        let lineage = event.output("curated").unwrap().column_lineage().unwrap();
        let edge = lineage.edge("y").unwrap();
        assert_eq!(edge.transformation, TransformationType::Identity);
        assert_eq!(edge.input_fields.len(), 1);
        assert_eq!(edge.input_fields[0].name, "raw");
        assert_eq!(edge.input_fields[0].field, "x");
    }

    #[test]
    fn test_one_edge_per_output_column() {
        let records = vec![
            mapping("j", ("orders", "amount"), ("facts", "total"), false),
            mapping("j", ("refunds", "amount"), ("facts", "total"), false),
            mapping("j", ("orders", "id"), ("facts", "order_id"), false),
            mapping("j", ("orders", "id"), ("audit", "order_id"), true),
        ];
        let event = &derive_events("ns", &records)[0];

        assert_eq!(event.edge_count(), 3);
        let facts = event.output("facts").unwrap().column_lineage().unwrap();
        assert_eq!(
            facts.edge("total").unwrap().transformation,
            TransformationType::Aggregation
        );
        let audit = event.output("audit").unwrap().column_lineage().unwrap();
        assert_eq!(
            audit.edge("order_id").unwrap().transformation,
            TransformationType::Transformation
        );
    }

    #[test]
    fn test_run_ids_are_fresh() {
        let records = vec![
            mapping("a", ("raw", "x"), ("curated", "y"), false),
            mapping("b", ("raw", "x"), ("curated", "y"), false),
        ];
        let first = derive_events("ns", &records);
        let second = derive_events("ns", &records);

        assert_ne!(first[0].run_id(), first[1].run_id());
        assert_ne!(first[0].run_id(), second[0].run_id());
    }

    #[test]
    fn test_schema_facet_only_when_requested() {
        let mut with_schema = mapping("j", ("raw", "x"), ("curated", "y"), false);
        with_schema.output_add_schema = true;
        with_schema.output_column_data_type = "bigint".to_string();

        let event = &derive_events("ns", &[with_schema])[0];
        assert!(event.inputs[0].schema_fields().is_none());

        let fields = event.outputs[0].schema_fields().unwrap();
        assert_eq!(
            fields,
            &[SchemaField {
                name: "y".to_string(),
                data_type: "bigint".to_string()
            }]
        );
    }

    #[test]
    fn test_wire_format() {
        let mut record = mapping("etl1", ("raw", "x"), ("curated", "y"), false);
        record.input_add_schema = true;
        let event = &derive_events("local-test", &[record])[0];

        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["eventType"], "COMPLETE");
        assert_eq!(json["job"]["name"], "etl1");
        assert_eq!(json["run"]["runId"], event.run_id().to_string());
        assert!(json["run"].get("facets").is_none());
        assert_eq!(json["schemaURL"], RUN_EVENT_SCHEMA_URL);
        assert_eq!(json["inputs"][0]["facets"]["schema"]["fields"][0]["type"], "string");

        let y = &json["outputs"][0]["facets"]["columnLineage"]["fields"]["y"];
        assert_eq!(y["transformationType"], "IDENTITY");
        assert!(y["transformationDescription"].is_null());
        assert_eq!(y["inputFields"][0]["namespace"], "raw_ns");
        assert_eq!(y["inputFields"][0]["name"], "raw");
        assert_eq!(y["inputFields"][0]["field"], "x");

        let time = json["eventTime"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(time).is_ok());
    }

    #[test]
    fn test_failed_event() {
        let event = RunEvent::failed("ns", "etl1", "Lineage table is empty");

        assert_eq!(event.event_type, EventType::Fail);
        assert!(event.inputs.is_empty());
        assert!(event.outputs.is_empty());

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["eventType"], "FAIL");
        assert_eq!(
            json["run"]["facets"]["errorMessage"]["message"],
            "Lineage table is empty"
        );
    }
}
