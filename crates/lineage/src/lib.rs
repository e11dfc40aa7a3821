//! Column-level lineage derivation for tabular job mappings.
//!
//! This crate turns a lineage table, one row per input-column to
//! output-column mapping, into OpenLineage run events with column-level
//! lineage. It enables:
//!
//! - **Catalog Lineage**: publish which input columns feed which output columns
//! - **Impact Analysis**: see what an input column change touches downstream
//! - **Schema Capture**: optionally attach dataset schemas to the same event
//!
//! # Pipeline
//!
//! 1. [`RawTable`] loads delimited text, auto-detecting the delimiter
//! 2. [`validate`] gates the table against the fixed 13-column schema
//! 3. [`group_by_job`], [`group_inputs`] and [`group_outputs`] build entities
//! 4. [`infer_edge`] classifies each output column's lineage
//! 5. [`assemble`] packages one job into a [`RunEvent`]
//!
//! # Example
//!
//! ```
//! use tabula_lineage::{derive_events, validate, RawTable, TransformationType};
//!
//! let csv = "\
//! job_name,id,input_table_source,input_table,input_column,input_column_data_type,input_add_schema,output_table_destination,output_table,output_column,output_column_data_type,output_add_schema,transformation
//! etl1,1,warehouse,raw,x,string,False,warehouse,curated,y,string,False,False
//! ";
//!
//! let table = RawTable::from_reader(csv.as_bytes()).unwrap();
//! let records = validate(&table).unwrap();
//! let events = derive_events("local-test", &records);
//!
//! assert_eq!(events.len(), 1);
//! let edge = events[0].outputs[0].column_lineage().unwrap().edge("y").unwrap();
//! assert_eq!(edge.transformation, TransformationType::Identity);
//! ```
//!
//! # Classification
//!
//! | Contributing rows | Transformation flag | Label |
//! |-------------------|---------------------|-------|
//! | more than one | any | `AGGREGATION` |
//! | one | true | `TRANSFORMATION` |
//! | one | false | `IDENTITY` |

mod error;
pub mod event;
pub mod fact;
pub mod glossary;
mod grouping;
mod inference;
pub mod record;
mod table;
mod validation;

// Re-export public types
pub use error::{LineageError, Result};
pub use event::{
    assemble, derive_events, ColumnLineageFacet, Dataset, EventType, RunEvent, SchemaField,
    DEFAULT_JOB_NAMESPACE,
};
pub use fact::{DatasetFact, UpsertFact};
pub use glossary::{GlossaryEntry, GlossaryPlan};
pub use grouping::{
    group_by_job, group_inputs, group_outputs, ColumnSpec, InputGroup, JobGroup, OutputColumn,
    OutputGroup,
};
pub use inference::{classify, infer_edge, ColumnLineageEdge, InputField, TransformationType};
pub use record::{DatasetKey, FieldType, Record, REQUIRED_COLUMNS};
pub use table::{sniff_delimiter, RawTable};
pub use validation::{check_schema, infer_type, validate};

/// Load, validate and derive events for a lineage table in one call.
pub fn derive_from_path(
    job_namespace: &str,
    path: impl AsRef<std::path::Path>,
) -> Result<Vec<RunEvent>> {
    let table = RawTable::from_path(path)?;
    let records = validate(&table)?;
    Ok(derive_events(job_namespace, &records))
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "job_name\tid\tinput_table_source\tinput_table\tinput_column\tinput_column_data_type\tinput_add_schema\toutput_table_destination\toutput_table\toutput_column\toutput_column_data_type\toutput_add_schema\ttransformation";

    fn write_table(rows: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        for row in rows {
            writeln!(file, "{}", row.replace(',', "\t")).unwrap();
        }
        file
    }

    /// End-to-end test for a customer summary job fed by two tables.
    #[test]
    fn test_customer_summary() {
        let file = write_table(&[
            "summary,1,pg://crm,customers,id,int,True,s3://mart,customer_summary,customer_id,int,True,False",
            "summary,2,pg://crm,customers,name,text,True,s3://mart,customer_summary,full_name,text,True,True",
            "summary,3,pg://shop,orders,amount,numeric,False,s3://mart,customer_summary,lifetime_value,numeric,True,True",
            "summary,4,pg://shop,refunds,amount,numeric,False,s3://mart,customer_summary,lifetime_value,numeric,True,True",
            "churn,5,s3://mart,customer_summary,lifetime_value,numeric,False,s3://ml,churn_features,ltv,double,False,False",
        ]);

        let events = derive_from_path("local-test", file.path()).unwrap();
        assert_eq!(events.len(), 2);

        let summary = &events[0];
        assert_eq!(summary.job.name, "summary");
        let inputs: Vec<_> = summary.inputs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(inputs, vec!["customers", "orders", "refunds"]);
        assert_eq!(summary.inputs[0].schema_fields().unwrap().len(), 2);
        assert!(summary.inputs[1].schema_fields().is_none());

        let output = summary.output("customer_summary").unwrap();
        let lineage = output.column_lineage().unwrap();
        assert_eq!(lineage.fields.len(), 3);
        assert_eq!(
            lineage.edge("customer_id").unwrap().transformation,
            TransformationType::Identity
        );
        assert_eq!(
            lineage.edge("full_name").unwrap().transformation,
            TransformationType::Transformation
        );
        let ltv = lineage.edge("lifetime_value").unwrap();
        assert_eq!(ltv.transformation, TransformationType::Aggregation);
        assert_eq!(ltv.input_fields.len(), 2);
        assert_eq!(output.schema_fields().unwrap().len(), 3);

        let churn = &events[1];
        assert_eq!(churn.inputs[0].namespace, "s3://mart");
        assert_eq!(churn.edge_count(), 1);
    }

    /// A table missing a column produces no events.
    #[test]
    fn test_schema_mismatch_blocks_events() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "job_name,id").unwrap();
        writeln!(file, "etl1,1").unwrap();

        let err = derive_from_path("local-test", file.path()).unwrap_err();
        assert!(matches!(err, LineageError::SchemaMismatch { .. }));
    }
}
