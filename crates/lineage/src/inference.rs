//! Lineage inference for output columns.

use serde::{Deserialize, Serialize};

use crate::grouping::OutputColumn;
use crate::record::Record;

/// How an output column relates to its contributing input columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransformationType {
    /// Copied unchanged from a single input column
    #[default]
    Identity,
    /// Computed from a single input column
    Transformation,
    /// Computed from several input rows
    Aggregation,
}

impl TransformationType {
    /// Returns the wire representation of this transformation type.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformationType::Identity => "IDENTITY",
            TransformationType::Transformation => "TRANSFORMATION",
            TransformationType::Aggregation => "AGGREGATION",
        }
    }
}

impl std::fmt::Display for TransformationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A contributing input column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputField {
    pub namespace: String,
    /// Input dataset name
    pub name: String,
    pub field: String,
}

impl From<&Record> for InputField {
    fn from(record: &Record) -> Self {
        Self {
            namespace: record.input_table_source.clone(),
            name: record.input_table.clone(),
            field: record.input_column.clone(),
        }
    }
}

/// Lineage of one output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLineageEdge {
    /// Output column name
    pub column: String,
    /// One entry per contributing record, in row order
    pub input_fields: Vec<InputField>,
    pub transformation: TransformationType,
}

/// Classify the relationship between an output column and its contributors.
///
/// More than one contributing record is an aggregation regardless of the
/// transformation flags. A single record is a transformation when flagged,
/// otherwise an identity copy.
pub fn classify(contributors: &[Record]) -> TransformationType {
    match contributors {
        [single] if single.transformation => TransformationType::Transformation,
        [_] | [] => TransformationType::Identity,
        _ => TransformationType::Aggregation,
    }
}

/// Build the lineage edge for one output column.
pub fn infer_edge(column: &OutputColumn) -> ColumnLineageEdge {
    ColumnLineageEdge {
        column: column.spec.name.clone(),
        input_fields: column.contributors.iter().map(InputField::from).collect(),
        transformation: classify(&column.contributors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::ColumnSpec;

    fn contributor(table: &str, column: &str, transformation: bool) -> Record {
        Record {
            input_table_source: "raw_ns".to_string(),
            input_table: table.to_string(),
            input_column: column.to_string(),
            transformation,
            ..Default::default()
        }
    }

    fn output_column(name: &str, contributors: Vec<Record>) -> OutputColumn {
        OutputColumn {
            spec: ColumnSpec {
                name: name.to_string(),
                data_type: "string".to_string(),
                add_schema: false,
            },
            contributors,
        }
    }

    #[test]
    fn test_single_untransformed_is_identity() {
        let rows = vec![contributor("raw", "x", false)];
        assert_eq!(classify(&rows), TransformationType::Identity);
    }

    #[test]
    fn test_single_transformed_is_transformation() {
        let rows = vec![contributor("raw", "x", true)];
        assert_eq!(classify(&rows), TransformationType::Transformation);
    }

    #[test]
    fn test_multiple_is_aggregation_regardless_of_flags() {
        let untransformed = vec![contributor("raw", "x", false), contributor("raw", "z", false)];
        let mixed = vec![contributor("raw", "x", true), contributor("raw", "z", false)];
        assert_eq!(classify(&untransformed), TransformationType::Aggregation);
        assert_eq!(classify(&mixed), TransformationType::Aggregation);
    }

    #[test]
    fn test_duplicate_rows_count_toward_aggregation() {
        let rows = vec![contributor("raw", "x", false), contributor("raw", "x", false)];
        let edge = infer_edge(&output_column("y", rows));

        assert_eq!(edge.transformation, TransformationType::Aggregation);
        assert_eq!(edge.input_fields.len(), 2);
        assert_eq!(edge.input_fields[0], edge.input_fields[1]);
    }

    #[test]
    fn test_infer_edge_is_stable() {
        let column = output_column(
            "total",
            vec![contributor("orders", "amount", false), contributor("refunds", "amount", true)],
        );

        let first = infer_edge(&column);
        let second = infer_edge(&column);
        assert_eq!(first, second);
        assert_eq!(first.column, "total");
        assert_eq!(first.input_fields[0].name, "orders");
        assert_eq!(first.input_fields[1].name, "refunds");
        assert_eq!(first.input_fields[1].namespace, "raw_ns");
    }

    #[test]
    fn test_display_matches_wire_label() {
        assert_eq!(TransformationType::Identity.to_string(), "IDENTITY");
        assert_eq!(TransformationType::Aggregation.to_string(), "AGGREGATION");
    }

    #[test]
    fn test_serializes_as_wire_label() {
        let json = serde_json::to_string(&TransformationType::Transformation).unwrap();
        assert_eq!(json, "\"TRANSFORMATION\"");
    }
}
