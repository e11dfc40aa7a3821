//! Typed lineage records.
//!
//! A [`Record`] is one validated row of a lineage table: a single mapping from
//! an input column to an output column within a job.

use serde::{Deserialize, Serialize};

/// Column type inferred for a table column, or required by the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Free text (any column that is not uniformly numeric or boolean)
    String,
    /// 64-bit signed integer
    Integer,
    /// Floating point number
    Float,
    /// Boolean literal
    Boolean,
}

impl FieldType {
    /// Returns the string representation of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub const JOB_NAME: &str = "job_name";
pub const ID: &str = "id";
pub const INPUT_TABLE_SOURCE: &str = "input_table_source";
pub const INPUT_TABLE: &str = "input_table";
pub const INPUT_COLUMN: &str = "input_column";
pub const INPUT_COLUMN_DATA_TYPE: &str = "input_column_data_type";
pub const INPUT_ADD_SCHEMA: &str = "input_add_schema";
pub const OUTPUT_TABLE_DESTINATION: &str = "output_table_destination";
pub const OUTPUT_TABLE: &str = "output_table";
pub const OUTPUT_COLUMN: &str = "output_column";
pub const OUTPUT_COLUMN_DATA_TYPE: &str = "output_column_data_type";
pub const OUTPUT_ADD_SCHEMA: &str = "output_add_schema";
pub const TRANSFORMATION: &str = "transformation";

/// The fixed table schema: every column a lineage table must carry, with its type.
pub const REQUIRED_COLUMNS: [(&str, FieldType); 13] = [
    (JOB_NAME, FieldType::String),
    (ID, FieldType::Integer),
    (INPUT_TABLE_SOURCE, FieldType::String),
    (INPUT_TABLE, FieldType::String),
    (INPUT_COLUMN, FieldType::String),
    (INPUT_COLUMN_DATA_TYPE, FieldType::String),
    (INPUT_ADD_SCHEMA, FieldType::Boolean),
    (OUTPUT_TABLE_DESTINATION, FieldType::String),
    (OUTPUT_TABLE, FieldType::String),
    (OUTPUT_COLUMN, FieldType::String),
    (OUTPUT_COLUMN_DATA_TYPE, FieldType::String),
    (OUTPUT_ADD_SCHEMA, FieldType::Boolean),
    (TRANSFORMATION, FieldType::Boolean),
];

/// One validated row of a lineage table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Record {
    pub job_name: String,
    pub id: i64,
    /// Namespace of the input dataset
    pub input_table_source: String,
    pub input_table: String,
    pub input_column: String,
    pub input_column_data_type: String,
    /// Attach the input dataset's schema facet
    pub input_add_schema: bool,
    /// Namespace of the output dataset
    pub output_table_destination: String,
    pub output_table: String,
    pub output_column: String,
    pub output_column_data_type: String,
    /// Attach the output dataset's schema facet
    pub output_add_schema: bool,
    /// The output column is computed from the input rather than copied
    pub transformation: bool,
}

impl Record {
    /// Key of the input dataset this record reads from.
    pub fn input_key(&self) -> DatasetKey {
        DatasetKey::new(&self.input_table_source, &self.input_table)
    }

    /// Key of the output dataset this record writes to.
    pub fn output_key(&self) -> DatasetKey {
        DatasetKey::new(&self.output_table_destination, &self.output_table)
    }
}

/// Composite identifier of a dataset entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatasetKey {
    pub namespace: String,
    pub name: String,
}

impl DatasetKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
