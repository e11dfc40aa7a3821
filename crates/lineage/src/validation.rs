//! Record validation.
//!
//! Gate between an untyped [`RawTable`] and typed [`Record`]s. Checks run in a
//! fixed order, and the first failing check decides the error:
//!
//! 1. the table has at least one data row
//! 2. no row is wider than the header
//! 3. no cell is null
//! 4. the header matches the required column set exactly
//! 5. each column's type, inferred across all rows, matches the required type
//!
//! Nothing is corrected silently. Grouping only ever sees records that passed
//! every check.

use std::collections::HashSet;

use crate::error::{LineageError, Result};
use crate::record::*;
use crate::table::RawTable;

/// Validate a raw table and convert its rows into records, in row order.
pub fn validate(table: &RawTable) -> Result<Vec<Record>> {
    if table.is_empty() {
        return Err(LineageError::EmptyInput);
    }

    check_row_widths(table)?;
    check_no_missing_values(table)?;
    check_schema(&table.headers)?;

    for (column, expected) in REQUIRED_COLUMNS {
        let found = infer_column_type(table, column);
        if found != expected {
            return Err(LineageError::TypeMismatch {
                column: column.to_string(),
                expected,
                found,
            });
        }
    }

    let records = table
        .rows
        .iter()
        .map(|row| to_record(table, row))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(rows = records.len(), "Lineage table validated");
    Ok(records)
}

fn check_row_widths(table: &RawTable) -> Result<()> {
    let expected = table.headers.len();
    match table.rows.iter().position(|row| row.len() > expected) {
        Some(row_idx) => Err(LineageError::RaggedRow {
            row: row_idx + 1,
            expected,
            found: table.rows[row_idx].len(),
        }),
        None => Ok(()),
    }
}

fn check_no_missing_values(table: &RawTable) -> Result<()> {
    for (row_idx, row) in table.rows.iter().enumerate() {
        if let Some(col_idx) = row.iter().position(|cell| cell.is_none()) {
            let column = table
                .headers
                .get(col_idx)
                .cloned()
                .unwrap_or_else(|| format!("#{}", col_idx + 1));
            return Err(LineageError::MissingValue {
                column,
                row: row_idx + 1,
            });
        }
    }
    Ok(())
}

/// Check that `headers` holds every required column exactly once and nothing else.
pub fn check_schema(headers: &[String]) -> Result<()> {
    let required: HashSet<&str> = REQUIRED_COLUMNS.iter().map(|(name, _)| *name).collect();

    let mut seen = HashSet::new();
    let mut unexpected = Vec::new();
    for header in headers {
        if !required.contains(header.as_str()) || !seen.insert(header.as_str()) {
            unexpected.push(header.clone());
        }
    }

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|(name, _)| !seen.contains(name))
        .map(|(name, _)| name.to_string())
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        Ok(())
    } else {
        Err(LineageError::SchemaMismatch {
            missing,
            unexpected,
        })
    }
}

/// Infer the type of a column from all of its non-null cells.
///
/// Integer wins over boolean, boolean over float, and anything else is a
/// string. Infinities count as floats.
pub fn infer_type<'a>(values: impl IntoIterator<Item = &'a str> + Clone) -> FieldType {
    if values.clone().into_iter().all(|v| v.parse::<i64>().is_ok()) {
        FieldType::Integer
    } else if values.clone().into_iter().all(|v| parse_bool(v).is_some()) {
        FieldType::Boolean
    } else if values
        .into_iter()
        .all(|v| v.parse::<f64>().map(|f| !f.is_nan()).unwrap_or(false))
    {
        FieldType::Float
    } else {
        FieldType::String
    }
}

fn infer_column_type(table: &RawTable, column: &str) -> FieldType {
    let Some(idx) = table.column_index(column) else {
        return FieldType::String;
    };
    let cells: Vec<&str> = table
        .rows
        .iter()
        .filter_map(|row| row.get(idx).and_then(|c| c.as_deref()))
        .collect();
    infer_type(cells.iter().copied())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

fn to_record(table: &RawTable, row: &[Option<String>]) -> Result<Record> {
    let text = |column: &str| -> String {
        table
            .column_index(column)
            .and_then(|idx| row.get(idx))
            .and_then(|cell| cell.clone())
            .unwrap_or_default()
    };
    let flag = |column: &str| -> Result<bool> {
        parse_bool(&text(column)).ok_or_else(|| LineageError::TypeMismatch {
            column: column.to_string(),
            expected: FieldType::Boolean,
            found: FieldType::String,
        })
    };

    let id = text(ID)
        .parse::<i64>()
        .map_err(|_| LineageError::TypeMismatch {
            column: ID.to_string(),
            expected: FieldType::Integer,
            found: FieldType::String,
        })?;

    Ok(Record {
        job_name: text(JOB_NAME),
        id,
        input_table_source: text(INPUT_TABLE_SOURCE),
        input_table: text(INPUT_TABLE),
        input_column: text(INPUT_COLUMN),
        input_column_data_type: text(INPUT_COLUMN_DATA_TYPE),
        input_add_schema: flag(INPUT_ADD_SCHEMA)?,
        output_table_destination: text(OUTPUT_TABLE_DESTINATION),
        output_table: text(OUTPUT_TABLE),
        output_column: text(OUTPUT_COLUMN),
        output_column_data_type: text(OUTPUT_COLUMN_DATA_TYPE),
        output_add_schema: flag(OUTPUT_ADD_SCHEMA)?,
        transformation: flag(TRANSFORMATION)?,
    })
}
