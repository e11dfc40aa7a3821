//! Entity grouping.
//!
//! Partitions validated records into jobs, input dataset entities and output
//! dataset entities. Every grouping emits its groups in first-appearance order
//! of the key, so the same rows in the same order always produce the same
//! entities in the same order.

use std::collections::HashMap;
use std::hash::Hash;

use crate::record::{DatasetKey, Record};

/// Records sharing a job name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobGroup {
    pub job_name: String,
    pub records: Vec<Record>,
}

/// One column of a dataset entity as described by the records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: String,
    /// Whether the describing record asked for the schema facet
    pub add_schema: bool,
}

/// An input dataset entity and its distinct columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputGroup {
    pub key: DatasetKey,
    pub columns: Vec<ColumnSpec>,
}

impl InputGroup {
    /// The schema facet is attached when any column asked for it.
    pub fn wants_schema(&self) -> bool {
        self.columns.iter().any(|c| c.add_schema)
    }
}

/// An output column with every record that feeds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputColumn {
    pub spec: ColumnSpec,
    /// Contributing records in row order, duplicates included
    pub contributors: Vec<Record>,
}

/// An output dataset entity and its distinct columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputGroup {
    pub key: DatasetKey,
    pub columns: Vec<OutputColumn>,
}

impl OutputGroup {
    /// The schema facet is attached when any column asked for it.
    pub fn wants_schema(&self) -> bool {
        self.columns.iter().any(|c| c.spec.add_schema)
    }
}

/// Group items by key, keeping first-appearance order of keys and row order
/// within each group.
fn group_ordered<T, K, F>(items: impl IntoIterator<Item = T>, key_fn: F) -> Vec<(K, Vec<T>)>
where
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<T>)> = Vec::new();

    for item in items {
        let key = key_fn(&item);
        match index.get(&key) {
            Some(&i) => groups[i].1.push(item),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![item]));
            }
        }
    }

    groups
}

/// Partition records into one group per job name.
pub fn group_by_job(records: &[Record]) -> Vec<JobGroup> {
    group_ordered(records.iter().cloned(), |r| r.job_name.clone())
        .into_iter()
        .map(|(job_name, records)| JobGroup { job_name, records })
        .collect()
}

/// Group records into input dataset entities.
///
/// A column described by several records keeps the first description seen;
/// later rows with conflicting metadata for the same column are ignored.
pub fn group_inputs(records: &[Record]) -> Vec<InputGroup> {
    group_ordered(records.iter(), |r| r.input_key())
        .into_iter()
        .map(|(key, rows)| {
            let columns = group_ordered(rows, |r| r.input_column.clone())
                .into_iter()
                .map(|(name, rows)| {
                    let first = rows[0];
                    ColumnSpec {
                        name,
                        data_type: first.input_column_data_type.clone(),
                        add_schema: first.input_add_schema,
                    }
                })
                .collect();
            InputGroup { key, columns }
        })
        .collect()
}

/// Group records into output dataset entities, keeping every contributing
/// record per output column for inference.
pub fn group_outputs(records: &[Record]) -> Vec<OutputGroup> {
    group_ordered(records.iter(), |r| r.output_key())
        .into_iter()
        .map(|(key, rows)| {
            let columns = group_ordered(rows, |r| r.output_column.clone())
                .into_iter()
                .map(|(name, rows)| {
                    let first = rows[0];
                    OutputColumn {
                        spec: ColumnSpec {
                            name,
                            data_type: first.output_column_data_type.clone(),
                            add_schema: first.output_add_schema,
                        },
                        contributors: rows.into_iter().cloned().collect(),
                    }
                })
                .collect();
            OutputGroup { key, columns }
        })
        .collect()
}
