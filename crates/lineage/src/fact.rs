//! Upsert facts for the metadata catalog.
//!
//! Facts are append-only and keyed by a stable identifier: re-sending the same
//! fact overwrites the catalog's copy rather than adding a second one.

use serde::{Deserialize, Serialize};

use crate::event::{Dataset, SchemaField};

/// A single upsert against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpsertFact {
    /// A dataset entity, optionally with its schema
    Dataset(DatasetFact),
    /// A glossary term definition
    GlossaryTerm(GlossaryTermFact),
    /// Terms attached to a single dataset field
    FieldTerms(FieldTermsFact),
    /// Terms attached to a whole dataset
    DatasetTerms(DatasetTermsFact),
    /// Field-level term attachments for every field of a dataset, sent at once
    EditableSchema(EditableSchemaFact),
}

impl UpsertFact {
    /// Stable identifier of the entity this fact updates.
    pub fn entity_key(&self) -> String {
        match self {
            UpsertFact::Dataset(f) => format!("{}/{}", f.namespace, f.name),
            UpsertFact::GlossaryTerm(f) => f.urn.clone(),
            UpsertFact::FieldTerms(f) => f.field_urn(),
            UpsertFact::DatasetTerms(f) => f.dataset_urn.clone(),
            UpsertFact::EditableSchema(f) => f.dataset_urn.clone(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            UpsertFact::Dataset(_) => "dataset",
            UpsertFact::GlossaryTerm(_) => "glossary_term",
            UpsertFact::FieldTerms(_) => "field_terms",
            UpsertFact::DatasetTerms(_) => "dataset_terms",
            UpsertFact::EditableSchema(_) => "editable_schema",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetFact {
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<SchemaField>>,
}

impl From<&Dataset> for DatasetFact {
    fn from(dataset: &Dataset) -> Self {
        Self {
            namespace: dataset.namespace.clone(),
            name: dataset.name.clone(),
            fields: dataset.schema_fields().map(|f| f.to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryTermFact {
    pub urn: String,
    pub name: String,
    pub definition: String,
    /// Owning principal, e.g. `urn:li:corpuser:jdoe`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTermsFact {
    pub dataset_urn: String,
    pub field: String,
    pub term_urns: Vec<String>,
}

impl FieldTermsFact {
    pub fn field_urn(&self) -> String {
        format!("urn:li:datasetField:({},{})", self.dataset_urn, self.field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetTermsFact {
    pub dataset_urn: String,
    pub term_urns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditableSchemaFact {
    pub dataset_urn: String,
    pub fields: Vec<FieldTermsFact>,
}
