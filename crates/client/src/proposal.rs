//! Metadata change proposals.
//!
//! The catalog's ingestion endpoint accepts one aspect per request, wrapped in
//! a proposal envelope whose aspect value is itself JSON-encoded text. A
//! single [`UpsertFact`] may expand to several proposals.

use serde::Serialize;
use serde_json::{json, Map, Value};
use tabula_lineage::fact::{
    DatasetFact, DatasetTermsFact, EditableSchemaFact, FieldTermsFact, GlossaryTermFact,
};
use tabula_lineage::glossary::dataset_urn;
use tabula_lineage::UpsertFact;

use crate::error::Result;

/// Actor recorded in audit stamps when a fact names no owner.
pub const SYSTEM_ACTOR: &str = "urn:li:corpuser:datahub";

/// Environment used for datasets identified by a lineage namespace.
pub const DEFAULT_ENV: &str = "PROD";

const RUN_ID: &str = "tabula-ingestion";

/// Request body of the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestRequest {
    pub proposal: MetadataChangeProposal,
}

/// One aspect upsert against one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataChangeProposal {
    pub entity_type: String,
    pub entity_urn: String,
    pub change_type: String,
    pub aspect_name: String,
    pub aspect: GenericAspect,
    pub system_metadata: SystemMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericAspect {
    pub content_type: String,
    /// JSON-encoded aspect
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetadata {
    pub last_observed: i64,
    pub run_id: String,
}

struct Stamp<'a> {
    time: i64,
    actor: &'a str,
}

impl Stamp<'_> {
    fn to_json(&self) -> Value {
        json!({ "time": self.time, "actor": self.actor })
    }
}

/// Expand a fact into the proposals that apply it, in send order.
pub fn proposals_for(fact: &UpsertFact, now_millis: i64) -> Result<Vec<MetadataChangeProposal>> {
    let stamp = Stamp {
        time: now_millis,
        actor: SYSTEM_ACTOR,
    };
    let raw = match fact {
        UpsertFact::Dataset(f) => vec![dataset_aspect(f)],
        UpsertFact::GlossaryTerm(f) => glossary_term_aspects(f, now_millis),
        UpsertFact::FieldTerms(f) => vec![field_terms_aspect(f, &stamp)],
        UpsertFact::DatasetTerms(f) => vec![dataset_terms_aspect(f, &stamp)],
        UpsertFact::EditableSchema(f) => vec![editable_schema_aspect(f, &stamp)],
    };

    raw.into_iter()
        .map(|(entity_type, entity_urn, aspect_name, value)| -> Result<MetadataChangeProposal> {
            Ok(MetadataChangeProposal {
                entity_type: entity_type.to_string(),
                entity_urn,
                change_type: "UPSERT".to_string(),
                aspect_name: aspect_name.to_string(),
                aspect: GenericAspect {
                    content_type: "application/json".to_string(),
                    value: serde_json::to_string(&value)?,
                },
                system_metadata: SystemMetadata {
                    last_observed: now_millis,
                    run_id: RUN_ID.to_string(),
                },
            })
        })
        .collect()
}

type RawAspect = (&'static str, String, &'static str, Value);

/// Catalog urn of a dataset identified by lineage namespace and name.
///
/// The namespace scheme (`s3://bucket` → `s3`) names the platform; the rest
/// of the namespace prefixes the dataset name.
pub fn lineage_dataset_urn(namespace: &str, name: &str) -> String {
    let (platform, prefix) = match namespace.split_once("://") {
        Some((scheme, rest)) => (scheme, rest.trim_matches('/')),
        None => (namespace, ""),
    };
    let qualified = if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix.replace('/', "."), name)
    };
    dataset_urn(platform, &qualified, DEFAULT_ENV)
}

fn dataset_aspect(fact: &DatasetFact) -> RawAspect {
    let urn = lineage_dataset_urn(&fact.namespace, &fact.name);
    match &fact.fields {
        Some(fields) => {
            let platform = urn_platform(&fact.namespace);
            let fields: Vec<Value> = fields
                .iter()
                .map(|f| {
                    let mut field_type = Map::new();
                    field_type.insert(schema_type(&f.data_type).to_string(), json!({}));
                    json!({
                        "fieldPath": f.name,
                        "nativeDataType": f.data_type,
                        "type": { "type": field_type },
                    })
                })
                .collect();
            let value = json!({
                "schemaName": fact.name,
                "platform": platform,
                "version": 0,
                "hash": "",
                "platformSchema": { "com.linkedin.schema.OtherSchema": { "rawSchema": "" } },
                "fields": fields,
            });
            ("dataset", urn, "schemaMetadata", value)
        }
        None => ("dataset", urn, "status", json!({ "removed": false })),
    }
}

fn urn_platform(namespace: &str) -> String {
    let platform = namespace.split_once("://").map_or(namespace, |(scheme, _)| scheme);
    format!("urn:li:dataPlatform:{}", platform)
}

/// Catalog field type for a native column type.
fn schema_type(native: &str) -> &'static str {
    match native.to_lowercase().as_str() {
        "int" | "integer" | "bigint" | "smallint" | "long" | "float" | "double" | "decimal"
        | "number" | "numeric" => "com.linkedin.schema.NumberType",
        "bool" | "boolean" => "com.linkedin.schema.BooleanType",
        "date" => "com.linkedin.schema.DateType",
        "timestamp" | "datetime" | "time" => "com.linkedin.schema.TimeType",
        _ => "com.linkedin.schema.StringType",
    }
}

fn glossary_term_aspects(fact: &GlossaryTermFact, now_millis: i64) -> Vec<RawAspect> {
    let mut aspects = vec![(
        "glossaryTerm",
        fact.urn.clone(),
        "glossaryTermInfo",
        json!({ "name": fact.name, "definition": fact.definition, "termSource": "" }),
    )];
    if let Some(owner) = &fact.owner {
        let stamp = Stamp {
            time: now_millis,
            actor: owner,
        };
        aspects.push((
            "glossaryTerm",
            fact.urn.clone(),
            "ownership",
            json!({
                "owners": [{ "owner": owner, "type": "DATAOWNER" }],
                "lastModified": stamp.to_json(),
            }),
        ));
    }
    aspects
}

fn term_associations(term_urns: &[String], stamp: &Stamp<'_>) -> Value {
    let terms: Vec<Value> = term_urns.iter().map(|urn| json!({ "urn": urn })).collect();
    json!({ "terms": terms, "auditStamp": stamp.to_json() })
}

fn field_terms_aspect(fact: &FieldTermsFact, stamp: &Stamp<'_>) -> RawAspect {
    (
        "datasetField",
        fact.field_urn(),
        "glossaryTerms",
        term_associations(&fact.term_urns, stamp),
    )
}

fn dataset_terms_aspect(fact: &DatasetTermsFact, stamp: &Stamp<'_>) -> RawAspect {
    (
        "dataset",
        fact.dataset_urn.clone(),
        "glossaryTerms",
        term_associations(&fact.term_urns, stamp),
    )
}

fn editable_schema_aspect(fact: &EditableSchemaFact, stamp: &Stamp<'_>) -> RawAspect {
    let fields: Vec<Value> = fact
        .fields
        .iter()
        .map(|f| {
            json!({
                "fieldPath": f.field,
                "glossaryTerms": term_associations(&f.term_urns, stamp),
            })
        })
        .collect();
    (
        "dataset",
        fact.dataset_urn.clone(),
        "editableSchemaMetadata",
        json!({ "editableSchemaFieldInfo": fields }),
    )
}
