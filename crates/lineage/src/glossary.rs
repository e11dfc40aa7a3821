//! Glossary term facts.
//!
//! Turns a list of glossary definitions (one term per dataset field) into the
//! upsert facts that define each term and attach it to its field.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LineageError, Result};
use crate::fact::{
    DatasetTermsFact, EditableSchemaFact, FieldTermsFact, GlossaryTermFact, UpsertFact,
};

/// One glossary definition: a term and the dataset field it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryEntry {
    pub term: String,
    pub description: String,
    pub field: String,
    pub database: String,
    pub table: String,
    /// Data platform, e.g. `hive` or `snowflake`
    pub platform: String,
    /// Environment / fabric, e.g. `PROD`
    pub env: String,
}

impl GlossaryEntry {
    pub fn term_urn(&self) -> String {
        term_urn(&self.term)
    }

    pub fn dataset_urn(&self) -> String {
        dataset_urn(
            &self.platform,
            &format!("{}.{}", self.database, self.table),
            &self.env,
        )
    }
}

pub fn term_urn(name: &str) -> String {
    format!("urn:li:glossaryTerm:{}", name)
}

pub fn dataset_urn(platform: &str, name: &str, env: &str) -> String {
    format!(
        "urn:li:dataset:(urn:li:dataPlatform:{},{},{})",
        platform, name, env
    )
}

/// Read glossary definitions from a JSON array.
pub fn load_entries<R: Read>(reader: R) -> Result<Vec<GlossaryEntry>> {
    serde_json::from_reader(reader).map_err(|e| LineageError::Glossary(e.to_string()))
}

/// Read glossary definitions from a JSON file.
pub fn load_entries_from_path(path: impl AsRef<Path>) -> Result<Vec<GlossaryEntry>> {
    let file = std::fs::File::open(path.as_ref())?;
    load_entries(file)
}

/// Ordered facts to send for a set of glossary entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlossaryPlan {
    pub facts: Vec<UpsertFact>,
}

impl GlossaryPlan {
    /// Per entry: define the term, attach it to the field, and attach it to the
    /// whole dataset.
    pub fn per_field(entries: &[GlossaryEntry], owner: Option<&str>) -> Self {
        let mut facts = Vec::with_capacity(entries.len() * 3);
        for entry in entries {
            facts.push(term_fact(entry, owner));
            facts.push(UpsertFact::FieldTerms(FieldTermsFact {
                dataset_urn: entry.dataset_urn(),
                field: entry.field.clone(),
                term_urns: vec![entry.term_urn()],
            }));
            facts.push(UpsertFact::DatasetTerms(DatasetTermsFact {
                dataset_urn: entry.dataset_urn(),
                term_urns: vec![entry.term_urn()],
            }));
        }
        Self { facts }
    }

    /// Define every term, then send one field-level attachment fact per
    /// dataset covering all of its fields. Datasets follow first-appearance
    /// order.
    pub fn per_dataset(entries: &[GlossaryEntry], owner: Option<&str>) -> Self {
        let mut facts: Vec<UpsertFact> = entries.iter().map(|e| term_fact(e, owner)).collect();

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut schemas: Vec<EditableSchemaFact> = Vec::new();
        for entry in entries {
            let urn = entry.dataset_urn();
            let field = FieldTermsFact {
                dataset_urn: urn.clone(),
                field: entry.field.clone(),
                term_urns: vec![entry.term_urn()],
            };
            match index.get(&urn) {
                Some(&i) => schemas[i].fields.push(field),
                None => {
                    index.insert(urn.clone(), schemas.len());
                    schemas.push(EditableSchemaFact {
                        dataset_urn: urn,
                        fields: vec![field],
                    });
                }
            }
        }

        facts.extend(schemas.into_iter().map(UpsertFact::EditableSchema));
        Self { facts }
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

fn term_fact(entry: &GlossaryEntry, owner: Option<&str>) -> UpsertFact {
    UpsertFact::GlossaryTerm(GlossaryTermFact {
        urn: entry.term_urn(),
        name: entry.term.clone(),
        definition: entry.description.clone(),
        owner: owner.map(|o| o.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(term: &str, table: &str, field: &str) -> GlossaryEntry {
        GlossaryEntry {
            term: term.to_string(),
            description: format!("{} definition", term),
            field: field.to_string(),
            database: "sales".to_string(),
            table: table.to_string(),
            platform: "hive".to_string(),
            env: "PROD".to_string(),
        }
    }

    #[test]
    fn test_urns() {
        let e = entry("CustomerEmail", "customers", "email");
        assert_eq!(e.term_urn(), "urn:li:glossaryTerm:CustomerEmail");
        assert_eq!(
            e.dataset_urn(),
            "urn:li:dataset:(urn:li:dataPlatform:hive,sales.customers,PROD)"
        );
    }

    #[test]
    fn test_per_field_plan() {
        let entries = vec![entry("Email", "customers", "email")];
        let plan = GlossaryPlan::per_field(&entries, Some("urn:li:corpuser:steward"));

        assert_eq!(plan.len(), 3);
        match &plan.facts[0] {
            UpsertFact::GlossaryTerm(t) => {
                assert_eq!(t.name, "Email");
                assert_eq!(t.owner.as_deref(), Some("urn:li:corpuser:steward"));
            }
            other => panic!("expected term fact, got {:?}", other),
        }
        assert_eq!(plan.facts[1].kind(), "field_terms");
        assert_eq!(plan.facts[2].kind(), "dataset_terms");
    }

    #[test]
    fn test_per_dataset_plan_groups_fields() {
        let entries = vec![
            entry("Email", "customers", "email"),
            entry("Amount", "orders", "amount"),
            entry("Phone", "customers", "phone"),
        ];
        let plan = GlossaryPlan::per_dataset(&entries, None);

        // three terms, then one schema fact per dataset
        assert_eq!(plan.len(), 5);
        match &plan.facts[3] {
            UpsertFact::EditableSchema(s) => {
                assert!(s.dataset_urn.contains("sales.customers"));
                let fields: Vec<_> = s.fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(fields, vec!["email", "phone"]);
            }
            other => panic!("expected schema fact, got {:?}", other),
        }
        assert!(plan.facts[4].entity_key().contains("sales.orders"));
    }

    #[test]
    fn test_load_entries() {
        let json = r#"[{"term":"Email","description":"Customer email","field":"email",
            "database":"sales","table":"customers","platform":"hive","env":"PROD"}]"#;
        let entries = load_entries(json.as_bytes()).unwrap();
        assert_eq!(entries, vec![GlossaryEntry {
            description: "Customer email".to_string(),
            ..entry("Email", "customers", "email")
        }]);

        let err = load_entries("{}".as_bytes()).unwrap_err();
        assert!(matches!(err, LineageError::Glossary(_)));
    }
}
