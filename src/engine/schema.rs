//! Index field mappings

use crate::models::SUGGEST_FIELD;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Engine field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Analyzed full text
    Text,
    /// Exact-match token
    Keyword,
    /// Numeric
    Float,
    /// Prefix completion suggester
    Completion,
}

/// Field-type declaration applied when an index is created
///
/// The engine cannot change a field's type in place, so a schema is only
/// ever applied together with index creation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexSchema {
    fields: BTreeMap<String, FieldType>,
}

impl IndexSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.insert(name.into(), field_type);
        self
    }

    /// Schema of the medicine catalog index
    pub fn medicines() -> Self {
        Self::new()
            .field("name", FieldType::Text)
            .field("generic_name", FieldType::Text)
            .field("manufacturer", FieldType::Keyword)
            .field("category", FieldType::Keyword)
            .field("price", FieldType::Float)
            .field("dosage", FieldType::Keyword)
            .field("description", FieldType::Text)
            .field(SUGGEST_FIELD, FieldType::Completion)
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).copied()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, FieldType)> {
        self.fields.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    /// Index creation body: `{"mappings": {"properties": {...}}}`
    pub fn to_create_body(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, ty)| (name.clone(), json!({ "type": ty })))
            .collect();

        json!({ "mappings": { "properties": properties } })
    }
}
