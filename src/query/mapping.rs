//! Field-mapping inspection: which indexed fields are date-typed.

use std::collections::HashMap;

use serde_json::Value;

use crate::types::{Direction, Result, SearchError};

/// Indexed type of a field, as far as the translator cares.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldType {
    /// `date` / `date_nanos`; filter values are ranges.
    Date,
    /// `keyword`.
    Keyword,
    /// `text`.
    Text,
    /// Any numeric type.
    Numeric,
    /// `boolean`.
    Boolean,
    /// Anything else, kept verbatim.
    Other(String),
}

impl FieldType {
    /// Maps a backend type name.
    pub fn from_backend(name: &str) -> Self {
        match name {
            "date" | "date_nanos" => FieldType::Date,
            "keyword" => FieldType::Keyword,
            "text" | "string" => FieldType::Text,
            "long" | "integer" | "short" | "byte" | "double" | "float" | "half_float"
            | "scaled_float" => FieldType::Numeric,
            "boolean" => FieldType::Boolean,
            other => FieldType::Other(other.to_owned()),
        }
    }
}

/// Field types for one document kind, keyed by full dotted path.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldMapping {
    fields: HashMap<String, FieldType>,
}

impl FieldMapping {
    /// Empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field; `full_name` is the dotted path, e.g. `metadata.created`.
    pub fn with_field(mut self, full_name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.insert(full_name.into(), ty);
        self
    }

    /// Parses a field-mapping response of the shape
    /// `{index: {mappings: {doc_type: {full_name: {mapping: {leaf: {type}}}}}}}`.
    ///
    /// Entries without a readable type are skipped; a response missing the
    /// index or document type is an error.
    pub fn from_response(index: &str, doc_type: &str, body: &Value) -> Result<Self> {
        let entries = body
            .get(index)
            .and_then(|idx| idx.get("mappings"))
            .and_then(|mappings| mappings.get(doc_type))
            .and_then(Value::as_object)
            .ok_or_else(|| {
                SearchError::Backend(format!(
                    "field mapping response has no entry for {index}/{doc_type}"
                ))
            })?;
        let mut fields = HashMap::with_capacity(entries.len());
        for (full_name, entry) in entries {
            let leaf = full_name.rsplit('.').next().unwrap_or(full_name);
            let ty = entry
                .get("mapping")
                .and_then(|mapping| mapping.get(leaf))
                .and_then(|field| field.get("type"))
                .and_then(Value::as_str);
            if let Some(ty) = ty {
                fields.insert(full_name.clone(), FieldType::from_backend(ty));
            }
        }
        Ok(Self { fields })
    }

    /// Type of `full_name`, if mapped.
    pub fn get(&self, full_name: &str) -> Option<&FieldType> {
        self.fields.get(full_name)
    }

    /// Whether `dir.key` is a date-typed field.
    pub fn is_time(&self, dir: Direction, key: &str) -> bool {
        matches!(
            self.fields.get(&format!("{}.{key}", dir.as_str())),
            Some(FieldType::Date)
        )
    }

    /// Number of mapped fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
