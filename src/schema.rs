//! Table schema definitions and parsing.
//!
//! A schema is an ordered list of field descriptors (name, type, mode,
//! description). Schemas are read from text resources, either JSON or the
//! legacy literal syntax handled by [`literal`], and translated into the
//! warehouse's column representation at load time.

pub mod literal;

use crate::error::{Result, TabloadError};
use crate::warehouse::ColumnSpec;
use polars::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::debug;

/// Declared column type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Integer,
    Float,
    Numeric,
    String,
    Boolean,
    Timestamp,
    Datetime,
    Date,
    Time,
    Bytes,
    Record,
    /// Any other type token, kept uppercase
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Integer => "INTEGER",
            FieldType::Float => "FLOAT",
            FieldType::Numeric => "NUMERIC",
            FieldType::String => "STRING",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Timestamp => "TIMESTAMP",
            FieldType::Datetime => "DATETIME",
            FieldType::Date => "DATE",
            FieldType::Time => "TIME",
            FieldType::Bytes => "BYTES",
            FieldType::Record => "RECORD",
            FieldType::Other(token) => token,
        }
    }

    /// Polars dtype a column of this type is stored as, when there is one
    pub fn polars_dtype(&self) -> Option<DataType> {
        match self {
            FieldType::Integer => Some(DataType::Int64),
            FieldType::Float | FieldType::Numeric => Some(DataType::Float64),
            FieldType::String => Some(DataType::String),
            FieldType::Boolean => Some(DataType::Boolean),
            FieldType::Timestamp | FieldType::Datetime => {
                Some(DataType::Datetime(TimeUnit::Microseconds, None))
            }
            FieldType::Date => Some(DataType::Date),
            FieldType::Bytes => Some(DataType::Binary),
            FieldType::Time | FieldType::Record | FieldType::Other(_) => None,
        }
    }

    /// Infer the declared type for an existing polars column
    pub fn from_dtype(dtype: &DataType) -> Self {
        match dtype {
            dt if dt.is_integer() => FieldType::Integer,
            dt if dt.is_float() => FieldType::Float,
            DataType::Boolean => FieldType::Boolean,
            DataType::Datetime(_, _) => FieldType::Timestamp,
            DataType::Date => FieldType::Date,
            DataType::Binary => FieldType::Bytes,
            _ => FieldType::String,
        }
    }
}

impl From<String> for FieldType {
    fn from(token: String) -> Self {
        match token.trim().to_ascii_uppercase().as_str() {
            "INTEGER" | "INT64" | "INT" => FieldType::Integer,
            "FLOAT" | "FLOAT64" => FieldType::Float,
            "NUMERIC" | "BIGNUMERIC" | "DECIMAL" => FieldType::Numeric,
            "STRING" => FieldType::String,
            "BOOLEAN" | "BOOL" => FieldType::Boolean,
            "TIMESTAMP" => FieldType::Timestamp,
            "DATETIME" => FieldType::Datetime,
            "DATE" => FieldType::Date,
            "TIME" => FieldType::Time,
            "BYTES" => FieldType::Bytes,
            "RECORD" | "STRUCT" => FieldType::Record,
            other => FieldType::Other(other.to_string()),
        }
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldMode {
    #[default]
    Nullable,
    Required,
    Repeated,
}

impl FieldMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldMode::Nullable => "NULLABLE",
            FieldMode::Required => "REQUIRED",
            FieldMode::Repeated => "REPEATED",
        }
    }
}

impl TryFrom<String> for FieldMode {
    type Error = String;

    fn try_from(token: String) -> std::result::Result<Self, Self::Error> {
        match token.trim().to_ascii_uppercase().as_str() {
            "" | "NULLABLE" => Ok(FieldMode::Nullable),
            "REQUIRED" => Ok(FieldMode::Required),
            "REPEATED" => Ok(FieldMode::Repeated),
            other => Err(format!("unknown field mode '{}'", other)),
        }
    }
}

impl From<FieldMode> for String {
    fn from(mode: FieldMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Single field descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mode: FieldMode,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            mode: FieldMode::default(),
            description: String::new(),
        }
    }

    pub fn with_mode(mut self, mode: FieldMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Translate into the warehouse column representation
    pub fn to_column_spec(&self) -> ColumnSpec {
        ColumnSpec {
            name: self.name.clone(),
            column_type: self.field_type.as_str().to_string(),
            mode: self.mode.as_str().to_string(),
            description: self.description.clone(),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Ordered list of uniquely named field descriptors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TableSchema {
    fields: Vec<FieldSchema>,
}

impl TableSchema {
    /// Build a schema, rejecting duplicate field names
    pub fn new(fields: Vec<FieldSchema>) -> Result<Self> {
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(TabloadError::parse(
                    "schema",
                    format!("duplicate field name '{}'", field.name),
                ));
            }
        }
        Ok(Self { fields })
    }

    /// Parse schema text; `source_name` is only used in error messages.
    ///
    /// JSON is tried first (a list of records, or an object with a `fields`
    /// list), then the legacy literal syntax.
    pub fn parse(text: &str, source_name: &str) -> Result<Self> {
        let value = match serde_json::from_str::<Value>(text) {
            Ok(value) => value,
            Err(json_err) => literal::parse_literal(text).map_err(|lit_err| {
                TabloadError::parse(
                    source_name,
                    format!("not valid JSON ({}) nor literal data ({})", json_err, lit_err),
                )
            })?,
        };

        let records = match value {
            Value::Array(items) => Value::Array(items),
            Value::Object(mut map) => match map.remove("fields") {
                Some(fields @ Value::Array(_)) => fields,
                _ => {
                    return Err(TabloadError::parse(
                        source_name,
                        "expected a list of field records or an object with a 'fields' list",
                    ));
                }
            },
            _ => {
                return Err(TabloadError::parse(
                    source_name,
                    "expected a list of field records",
                ));
            }
        };

        let fields: Vec<FieldSchema> = serde_json::from_value(records)
            .map_err(|e| TabloadError::parse(source_name, e.to_string()))?;

        debug!("Parsed {} fields from {}", fields.len(), source_name);
        Self::new(fields).map_err(|e| match e {
            TabloadError::Parse { reason, .. } => TabloadError::parse(source_name, reason),
            other => other,
        })
    }

    /// Describe an existing DataFrame; every column is NULLABLE
    pub fn infer_from_dataframe(df: &DataFrame) -> Self {
        let fields = df
            .get_columns()
            .iter()
            .map(|column| {
                FieldSchema::new(column.name().as_str(), FieldType::from_dtype(column.dtype()))
            })
            .collect();
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Keep only the named fields, preserving schema order
    pub fn retain_names(&self, names: &BTreeSet<String>) -> Self {
        Self {
            fields: self
                .fields
                .iter()
                .filter(|f| names.contains(&f.name))
                .cloned()
                .collect(),
        }
    }

    pub fn to_column_specs(&self) -> Vec<ColumnSpec> {
        self.fields.iter().map(FieldSchema::to_column_spec).collect()
    }
}

impl<'de> Deserialize<'de> for TableSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let fields = Vec::<FieldSchema>::deserialize(deserializer)?;
        TableSchema::new(fields).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_schema() {
        let text = r#"[
            {"name": "id", "type": "integer", "mode": "REQUIRED", "description": "Row id"},
            {"name": "label", "type": "STRING"}
        ]"#;
        let schema = TableSchema::parse(text, "schema.txt").unwrap();

        assert_eq!(schema.len(), 2);
        assert_eq!(schema.fields()[0].field_type, FieldType::Integer);
        assert_eq!(schema.fields()[0].mode, FieldMode::Required);
        assert_eq!(schema.fields()[0].description, "Row id");
        assert_eq!(schema.fields()[1].mode, FieldMode::Nullable);
        assert_eq!(schema.fields()[1].description, "");
    }

    #[test]
    fn test_parse_wrapped_json_schema() {
        let text = r#"{"fields": [{"name": "amount", "type": "FLOAT64"}]}"#;
        let schema = TableSchema::parse(text, "schema.json").unwrap();
        assert_eq!(schema.fields()[0].field_type, FieldType::Float);
    }

    #[test]
    fn test_parse_literal_schema() {
        let text = "[{'name': 'fecha', 'type': 'TIMESTAMP', 'mode': None},\n\
                    {'name': 'valor', 'type': 'FLOAT', 'description': None}]";
        let schema = TableSchema::parse(text, "legacy.txt").unwrap();

        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["fecha", "valor"]);
        assert_eq!(schema.fields()[0].mode, FieldMode::Nullable);
        assert_eq!(schema.fields()[1].description, "");
    }

    #[test]
    fn test_parse_errors() {
        let err = TableSchema::parse("this is not a schema", "bad.txt").unwrap_err();
        assert!(matches!(err, TabloadError::Parse { ref source_name, .. } if source_name == "bad.txt"));

        let err = TableSchema::parse(r#"[{"type": "STRING"}]"#, "noname.txt").unwrap_err();
        assert!(matches!(err, TabloadError::Parse { .. }));

        let err = TableSchema::parse(r#"{"name": "x"}"#, "object.txt").unwrap_err();
        assert!(matches!(err, TabloadError::Parse { .. }));

        let err = TableSchema::parse(
            r#"[{"name": "x", "type": "STRING"}, {"name": "x", "type": "INTEGER"}]"#,
            "dup.txt",
        )
        .unwrap_err();
        match err {
            TabloadError::Parse { source_name, reason } => {
                assert_eq!(source_name, "dup.txt");
                assert!(reason.contains("duplicate"));
            }
            other => panic!("Expected Parse error, got {:?}", other),
        }

        let err = TableSchema::parse(r#"[{"name": "x", "type": "STRING", "mode": "SOMETIMES"}]"#, "mode.txt")
            .unwrap_err();
        assert!(matches!(err, TabloadError::Parse { .. }));
    }

    #[test]
    fn test_unknown_type_is_kept() {
        let schema = TableSchema::parse(r#"[{"name": "g", "type": "geography"}]"#, "geo.txt").unwrap();
        assert_eq!(schema.fields()[0].field_type, FieldType::Other("GEOGRAPHY".to_string()));
        assert_eq!(schema.fields()[0].field_type.polars_dtype(), None);
    }

    #[test]
    fn test_column_spec_defaults() {
        let specs = TableSchema::new(vec![
            FieldSchema::new("x", FieldType::Integer),
            FieldSchema::new("y", FieldType::String)
                .with_mode(FieldMode::Required)
                .with_description("label"),
        ])
        .unwrap()
        .to_column_specs();

        assert_eq!(specs[0].column_type, "INTEGER");
        assert_eq!(specs[0].mode, "NULLABLE");
        assert_eq!(specs[0].description, "");
        assert_eq!(specs[1].mode, "REQUIRED");
        assert_eq!(specs[1].description, "label");
    }

    #[test]
    fn test_infer_from_dataframe() {
        let df = df!(
            "id" => [1i64, 2],
            "price" => [1.5f64, 2.5],
            "name" => ["a", "b"],
            "flag" => [true, false],
        )
        .unwrap();
        let schema = TableSchema::infer_from_dataframe(&df);
        let types: Vec<_> = schema.fields().iter().map(|f| f.field_type.clone()).collect();
        assert_eq!(
            types,
            vec![
                FieldType::Integer,
                FieldType::Float,
                FieldType::String,
                FieldType::Boolean
            ]
        );
    }

    #[test]
    fn test_retain_names_keeps_schema_order() {
        let schema = TableSchema::new(vec![
            FieldSchema::new("a", FieldType::String),
            FieldSchema::new("b", FieldType::String),
            FieldSchema::new("c", FieldType::String),
        ])
        .unwrap();
        let keep: BTreeSet<String> = ["c".to_string(), "a".to_string()].into_iter().collect();
        let kept = schema.retain_names(&keep);
        assert_eq!(kept.names().collect::<Vec<_>>(), vec!["a", "c"]);
    }
}
