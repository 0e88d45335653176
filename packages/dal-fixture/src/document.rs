//! Fixture document model: ordered tables of ordered rows.
//!
//! Serialized as pretty JSON:
//!
//! ```json
//! {
//!   "tables": [
//!     { "name": "orders", "rows": [ { "id": 1, "name": "a" } ] }
//!   ]
//! }
//! ```
//!
//! Column order inside a row is kept as written. Blobs are written as
//! `{"blob": "<base64>"}` and non-finite reals as `{"real": "inf"}`,
//! `{"real": "-inf"}` or `{"real": "nan"}`; booleans are accepted on input and
//! stored as 0/1.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rusqlite::types::Value;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FixtureError;
use crate::raw::RawRow;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FixtureDocument {
    #[serde(default)]
    pub tables: Vec<FixtureTable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureTable {
    pub name: String,
    #[serde(default)]
    pub rows: Vec<FixtureRow>,
}

/// One row: column name/value pairs in column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FixtureRow {
    fields: Vec<(String, FieldValue)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl FixtureDocument {
    pub fn parse(text: &str) -> Result<Self, FixtureError> {
        serde_json::from_str(text)
            .map_err(|e| FixtureError::document(format!("invalid fixture document: {e}")))
    }

    /// Textual form written by `dump_to`.
    pub fn render(&self) -> Result<String, FixtureError> {
        serde_json::to_string_pretty(self)
            .map(|mut text| {
                text.push('\n');
                text
            })
            .map_err(|e| FixtureError::document(format!("failed to render fixture document: {e}")))
    }

    pub fn table(&self, name: &str) -> Option<&FixtureTable> {
        self.tables
            .iter()
            .find(|table| table.name.eq_ignore_ascii_case(name))
    }

    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|table| table.rows.len()).sum()
    }
}

impl FixtureTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: FixtureRow) -> Self {
        self.rows.push(row);
        self
    }
}

impl FixtureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.push((column.into(), value.into()));
        self
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<RawRow> for FixtureRow {
    fn from(row: RawRow) -> Self {
        Self {
            fields: row
                .into_iter()
                .map(|(column, value)| (column, FieldValue::from(value)))
                .collect(),
        }
    }
}

impl Serialize for FixtureRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FixtureRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = FixtureRow;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FixtureRow, A::Error> {
                let mut fields: Vec<(String, FieldValue)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((column, value)) = access.next_entry::<String, FieldValue>()? {
                    if fields.iter().any(|(name, _)| name.eq_ignore_ascii_case(&column)) {
                        return Err(de::Error::custom(format!("duplicate column '{column}'")));
                    }
                    fields.push((column, value));
                }
                Ok(FixtureRow { fields })
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_unit(),
            FieldValue::Integer(i) => serializer.serialize_i64(*i),
            FieldValue::Real(f) if f.is_finite() => serializer.serialize_f64(*f),
            FieldValue::Real(f) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("real", non_finite_name(*f))?;
                map.end()
            }
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Blob(bytes) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("blob", &STANDARD.encode(bytes))?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        FieldValue::try_from(json).map_err(de::Error::custom)
    }
}

impl TryFrom<serde_json::Value> for FieldValue {
    type Error = String;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value as Json;

        match json {
            Json::Null => Ok(FieldValue::Null),
            Json::Bool(b) => Ok(FieldValue::Integer(i64::from(b))),
            Json::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(FieldValue::Integer(i)),
                (None, Some(f)) => Ok(FieldValue::Real(f)),
                (None, None) => Err(format!("unsupported number {n}")),
            },
            Json::String(s) => Ok(FieldValue::Text(s)),
            Json::Object(map) if map.len() == 1 => match (map.get("blob"), map.get("real")) {
                (Some(Json::String(encoded)), _) => STANDARD
                    .decode(encoded)
                    .map(FieldValue::Blob)
                    .map_err(|e| format!("invalid base64 blob: {e}")),
                (_, Some(Json::String(name))) => parse_non_finite(name)
                    .map(FieldValue::Real)
                    .ok_or_else(|| format!("invalid real '{name}', expected inf, -inf or nan")),
                _ => Err(OBJECT_FORMS.to_string()),
            },
            Json::Object(_) => Err(OBJECT_FORMS.to_string()),
            Json::Array(_) => Err("arrays are not valid column values".to_string()),
        }
    }
}

const OBJECT_FORMS: &str =
    "objects are only allowed as {\"blob\": \"<base64>\"} or {\"real\": \"inf|-inf|nan\"}";

fn non_finite_name(f: f64) -> &'static str {
    if f.is_nan() {
        "nan"
    } else if f > 0.0 {
        "inf"
    } else {
        "-inf"
    }
}

fn parse_non_finite(name: &str) -> Option<f64> {
    match name {
        "inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        "nan" => Some(f64::NAN),
        _ => None,
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Integer(i) => FieldValue::Integer(i),
            Value::Real(f) => FieldValue::Real(f),
            Value::Text(s) => FieldValue::Text(s),
            Value::Blob(b) => FieldValue::Blob(b),
        }
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Null => Value::Null,
            FieldValue::Integer(i) => Value::Integer(i),
            FieldValue::Real(f) => Value::Real(f),
            FieldValue::Text(s) => Value::Text(s),
            FieldValue::Blob(b) => Value::Blob(b),
        }
    }
}

impl From<&FieldValue> for Value {
    fn from(value: &FieldValue) -> Self {
        Value::from(value.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Real(f)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}
