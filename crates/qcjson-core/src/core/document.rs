use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Top-level keys the embedder is allowed to write or remove.
///
/// Every other key in a [`Document`] belongs to the caller and survives the
/// whole pipeline untouched.
pub const OUTPUT_KEYS: [&str; 6] = [
    "success",
    "return_result",
    "properties",
    "provenance",
    "raw_output",
    "error",
];

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Document must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },
}

/// A job document: a JSON object mapping string keys to arbitrary values.
///
/// The protocol takes the document by value for the duration of a call and hands
/// it back, so there is never more than one owner mutating it. Key order is kept
/// as the caller wrote it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: Map<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(input: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(input)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(DocumentError::NotAnObject {
                found: json_type_name(&other),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    pub fn to_json_string(&self, pretty: bool) -> Result<String, DocumentError> {
        let text = if pretty {
            serde_json::to_string_pretty(&self.fields)?
        } else {
            serde_json::to_string(&self.fields)?
        };
        Ok(text)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Short JSON type name used in validation messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_str_parses_objects() {
        let doc = Document::from_json_str(r#"{"driver": "energy", "extra": [1, 2]}"#).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.get("driver"), Some(&json!("energy")));
        assert!(doc.contains_key("extra"));
    }

    #[test]
    fn from_json_str_rejects_non_objects() {
        let err = Document::from_json_str("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, DocumentError::NotAnObject { found: "array" }));
    }

    #[test]
    fn from_json_str_reports_parse_errors() {
        let err = Document::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, DocumentError::Parse(_)));
    }

    #[test]
    fn key_order_is_preserved_through_serialization() {
        let input = r#"{"zeta":1,"alpha":2,"mid":3}"#;
        let doc = Document::from_json_str(input).unwrap();
        assert_eq!(doc.to_json_string(false).unwrap(), input);
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let mut doc = Document::from_json_str(r#"{"a":1,"b":2,"c":3}"#).unwrap();
        assert_eq!(doc.remove("b"), Some(json!(2)));
        let keys: Vec<_> = doc.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn serde_round_trip_is_transparent() {
        let doc = Document::from_value(json!({"schema_name": "QC_JSON"})).unwrap();
        let text = serde_json::to_string(&doc).unwrap();
        assert_eq!(text, r#"{"schema_name":"QC_JSON"}"#);
        let back: Document = serde_json::from_str(&text).unwrap();
        assert_eq!(back, doc);
    }
}
