use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::ApiError;

/// Name of the identity field every record carries.
pub const FIELD_ID: &str = "id";
/// Sensitive field, hashed before the record reaches the store.
pub const FIELD_PASSWORD: &str = "password";
/// Potentially large field, externalized to the blob store.
pub const FIELD_DATA: &str = "data";

/// One user's JSON document, kept as object text.
///
/// Identity is always read from the `id` field, never stored on the side.
/// A record is never edited in place: field helpers return a new record.
/// The empty record (no text at all) is a valid value that every transform
/// passes through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record(String);

impl Record {
    /// Wrap text that is already known to be a JSON object (store reads, parser output).
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Wrap caller-provided text, checking it is a JSON object.
    pub fn parse(text: impl Into<String>) -> Result<Self, ApiError> {
        let text = text.into();
        match serde_json::from_str::<Value>(&text)? {
            Value::Object(_) => Ok(Self(text)),
            _ => Err(ApiError::bad_input("expected a JSON object")),
        }
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Value of the `id` field, or an empty string when absent.
    pub fn id(&self) -> String {
        self.field_string(FIELD_ID).unwrap_or_default()
    }

    pub fn data(&self) -> Option<String> {
        self.field_string(FIELD_DATA)
    }

    pub fn password(&self) -> Option<String> {
        self.field_string(FIELD_PASSWORD)
    }

    /// Read a top-level field as text. Strings come back unquoted, other
    /// scalars as their JSON text; null and missing fields are `None`.
    pub fn field_string(&self, name: &str) -> Option<String> {
        let object = self.to_object().ok()?;
        match object.get(name)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Read a top-level field that must hold a string. Missing and null
    /// fields are `None`; any other JSON type is `BadInput`.
    pub fn string_field(&self, name: &str) -> Result<Option<String>, ApiError> {
        match self.to_object()?.remove(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(ApiError::bad_input(format!("field '{}' must be a string", name))),
        }
    }

    /// New record with `name` set to the string `value`.
    pub fn with_field(&self, name: &str, value: &str) -> Result<Self, ApiError> {
        let mut object = self.to_object()?;
        object.insert(name.to_string(), Value::String(value.to_string()));
        Self::from_object(object)
    }

    /// New record without the field `name`. Removing an absent field is a no-op.
    pub fn without_field(&self, name: &str) -> Result<Self, ApiError> {
        let mut object = self.to_object()?;
        object.remove(name);
        Self::from_object(object)
    }

    fn to_object(&self) -> Result<Map<String, Value>, ApiError> {
        match serde_json::from_str::<Value>(&self.0)? {
            Value::Object(map) => Ok(map),
            _ => Err(ApiError::bad_input("expected a JSON object")),
        }
    }

    fn from_object(object: Map<String, Value>) -> Result<Self, ApiError> {
        serde_json::to_string(&Value::Object(object))
            .map(Self)
            .map_err(|e| ApiError::internal(format!("failed to encode record: {}", e)))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Record> for String {
    fn from(record: Record) -> Self {
        record.0
    }
}

// Records are embedded as JSON objects, not as quoted strings.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match serde_json::from_str::<Value>(&self.0) {
            Ok(value) => value.serialize(serializer),
            Err(_) => serializer.serialize_str(&self.0),
        }
    }
}

/// Per-record result of a fan-out run. Exactly one is produced for every
/// record the source yields.
#[derive(Debug, Clone)]
pub struct ProcessingOutcome {
    pub record_id: String,
    pub transformed: Record,
    pub error: Option<ApiError>,
}

impl ProcessingOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Completion signal of a whole fan-out run. Carries the source's own
/// terminal error, never per-record failures.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub terminal_error: Option<ApiError>,
}

impl BatchResult {
    pub fn into_result(self) -> Result<(), ApiError> {
        match self.terminal_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Range of records requested by a list operation. Signed so that the
/// validation layer can reject negative values coming from callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub offset: i64,
    pub count: i64,
}

impl ListQuery {
    pub fn new(offset: i64, count: i64) -> Self {
        Self { offset, count }
    }
}

/// A page of records tagged with the offset it was read from.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordList {
    pub offset: i64,
    #[serde(rename = "data")]
    pub records: Vec<Record>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_accessors() {
        let record = Record::new(r#"{"id":"loki","password":"pass","data":"lorem ipsum"}"#);
        assert_eq!(record.id(), "loki");
        assert_eq!(record.password().as_deref(), Some("pass"));
        assert_eq!(record.data().as_deref(), Some("lorem ipsum"));
        assert_eq!(record.field_string("missing"), None);
    }

    #[test]
    fn test_string_field_rejects_other_types() {
        let record = Record::new(r#"{"id":"loki","data":{"k":1},"note":null}"#);
        assert_eq!(record.string_field("id").unwrap().as_deref(), Some("loki"));
        assert_eq!(record.string_field("note").unwrap(), None);
        assert_eq!(record.string_field("missing").unwrap(), None);
        assert!(record.string_field("data").is_err());
    }

    #[test]
    fn test_id_of_empty_record() {
        assert_eq!(Record::empty().id(), "");
        assert!(Record::empty().is_empty());
    }

    #[test]
    fn test_with_and_without_field_do_not_touch_original() {
        let record = Record::new(r#"{"id":"hulk","data":"smash"}"#);
        let stripped = record.without_field(FIELD_DATA).unwrap();
        assert_eq!(stripped.data(), None);
        assert_eq!(record.data().as_deref(), Some("smash"));

        let restored = stripped.with_field(FIELD_DATA, "smash").unwrap();
        assert_eq!(restored.data().as_deref(), Some("smash"));
        assert_eq!(restored.id(), "hulk");
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(Record::parse(r#"{"id":"x"}"#).is_ok());
        assert!(Record::parse("[1,2]").is_err());
        assert!(Record::parse(r#"{"id": "x", "data": oops"}"#).is_err());
    }

    #[test]
    fn test_record_list_serializes_records_as_objects() {
        let list = RecordList {
            offset: 3,
            records: vec![Record::new(r#"{"id":"a"}"#)],
        };
        let value = serde_json::to_value(&list).unwrap();
        assert_eq!(value["offset"], 3);
        assert_eq!(value["data"][0]["id"], "a");
    }
}
