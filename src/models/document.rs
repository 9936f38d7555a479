//! Documents and the response envelope they arrive in.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Errors reading a field out of a [`Document`]
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Field '{0}' is missing from the document")]
    Missing(String),

    #[error("Field '{field}' could not be decoded: {source}")]
    Decode {
        field: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One record returned by a resource, tagged with the resource it came from.
///
/// Documents are read-only; typed views are obtained with [`Document::field`]
/// or [`Document::decode`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    #[serde(skip)]
    resource: String,

    #[serde(flatten)]
    data: Map<String, Value>,
}

impl Document {
    /// Wrap a JSON object returned by `resource`
    pub fn new(resource: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            resource: resource.into(),
            data,
        }
    }

    /// Build from any JSON value; non-objects are stored under `value`
    pub fn from_value(resource: impl Into<String>, value: Value) -> Self {
        let data = match value {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Self::new(resource, data)
    }

    /// Name of the resource this document belongs to
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Look up a field; dotted paths descend into nested objects
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = self.data.get(parts.next()?)?;
        parts.try_fold(first, |value, key| value.get(key))
    }

    /// Read a string-valued field, typically the document identifier
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Decode a field into a typed value
    pub fn field<T: DeserializeOwned>(&self, path: &str) -> Result<T, DocumentError> {
        let value = self
            .get(path)
            .ok_or_else(|| DocumentError::Missing(path.to_string()))?;

        T::deserialize(value).map_err(|source| DocumentError::Decode {
            field: path.to_string(),
            source,
        })
    }

    /// Decode the whole document into a typed model
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DocumentError> {
        T::deserialize(Value::Object(self.data.clone())).map_err(|source| DocumentError::Decode {
            field: self.resource.clone(),
            source,
        })
    }

    /// Field names present in this document
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(|k| k.as_str())
    }

    /// Borrow the underlying JSON object
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Consume into the underlying JSON object
    pub fn into_map(self) -> Map<String, Value> {
        self.data
    }

    /// Consume into a JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.data)
    }
}

/// Meta information attached to every API response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// Version of the API implementation
    #[serde(default)]
    pub api_version: Option<String>,

    /// When the query was executed
    #[serde(default)]
    pub time_stamp: Option<DateTime<Utc>>,

    /// Total number of documents matching the query
    #[serde(default, alias = "total_doc")]
    pub total: Option<u64>,
}

/// An error reported inside a response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: i64,
    pub message: String,
}

/// Errors validating a response envelope
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("response carries both data and errors")]
    Ambiguous,

    #[error("response carries neither data nor errors")]
    Empty,

    #[error("API error {}: {}", .0.code, .0.message)]
    Api(ApiError),
}

/// The `{data, errors, meta}` envelope wrapping every resource response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub data: Option<Vec<Value>>,

    #[serde(default)]
    pub errors: Option<Vec<ApiError>>,

    #[serde(default)]
    pub meta: Option<Meta>,
}

impl ResponseEnvelope {
    /// Check that exactly one of `data` and `errors` is present and return the
    /// data.
    pub fn into_data(self) -> Result<(Vec<Value>, Meta), EnvelopeError> {
        let meta = self.meta.unwrap_or_default();
        match (self.data, self.errors) {
            (Some(_), Some(errors)) if !errors.is_empty() => Err(EnvelopeError::Ambiguous),
            (Some(data), _) => {
                let meta = Meta {
                    total: meta.total.or(Some(data.len() as u64)),
                    ..meta
                };
                Ok((data, meta))
            }
            (None, Some(mut errors)) if !errors.is_empty() => {
                Err(EnvelopeError::Api(errors.swap_remove(0)))
            }
            (None, _) => Err(EnvelopeError::Empty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::from_value("materials", value)
    }

    #[test]
    fn test_dotted_lookup() {
        let d = doc(json!({
            "material_id": "mp-149",
            "orig_inputs": {"incar": {"ENCUT": 520}}
        }));

        assert_eq!(d.resource(), "materials");
        assert_eq!(d.get_str("material_id"), Some("mp-149"));
        assert_eq!(d.get("orig_inputs.incar.ENCUT"), Some(&json!(520)));
        assert!(d.get("orig_inputs.kpoints").is_none());
    }

    #[test]
    fn test_typed_field() {
        let d = doc(json!({"nsites": 2, "elements": ["Si"]}));

        let nsites: u32 = d.field("nsites").unwrap();
        assert_eq!(nsites, 2);

        assert!(matches!(
            d.field::<u32>("volume"),
            Err(DocumentError::Missing(_))
        ));
        assert!(matches!(
            d.field::<u32>("elements"),
            Err(DocumentError::Decode { .. })
        ));
    }

    #[test]
    fn test_envelope_total_defaults_to_data_length() {
        let envelope: ResponseEnvelope =
            serde_json::from_value(json!({"data": [{"a": 1}, {"a": 2}]})).unwrap();
        let (data, meta) = envelope.into_data().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(meta.total, Some(2));
    }

    #[test]
    fn test_envelope_total_doc_alias() {
        let envelope: ResponseEnvelope = serde_json::from_value(json!({
            "data": [{"a": 1}],
            "meta": {"total_doc": 40, "api_version": "0.9.5"}
        }))
        .unwrap();
        let (_, meta) = envelope.into_data().unwrap();
        assert_eq!(meta.total, Some(40));
        assert_eq!(meta.api_version.as_deref(), Some("0.9.5"));
    }

    #[test]
    fn test_envelope_consistency() {
        let both: ResponseEnvelope = serde_json::from_value(json!({
            "data": [],
            "errors": [{"code": 500, "message": "boom"}]
        }))
        .unwrap();
        assert_eq!(both.into_data().unwrap_err(), EnvelopeError::Ambiguous);

        let neither = ResponseEnvelope::default();
        assert_eq!(neither.into_data().unwrap_err(), EnvelopeError::Empty);

        let errors: ResponseEnvelope = serde_json::from_value(json!({
            "errors": [{"code": 400, "message": "bad field"}]
        }))
        .unwrap();
        assert!(matches!(errors.into_data(), Err(EnvelopeError::Api(e)) if e.code == 400));
    }
}
