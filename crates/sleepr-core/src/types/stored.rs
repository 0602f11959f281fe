//! The store-side representation of a document.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::filter::ID_FIELD;
use super::id::DocumentId;
use crate::error::{AppError, ErrorKind};

/// A document as the store holds it: a JSON object carrying `_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    fields: Map<String, Value>,
}

impl StoredDocument {
    /// Build the stored form of a creation payload under a fresh identifier.
    ///
    /// The payload must serialize to a JSON object. Any `_id` it carries is
    /// overwritten.
    pub fn from_payload<P: Serialize + ?Sized>(id: DocumentId, payload: &P) -> Result<Self, AppError> {
        match serde_json::to_value(payload)? {
            Value::Object(mut fields) => {
                fields.insert(ID_FIELD.to_string(), id.into());
                Ok(Self { fields })
            }
            other => Err(AppError::new(
                ErrorKind::Serialization,
                format!("Document payload must be a JSON object, got {}", json_type(&other)),
            )),
        }
    }

    /// Wrap a raw JSON object read back from the store.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// The document identifier, if present and well-formed.
    pub fn id(&self) -> Option<DocumentId> {
        self.fields
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    /// Look up a top-level field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Borrow the underlying JSON object.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Mutably borrow the underlying JSON object.
    pub fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    /// Unwrap into the underlying JSON object.
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// Convert into the application-facing document type.
    pub fn into_document<T: DeserializeOwned>(self) -> Result<T, AppError> {
        Ok(serde_json::from_value(Value::Object(self.fields))?)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
