//! In-memory document store.
//!
//! Collections are insertion-ordered vectors guarded by a `DashMap` shard
//! lock, so every single-document operation (including its unique index
//! check) is atomic. Suitable for tests and single-process deployments.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use sleepr_core::traits::store::{StoreClient, StoreError};
use sleepr_core::types::{Filter, FilterField, FilterOp, ID_FIELD, StoredDocument, UpdateQuery};

/// Documents and unique indexes of one collection.
#[derive(Debug, Default)]
struct MemoryCollection {
    documents: Vec<StoredDocument>,
    unique_fields: Vec<String>,
}

impl MemoryCollection {
    fn position(&self, filter: &Filter) -> Result<Option<usize>, StoreError> {
        for (i, doc) in self.documents.iter().enumerate() {
            if matches(doc, filter)? {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// The unique index `candidate` would violate, ignoring the document at `skip`.
    fn violated_index(
        &self,
        collection: &str,
        candidate: &StoredDocument,
        skip: Option<usize>,
    ) -> Option<String> {
        let fields = std::iter::once(ID_FIELD).chain(self.unique_fields.iter().map(String::as_str));
        for field in fields {
            // Missing and null values are not indexed.
            let Some(value) = candidate.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken = self
                .documents
                .iter()
                .enumerate()
                .any(|(i, doc)| Some(i) != skip && doc.get(field) == Some(value));
            if taken {
                return Some(index_name(collection, field));
            }
        }
        None
    }
}

/// Process-local [`StoreClient`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<DashMap<String, MemoryCollection>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|c| c.documents.len())
            .unwrap_or(0)
    }

    /// Fields carrying a unique index in `collection`.
    pub fn unique_fields(&self, collection: &str) -> Vec<String> {
        self.collections
            .get(collection)
            .map(|c| c.unique_fields.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn insert(
        &self,
        collection: &str,
        document: StoredDocument,
    ) -> Result<StoredDocument, StoreError> {
        let mut coll = self.collections.entry(collection.to_string()).or_default();
        if let Some(index) = coll.violated_index(collection, &document, None) {
            return Err(StoreError::DuplicateKey { index });
        }
        coll.documents.push(document.clone());
        debug!(collection, count = coll.documents.len(), "Inserted document");
        Ok(document)
    }

    async fn query_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let Some(coll) = self.collections.get(collection) else {
            return Ok(None);
        };
        Ok(coll.position(filter)?.map(|i| coll.documents[i].clone()))
    }

    async fn query_many(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let Some(coll) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut found = Vec::new();
        for doc in &coll.documents {
            if matches(doc, filter)? {
                found.push(doc.clone());
            }
        }
        Ok(found)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateQuery,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let Some(mut coll) = self.collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(i) = coll.position(filter)? else {
            return Ok(None);
        };

        let mut updated = coll.documents[i].clone();
        apply_update(&mut updated, update);
        if let Some(index) = coll.violated_index(collection, &updated, Some(i)) {
            return Err(StoreError::DuplicateKey { index });
        }
        coll.documents[i] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let Some(mut coll) = self.collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(i) = coll.position(filter)? else {
            return Ok(None);
        };
        Ok(Some(coll.documents.remove(i)))
    }

    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        let mut coll = self.collections.entry(collection.to_string()).or_default();
        if field == ID_FIELD || coll.unique_fields.iter().any(|f| f == field) {
            return Ok(());
        }

        let values: Vec<&Value> = coll
            .documents
            .iter()
            .filter_map(|d| d.get(field))
            .filter(|v| !v.is_null())
            .collect();
        let has_duplicates = values
            .iter()
            .enumerate()
            .any(|(i, v)| values[i + 1..].contains(v));
        if has_duplicates {
            return Err(StoreError::backend(format!(
                "Cannot build unique index {}: existing documents share a value",
                index_name(collection, field)
            )));
        }

        coll.unique_fields.push(field.to_string());
        debug!(collection, field, "Created unique index");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}

fn index_name(collection: &str, field: &str) -> String {
    format!("{collection}_{field}_key")
}

fn apply_update(document: &mut StoredDocument, update: &UpdateQuery) {
    let fields = document.fields_mut();
    for (field, value) in update.set_fields() {
        fields.insert(field.to_string(), value.clone());
    }
    for field in update.unset_fields() {
        fields.remove(field);
    }
}

fn matches(document: &StoredDocument, filter: &Filter) -> Result<bool, StoreError> {
    for condition in filter.conditions() {
        if !condition_matches(document.get(&condition.field), condition)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Missing fields compare as JSON `null`, and ordering operators only match
/// values of the same JSON type.
fn condition_matches(actual: Option<&Value>, condition: &FilterField) -> Result<bool, StoreError> {
    let current = actual.unwrap_or(&Value::Null);
    let expected = &condition.value;
    let matched = match condition.op {
        FilterOp::Eq => current == expected,
        FilterOp::Ne => current != expected,
        FilterOp::Gt => compare(current, expected) == Some(Ordering::Greater),
        FilterOp::Gte => matches!(
            compare(current, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOp::Lt => compare(current, expected) == Some(Ordering::Less),
        FilterOp::Lte => matches!(
            compare(current, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOp::In => match expected {
            Value::Array(candidates) => candidates.contains(current),
            _ => return Err(malformed(condition, "an array")),
        },
        FilterOp::Exists => match expected {
            Value::Bool(present) => *present == actual.is_some(),
            _ => return Err(malformed(condition, "a boolean")),
        },
    };
    Ok(matched)
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn malformed(condition: &FilterField, expected: &str) -> StoreError {
    StoreError::backend(format!(
        "Malformed filter on {}: {} requires {expected}",
        condition.field, condition.op
    ))
}
