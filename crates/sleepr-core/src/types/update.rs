//! Update expressions.
//!
//! An [`UpdateQuery`] carries a `$set` clause (ordered field assignments) and
//! an `$unset` clause (field removals). Only the `$set` clause takes part in
//! uniqueness checking.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::filter::ID_FIELD;
use crate::error::AppError;

/// A mutation applied to a single document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateQuery {
    /// Field assignments, in the order they were added.
    #[serde(
        rename = "$set",
        default,
        skip_serializing_if = "Vec::is_empty",
        with = "set_clause"
    )]
    set: Vec<(String, Value)>,
    /// Fields to remove.
    #[serde(rename = "$unset", default, skip_serializing_if = "Vec::is_empty")]
    unset: Vec<String>,
}

impl UpdateQuery {
    /// An empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `value` to `field`. Re-assigning a field replaces the earlier value
    /// but keeps its original position.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        let value = value.into();
        match self.set.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = value,
            None => self.set.push((field, value)),
        }
        self
    }

    /// Assign every entry of `fields`.
    pub fn set_all(self, fields: Map<String, Value>) -> Self {
        fields
            .into_iter()
            .fold(self, |update, (field, value)| update.set(field, value))
    }

    /// Remove `field` from the document.
    pub fn unset(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.unset.contains(&field) {
            self.unset.push(field);
        }
        self
    }

    /// Whether the update carries a `$set` clause.
    pub fn has_set(&self) -> bool {
        !self.set.is_empty()
    }

    /// The `$set` assignments in order.
    pub fn set_fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.set.iter().map(|(f, v)| (f.as_str(), v))
    }

    /// The value assigned to `field` by the `$set` clause, if any.
    pub fn set_value(&self, field: &str) -> Option<&Value> {
        self.set.iter().find(|(f, _)| f == field).map(|(_, v)| v)
    }

    /// The `$unset` field names.
    pub fn unset_fields(&self) -> &[String] {
        &self.unset
    }

    /// Whether the update does nothing.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }

    /// Reject updates that would touch the document identifier.
    pub fn validate(&self) -> Result<(), AppError> {
        let touches_id =
            self.set_value(ID_FIELD).is_some() || self.unset.iter().any(|f| f == ID_FIELD);
        if touches_id {
            return Err(AppError::validation(format!(
                "The {ID_FIELD} field is immutable and cannot be updated"
            )));
        }
        Ok(())
    }

    /// The `$set` clause as a JSON object.
    pub fn set_object(&self) -> Map<String, Value> {
        self.set.iter().cloned().collect()
    }
}

/// `$set` as a JSON object whose key order is the assignment order.
mod set_clause {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::{Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(
        set: &[(String, Value)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(set.iter().map(|(f, v)| (f, v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, Value)>, D::Error> {
        struct SetVisitor;

        impl<'de> Visitor<'de> for SetVisitor {
            type Value = Vec<(String, Value)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of field assignments")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut set: Vec<(String, Value)> = Vec::new();
                while let Some((field, value)) = map.next_entry::<String, Value>()? {
                    match set.iter_mut().find(|(f, _)| *f == field) {
                        Some(entry) => entry.1 = value,
                        None => set.push((field, value)),
                    }
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(SetVisitor)
    }
}
