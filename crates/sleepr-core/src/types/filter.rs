//! Filter expressions for selecting documents.
//!
//! A [`Filter`] is a conjunction of [`FilterField`] conditions on top-level
//! document fields. Store adapters are responsible for evaluating it; the
//! repository only builds and forwards filters.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::id::DocumentId;

/// Field holding the document identifier in the stored representation.
pub const ID_FIELD: &str = "_id";

/// Filter comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Exact equality.
    Eq,
    /// Not equal (also matches documents missing the field).
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Membership in a JSON array of candidate values.
    In,
    /// Field presence; the value is a JSON boolean.
    Exists,
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::In => "$in",
            Self::Exists => "$exists",
        };
        f.write_str(op)
    }
}

/// A single filter condition on a named field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterField {
    /// The top-level document field to filter on.
    pub field: String,
    /// The comparison operator.
    pub op: FilterOp,
    /// The value to compare against.
    pub value: Value,
}

impl FilterField {
    /// Create a new filter field.
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

/// A conjunction of field conditions. The empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    conditions: Vec<FilterField>,
}

impl Filter {
    /// A filter matching every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// A filter selecting the document with the given identifier.
    pub fn by_id(id: DocumentId) -> Self {
        Self::all().eq(ID_FIELD, id)
    }

    /// Add a condition.
    pub fn and(mut self, condition: FilterField) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Require `field == value`.
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(FilterField::new(field, FilterOp::Eq, value))
    }

    /// Require `field != value`.
    pub fn ne(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(FilterField::new(field, FilterOp::Ne, value))
    }

    /// Require `field > value`.
    pub fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(FilterField::new(field, FilterOp::Gt, value))
    }

    /// Require `field >= value`.
    pub fn gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(FilterField::new(field, FilterOp::Gte, value))
    }

    /// Require `field < value`.
    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(FilterField::new(field, FilterOp::Lt, value))
    }

    /// Require `field <= value`.
    pub fn lte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(FilterField::new(field, FilterOp::Lte, value))
    }

    /// Require `field` to equal one of `values`.
    pub fn any_of<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.and(FilterField::new(field, FilterOp::In, Value::Array(values)))
    }

    /// Require `field` to be present (`true`) or absent (`false`).
    pub fn exists(self, field: impl Into<String>, present: bool) -> Self {
        self.and(FilterField::new(field, FilterOp::Exists, present))
    }

    /// The conditions in insertion order.
    pub fn conditions(&self) -> &[FilterField] {
        &self.conditions
    }

    /// Whether the filter has no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, c) in self.conditions.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {{{}: {}}}", c.field, c.op, c.value)?;
        }
        f.write_str("}")
    }
}
