//! Core type definitions used across the Sleepr workspace.

pub mod filter;
pub mod id;
pub mod stored;
pub mod update;

pub use filter::{Filter, FilterField, FilterOp, ID_FIELD};
pub use id::DocumentId;
pub use stored::StoredDocument;
pub use update::UpdateQuery;
