//! The store-client boundary consumed by repositories.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::{AppError, ErrorKind};
use crate::types::{Filter, StoredDocument, UpdateQuery};

/// Failure reported by a store adapter.
///
/// Every adapter classifies its driver errors into these two variants in a
/// single place, so repositories never inspect wire-level error codes.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A store-native unique index rejected the write.
    #[error("duplicate key violates unique index {index}")]
    DuplicateKey {
        /// Name of the violated index (or field, for stores without named indexes).
        index: String,
    },
    /// Any other failure: connectivity, malformed queries, decoding.
    #[error("{message}")]
    Backend {
        /// Description of the failed operation.
        message: String,
        /// The driver error, if there is one.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    /// A backend failure without an underlying driver error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }

    /// A backend failure wrapping a driver error.
    pub fn backend_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this is a duplicate-key failure.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let kind = match err {
            StoreError::DuplicateKey { .. } => ErrorKind::Conflict,
            StoreError::Backend { .. } => ErrorKind::Database,
        };
        let message = err.to_string();
        Self::with_source(kind, message, err)
    }
}

/// Document store operations, one round trip each.
///
/// Implementations must be safe to share between tasks; repositories hold
/// them behind an `Arc<dyn StoreClient>`.
#[async_trait]
pub trait StoreClient: Send + Sync + fmt::Debug + 'static {
    /// Insert a document. Fails with [`StoreError::DuplicateKey`] when a
    /// unique index rejects it.
    async fn insert(
        &self,
        collection: &str,
        document: StoredDocument,
    ) -> Result<StoredDocument, StoreError>;

    /// Return the first document matching `filter`, in store order.
    async fn query_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<StoredDocument>, StoreError>;

    /// Return every document matching `filter`, in store order.
    async fn query_many(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// Apply `update` to the first document matching `filter` and return the
    /// post-update document, or `None` when nothing matched.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateQuery,
    ) -> Result<Option<StoredDocument>, StoreError>;

    /// Remove the first document matching `filter` and return it.
    async fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<StoredDocument>, StoreError>;

    /// Ensure a unique index on `field` exists. Idempotent.
    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError>;

    /// Check store connectivity.
    async fn health_check(&self) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_key_maps_to_conflict() {
        let err: AppError = StoreError::DuplicateKey {
            index: "reservations_userId_key".to_string(),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(err.source.is_some());
    }

    #[test]
    fn test_backend_keeps_source() {
        let io = std::io::Error::other("connection reset");
        let err: AppError = StoreError::backend_with_source("query failed", io).into();
        assert_eq!(err.kind, ErrorKind::Database);
        assert_eq!(err.message, "query failed");

        let store_err = err
            .source
            .as_ref()
            .and_then(|s| s.downcast_ref::<StoreError>())
            .expect("store error source");
        assert!(std::error::Error::source(store_err).is_some());
    }
}
