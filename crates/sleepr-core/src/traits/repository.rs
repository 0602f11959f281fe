//! Generic repository trait for document access.

use async_trait::async_trait;

use super::document::Document;
use crate::result::AppResult;
use crate::types::{Filter, UpdateQuery};

/// Generic document repository.
///
/// Lookups that require exactly one document fail with
/// [`ErrorKind::NotFound`](crate::error::ErrorKind::NotFound); writes that
/// would break a uniqueness invariant fail with
/// [`ErrorKind::Conflict`](crate::error::ErrorKind::Conflict). Any other
/// store failure is passed through.
#[async_trait]
pub trait Repository<T: Document>: Send + Sync + 'static {
    /// Persist a new document under a freshly generated identifier.
    async fn create(&self, payload: T::Payload) -> AppResult<T>;

    /// Return the single document matching `filter`.
    async fn find_one(&self, filter: &Filter) -> AppResult<T>;

    /// Return every document matching `filter`. Never fails with not-found.
    async fn find(&self, filter: &Filter) -> AppResult<Vec<T>>;

    /// Apply `update` to the document matching `filter` and return the
    /// post-update document.
    async fn find_one_and_update(&self, filter: &Filter, update: &UpdateQuery) -> AppResult<T>;

    /// Remove the document matching `filter` and return its prior state.
    async fn find_one_and_delete(&self, filter: &Filter) -> AppResult<T>;
}
