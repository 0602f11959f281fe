//! Shared test helpers for integration tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Barrier;

use sleepr::{
    CreateReservation, Filter, MemoryStore, ReservationRepository, StoreClient, StoreError,
    StoredDocument, UpdateQuery,
};

/// A reservation payload for `user_id` paid by `invoice_id`.
pub fn reservation(user_id: &str, invoice_id: &str) -> CreateReservation {
    let start = Utc::now() + Duration::days(7);
    CreateReservation::new(start, start + Duration::days(3), user_id, invoice_id)
}

/// A reservation repository over a fresh memory store.
///
/// With `indexed`, the store also carries unique indexes on the declared
/// fields.
pub async fn reservation_repo(indexed: bool) -> (MemoryStore, ReservationRepository) {
    let store = MemoryStore::new();
    let repo = ReservationRepository::new(Arc::new(store.clone()));
    if indexed {
        repo.sync_indexes().await.expect("sync indexes");
    }
    (store, repo)
}

/// Memory store that holds every `update_one` until `parties` callers have
/// reached it, so concurrent updates finish their pre-checks first.
#[derive(Debug)]
pub struct GatedStore {
    inner: MemoryStore,
    gate: Barrier,
}

impl GatedStore {
    pub fn new(inner: MemoryStore, parties: usize) -> Self {
        Self {
            inner,
            gate: Barrier::new(parties),
        }
    }
}

#[async_trait]
impl StoreClient for GatedStore {
    async fn insert(
        &self,
        collection: &str,
        document: StoredDocument,
    ) -> Result<StoredDocument, StoreError> {
        self.inner.insert(collection, document).await
    }

    async fn query_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<StoredDocument>, StoreError> {
        self.inner.query_one(collection, filter).await
    }

    async fn query_many(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        self.inner.query_many(collection, filter).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateQuery,
    ) -> Result<Option<StoredDocument>, StoreError> {
        self.gate.wait().await;
        self.inner.update_one(collection, filter, update).await
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<StoredDocument>, StoreError> {
        self.inner.delete_one(collection, filter).await
    }

    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        self.inner.ensure_unique_index(collection, field).await
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        self.inner.health_check().await
    }
}
