//! Reservation repository.

use std::sync::Arc;

use async_trait::async_trait;

use sleepr_core::result::AppResult;
use sleepr_core::traits::{Repository, StoreClient};
use sleepr_core::types::{Filter, UpdateQuery};
use sleepr_entity::reservation::{CreateReservation, ReservationDocument};

use super::document::DocumentRepository;

/// Repository for reservations. `userId` and `invoiceId` are unique.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    inner: DocumentRepository<ReservationDocument>,
}

impl ReservationRepository {
    /// Create a new reservation repository.
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self {
            inner: DocumentRepository::new(store, ReservationDocument::UNIQUE_FIELDS),
        }
    }

    /// Back `userId` and `invoiceId` with store-native unique indexes.
    pub async fn sync_indexes(&self) -> AppResult<()> {
        self.inner.sync_indexes().await
    }

    /// Find the reservation held by a user.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<ReservationDocument> {
        self.inner.find_one(&Filter::all().eq("userId", user_id)).await
    }

    /// Find the reservation paid by an invoice.
    pub async fn find_by_invoice(&self, invoice_id: &str) -> AppResult<ReservationDocument> {
        self.inner
            .find_one(&Filter::all().eq("invoiceId", invoice_id))
            .await
    }

    /// Move a reservation to another invoice.
    pub async fn reassign_invoice(
        &self,
        user_id: &str,
        invoice_id: &str,
    ) -> AppResult<ReservationDocument> {
        self.inner
            .find_one_and_update(
                &Filter::all().eq("userId", user_id),
                &UpdateQuery::new().set("invoiceId", invoice_id),
            )
            .await
    }
}

#[async_trait]
impl Repository<ReservationDocument> for ReservationRepository {
    async fn create(&self, payload: CreateReservation) -> AppResult<ReservationDocument> {
        self.inner.create(payload).await
    }

    async fn find_one(&self, filter: &Filter) -> AppResult<ReservationDocument> {
        self.inner.find_one(filter).await
    }

    async fn find(&self, filter: &Filter) -> AppResult<Vec<ReservationDocument>> {
        self.inner.find(filter).await
    }

    async fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &UpdateQuery,
    ) -> AppResult<ReservationDocument> {
        self.inner.find_one_and_update(filter, update).await
    }

    async fn find_one_and_delete(&self, filter: &Filter) -> AppResult<ReservationDocument> {
        self.inner.find_one_and_delete(filter).await
    }
}
