//! Reservation document model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use sleepr_core::traits::Document;
use sleepr_core::types::DocumentId;

/// A booking held by a single user and paid by a single invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDocument {
    /// Unique document identifier.
    #[serde(rename = "_id")]
    pub id: DocumentId,
    /// When the reservation was made.
    pub timestamp: DateTime<Utc>,
    /// First day of the stay.
    pub start_date: DateTime<Utc>,
    /// Last day of the stay.
    pub end_date: DateTime<Utc>,
    /// Owning user. Unique across reservations.
    pub user_id: String,
    /// Paying invoice. Unique across reservations.
    pub invoice_id: String,
}

impl ReservationDocument {
    /// Fields whose values must be unique across the collection, in check order.
    pub const UNIQUE_FIELDS: &'static [&'static str] = &["userId", "invoiceId"];

    /// Length of the stay.
    pub fn duration(&self) -> Duration {
        self.end_date - self.start_date
    }

    /// Whether `at` falls within the stay.
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.start_date <= at && at <= self.end_date
    }
}

impl Document for ReservationDocument {
    const COLLECTION: &'static str = "reservations";

    type Payload = CreateReservation;

    fn id(&self) -> DocumentId {
        self.id
    }
}

/// Data required to create a reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservation {
    /// When the reservation was made.
    pub timestamp: DateTime<Utc>,
    /// First day of the stay.
    pub start_date: DateTime<Utc>,
    /// Last day of the stay.
    pub end_date: DateTime<Utc>,
    /// Owning user.
    pub user_id: String,
    /// Paying invoice.
    pub invoice_id: String,
}

impl CreateReservation {
    /// Build a payload stamped with the current time.
    pub fn new(
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        user_id: impl Into<String>,
        invoice_id: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            start_date,
            end_date,
            user_id: user_id.into(),
            invoice_id: invoice_id.into(),
        }
    }
}
