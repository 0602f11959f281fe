//! # sleepr-database
//!
//! Store adapters (in-memory and PostgreSQL JSONB) and the generic
//! document repository that enforces declared uniqueness constraints on
//! top of them.

pub mod repositories;
pub mod store;

pub use repositories::{DocumentRepository, ReservationRepository};
pub use store::{MemoryStore, PostgresStore};
