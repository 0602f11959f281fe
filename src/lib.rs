//! # sleepr
//!
//! Generic document repository with declared uniqueness constraints.
//!
//! This crate wires the workspace together: it loads [`AppConfig`], installs
//! the tracing subscriber, and builds the configured store and repositories.
//! The building blocks live in `sleepr-core` (contracts, errors, config),
//! `sleepr-entity` (documents), and `sleepr-database` (stores, repositories).

pub mod bootstrap;
pub mod telemetry;

pub use sleepr_core::config::{AppConfig, StoreBackend};
pub use sleepr_core::error::{AppError, ErrorKind};
pub use sleepr_core::result::AppResult;
pub use sleepr_core::traits::{Document, Repository, StoreClient, StoreError};
pub use sleepr_core::types::{DocumentId, Filter, StoredDocument, UpdateQuery};
pub use sleepr_database::{DocumentRepository, MemoryStore, PostgresStore, ReservationRepository};
pub use sleepr_entity::reservation::{CreateReservation, ReservationDocument};
