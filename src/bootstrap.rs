//! Build stores and repositories from configuration.

use std::sync::Arc;

use tracing::info;

use sleepr_core::config::{AppConfig, StoreBackend};
use sleepr_core::error::AppError;
use sleepr_core::result::AppResult;
use sleepr_core::traits::StoreClient;
use sleepr_database::{MemoryStore, PostgresStore, ReservationRepository};

/// Open the store selected by `config.store.backend`.
pub async fn open_store(config: &AppConfig) -> AppResult<Arc<dyn StoreClient>> {
    config.validate()?;

    let store: Arc<dyn StoreClient> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Postgres => Arc::new(PostgresStore::connect(&config.database).await?),
    };

    if !store.health_check().await? {
        return Err(AppError::database("Store failed its health check"));
    }
    info!(backend = ?config.store.backend, "Document store ready");
    Ok(store)
}

/// Build the reservation repository, creating its unique indexes when
/// `config.store.sync_indexes` is set.
pub async fn reservation_repository(
    config: &AppConfig,
    store: Arc<dyn StoreClient>,
) -> AppResult<ReservationRepository> {
    let repo = ReservationRepository::new(store);
    if config.store.sync_indexes {
        repo.sync_indexes().await?;
    }
    Ok(repo)
}
