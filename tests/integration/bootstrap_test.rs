//! Configuration-driven wiring.

use sleepr::bootstrap::{open_store, reservation_repository};
use sleepr::telemetry::init_logging;
use sleepr::{AppConfig, ErrorKind, Repository, StoreBackend};

use crate::helpers::reservation;

#[tokio::test]
async fn test_memory_backend_with_indexes() {
    let config = AppConfig::from_toml("[store]\nbackend = \"memory\"\n").unwrap();
    let store = open_store(&config).await.unwrap();
    let repo = reservation_repository(&config, store).await.unwrap();

    repo.create(reservation("u1", "inv-1")).await.unwrap();
    let err = repo.create(reservation("u2", "inv-1")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn test_memory_backend_without_indexes() {
    let config = AppConfig::from_toml("[store]\nsync_indexes = false\n").unwrap();
    let store = open_store(&config).await.unwrap();
    let repo = reservation_repository(&config, store).await.unwrap();

    repo.create(reservation("u1", "inv-1")).await.unwrap();
    repo.create(reservation("u1", "inv-1")).await.unwrap();
}

#[tokio::test]
async fn test_postgres_backend_requires_url() {
    let mut config = AppConfig::default();
    config.store.backend = StoreBackend::Postgres;
    let err = open_store(&config).await.err().expect("missing url must fail");
    assert_eq!(err.kind, ErrorKind::Configuration);
}

#[test]
fn test_init_logging_once() {
    let config = AppConfig::default();
    init_logging(&config.logging).unwrap();
    assert!(init_logging(&config.logging).is_err());
}
