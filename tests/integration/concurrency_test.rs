//! The update pre-check and apply step are separate round trips.

use std::sync::Arc;

use sleepr::{
    Document, ErrorKind, Filter, MemoryStore, Repository, ReservationDocument,
    ReservationRepository, StoreClient, UpdateQuery,
};

use crate::helpers::{GatedStore, reservation};

async fn race(indexed: bool) -> (MemoryStore, Vec<Result<ReservationDocument, sleepr::AppError>>) {
    let memory = MemoryStore::new();
    let repo = ReservationRepository::new(Arc::new(GatedStore::new(memory.clone(), 2)));
    if indexed {
        repo.sync_indexes().await.unwrap();
    }
    let a = repo.create(reservation("a", "inv-a")).await.unwrap();
    let b = repo.create(reservation("b", "inv-b")).await.unwrap();

    let update = UpdateQuery::new().set("userId", "shared");
    let (filter_a, filter_b) = (Filter::by_id(a.id), Filter::by_id(b.id));
    let (first, second) = tokio::join!(
        repo.find_one_and_update(&filter_a, &update),
        repo.find_one_and_update(&filter_b, &update),
    );
    (memory, vec![first, second])
}

#[tokio::test]
async fn test_concurrent_updates_can_both_pass_pre_check() {
    let (memory, results) = race(false).await;

    assert!(results.iter().all(Result::is_ok));
    let holders = memory
        .query_many(
            ReservationDocument::COLLECTION,
            &Filter::all().eq("userId", "shared"),
        )
        .await
        .unwrap();
    assert_eq!(holders.len(), 2);
}

#[tokio::test]
async fn test_store_index_backstops_concurrent_updates() {
    let (memory, results) = race(true).await;

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.kind == ErrorKind::Conflict))
        .count();
    assert_eq!((ok, conflicts), (1, 1));

    let holders = memory
        .query_many(
            ReservationDocument::COLLECTION,
            &Filter::all().eq("userId", "shared"),
        )
        .await
        .unwrap();
    assert_eq!(holders.len(), 1);
}
