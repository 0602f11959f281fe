//! Reservation repository behaviour against the memory store.

use std::collections::HashSet;

use sleepr::{Document, ErrorKind, Filter, Repository, ReservationDocument, UpdateQuery};

use crate::helpers::{reservation, reservation_repo};

#[tokio::test]
async fn test_unique_user_id_scenario() {
    let (store, repo) = reservation_repo(true).await;

    let first = repo.create(reservation("u1", "inv-1")).await.unwrap();
    assert_eq!(first.user_id, "u1");

    let err = repo.create(reservation("u1", "inv-2")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(store.count(ReservationDocument::COLLECTION), 1);

    let moved = repo
        .find_one_and_update(
            &Filter::all().eq("userId", "u1"),
            &UpdateQuery::new().set("userId", "u2"),
        )
        .await
        .unwrap();
    assert_eq!(moved.id, first.id);
    assert_eq!(moved.user_id, "u2");

    // Re-assigning the current value is not a self-conflict.
    let again = repo
        .find_one_and_update(
            &Filter::all().eq("userId", "u2"),
            &UpdateQuery::new().set("userId", "u2"),
        )
        .await
        .unwrap();
    assert_eq!(again, moved);

    // The old filter no longer matches anything.
    let err = repo
        .find_one_and_update(
            &Filter::all().eq("userId", "u1"),
            &UpdateQuery::new().set("userId", "u2"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    // Another document taking "u2" collides.
    repo.create(reservation("u3", "inv-3")).await.unwrap();
    let err = repo
        .find_one_and_update(
            &Filter::all().eq("userId", "u3"),
            &UpdateQuery::new().set("userId", "u2"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert!(err.message.contains("userId"));
    assert_eq!(repo.find_by_user("u3").await.unwrap().invoice_id, "inv-3");
}

#[tokio::test]
async fn test_created_ids_are_distinct() {
    let (_, repo) = reservation_repo(true).await;

    let mut ids = HashSet::new();
    for i in 0..25 {
        let doc = repo
            .create(reservation(&format!("u{i}"), &format!("inv-{i}")))
            .await
            .unwrap();
        assert!(ids.insert(doc.id), "id {} reused", doc.id);
    }
}

#[tokio::test]
async fn test_update_pre_check_works_without_store_index() {
    let (_, repo) = reservation_repo(false).await;
    repo.create(reservation("u1", "inv-1")).await.unwrap();
    let second = repo.create(reservation("u2", "inv-2")).await.unwrap();

    let err = repo
        .find_one_and_update(
            &Filter::by_id(second.id),
            &UpdateQuery::new().set("invoiceId", "inv-1"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(repo.find_one(&Filter::by_id(second.id)).await.unwrap(), second);
}

#[tokio::test]
async fn test_create_without_store_index_is_not_checked() {
    let (store, repo) = reservation_repo(false).await;
    repo.create(reservation("u1", "inv-1")).await.unwrap();
    repo.create(reservation("u1", "inv-1")).await.unwrap();
    assert_eq!(store.count(ReservationDocument::COLLECTION), 2);
}

#[tokio::test]
async fn test_not_found_paths_leave_state_unchanged() {
    let (store, repo) = reservation_repo(true).await;
    repo.create(reservation("u1", "inv-1")).await.unwrap();
    let missing = Filter::all().eq("userId", "ghost");

    assert_eq!(repo.find_one(&missing).await.unwrap_err().kind, ErrorKind::NotFound);
    assert_eq!(
        repo.find_one_and_update(&missing, &UpdateQuery::new().set("invoiceId", "x"))
            .await
            .unwrap_err()
            .kind,
        ErrorKind::NotFound
    );
    assert_eq!(
        repo.find_one_and_delete(&missing).await.unwrap_err().kind,
        ErrorKind::NotFound
    );
    assert!(repo.find(&missing).await.unwrap().is_empty());
    assert_eq!(store.count(ReservationDocument::COLLECTION), 1);
}

#[tokio::test]
async fn test_find_filters_and_delete() {
    let (_, repo) = reservation_repo(true).await;
    let a = repo.create(reservation("u1", "inv-1")).await.unwrap();
    let b = repo.create(reservation("u2", "inv-2")).await.unwrap();
    repo.create(reservation("u3", "inv-3")).await.unwrap();

    let found = repo
        .find(&Filter::all().any_of("userId", ["u1", "u2"]))
        .await
        .unwrap();
    assert_eq!(found, vec![a.clone(), b.clone()]);

    let removed = repo.find_one_and_delete(&Filter::by_id(a.id)).await.unwrap();
    assert_eq!(removed, a);
    assert_eq!(repo.find(&Filter::all()).await.unwrap().len(), 2);

    // The freed value can be taken again.
    let c = repo
        .find_one_and_update(&Filter::by_id(b.id), &UpdateQuery::new().set("userId", "u1"))
        .await
        .unwrap();
    assert_eq!(c.user_id, "u1");
}
