#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Association entry point tests.

mod common;

use common::TestApp;
use showcase_kernel::ShowcaseError;
use showcase_kernel::error::ItemKind;

#[tokio::test]
async fn test_add_then_duplicate() {
    let app = TestApp::new();
    let ctx = app.admin();

    let association = app.service.add_dataset(&ctx, "s1", "d1").await.unwrap();
    assert_eq!(association.showcase_id, "s1");
    assert_eq!(association.dataset_id, "d1");
    assert!(association.created > 0);

    let err = app.service.add_dataset(&ctx, "s1", "d1").await.unwrap_err();
    assert!(matches!(err, ShowcaseError::DuplicateAssociation { .. }));

    let ids = app.service.dataset_ids_for_showcase(&ctx, "s1").await.unwrap();
    assert_eq!(ids, vec!["d1"]);
}

#[tokio::test]
async fn test_add_rejects_unknown_and_mistyped_ids() {
    let app = TestApp::new();
    let ctx = app.admin();

    let err = app.service.add_dataset(&ctx, "s9", "d1").await.unwrap_err();
    assert!(matches!(
        err,
        ShowcaseError::NotFound {
            kind: ItemKind::Showcase,
            ..
        }
    ));

    let err = app.service.add_dataset(&ctx, "s1", "s2").await.unwrap_err();
    assert!(matches!(
        err,
        ShowcaseError::NotFound {
            kind: ItemKind::Dataset,
            ..
        }
    ));

    assert!(app.records.is_empty());
}

#[tokio::test]
async fn test_remove_is_idempotent() {
    let app = TestApp::new();
    let ctx = app.admin();
    app.associate("s1", &["d1", "d2"]).await;

    assert!(app.service.remove_dataset(&ctx, "s1", "d1").await.unwrap());
    assert!(!app.service.remove_dataset(&ctx, "s1", "d1").await.unwrap());
    assert_eq!(app.dataset_ids("s1").await, vec!["d2"]);
}

#[tokio::test]
async fn test_remove_by_name_matches_add_by_name() {
    let app = TestApp::new();
    let ctx = app.admin();

    app.service
        .add_dataset(&ctx, "city-dashboards", "air-quality")
        .await
        .unwrap();
    assert_eq!(app.dataset_ids("s1").await, vec!["d1"]);

    assert!(
        app.service
            .remove_dataset(&ctx, "city-dashboards", "air-quality")
            .await
            .unwrap()
    );
    assert!(app.dataset_ids("s1").await.is_empty());
}

#[tokio::test]
async fn test_listings_resolve_items_in_association_order() {
    let app = TestApp::new();
    let ctx = app.anonymous();
    app.associate("s1", &["d5", "d1", "d3"]).await;
    app.associate("s2", &["d1"]).await;

    let datasets = app
        .service
        .datasets_for_showcase(&ctx, "city-dashboards")
        .await
        .unwrap();
    let titles: Vec<_> = datasets.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["River flow", "Air quality", "Pollen counts"]);

    let showcases = app
        .service
        .showcases_for_dataset(&ctx, "air-quality")
        .await
        .unwrap();
    let names: Vec<_> = showcases.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["city-dashboards", "river-watch"]);
}

#[tokio::test]
async fn test_listing_skips_items_gone_from_catalog() {
    let app = TestApp::new();
    app.associate("s1", &["d1", "d2"]).await;
    app.catalog.remove("d1");

    let datasets = app
        .service
        .datasets_for_showcase(&app.anonymous(), "s1")
        .await
        .unwrap();
    assert_eq!(datasets.len(), 1);
    assert_eq!(datasets[0].id, "d2");

    // The raw id listing still reports the association
    let ids = app
        .service
        .dataset_ids_for_showcase(&app.anonymous(), "s1")
        .await
        .unwrap();
    assert_eq!(ids, vec!["d1", "d2"]);
}

#[tokio::test]
async fn test_cascade_on_deleted_items() {
    let app = TestApp::new();
    app.associate("s1", &["d1", "d2"]).await;
    app.associate("s2", &["d1"]).await;

    assert_eq!(app.service.item_deleted("d1").await.unwrap(), 2);
    assert_eq!(app.dataset_ids("s1").await, vec!["d2"]);
    assert!(app.dataset_ids("s2").await.is_empty());

    assert_eq!(app.service.item_deleted("s1").await.unwrap(), 1);
    assert!(app.records.is_empty());
    assert_eq!(app.service.item_deleted("s1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_anonymous_cannot_mutate() {
    let app = TestApp::new();
    let ctx = app.anonymous();

    let err = app.service.add_dataset(&ctx, "s1", "d1").await.unwrap_err();
    assert!(matches!(err, ShowcaseError::NotAuthorized { .. }));

    app.associate("s1", &["d1"]).await;
    let err = app
        .service
        .remove_dataset(&ctx, "s1", "d1")
        .await
        .unwrap_err();
    assert!(matches!(err, ShowcaseError::NotAuthorized { .. }));
    assert_eq!(app.dataset_ids("s1").await, vec!["d1"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_of_same_pair() {
    let app = TestApp::new();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let service = app.service.clone();
        let ctx = app.admin();
        handles.push(tokio::spawn(async move {
            service.add_dataset(&ctx, "s1", "d1").await
        }));
    }

    let mut created = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(ShowcaseError::DuplicateAssociation { .. }) => duplicates += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(duplicates, 15);
    assert_eq!(app.records.len(), 1);
}
