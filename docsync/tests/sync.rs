mod common;

use serde_json::json;
use std::io::ErrorKind;

use common::{COLLECTION, RecordingBackend, definitions, people_store, recording_repository, write_definitions};
use docsync::prelude::*;

#[tokio::test]
async fn first_sync_creates_the_design_document_without_a_revision() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_definitions(dir.path(), &definitions());
    let repository = recording_repository().await;

    let outcome = repository.sync_views(&path).await.unwrap();

    assert!(matches!(outcome, SyncOutcome::Created { .. }));
    assert_eq!(repository.backend().inserts(), 1);

    let (record, id) = repository.backend().last_insert().unwrap();
    let raw = std::fs::read(&path).unwrap();

    assert_eq!(id.as_deref(), Some("_design/people"));
    assert!(record.get("_rev").is_none());
    assert_eq!(record["views"], definitions()["views"]);
    assert_eq!(record["hash"], json!(Fingerprint::of(&raw).as_str()));
}

#[tokio::test]
async fn unchanged_definitions_are_written_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_definitions(dir.path(), &definitions());
    let repository = recording_repository().await;

    assert!(repository.sync_views(&path).await.unwrap().wrote());
    assert_eq!(repository.sync_views(&path).await.unwrap(), SyncOutcome::Unchanged);
    assert_eq!(repository.sync_views(&path).await.unwrap(), SyncOutcome::Unchanged);

    assert_eq!(repository.backend().inserts(), 1);
}

#[tokio::test]
async fn changed_definitions_update_the_stored_revision() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_definitions(dir.path(), &definitions());
    let repository = recording_repository().await;

    let SyncOutcome::Created { rev: first } = repository.sync_views(&path).await.unwrap() else {
        panic!("expected the design document to be created");
    };

    let mut changed = definitions();
    changed["views"]["byAge"] = json!({ "map": "function (doc) { emit(doc.age, doc); }" });
    write_definitions(dir.path(), &changed);

    let outcome = repository.sync_views(&path).await.unwrap();
    let SyncOutcome::Updated { previous_rev, rev } = outcome else {
        panic!("expected the design document to be updated");
    };

    assert_eq!(previous_rev.as_deref(), Some(first.as_str()));
    assert_ne!(rev, first);

    let (record, _) = repository.backend().last_insert().unwrap();
    assert_eq!(record["_rev"], json!(first));
    assert_eq!(repository.backend().inserts(), 2);

    let stored = StoreBackend::get(&repository.backend().inner, "_design/people")
        .await
        .unwrap();
    assert!(stored["views"].get("byAge").is_some());
}

#[tokio::test]
async fn whitespace_changes_count_as_changes() {
    let repository = recording_repository().await;
    let compact = serde_json::to_vec(&definitions()).unwrap();
    let pretty = serde_json::to_vec_pretty(&definitions()).unwrap();

    repository.sync_views_from_bytes(&compact).await.unwrap();
    let outcome = repository.sync_views_from_bytes(&pretty).await.unwrap();

    assert!(matches!(outcome, SyncOutcome::Updated { .. }));
}

#[tokio::test]
async fn one_query_method_is_installed_per_view() {
    let repository = recording_repository().await;

    repository
        .sync_views_from_bytes(&serde_json::to_vec(&definitions()).unwrap())
        .await
        .unwrap();

    let queries = repository.queries().await;
    assert_eq!(queries.method_names(), vec!["findAll", "findByName"]);
    assert!(repository.method("findByAge").await.is_none());

    let method = repository.method("findByName").await.unwrap();
    assert_eq!(method.view(), "byName");
    assert_eq!(method.collection(), COLLECTION);
}

#[tokio::test]
async fn a_missing_definition_file_surfaces_the_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let repository = recording_repository().await;

    let err = repository
        .sync_views(dir.path().join("missing.json"))
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::Io(ref io) if io.kind() == ErrorKind::NotFound));
    assert_eq!(repository.backend().calls(), 0);
    assert!(repository.queries().await.is_empty());
}

#[tokio::test]
async fn malformed_definitions_are_rejected_before_any_write() {
    let repository = recording_repository().await;

    let err = repository
        .sync_views_from_bytes(b"{\"views\": [1, 2]}")
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentStoreError::InvalidDefinition(_)));

    let err = repository
        .sync_views_from_bytes(b"{ not json")
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentStoreError::Serialization(_)));

    assert_eq!(repository.backend().calls(), 0);
}

#[tokio::test]
async fn colliding_method_names_are_rejected() {
    let repository = recording_repository().await;
    let definitions = json!({
        "views": {
            "byName": { "map": "function (doc) { emit(doc.name, doc); }" },
            "ByName": { "map": "function (doc) { emit(doc.name, null); }" }
        }
    });

    let err = repository
        .sync_views_from_bytes(&serde_json::to_vec(&definitions).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::InvalidDefinition(_)));
    assert_eq!(repository.backend().inserts(), 0);
}

#[tokio::test]
async fn extra_top_level_fields_are_persisted() {
    let repository = recording_repository().await;
    let mut definitions = definitions();
    definitions["language"] = json!("javascript");

    repository
        .sync_views_from_bytes(&serde_json::to_vec(&definitions).unwrap())
        .await
        .unwrap();

    let (record, _) = repository.backend().last_insert().unwrap();
    assert_eq!(record["language"], json!("javascript"));
}

#[tokio::test]
async fn query_methods_stay_installed_when_the_design_write_fails() {
    let repository = Repository::new(RecordingBackend::new(people_store().await).failing_inserts()).unwrap();

    let err = repository
        .sync_views_from_bytes(&serde_json::to_vec(&definitions()).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::Backend(_)));
    assert_eq!(repository.queries().await.method_names(), vec!["findAll", "findByName"]);
    assert!(repository.method("findByName").await.is_some());
}

#[tokio::test]
async fn a_failed_design_lookup_aborts_without_writing() {
    let repository = Repository::new(RecordingBackend::new(people_store().await).failing_gets()).unwrap();

    let err = repository
        .sync_views_from_bytes(&serde_json::to_vec(&definitions()).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::Backend(_)));
    assert!(!err.is_not_found());
    assert_eq!(repository.backend().inserts(), 0);
    assert_eq!(repository.queries().await.len(), 2);
}

#[tokio::test]
async fn a_stored_hash_of_another_type_is_overwritten() {
    let repository = recording_repository().await;
    let stored = StoreBackend::insert(
        &repository.backend().inner,
        json!({ "_id": "_design/people", "views": {}, "hash": 5 }),
        None,
    )
    .await
    .unwrap();

    let raw = serde_json::to_vec(&definitions()).unwrap();
    let outcome = repository.sync_views_from_bytes(&raw).await.unwrap();

    let SyncOutcome::Updated { previous_rev, .. } = &outcome else {
        panic!("expected the design document to be updated, got {outcome:?}");
    };
    assert_eq!(previous_rev.as_deref(), Some(stored.rev.as_str()));

    let (record, _) = repository.backend().last_insert().unwrap();
    assert_eq!(record["_rev"], json!(stored.rev));
    assert_eq!(record["hash"], json!(Fingerprint::of(&raw).as_str()));
    assert_eq!(repository.sync_views_from_bytes(&raw).await.unwrap(), SyncOutcome::Unchanged);
}
