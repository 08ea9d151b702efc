//! Tenant isolation tests.
//!
//! Two tenants share one database; every operation must behave as if the
//! other tenant's rows did not exist.

#![cfg(feature = "sqlite")]

mod common;

use serde_json::json;

use common::*;
use novabase_persistence::error::{AccessError, StorageError, ValidationError};

// ============================================================================
// Read Isolation
// ============================================================================

#[tokio::test]
async fn test_list_isolation() {
    let engine = create_engine().await;

    engine
        .create(&tenant_one(), "notes", json!({"title": "mine"}))
        .await
        .unwrap();
    engine
        .create(&tenant_two(), "notes", json!({"title": "theirs"}))
        .await
        .unwrap();

    let rows_one = engine.list(&tenant_one(), "notes").await.unwrap();
    let rows_two = engine.list(&tenant_two(), "notes").await.unwrap();

    assert_eq!(rows_one.len(), 1);
    assert_eq!(rows_one[0]["title"], "mine");
    assert_eq!(rows_two.len(), 1);
    assert_eq!(rows_two[0]["title"], "theirs");
}

#[tokio::test]
async fn test_same_tenant_different_users_share_rows() {
    let engine = create_engine().await;

    engine
        .create(&create_tenant("T1", "alice"), "notes", json!({"title": "shared"}))
        .await
        .unwrap();

    let rows = engine
        .list(&create_tenant("T1", "bob"), "notes")
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

// ============================================================================
// Write Isolation
// ============================================================================

#[tokio::test]
async fn test_create_always_uses_context_tenant() {
    let engine = create_engine().await;

    // The sanitizer refuses a client tenant outright.
    let refused = engine
        .create(&tenant_one(), "notes", json!({"title": "hello", "tenant_id": "T9"}))
        .await;
    assert!(matches!(
        refused,
        Err(StorageError::Validation(ValidationError::SecurityViolation { .. }))
    ));

    let row = engine
        .create(&tenant_one(), "notes", json!({"title": "hello"}))
        .await
        .unwrap();
    assert_eq!(row["tenant_id"], "T1");
}

#[tokio::test]
async fn test_update_of_other_tenant_row_matches_missing_row() {
    let engine = create_engine().await;
    let foreign = engine
        .create(&tenant_two(), "notes", json!({"title": "theirs"}))
        .await
        .unwrap();

    let foreign_result = engine
        .update(&tenant_one(), "notes", &id_of(&foreign), json!({"title": "bye"}))
        .await;
    let missing_result = engine
        .update(&tenant_one(), "notes", "424242", json!({"title": "bye"}))
        .await;

    let foreign_err = foreign_result.unwrap_err();
    let missing_err = missing_result.unwrap_err();
    assert!(matches!(
        foreign_err,
        StorageError::Access(AccessError::NotFoundOrForbidden)
    ));
    assert_eq!(foreign_err.to_string(), missing_err.to_string());

    // The foreign row is untouched.
    let rows = engine.list(&tenant_two(), "notes").await.unwrap();
    assert_eq!(rows[0]["title"], "theirs");
}

#[tokio::test]
async fn test_delete_of_other_tenant_row_matches_missing_row() {
    let engine = create_engine().await;
    let foreign = engine
        .create(&tenant_two(), "notes", json!({"title": "theirs"}))
        .await
        .unwrap();

    let foreign_err = engine
        .delete(&tenant_one(), "notes", &id_of(&foreign))
        .await
        .unwrap_err();
    let missing_err = engine
        .delete(&tenant_one(), "notes", "424242")
        .await
        .unwrap_err();

    assert!(matches!(
        foreign_err,
        StorageError::Access(AccessError::NotFoundOrForbidden)
    ));
    assert_eq!(foreign_err.to_string(), missing_err.to_string());
    assert_eq!(engine.list(&tenant_two(), "notes").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_update_of_other_tenant_row() {
    let engine = create_engine().await;
    let foreign = engine
        .create(&tenant_two(), "notes", json!({"title": "theirs"}))
        .await
        .unwrap();

    let result = engine
        .update(&tenant_one(), "notes", &id_of(&foreign), json!({}))
        .await;

    assert!(matches!(
        result,
        Err(StorageError::Access(AccessError::NotFoundOrForbidden))
    ));
}

#[tokio::test]
async fn test_update_never_changes_tenant() {
    let engine = create_engine().await;
    let ctx = tenant_one();
    let created = engine
        .create(&ctx, "notes", json!({"title": "draft"}))
        .await
        .unwrap();
    let id = id_of(&created);

    for body in [
        json!({"tenant_id": "T2", "title": "moved"}),
        json!({"TENANT_ID": "T2"}),
    ] {
        let result = engine.update(&ctx, "notes", &id, body).await;
        assert!(result.is_err());
    }

    let rows = engine.list(&ctx, "notes").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["tenant_id"], "T1");
    assert_eq!(rows[0]["title"], "draft");
    assert!(engine.list(&tenant_two(), "notes").await.unwrap().is_empty());
}

// ============================================================================
// Context Propagation
// ============================================================================

#[tokio::test]
async fn test_context_does_not_leak_between_requests() {
    // The in-memory pool has one connection, so every request reuses it.
    let engine = create_engine().await;

    engine
        .create(&tenant_one(), "notes", json!({"title": "one"}))
        .await
        .unwrap();
    engine
        .create(&tenant_two(), "notes", json!({"title": "two"}))
        .await
        .unwrap();

    for _ in 0..3 {
        let one = engine.list(&tenant_one(), "notes").await.unwrap();
        let two = engine.list(&tenant_two(), "notes").await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0]["title"], "one");
        assert_eq!(two.len(), 1);
        assert_eq!(two[0]["title"], "two");
    }
}

#[tokio::test]
async fn test_failed_request_does_not_leak_context() {
    let engine = create_engine().await;
    engine
        .create(&tenant_one(), "notes", json!({"title": "one"}))
        .await
        .unwrap();

    let _ = engine
        .create(&tenant_one(), "notes", json!({"colour": "red"}))
        .await;

    let rows = engine.list(&tenant_two(), "notes").await.unwrap();
    assert!(rows.is_empty());
}
