//! Audit logging tests.
//!
//! Every committed mutation leaves exactly one audit record; every rolled
//! back mutation leaves none.

#![cfg(feature = "sqlite")]

mod common;

use serde_json::json;

use common::*;
use novabase_persistence::error::{BackendError, StorageError};
use novabase_persistence::types::AuditAction;

fn is_internal<T>(result: &Result<T, StorageError>) -> bool {
    matches!(result, Err(StorageError::Backend(BackendError::Internal { .. })))
}

#[tokio::test]
async fn test_create_is_audited() {
    let engine = create_engine().await;
    let ctx = tenant_one();

    let row = engine
        .create(&ctx, "notes", json!({"title": "hello"}))
        .await
        .unwrap();

    let trail = engine.audit_trail(&ctx).await.unwrap();
    assert_eq!(trail.len(), 1);
    let record = &trail[0];
    assert_eq!(record.action, AuditAction::Create);
    assert_eq!(record.table_name, "notes");
    assert_eq!(record.record_id, id_of(&row));
    assert_eq!(record.tenant_id.as_str(), "T1");
    assert_eq!(record.user_id.as_str(), "U1");
    assert_eq!(
        record.payload,
        Some(json!({"title": "hello", "tenant_id": "T1"}))
    );
}

#[tokio::test]
async fn test_update_and_delete_are_audited() {
    let engine = create_engine().await;
    let ctx = tenant_one();
    let row = engine
        .create(&ctx, "notes", json!({"title": "draft"}))
        .await
        .unwrap();
    let id = id_of(&row);

    engine
        .update(&ctx, "notes", &id, json!({"title": "final"}))
        .await
        .unwrap();
    engine.delete(&ctx, "notes", &id).await.unwrap();

    let trail = engine.audit_trail(&ctx).await.unwrap();
    let actions: Vec<AuditAction> = trail.iter().map(|r| r.action).collect();
    assert_eq!(
        actions,
        vec![AuditAction::Delete, AuditAction::Update, AuditAction::Create]
    );
    assert!(trail.iter().all(|r| r.record_id == id));
    assert_eq!(trail[0].payload, None);
    assert_eq!(trail[1].payload, Some(json!({"title": "final"})));
}

#[tokio::test]
async fn test_empty_update_is_audited() {
    let engine = create_engine().await;
    let ctx = tenant_one();
    let row = engine
        .create(&ctx, "notes", json!({"title": "draft"}))
        .await
        .unwrap();

    engine
        .update(&ctx, "notes", &id_of(&row), json!({}))
        .await
        .unwrap();

    let trail = engine.audit_trail(&ctx).await.unwrap();
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].action, AuditAction::Update);
    assert_eq!(trail[0].payload, Some(json!({})));
}

#[tokio::test]
async fn test_failed_create_is_not_audited() {
    let engine = create_engine().await;
    let ctx = tenant_one();
    engine
        .create(&ctx, "projects", json!({"name": "apollo"}))
        .await
        .unwrap();

    assert!(
        engine
            .create(&ctx, "projects", json!({"name": "apollo"}))
            .await
            .is_err()
    );
    assert!(
        engine
            .create(&ctx, "notes", json!({"hashed_password": "x"}))
            .await
            .is_err()
    );

    let trail = engine.audit_trail(&ctx).await.unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].table_name, "projects");
}

#[tokio::test]
async fn test_failed_audit_write_rolls_back_create() {
    let engine = create_engine().await;
    let ctx = tenant_one();
    engine.backend().execute_batch(BLOCK_AUDIT_DDL).unwrap();

    let result = engine.create(&ctx, "notes", json!({"title": "hello"})).await;

    assert!(is_internal(&result));
    assert!(engine.list(&ctx, "notes").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_audit_write_rolls_back_update_and_delete() {
    let engine = create_engine().await;
    let ctx = tenant_one();
    let row = engine
        .create(&ctx, "notes", json!({"title": "draft"}))
        .await
        .unwrap();
    let id = id_of(&row);
    engine.backend().execute_batch(BLOCK_AUDIT_DDL).unwrap();

    let updated = engine
        .update(&ctx, "notes", &id, json!({"title": "final"}))
        .await;
    assert!(is_internal(&updated));

    let deleted = engine.delete(&ctx, "notes", &id).await;
    assert!(is_internal(&deleted));

    let rows = engine.list(&ctx, "notes").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["title"], "draft");

    let trail = engine.audit_trail(&ctx).await.unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action, AuditAction::Create);
}

#[tokio::test]
async fn test_cross_tenant_mutation_is_not_audited() {
    let engine = create_engine().await;
    let foreign = engine
        .create(&tenant_two(), "notes", json!({"title": "theirs"}))
        .await
        .unwrap();
    let id = id_of(&foreign);

    assert!(
        engine
            .update(&tenant_one(), "notes", &id, json!({"title": "bye"}))
            .await
            .is_err()
    );
    assert!(engine.delete(&tenant_one(), "notes", &id).await.is_err());

    assert!(engine.audit_trail(&tenant_one()).await.unwrap().is_empty());
    assert_eq!(engine.audit_trail(&tenant_two()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_audit_trail_is_tenant_scoped() {
    let engine = create_engine().await;

    engine
        .create(&tenant_one(), "notes", json!({"title": "a"}))
        .await
        .unwrap();
    engine
        .create(&tenant_two(), "notes", json!({"title": "b"}))
        .await
        .unwrap();
    engine
        .create(&tenant_two(), "projects", json!({"name": "c"}))
        .await
        .unwrap();

    let one = engine.audit_trail(&tenant_one()).await.unwrap();
    let two = engine.audit_trail(&tenant_two()).await.unwrap();

    assert_eq!(one.len(), 1);
    assert_eq!(two.len(), 2);
    assert!(two.iter().all(|r| r.tenant_id.as_str() == "T2"));
}

#[tokio::test]
async fn test_audit_snapshot_includes_owner() {
    let engine = create_engine().await;

    engine
        .create(&tenant_one(), "projects", json!({"name": "apollo"}))
        .await
        .unwrap();

    let trail = engine.audit_trail(&tenant_one()).await.unwrap();
    assert_eq!(
        trail[0].payload,
        Some(json!({"name": "apollo", "tenant_id": "T1", "user_id": "U1"}))
    );
}
