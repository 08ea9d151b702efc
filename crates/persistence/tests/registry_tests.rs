//! Table registry tests.

#![cfg(feature = "sqlite")]

mod common;

use std::sync::Arc;

use serde_json::json;

use common::*;
use novabase_persistence::engine::CrudEngine;
use novabase_persistence::error::{AccessError, StorageError, ValidationError};

#[tokio::test]
async fn test_register_table() {
    let engine = CrudEngine::new(Arc::new(create_backend()));

    assert!(!engine.is_reachable("notes").await.unwrap());

    let registration = engine.register_table("notes").await.unwrap();
    assert_eq!(registration.table_name, "notes");
    assert!(registration.is_active);
    assert!(engine.is_reachable("notes").await.unwrap());
}

#[tokio::test]
async fn test_register_twice_keeps_one_registration() {
    let engine = CrudEngine::new(Arc::new(create_backend()));

    let first = engine.register_table("notes").await.unwrap();
    let second = engine.register_table("notes").await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(engine.registrations().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_register_requires_tenant_column() {
    let engine = CrudEngine::new(Arc::new(create_backend()));

    let result = engine.register_table("lookup").await;

    match result {
        Err(StorageError::Validation(ValidationError::MissingTenantColumn { table, column })) => {
            assert_eq!(table, "lookup");
            assert_eq!(column, "tenant_id");
        }
        other => panic!("expected MissingTenantColumn, got {:?}", other),
    }
    assert!(!engine.is_reachable("lookup").await.unwrap());
}

#[tokio::test]
async fn test_register_missing_table() {
    let engine = CrudEngine::new(Arc::new(create_backend()));

    let result = engine.register_table("nowhere").await;

    assert!(matches!(
        result,
        Err(StorageError::Access(AccessError::SchemaNotFound { .. }))
    ));
    assert!(engine.registrations().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_register_invalid_name() {
    let engine = CrudEngine::new(Arc::new(create_backend()));

    let result = engine.register_table("notes; --").await;

    assert!(matches!(
        result,
        Err(StorageError::Access(AccessError::NotExposed { .. }))
    ));
}

#[tokio::test]
async fn test_system_tables_cannot_be_registered() {
    let engine = CrudEngine::new(Arc::new(create_backend()));

    for table in ["audit_logs", "tables_meta", "AUDIT_LOGS"] {
        let result = engine.register_table(table).await;
        assert!(
            matches!(
                result,
                Err(StorageError::Validation(ValidationError::ReservedTable { .. }))
            ),
            "{table} should be reserved"
        );
    }
}

#[tokio::test]
async fn test_deactivated_table_is_not_exposed() {
    let engine = create_engine().await;
    let ctx = tenant_one();
    engine
        .create(&ctx, "notes", json!({"title": "kept"}))
        .await
        .unwrap();

    let registration = engine.deactivate_table("notes").await.unwrap();
    assert!(!registration.is_active);

    let result = engine.list(&ctx, "notes").await;
    assert!(matches!(
        result,
        Err(StorageError::Access(AccessError::NotExposed { .. }))
    ));

    // Reactivation exposes the untouched rows again.
    engine.register_table("notes").await.unwrap();
    assert_eq!(engine.list(&ctx, "notes").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_deactivate_unknown_table() {
    let engine = create_engine().await;

    let result = engine.deactivate_table("hidden").await;

    assert!(matches!(
        result,
        Err(StorageError::Access(AccessError::NotExposed { .. }))
    ));
}

#[tokio::test]
async fn test_registered_but_dropped_table() {
    let backend = Arc::new(create_backend());
    backend
        .execute_batch("CREATE TABLE ghost (id INTEGER PRIMARY KEY, tenant_id TEXT)")
        .unwrap();
    let engine = CrudEngine::new(Arc::clone(&backend));
    engine.register_table("ghost").await.unwrap();

    backend.execute_batch("DROP TABLE ghost").unwrap();

    let result = engine.list(&tenant_one(), "ghost").await;
    let err = result.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Access(AccessError::SchemaNotFound { .. })
    ));
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_not_exposed_and_schema_not_found_are_both_not_found() {
    let engine = create_engine().await;

    let unregistered = engine.list(&tenant_one(), "hidden").await.unwrap_err();
    let nonexistent = engine.list(&tenant_one(), "nowhere").await.unwrap_err();

    assert!(unregistered.is_not_found());
    assert!(nonexistent.is_not_found());
}

#[tokio::test]
async fn test_registrations_are_listed() {
    let engine = create_engine().await;

    let names: Vec<String> = engine
        .registrations()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.table_name)
        .collect();

    assert_eq!(names, vec!["notes".to_string(), "projects".to_string()]);
}
