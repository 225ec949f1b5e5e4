use std::time::Duration;

use optivault_core::{CollectionName, Document, TenantId, Value};

use crate::error::StoreError;
use crate::key::DocumentKey;
use crate::lock::TenantLock;
use crate::store::DocumentStore;

fn test_key(collection: &str, id: &str) -> DocumentKey {
    DocumentKey::new("test-tenant", collection, id)
}

fn doc(fields: &[(&str, Value)]) -> Document {
    fields
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

/// Run the full document store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if any store call fails.
pub async fn run_store_conformance_tests(store: &dyn DocumentStore) -> Result<(), StoreError> {
    test_get_missing(store).await?;
    test_list_empty(store).await?;
    test_merge_and_get(store).await?;
    test_merge_keeps_untouched_fields(store).await?;
    test_merge_is_idempotent(store).await?;
    test_list_is_ordered(store).await?;
    test_tenant_isolation(store).await?;
    test_collection_isolation(store).await?;
    test_separators_do_not_alias(store).await?;
    Ok(())
}

async fn test_get_missing(store: &dyn DocumentStore) -> Result<(), StoreError> {
    let val = store.get_document(&test_key("missing", "nope")).await?;
    assert!(val.is_none(), "get on missing document should return None");
    Ok(())
}

async fn test_list_empty(store: &dyn DocumentStore) -> Result<(), StoreError> {
    let docs = store
        .list_documents(&TenantId::new("test-tenant"), &CollectionName::new("never-written"))
        .await?;
    assert!(docs.is_empty(), "unwritten collection should list empty");
    Ok(())
}

async fn test_merge_and_get(store: &dyn DocumentStore) -> Result<(), StoreError> {
    let key = test_key("merge-get", "d1");
    let body = doc(&[("name", "hello".into()), ("qty", Value::int(2))]);
    store.merge_document(&key, &body).await?;
    let val = store.get_document(&key).await?;
    assert_eq!(val.as_ref(), Some(&body));
    Ok(())
}

async fn test_merge_keeps_untouched_fields(store: &dyn DocumentStore) -> Result<(), StoreError> {
    let key = test_key("merge-partial", "d1");
    store
        .merge_document(&key, &doc(&[("a", Value::int(1)), ("b", Value::int(2))]))
        .await?;
    store
        .merge_document(&key, &doc(&[("b", Value::int(20)), ("c", Value::int(30))]))
        .await?;

    let val = store.get_document(&key).await?.unwrap_or_default();
    assert_eq!(val.get("a"), Some(&Value::int(1)), "untouched field kept");
    assert_eq!(val.get("b"), Some(&Value::int(20)), "present field replaced");
    assert_eq!(val.get("c"), Some(&Value::int(30)), "new field added");
    Ok(())
}

async fn test_merge_is_idempotent(store: &dyn DocumentStore) -> Result<(), StoreError> {
    let key = test_key("merge-twice", "d1");
    let body = doc(&[("x", "y".into())]);
    store.merge_document(&key, &body).await?;
    store.merge_document(&key, &body).await?;
    let val = store.get_document(&key).await?;
    assert_eq!(val.as_ref(), Some(&body));
    Ok(())
}

async fn test_list_is_ordered(store: &dyn DocumentStore) -> Result<(), StoreError> {
    for id in ["c", "a", "b"] {
        store
            .merge_document(&test_key("ordered", id), &doc(&[("id", id.into())]))
            .await?;
    }
    let docs = store
        .list_documents(&TenantId::new("test-tenant"), &CollectionName::new("ordered"))
        .await?;
    let ids: Vec<&str> = docs.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    Ok(())
}

async fn test_tenant_isolation(store: &dyn DocumentStore) -> Result<(), StoreError> {
    store
        .merge_document(
            &DocumentKey::new("tenant-a", "shared", "d1"),
            &doc(&[("owner", "a".into())]),
        )
        .await?;
    store
        .merge_document(
            &DocumentKey::new("tenant-b", "shared", "d1"),
            &doc(&[("owner", "b".into())]),
        )
        .await?;

    let a = store
        .list_documents(&TenantId::new("tenant-a"), &CollectionName::new("shared"))
        .await?;
    assert_eq!(a.len(), 1, "tenant a sees only its own document");
    assert_eq!(a[0].1.get("owner"), Some(&Value::from("a")));
    Ok(())
}

async fn test_collection_isolation(store: &dyn DocumentStore) -> Result<(), StoreError> {
    store
        .merge_document(&test_key("left", "d1"), &doc(&[("side", "left".into())]))
        .await?;
    let right = store
        .list_documents(&TenantId::new("test-tenant"), &CollectionName::new("right"))
        .await?;
    assert!(right.is_empty(), "collections do not leak into each other");
    Ok(())
}

async fn test_separators_do_not_alias(store: &dyn DocumentStore) -> Result<(), StoreError> {
    let first = DocumentKey::new("sep:a", "b", "c");
    let second = DocumentKey::new("sep", "a:b", "c");
    let third = DocumentKey::new("sep", "a", "b:c");
    store
        .merge_document(&first, &doc(&[("owner", "first".into())]))
        .await?;
    store
        .merge_document(&second, &doc(&[("owner", "second".into())]))
        .await?;
    store
        .merge_document(&third, &doc(&[("owner", "third".into())]))
        .await?;

    for (key, owner) in [(&first, "first"), (&second, "second"), (&third, "third")] {
        let val = store.get_document(key).await?.unwrap_or_default();
        assert_eq!(
            val.get("owner"),
            Some(&Value::from(owner)),
            "{key:?} must not share storage with a key that renders the same"
        );
    }

    let listed = store
        .list_documents(&TenantId::new("sep"), &CollectionName::new("a:b"))
        .await?;
    assert_eq!(listed.len(), 1, "a collection containing ':' lists its own document");
    Ok(())
}

/// Run the full tenant lock conformance test suite.
///
/// # Errors
///
/// Returns an error if a lock call fails where it should succeed.
pub async fn run_lock_conformance_tests(lock: &dyn TenantLock) -> Result<(), StoreError> {
    test_acquire_and_release(lock).await?;
    test_held_tenant_times_out(lock).await?;
    test_tenants_are_independent(lock).await?;
    test_extend_keeps_tenant(lock).await?;
    Ok(())
}

const TTL: Duration = Duration::from_secs(10);

async fn test_acquire_and_release(lock: &dyn TenantLock) -> Result<(), StoreError> {
    let tenant = TenantId::new("lock-release");
    let guard = lock.acquire(&tenant, TTL, Duration::ZERO).await?;
    guard.release().await?;

    let again = lock.acquire(&tenant, TTL, Duration::ZERO).await?;
    again.release().await
}

async fn test_held_tenant_times_out(lock: &dyn TenantLock) -> Result<(), StoreError> {
    let tenant = TenantId::new("lock-contended");
    let held = lock.acquire(&tenant, TTL, Duration::ZERO).await?;

    let second = lock.acquire(&tenant, TTL, Duration::from_millis(50)).await;
    assert!(
        matches!(second, Err(StoreError::Timeout(_))),
        "a leased tenant cannot be acquired twice"
    );

    held.release().await
}

async fn test_tenants_are_independent(lock: &dyn TenantLock) -> Result<(), StoreError> {
    let a = lock
        .acquire(&TenantId::new("lock-a"), TTL, Duration::ZERO)
        .await?;
    let b = lock
        .acquire(&TenantId::new("lock-b"), TTL, Duration::ZERO)
        .await?;
    a.release().await?;
    b.release().await
}

async fn test_extend_keeps_tenant(lock: &dyn TenantLock) -> Result<(), StoreError> {
    let tenant = TenantId::new("lock-extend");
    let guard = lock.acquire(&tenant, TTL, Duration::ZERO).await?;
    guard.extend(TTL).await?;

    let second = lock.acquire(&tenant, TTL, Duration::ZERO).await;
    assert!(
        matches!(second, Err(StoreError::Timeout(_))),
        "an extended lease is still held"
    );
    guard.release().await
}
