use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value as JsonValue, json};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use optivault_backup::manifest::MANIFEST;
use optivault_backup::{
    Artifact, BackupAssembler, BackupConfig, RestoreControl, RestoreError, RestoreOrchestrator,
    RestoreState, RetryStrategy,
};
use optivault_core::{CollectionName, Document, DocumentId, Principal, TenantId, Value};
use optivault_store::{DocumentKey, DocumentStore, LockGuard, StoreError, TenantLock};
use optivault_store_memory::{MemoryDocumentStore, MemoryTenantLock};

// -- Fault-injecting store -------------------------------------------------

/// Wraps the memory store and fails, delays or observes calls on demand.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryDocumentStore,
    /// Document ids whose writes always fail with a permanent error.
    fail_ids: HashSet<String>,
    /// Collections whose listing always fails with a transient error.
    fail_lists: HashSet<String>,
    /// Number of upcoming writes that fail with a transient error.
    transient_failures: AtomicUsize,
    delay: Duration,
    /// Cancel this token once the given number of writes succeeded.
    cancel_after: Option<(usize, CancellationToken)>,
    attempted: Mutex<Vec<String>>,
    merged: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FlakyStore {
    fn attempted(&self) -> Vec<String> {
        self.attempted.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn list_documents(
        &self,
        tenant: &TenantId,
        collection: &CollectionName,
    ) -> Result<Vec<(DocumentId, Document)>, StoreError> {
        if self.fail_lists.contains(collection.as_str()) {
            return Err(StoreError::Unavailable("listing unavailable".into()));
        }
        self.inner.list_documents(tenant, collection).await
    }

    async fn get_document(&self, key: &DocumentKey) -> Result<Option<Document>, StoreError> {
        self.inner.get_document(key).await
    }

    async fn merge_document(
        &self,
        key: &DocumentKey,
        document: &Document,
    ) -> Result<(), StoreError> {
        self.attempted.lock().unwrap().push(key.id.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = if self.fail_ids.contains(key.id.as_str()) {
            Err(StoreError::Rejected(format!("{} is malformed", key.id)))
        } else if self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            Err(StoreError::Unavailable("try again".into()))
        } else {
            self.inner.merge_document(key, document).await
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if result.is_ok() {
            let merged = self.merged.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((limit, token)) = &self.cancel_after
                && merged >= *limit
            {
                token.cancel();
            }
        }
        result
    }
}

// -- Helpers -----------------------------------------------------------------

fn fast_config() -> BackupConfig {
    BackupConfig {
        retry_strategy: RetryStrategy::Constant {
            delay: Duration::from_millis(1),
        },
        store_timeout: Duration::from_secs(5),
        ..BackupConfig::default()
    }
}

fn owner() -> Principal {
    Principal::new("u1", "owner@shop.test")
}

fn instant() -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
}

fn bytes(value: &JsonValue) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}

/// Artifact owned by `u1` with one collection of `count` documents
/// named `doc-000`, `doc-001`, ...
fn numbered_artifact(collection: &str, count: usize) -> JsonValue {
    let docs: serde_json::Map<String, JsonValue> = (0..count)
        .map(|i| (format!("doc-{i:03}"), json!({"qty": i, "name": format!("item {i}")})))
        .collect();
    json!({
        "metadata": {
            "ownerId": "u1",
            "ownerEmail": "owner@shop.test",
            "collections": [collection],
            "totalDocuments": count,
            "version": "2.0",
            "securityLevel": "standard",
        },
        collection: docs,
    })
}

async fn seed(store: &dyn DocumentStore, tenant: &str, collection: &str, id: &str, doc: Document) {
    store
        .merge_document(&DocumentKey::new(tenant, collection, id), &doc)
        .await
        .unwrap();
}

async fn seed_source(store: &MemoryDocumentStore) {
    let mut limits = Document::new();
    limits.insert("minSph".into(), Value::float(-8.0));
    limits.insert("maxSph".into(), Value::float(6.0));
    limits.insert("minCyl".into(), Value::float(-4.0));
    limits.insert("maxCyl".into(), Value::float(0.0));
    limits.insert("addition".into(), Value::float(2.5));
    limits.insert("axis".into(), Value::int(180));

    let mut product = Document::new();
    product.insert("name".into(), "Single Vision 1.56".into());
    product.insert("sph".into(), Value::float(-1.25));
    product.insert("cyl".into(), Value::float(-0.5));
    product.insert("qty".into(), Value::int(4));
    product.insert("salePrice".into(), Value::float(1200.0));
    product.insert("createdAt".into(), Value::Timestamp(instant()));
    product.insert("powerLimits".into(), Value::Map(limits));
    product.insert(
        "tags".into(),
        Value::List(vec!["stock".into(), Value::Bool(true), Value::Null]),
    );
    seed(store, "u1", "products", "p1", product).await;

    let mut customer = Document::new();
    customer.insert("name".into(), "R. Mehta".into());
    customer.insert("phone".into(), "5550100".into());
    customer.insert("dateOfBirth".into(), Value::Timestamp(instant()));
    seed(store, "u1", "customers", "c1", customer).await;

    let mut placeholder = Document::new();
    placeholder.insert("_placeholder".into(), Value::Bool(true));
    seed(store, "u1", "frames", "_init", placeholder).await;

    let mut foreign = Document::new();
    foreign.insert("name".into(), "other tenant".into());
    seed(store, "u2", "products", "x1", foreign).await;
}

// -- Backup ------------------------------------------------------------------

#[tokio::test]
async fn assembled_artifact_lists_every_manifest_collection() {
    let source = Arc::new(MemoryDocumentStore::new());
    seed_source(&source).await;

    let output = BackupAssembler::new(source, fast_config())
        .assemble(&owner())
        .await
        .unwrap();
    let json: JsonValue =
        serde_json::from_slice(&output.artifact.to_json_bytes().unwrap()).unwrap();

    for name in MANIFEST {
        assert!(json[name].is_object(), "missing collection {name}");
    }
    assert_eq!(json["metadata"]["ownerId"], "u1");
    assert_eq!(json["metadata"]["totalDocuments"], 2);
    assert_eq!(json["frames"], json!({}));
    assert_eq!(json["products"].as_object().unwrap().len(), 1);
    assert_eq!(
        json["products"]["p1"]["createdAt"],
        json!({"type": "timestamp", "value": "2023-11-14T22:13:20.000Z"})
    );
}

#[tokio::test]
async fn unreadable_collection_is_exported_empty_with_a_warning() {
    let store = Arc::new(FlakyStore {
        fail_lists: HashSet::from(["sales".to_owned()]),
        ..FlakyStore::default()
    });
    let mut product = Document::new();
    product.insert("name".into(), "Lens".into());
    seed(store.as_ref(), "u1", "products", "p1", product).await;

    let output = BackupAssembler::new(store, fast_config())
        .assemble(&owner())
        .await
        .unwrap();

    assert_eq!(output.report.warnings.len(), 1);
    assert!(output.report.warnings[0].contains("sales"));
    assert!(
        output
            .artifact
            .collection(&"sales".into())
            .unwrap()
            .is_empty()
    );
    assert_eq!(output.artifact.metadata.total_documents, 1);
}

// -- Round trip --------------------------------------------------------------

#[tokio::test]
async fn backup_restores_unchanged_into_an_empty_store() {
    let source = Arc::new(MemoryDocumentStore::new());
    seed_source(&source).await;
    let artifact = BackupAssembler::new(source.clone(), fast_config())
        .assemble(&owner())
        .await
        .unwrap()
        .artifact;
    let file = artifact.to_json_bytes().unwrap();

    let target = Arc::new(MemoryDocumentStore::new());
    let orchestrator = RestoreOrchestrator::new(target.clone(), fast_config());
    let summary = orchestrator
        .restore(&file, &owner(), &RestoreControl::new())
        .await
        .unwrap();

    assert_eq!(summary.restored, 2);
    assert_eq!(summary.errored, 0);
    assert!(summary.is_clean());
    assert_eq!(
        summary.states,
        vec![
            RestoreState::Parsed,
            RestoreState::Validated,
            RestoreState::Restoring,
            RestoreState::Completed,
        ]
    );

    let tenant = TenantId::from("u1");
    let mut expected = source.snapshot().remove(&tenant).unwrap();
    expected.remove(&CollectionName::from("frames"));
    let restored = target.snapshot().remove(&tenant).unwrap();
    assert_eq!(restored, expected);
    assert!(!target.snapshot().contains_key(&TenantId::from("u2")));
}

#[tokio::test]
async fn restoring_twice_yields_the_same_state() {
    let target = Arc::new(MemoryDocumentStore::new());
    let orchestrator = RestoreOrchestrator::new(target.clone(), fast_config());
    let file = bytes(&numbered_artifact("products", 20));

    orchestrator
        .restore(&file, &owner(), &RestoreControl::new())
        .await
        .unwrap();
    let first = target.snapshot();
    orchestrator
        .restore(&file, &owner(), &RestoreControl::new())
        .await
        .unwrap();
    assert_eq!(target.snapshot(), first);
}

#[tokio::test]
async fn restore_merges_into_existing_documents() {
    let target = Arc::new(MemoryDocumentStore::new());
    let mut existing = Document::new();
    existing.insert("name".into(), "old".into());
    existing.insert("localNote".into(), "keep me".into());
    seed(target.as_ref(), "u1", "products", "p1", existing).await;

    let file = bytes(&json!({
        "metadata": {"ownerId": "u1", "collections": ["products"]},
        "products": {"p1": {"name": "new"}},
    }));
    RestoreOrchestrator::new(target.clone(), fast_config())
        .restore(&file, &owner(), &RestoreControl::new())
        .await
        .unwrap();

    let doc = target
        .get_document(&DocumentKey::new("u1", "products", "p1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc["name"], Value::from("new"));
    assert_eq!(doc["localNote"], Value::from("keep me"));
}

#[tokio::test]
async fn legacy_values_are_normalized_on_restore() {
    let target = Arc::new(MemoryDocumentStore::new());
    let file = bytes(&json!({
        "metadata": {"ownerId": "u1", "collections": ["lensInventory"]},
        "lensInventory": {
            "l1": {
                "qty": "5",
                "sph": "not-a-number",
                "createdAt": {"seconds": 1_700_000_000, "nanoseconds": 0},
                "updatedAt": 1_700_000_000_000_i64,
                "powerInventory": {"-1.00_0.00": {"sph": "-1", "cyl": "", "quantity": "3"}},
            },
        },
    }));
    RestoreOrchestrator::new(target.clone(), fast_config())
        .restore(&file, &owner(), &RestoreControl::new())
        .await
        .unwrap();

    let doc = target
        .get_document(&DocumentKey::new("u1", "lensInventory", "l1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc["qty"], Value::int(5));
    assert_eq!(doc["sph"], Value::from("not-a-number"));
    assert_eq!(doc["createdAt"], Value::Timestamp(instant()));
    assert_eq!(doc["updatedAt"], Value::Timestamp(instant()));
    let entry = doc["powerInventory"].as_map().unwrap()["-1.00_0.00"]
        .as_map()
        .unwrap()
        .clone();
    assert_eq!(entry["sph"], Value::float(-1.0));
    assert_eq!(entry["cyl"], Value::float(0.0));
    assert_eq!(entry["quantity"], Value::int(3));
}

// -- Admission ---------------------------------------------------------------

#[tokio::test]
async fn foreign_backup_is_rejected_without_writes() {
    let target = Arc::new(MemoryDocumentStore::new());
    let orchestrator = RestoreOrchestrator::new(target.clone(), fast_config());
    let file = bytes(&numbered_artifact("products", 5));

    let err = orchestrator
        .restore(
            &file,
            &Principal::new("u2", "owner@shop.test"),
            &RestoreControl::new(),
        )
        .await
        .unwrap_err();

    let (backup_owner, requester, errors) = match err {
        RestoreError::Ownership {
            backup_owner,
            requester,
            errors,
        } => (backup_owner, requester, errors),
        other => panic!("expected ownership error, got {other}"),
    };
    assert!(backup_owner.contains("u1"));
    assert!(requester.contains("u2"));
    assert!(!errors.is_empty());
    assert!(target.is_empty());
}

#[tokio::test]
async fn backup_without_owner_is_rejected_for_everyone() {
    let target = Arc::new(MemoryDocumentStore::new());
    let orchestrator = RestoreOrchestrator::new(target.clone(), fast_config());
    let mut artifact = numbered_artifact("products", 3);
    artifact["metadata"]
        .as_object_mut()
        .unwrap()
        .remove("ownerId");

    let err = orchestrator
        .restore(&bytes(&artifact), &owner(), &RestoreControl::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RestoreError::Ownership { .. }));
    assert!(target.is_empty());
}

#[tokio::test]
async fn malformed_backup_is_a_parse_error_without_writes() {
    let target = Arc::new(MemoryDocumentStore::new());
    let orchestrator = RestoreOrchestrator::new(target.clone(), fast_config());

    for file in [
        bytes(&json!({"metadata": {"ownerId": "u1"}, "products": {"p1": {}}})),
        bytes(&json!({"metadata": {"ownerId": "u1", "collections": null}})),
        b"{ not json".to_vec(),
    ] {
        let err = orchestrator
            .restore(&file, &owner(), &RestoreControl::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RestoreError::Parse(_)), "{err}");
    }
    assert!(target.is_empty());
}

// -- Failure isolation -------------------------------------------------------

#[tokio::test]
async fn one_failing_document_does_not_stop_the_rest() {
    let store = Arc::new(FlakyStore {
        fail_ids: HashSet::from(["doc-042".to_owned()]),
        ..FlakyStore::default()
    });
    let orchestrator = RestoreOrchestrator::new(store.clone(), fast_config());

    let summary = orchestrator
        .restore(
            &bytes(&numbered_artifact("products", 100)),
            &owner(),
            &RestoreControl::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.restored, 99);
    assert_eq!(summary.errored, 1);
    assert_eq!(summary.states.last(), Some(&RestoreState::Completed));
    assert_eq!(summary.collections[0].failures[0].id.as_str(), "doc-042");

    // Permanent errors are not retried.
    let attempted = store.attempted();
    assert_eq!(attempted.len(), 100);
    for i in 43..100 {
        let id = format!("doc-{i:03}");
        assert!(attempted.contains(&id), "{id} was never attempted");
        assert!(
            store
                .inner
                .get_document(&DocumentKey::new("u1", "products", id.as_str()))
                .await
                .unwrap()
                .is_some()
        );
    }
}

#[tokio::test]
async fn transient_write_failures_are_retried() {
    let store = Arc::new(FlakyStore {
        transient_failures: AtomicUsize::new(3),
        ..FlakyStore::default()
    });
    let config = BackupConfig {
        max_concurrent_writes: 1,
        ..fast_config()
    };

    let summary = RestoreOrchestrator::new(store.clone(), config)
        .restore(
            &bytes(&numbered_artifact("products", 5)),
            &owner(),
            &RestoreControl::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.restored, 5);
    assert_eq!(summary.errored, 0);
    assert_eq!(store.attempted().len(), 8);
}

#[tokio::test]
async fn persistent_transient_failure_counts_as_errored() {
    let store = Arc::new(FlakyStore {
        transient_failures: AtomicUsize::new(usize::MAX),
        ..FlakyStore::default()
    });
    let config = BackupConfig {
        max_retries: 2,
        ..fast_config()
    };

    let summary = RestoreOrchestrator::new(store.clone(), config)
        .restore(
            &bytes(&numbered_artifact("products", 2)),
            &owner(),
            &RestoreControl::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.errored, 2);
    assert_eq!(store.attempted().len(), 6);
    assert_eq!(summary.states.last(), Some(&RestoreState::Completed));
}

// -- Cancellation and progress ---------------------------------------------

#[tokio::test]
async fn cancelled_restore_completes_with_partial_counts() {
    let cancel = CancellationToken::new();
    let store = Arc::new(FlakyStore {
        cancel_after: Some((2, cancel.clone())),
        ..FlakyStore::default()
    });
    let config = BackupConfig {
        max_concurrent_writes: 1,
        ..fast_config()
    };
    let mut artifact = numbered_artifact("products", 5);
    artifact["metadata"]["collections"] = json!(["products", "customers"]);
    artifact["customers"] = numbered_artifact("customers", 5)["customers"].clone();

    let summary = RestoreOrchestrator::new(store.clone(), config)
        .restore(
            &bytes(&artifact),
            &owner(),
            &RestoreControl::new().with_cancel(cancel),
        )
        .await
        .unwrap();

    assert!(summary.cancelled);
    assert!(!summary.is_clean());
    assert_eq!(summary.restored, 2);
    assert_eq!(summary.not_attempted, 8);
    assert_eq!(summary.collections[1].not_attempted, 5);
    assert_eq!(summary.states.last(), Some(&RestoreState::Completed));
    assert_eq!(store.inner.len(), 2);
}

#[tokio::test]
async fn progress_is_reported_every_interval_and_per_collection() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let config = BackupConfig {
        progress_interval: 10,
        ..fast_config()
    };
    let control = RestoreControl::new().with_progress(tx);

    RestoreOrchestrator::new(Arc::new(MemoryDocumentStore::new()), config)
        .restore(&bytes(&numbered_artifact("products", 100)), &owner(), &control)
        .await
        .unwrap();
    drop(control);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert_eq!(events.len(), 11);
    let last = events.last().unwrap();
    assert_eq!(last.collections_done, 1);
    assert_eq!(last.collections_total, 1);
    assert_eq!(last.restored, 100);
    assert_eq!(last.collection.as_str(), "products");
}

// -- Tenant lock -------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn restore_is_refused_while_the_tenant_is_locked() {
    let lock = Arc::new(MemoryTenantLock::new());
    let target = Arc::new(MemoryDocumentStore::new());
    let config = BackupConfig {
        lock_timeout: Duration::from_millis(200),
        ..fast_config()
    };
    let orchestrator = RestoreOrchestrator::new(target.clone(), config).with_lock(lock.clone());
    let file = bytes(&numbered_artifact("products", 3));
    let tenant = TenantId::new("u1");

    let held = lock
        .acquire(&tenant, Duration::from_secs(60), Duration::ZERO)
        .await
        .unwrap();
    let err = orchestrator
        .restore(&file, &owner(), &RestoreControl::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RestoreError::Busy { .. }));
    assert!(target.is_empty());

    held.release().await.unwrap();
    let summary = orchestrator
        .restore(&file, &owner(), &RestoreControl::new())
        .await
        .unwrap();
    assert_eq!(summary.restored, 3);
    assert!(!lock.is_locked(&tenant), "lock must be released after completion");
}

#[tokio::test(start_paused = true)]
async fn lock_is_kept_alive_through_a_collection_longer_than_its_ttl() {
    let store = Arc::new(FlakyStore {
        delay: Duration::from_millis(100),
        ..FlakyStore::default()
    });
    let config = BackupConfig {
        max_concurrent_writes: 1,
        lock_ttl: Duration::from_secs(1),
        ..fast_config()
    };
    let orchestrator =
        RestoreOrchestrator::new(store.clone(), config).with_lock(Arc::new(MemoryTenantLock::new()));
    let file = bytes(&numbered_artifact("products", 30));

    // One collection takes three seconds to write, three times the lease.
    let (owner_a, owner_b) = (owner(), owner());
    let (control_a, control_b) = (RestoreControl::new(), RestoreControl::new());
    let (first, second) = tokio::join!(
        orchestrator.restore(&file, &owner_a, &control_a),
        orchestrator.restore(&file, &owner_b, &control_b),
    );
    for summary in [first.unwrap(), second.unwrap()] {
        assert_eq!(summary.restored, 30);
        assert!(!summary.lock_lost);
        assert!(summary.is_clean());
    }
    assert_eq!(store.attempted().len(), 60);
    assert_eq!(store.max_in_flight.load(Ordering::SeqCst), 1);
}

/// Lock whose leases cannot be extended, as if each had already been taken over.
struct ExpiringLock {
    released: Arc<AtomicUsize>,
}

struct ExpiringGuard {
    released: Arc<AtomicUsize>,
}

#[async_trait]
impl LockGuard for ExpiringGuard {
    async fn extend(&self, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::LockExpired("restore:u1".into()))
    }

    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl TenantLock for ExpiringLock {
    async fn acquire(
        &self,
        _tenant: &TenantId,
        _ttl: Duration,
        _timeout: Duration,
    ) -> Result<Box<dyn LockGuard>, StoreError> {
        Ok(Box::new(ExpiringGuard {
            released: Arc::clone(&self.released),
        }))
    }
}

#[tokio::test(start_paused = true)]
async fn losing_the_lock_stops_further_writes() {
    let store = Arc::new(FlakyStore {
        delay: Duration::from_millis(50),
        ..FlakyStore::default()
    });
    let released = Arc::new(AtomicUsize::new(0));
    let config = BackupConfig {
        max_concurrent_writes: 1,
        lock_ttl: Duration::from_millis(300),
        ..fast_config()
    };
    let orchestrator = RestoreOrchestrator::new(store.clone(), config).with_lock(Arc::new(
        ExpiringLock {
            released: Arc::clone(&released),
        },
    ));

    let summary = orchestrator
        .restore(
            &bytes(&numbered_artifact("products", 20)),
            &owner(),
            &RestoreControl::new(),
        )
        .await
        .unwrap();

    // The first extension is due after 100ms, by which time about two writes finished.
    assert!(summary.lock_lost);
    assert!(!summary.cancelled, "caller did not cancel");
    assert!(summary.restored >= 1 && summary.restored < 20);
    assert_eq!(summary.restored + summary.not_attempted, 20);
    assert_eq!(store.attempted().len(), summary.restored);
    assert!(!summary.is_clean());
    assert!(summary.warnings.iter().any(|w| w.contains("lock") && w.contains("lost")));
    assert_eq!(summary.states.last(), Some(&RestoreState::Completed));
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_restores_of_one_tenant_do_not_interleave() {
    let store = Arc::new(FlakyStore {
        delay: Duration::from_millis(10),
        ..FlakyStore::default()
    });
    let config = BackupConfig {
        max_concurrent_writes: 1,
        ..fast_config()
    };
    let orchestrator = Arc::new(
        RestoreOrchestrator::new(store.clone(), config)
            .with_lock(Arc::new(MemoryTenantLock::new())),
    );
    let file = Arc::new(bytes(&numbered_artifact("products", 5)));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let orchestrator = Arc::clone(&orchestrator);
            let file = Arc::clone(&file);
            tokio::spawn(async move {
                orchestrator
                    .restore(&file, &owner(), &RestoreControl::new())
                    .await
            })
        })
        .collect();
    for handle in handles {
        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.restored, 5);
    }

    assert_eq!(store.attempted().len(), 10);
    assert_eq!(store.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn in_memory_artifact_can_be_restored_directly() {
    let source = Arc::new(MemoryDocumentStore::new());
    seed_source(&source).await;
    let artifact: Artifact = BackupAssembler::new(source, fast_config())
        .assemble(&owner())
        .await
        .unwrap()
        .artifact;

    let target = Arc::new(MemoryDocumentStore::new());
    let summary = RestoreOrchestrator::new(target.clone(), fast_config())
        .restore_artifact(&artifact, &owner(), &RestoreControl::new())
        .await
        .unwrap();
    assert_eq!(summary.restored, 2);
    assert_eq!(target.len(), 2);
}
