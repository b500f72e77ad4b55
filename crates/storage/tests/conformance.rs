//! Runs the storage conformance suite against both shipped durable stores.

use taskripple_storage::conformance::run_conformance_suite;
use taskripple_storage::{
    AccountStatus, CollectionStorage, JsonFileStore, LedgerStorage, MemoryStore, Role,
};

#[tokio::test]
async fn memory_store_conformance() {
    let report = run_conformance_suite(|| async {
        CollectionStorage::open(MemoryStore::new())
            .await
            .expect("open memory storage")
    })
    .await;
    assert!(report.total > 0);
    assert!(report.failed == 0, "{report}");
}

#[tokio::test]
async fn json_file_store_conformance() {
    let root = tempfile::tempdir().expect("tempdir");
    let counter = std::sync::atomic::AtomicUsize::new(0);
    let report = run_conformance_suite(|| {
        let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let dir = root.path().join(format!("run-{n}"));
        async move {
            let store = JsonFileStore::open(dir).await.expect("open json store");
            CollectionStorage::open(store)
                .await
                .expect("open json storage")
        }
    })
    .await;
    assert!(report.failed == 0, "{report}");
}

#[tokio::test]
async fn json_file_store_survives_reopen() {
    let root = tempfile::tempdir().expect("tempdir");
    {
        let store = JsonFileStore::open(root.path()).await.unwrap();
        let storage = CollectionStorage::open(store).await.unwrap();
        let mut snap = storage.begin_snapshot().await.unwrap();
        storage
            .insert_account(
                &mut snap,
                taskripple_storage::AccountRecord {
                    id: "admin-001".to_string(),
                    full_name: "Super Admin".to_string(),
                    email: "admin@example.com".to_string(),
                    phone: "0000000000".to_string(),
                    secret: "admin123".to_string(),
                    role: Role::Admin,
                    status: AccountStatus::Active,
                    balance: rust_decimal::Decimal::new(1250, 2),
                    referrer_id: None,
                    referral_code: "ADMIN001".to_string(),
                    created_at: "2026-01-01T00:00:00Z".to_string(),
                },
            )
            .await
            .unwrap();
        storage.commit_snapshot(snap).await.unwrap();
    }

    let store = JsonFileStore::open(root.path()).await.unwrap();
    let storage = CollectionStorage::open(store).await.unwrap();
    let admin = storage.get_account("admin-001").await.unwrap();
    assert_eq!(admin.role, Role::Admin);
    assert_eq!(admin.balance.to_string(), "12.50");
}
