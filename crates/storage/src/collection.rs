//! [`LedgerStorage`] over a whole-collection [`DurableStore`].
//!
//! The committed state of all four collections is cached in memory behind
//! a `RwLock`. A snapshot takes the single writer lock, works on a private
//! copy of the collections, and on commit saves every collection it touched
//! before swapping the copy in. Readers only ever see the swapped-in state.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::durable::{Collection, DurableStore};
use crate::error::StorageError;
use crate::filter::{SubmissionFilter, TransactionFilter};
use crate::record::{AccountRecord, Record, SubmissionRecord, TaskRecord, TransactionRecord};
use crate::traits::LedgerStorage;

/// In-memory image of all four collections.
#[derive(Debug, Clone, Default)]
pub struct Collections {
    pub accounts: Vec<AccountRecord>,
    pub tasks: Vec<TaskRecord>,
    pub submissions: Vec<SubmissionRecord>,
    pub transactions: Vec<TransactionRecord>,
}

impl Collections {
    fn encode(&self, collection: Collection) -> Result<Vec<serde_json::Value>, StorageError> {
        match collection {
            Collection::Accounts => encode_records(&self.accounts),
            Collection::Tasks => encode_records(&self.tasks),
            Collection::Submissions => encode_records(&self.submissions),
            Collection::Transactions => encode_records(&self.transactions),
        }
    }
}

/// An open write transaction. Holds the writer lock until consumed or
/// dropped; dropping it discards the working copy.
pub struct CollectionSnapshot {
    writer: OwnedMutexGuard<()>,
    working: Collections,
    dirty: BTreeSet<Collection>,
}

impl CollectionSnapshot {
    fn touch(&mut self, collection: Collection) {
        self.dirty.insert(collection);
    }
}

/// Snapshot-isolated, single-writer storage over a [`DurableStore`].
pub struct CollectionStorage<D> {
    store: D,
    committed: RwLock<Collections>,
    writer: Arc<Mutex<()>>,
}

impl<D: DurableStore> CollectionStorage<D> {
    /// Load every collection from `store` and start serving it.
    pub async fn open(store: D) -> Result<Self, StorageError> {
        let committed = Collections {
            accounts: load_records(&store).await?,
            tasks: load_records(&store).await?,
            submissions: load_records(&store).await?,
            transactions: load_records(&store).await?,
        };
        tracing::debug!(
            accounts = committed.accounts.len(),
            tasks = committed.tasks.len(),
            submissions = committed.submissions.len(),
            transactions = committed.transactions.len(),
            "collections loaded"
        );
        Ok(Self {
            store,
            committed: RwLock::new(committed),
            writer: Arc::new(Mutex::new(())),
        })
    }

    pub fn store(&self) -> &D {
        &self.store
    }

    /// Put back collections that were already saved by a failed commit.
    async fn restore(&self, saved: &[Collection]) {
        let committed = self.committed.read().await;
        for &collection in saved {
            let restored = match committed.encode(collection) {
                Ok(records) => self.store.save(collection, records).await,
                Err(e) => Err(e),
            };
            if let Err(e) = restored {
                tracing::warn!(%collection, error = %e, "failed to restore collection after aborted commit");
            }
        }
    }
}

async fn load_records<R: Record, D: DurableStore>(store: &D) -> Result<Vec<R>, StorageError> {
    store
        .load(R::COLLECTION)
        .await?
        .into_iter()
        .map(|value| {
            serde_json::from_value(value).map_err(|source| StorageError::Serialization {
                collection: R::COLLECTION.name(),
                source,
            })
        })
        .collect()
}

fn encode_records<R: Record>(records: &[R]) -> Result<Vec<serde_json::Value>, StorageError> {
    records
        .iter()
        .map(|r| {
            serde_json::to_value(r).map_err(|source| StorageError::Serialization {
                collection: R::COLLECTION.name(),
                source,
            })
        })
        .collect()
}

fn get_record<R: Record>(records: &[R], id: &str) -> Result<R, StorageError> {
    records
        .iter()
        .find(|r| r.id() == id)
        .cloned()
        .ok_or_else(|| StorageError::not_found(R::COLLECTION.name(), id))
}

fn insert_record<R: Record>(records: &mut Vec<R>, record: R) -> Result<(), StorageError> {
    if records.iter().any(|r| r.id() == record.id()) {
        return Err(StorageError::already_exists(
            R::COLLECTION.name(),
            record.id(),
        ));
    }
    records.push(record);
    Ok(())
}

fn replace_record<R: Record>(records: &mut [R], record: R) -> Result<(), StorageError> {
    let slot = records
        .iter_mut()
        .find(|r| r.id() == record.id())
        .ok_or_else(|| StorageError::not_found(R::COLLECTION.name(), record.id()))?;
    *slot = record;
    Ok(())
}

#[async_trait]
impl<D: DurableStore> LedgerStorage for CollectionStorage<D> {
    type Snapshot = CollectionSnapshot;

    async fn begin_snapshot(&self) -> Result<CollectionSnapshot, StorageError> {
        let writer = self.writer.clone().lock_owned().await;
        let working = self.committed.read().await.clone();
        Ok(CollectionSnapshot {
            writer,
            working,
            dirty: BTreeSet::new(),
        })
    }

    async fn commit_snapshot(&self, snapshot: CollectionSnapshot) -> Result<(), StorageError> {
        let CollectionSnapshot {
            writer,
            working,
            dirty,
        } = snapshot;

        // Encode everything first so a serialization failure saves nothing.
        let mut encoded = Vec::with_capacity(dirty.len());
        for &collection in &dirty {
            encoded.push((collection, working.encode(collection)?));
        }

        let mut saved = Vec::with_capacity(encoded.len());
        for (collection, records) in encoded {
            if let Err(e) = self.store.save(collection, records).await {
                tracing::warn!(%collection, error = %e, "commit failed, restoring saved collections");
                self.restore(&saved).await;
                return Err(e);
            }
            saved.push(collection);
        }

        *self.committed.write().await = working;
        tracing::debug!(collections = ?saved, "snapshot committed");
        drop(writer);
        Ok(())
    }

    async fn abort_snapshot(&self, snapshot: CollectionSnapshot) -> Result<(), StorageError> {
        tracing::debug!(collections = ?snapshot.dirty, "snapshot aborted");
        drop(snapshot);
        Ok(())
    }

    // ── Accounts ─────────────────────────────────────────────────────────────

    async fn insert_account(
        &self,
        snapshot: &mut CollectionSnapshot,
        record: AccountRecord,
    ) -> Result<(), StorageError> {
        insert_record(&mut snapshot.working.accounts, record)?;
        snapshot.touch(Collection::Accounts);
        Ok(())
    }

    async fn get_account_for_update(
        &self,
        snapshot: &mut CollectionSnapshot,
        id: &str,
    ) -> Result<AccountRecord, StorageError> {
        get_record(&snapshot.working.accounts, id)
    }

    async fn find_account_by_email(
        &self,
        snapshot: &mut CollectionSnapshot,
        email: &str,
    ) -> Result<Option<AccountRecord>, StorageError> {
        Ok(snapshot
            .working
            .accounts
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn find_account_by_referral_code(
        &self,
        snapshot: &mut CollectionSnapshot,
        code: &str,
    ) -> Result<Option<AccountRecord>, StorageError> {
        Ok(snapshot
            .working
            .accounts
            .iter()
            .find(|a| a.referral_code == code)
            .cloned())
    }

    async fn count_accounts(&self, snapshot: &mut CollectionSnapshot) -> Result<usize, StorageError> {
        Ok(snapshot.working.accounts.len())
    }

    async fn update_account(
        &self,
        snapshot: &mut CollectionSnapshot,
        record: AccountRecord,
    ) -> Result<(), StorageError> {
        replace_record(&mut snapshot.working.accounts, record)?;
        snapshot.touch(Collection::Accounts);
        Ok(())
    }

    // ── Tasks ────────────────────────────────────────────────────────────────

    async fn insert_task(
        &self,
        snapshot: &mut CollectionSnapshot,
        record: TaskRecord,
    ) -> Result<(), StorageError> {
        insert_record(&mut snapshot.working.tasks, record)?;
        snapshot.touch(Collection::Tasks);
        Ok(())
    }

    async fn get_task_for_update(
        &self,
        snapshot: &mut CollectionSnapshot,
        id: &str,
    ) -> Result<TaskRecord, StorageError> {
        get_record(&snapshot.working.tasks, id)
    }

    async fn delete_task(
        &self,
        snapshot: &mut CollectionSnapshot,
        id: &str,
    ) -> Result<bool, StorageError> {
        let before = snapshot.working.tasks.len();
        snapshot.working.tasks.retain(|t| t.id != id);
        let removed = snapshot.working.tasks.len() != before;
        if removed {
            snapshot.touch(Collection::Tasks);
        }
        Ok(removed)
    }

    // ── Submissions ──────────────────────────────────────────────────────────

    async fn insert_submission(
        &self,
        snapshot: &mut CollectionSnapshot,
        record: SubmissionRecord,
    ) -> Result<(), StorageError> {
        insert_record(&mut snapshot.working.submissions, record)?;
        snapshot.touch(Collection::Submissions);
        Ok(())
    }

    async fn get_submission_for_update(
        &self,
        snapshot: &mut CollectionSnapshot,
        id: &str,
    ) -> Result<SubmissionRecord, StorageError> {
        get_record(&snapshot.working.submissions, id)
    }

    async fn find_submission(
        &self,
        snapshot: &mut CollectionSnapshot,
        user_id: &str,
        task_id: &str,
    ) -> Result<Option<SubmissionRecord>, StorageError> {
        Ok(snapshot
            .working
            .submissions
            .iter()
            .find(|s| s.user_id == user_id && s.task_id == task_id)
            .cloned())
    }

    async fn update_submission(
        &self,
        snapshot: &mut CollectionSnapshot,
        record: SubmissionRecord,
    ) -> Result<(), StorageError> {
        replace_record(&mut snapshot.working.submissions, record)?;
        snapshot.touch(Collection::Submissions);
        Ok(())
    }

    // ── Transactions ─────────────────────────────────────────────────────────

    async fn insert_transaction(
        &self,
        snapshot: &mut CollectionSnapshot,
        record: TransactionRecord,
    ) -> Result<(), StorageError> {
        insert_record(&mut snapshot.working.transactions, record)?;
        snapshot.touch(Collection::Transactions);
        Ok(())
    }

    async fn get_transaction_for_update(
        &self,
        snapshot: &mut CollectionSnapshot,
        id: &str,
    ) -> Result<TransactionRecord, StorageError> {
        get_record(&snapshot.working.transactions, id)
    }

    async fn find_transactions_for_update(
        &self,
        snapshot: &mut CollectionSnapshot,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>, StorageError> {
        Ok(snapshot
            .working
            .transactions
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn update_transaction(
        &self,
        snapshot: &mut CollectionSnapshot,
        record: TransactionRecord,
    ) -> Result<(), StorageError> {
        replace_record(&mut snapshot.working.transactions, record)?;
        snapshot.touch(Collection::Transactions);
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    async fn get_account(&self, id: &str) -> Result<AccountRecord, StorageError> {
        get_record(&self.committed.read().await.accounts, id)
    }

    async fn list_accounts(&self) -> Result<Vec<AccountRecord>, StorageError> {
        Ok(self.committed.read().await.accounts.clone())
    }

    async fn get_task(&self, id: &str) -> Result<TaskRecord, StorageError> {
        get_record(&self.committed.read().await.tasks, id)
    }

    async fn list_tasks(&self) -> Result<Vec<TaskRecord>, StorageError> {
        Ok(self.committed.read().await.tasks.clone())
    }

    async fn get_submission(&self, id: &str) -> Result<SubmissionRecord, StorageError> {
        get_record(&self.committed.read().await.submissions, id)
    }

    async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionRecord>, StorageError> {
        Ok(self
            .committed
            .read()
            .await
            .submissions
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    async fn get_transaction(&self, id: &str) -> Result<TransactionRecord, StorageError> {
        get_record(&self.committed.read().await.transactions, id)
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>, StorageError> {
        Ok(self
            .committed
            .read()
            .await
            .transactions
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use rust_decimal::Decimal;

    use super::*;
    use crate::durable::MemoryStore;
    use crate::record::{AccountStatus, Role, TransactionKind, TransactionMetadata, TransactionStatus};

    /// Wraps a MemoryStore and fails saves of one collection on demand.
    struct FlakyStore {
        inner: MemoryStore,
        fail_on: Collection,
        failing: AtomicBool,
    }

    #[async_trait]
    impl DurableStore for FlakyStore {
        async fn load(
            &self,
            collection: Collection,
        ) -> Result<Vec<serde_json::Value>, StorageError> {
            self.inner.load(collection).await
        }

        async fn save(
            &self,
            collection: Collection,
            records: Vec<serde_json::Value>,
        ) -> Result<(), StorageError> {
            if collection == self.fail_on && self.failing.load(Ordering::SeqCst) {
                return Err(StorageError::Backend("disk full".to_string()));
            }
            self.inner.save(collection, records).await
        }
    }

    fn account(id: &str, balance: i64) -> AccountRecord {
        AccountRecord {
            id: id.to_string(),
            full_name: format!("User {id}"),
            email: format!("{id}@example.com"),
            phone: "555-0100".to_string(),
            secret: "pw".to_string(),
            role: Role::User,
            status: AccountStatus::Active,
            balance: Decimal::from(balance),
            referrer_id: None,
            referral_code: format!("CODE-{id}"),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn credit(id: &str, user_id: &str, amount: i64) -> TransactionRecord {
        TransactionRecord {
            id: id.to_string(),
            user_id: user_id.to_string(),
            kind: TransactionKind::TaskReward,
            amount: Decimal::from(amount),
            status: TransactionStatus::Completed,
            description: "reward".to_string(),
            metadata: TransactionMetadata::default(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn failed_commit_leaves_committed_state_and_store_untouched() {
        let store = FlakyStore {
            inner: MemoryStore::new(),
            fail_on: Collection::Transactions,
            failing: AtomicBool::new(false),
        };
        let storage = CollectionStorage::open(store).await.unwrap();

        let mut snap = storage.begin_snapshot().await.unwrap();
        storage.insert_account(&mut snap, account("a", 0)).await.unwrap();
        storage.commit_snapshot(snap).await.unwrap();

        storage.store().failing.store(true, Ordering::SeqCst);
        let mut snap = storage.begin_snapshot().await.unwrap();
        storage.update_account(&mut snap, account("a", 3)).await.unwrap();
        storage
            .insert_transaction(&mut snap, credit("t1", "a", 3))
            .await
            .unwrap();
        let err = storage.commit_snapshot(snap).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));

        // Visible state unchanged.
        assert_eq!(storage.get_account("a").await.unwrap().balance, Decimal::ZERO);
        assert!(storage.get_transaction("t1").await.is_err());

        // Durable accounts collection restored to the pre-commit contents.
        let persisted = storage
            .store()
            .inner
            .load(Collection::Accounts)
            .await
            .unwrap();
        let persisted: Vec<AccountRecord> = persisted
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect();
        assert_eq!(persisted[0].balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn begin_waits_for_open_snapshot() {
        let storage = Arc::new(CollectionStorage::open(MemoryStore::new()).await.unwrap());
        let first = storage.begin_snapshot().await.unwrap();

        let s = storage.clone();
        let waiter = tokio::spawn(async move {
            let snap = s.begin_snapshot().await.unwrap();
            s.abort_snapshot(snap).await.unwrap();
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        storage.abort_snapshot(first).await.unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), waiter)
            .await
            .expect("second writer never ran")
            .unwrap();
    }
}
