use async_trait::async_trait;

use crate::error::StorageError;
use crate::filter::{SubmissionFilter, TransactionFilter};
use crate::record::{AccountRecord, SubmissionRecord, TaskRecord, TransactionRecord};

/// The storage trait for the ledger.
///
/// A `LedgerStorage` implementation provides transactional storage for
/// accounts, tasks, submissions, and transactions.
///
/// ## Snapshot Semantics
///
/// All mutating operations take `&mut Self::Snapshot`, a type representing an
/// in-progress transaction. The lifecycle is:
///
/// 1. `begin_snapshot()` - start a transaction, returns a `Snapshot`
/// 2. Call reads and mutating methods with `&mut snapshot`
/// 3. `commit_snapshot(snapshot)` - commit and consume the transaction
///    OR `abort_snapshot(snapshot)` - roll back and consume the transaction
///
/// If a `Snapshot` is dropped without committing, its mutations MUST be
/// discarded.
///
/// ## Single Writer
///
/// At most one snapshot is open at a time. `begin_snapshot` waits until the
/// previous snapshot is committed, aborted, or dropped. A task must never
/// open a second snapshot while holding one.
///
/// ## Reads
///
/// The query methods outside a snapshot observe the last committed state.
/// They never see the effects of an open snapshot.
#[async_trait]
pub trait LedgerStorage: Send + Sync + 'static {
    /// The snapshot (transaction) type used by this storage backend.
    type Snapshot: Send;

    // ── Snapshot lifecycle ────────────────────────────────────────────────────

    async fn begin_snapshot(&self) -> Result<Self::Snapshot, StorageError>;

    /// Commit a snapshot, making all mutations durable and visible.
    async fn commit_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    /// Abort (roll back) a snapshot, discarding all mutations.
    async fn abort_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    // ── Accounts (within snapshot) ───────────────────────────────────────────

    /// Returns `Err(StorageError::AlreadyExists)` if the id is taken.
    async fn insert_account(
        &self,
        snapshot: &mut Self::Snapshot,
        record: AccountRecord,
    ) -> Result<(), StorageError>;

    /// Returns `Err(StorageError::NotFound)` if the account does not exist.
    async fn get_account_for_update(
        &self,
        snapshot: &mut Self::Snapshot,
        id: &str,
    ) -> Result<AccountRecord, StorageError>;

    async fn find_account_by_email(
        &self,
        snapshot: &mut Self::Snapshot,
        email: &str,
    ) -> Result<Option<AccountRecord>, StorageError>;

    async fn find_account_by_referral_code(
        &self,
        snapshot: &mut Self::Snapshot,
        code: &str,
    ) -> Result<Option<AccountRecord>, StorageError>;

    async fn count_accounts(&self, snapshot: &mut Self::Snapshot) -> Result<usize, StorageError>;

    /// Replace the stored account with the same id.
    ///
    /// Returns `Err(StorageError::NotFound)` if the account does not exist.
    async fn update_account(
        &self,
        snapshot: &mut Self::Snapshot,
        record: AccountRecord,
    ) -> Result<(), StorageError>;

    // ── Tasks (within snapshot) ──────────────────────────────────────────────

    async fn insert_task(
        &self,
        snapshot: &mut Self::Snapshot,
        record: TaskRecord,
    ) -> Result<(), StorageError>;

    async fn get_task_for_update(
        &self,
        snapshot: &mut Self::Snapshot,
        id: &str,
    ) -> Result<TaskRecord, StorageError>;

    /// Remove a task. Returns `false` if there was nothing to remove.
    async fn delete_task(
        &self,
        snapshot: &mut Self::Snapshot,
        id: &str,
    ) -> Result<bool, StorageError>;

    // ── Submissions (within snapshot) ────────────────────────────────────────

    async fn insert_submission(
        &self,
        snapshot: &mut Self::Snapshot,
        record: SubmissionRecord,
    ) -> Result<(), StorageError>;

    async fn get_submission_for_update(
        &self,
        snapshot: &mut Self::Snapshot,
        id: &str,
    ) -> Result<SubmissionRecord, StorageError>;

    /// Find the submission for a (user, task) pair, whatever its status.
    async fn find_submission(
        &self,
        snapshot: &mut Self::Snapshot,
        user_id: &str,
        task_id: &str,
    ) -> Result<Option<SubmissionRecord>, StorageError>;

    async fn update_submission(
        &self,
        snapshot: &mut Self::Snapshot,
        record: SubmissionRecord,
    ) -> Result<(), StorageError>;

    // ── Transactions (within snapshot) ───────────────────────────────────────

    async fn insert_transaction(
        &self,
        snapshot: &mut Self::Snapshot,
        record: TransactionRecord,
    ) -> Result<(), StorageError>;

    async fn get_transaction_for_update(
        &self,
        snapshot: &mut Self::Snapshot,
        id: &str,
    ) -> Result<TransactionRecord, StorageError>;

    async fn find_transactions_for_update(
        &self,
        snapshot: &mut Self::Snapshot,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>, StorageError>;

    async fn update_transaction(
        &self,
        snapshot: &mut Self::Snapshot,
        record: TransactionRecord,
    ) -> Result<(), StorageError>;

    // ── Query operations (committed state) ───────────────────────────────────

    async fn get_account(&self, id: &str) -> Result<AccountRecord, StorageError>;

    /// All accounts in registration order.
    async fn list_accounts(&self) -> Result<Vec<AccountRecord>, StorageError>;

    async fn get_task(&self, id: &str) -> Result<TaskRecord, StorageError>;

    /// All tasks in insertion order.
    async fn list_tasks(&self) -> Result<Vec<TaskRecord>, StorageError>;

    async fn get_submission(&self, id: &str) -> Result<SubmissionRecord, StorageError>;

    /// Matching submissions in insertion order.
    async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionRecord>, StorageError>;

    async fn get_transaction(&self, id: &str) -> Result<TransactionRecord, StorageError>;

    /// Matching transactions in insertion order.
    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>, StorageError>;
}
