//! Conformance test suite for `LedgerStorage` implementations.
//!
//! This module provides a backend-agnostic test suite that any
//! `LedgerStorage` implementation can run to verify correctness. The suite
//! covers:
//!
//! - **Initialization**: record insertion, duplicate id detection
//! - **Error handling**: correct error variants for missing records
//! - **Snapshot isolation**: uncommitted writes invisible, committed writes visible
//! - **Atomic commit**: all-or-nothing semantics across collections
//! - **Single writer**: concurrent read-modify-write snapshots never lose updates
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty storage instance for each test:
//!
//! ```ignore
//! use taskripple_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn memory_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         CollectionStorage::open(MemoryStore::new()).await.unwrap()
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod commit;
mod concurrent;
mod error;
mod init;
mod snapshot;

use std::fmt;
use std::future::Future;

use rust_decimal::Decimal;

use crate::record::{
    AccountRecord, AccountStatus, ProofType, Role, SubmissionRecord, SubmissionStatus, TaskRecord,
    TransactionKind, TransactionMetadata, TransactionRecord, TransactionStatus,
};
use crate::LedgerStorage;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "init", "snapshot", "commit").
    pub category: String,
    /// Test name (e.g. "insert_account_visible_after_commit").
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// storage instance, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(init::run_init_tests(&factory).await);
    results.extend(error::run_error_tests(&factory).await);
    results.extend(snapshot::run_snapshot_tests(&factory).await);
    results.extend(commit::run_commit_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: record constructors with sensible defaults ──────────────────────

fn make_account(id: &str) -> AccountRecord {
    AccountRecord {
        id: id.to_string(),
        full_name: format!("Account {id}"),
        email: format!("{id}@example.com"),
        phone: "555-0100".to_string(),
        secret: "secret".to_string(),
        role: Role::User,
        status: AccountStatus::Pending,
        balance: Decimal::ZERO,
        referrer_id: None,
        referral_code: format!("REF-{id}"),
        created_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

fn make_task(id: &str) -> TaskRecord {
    TaskRecord {
        id: id.to_string(),
        title: format!("Task {id}"),
        description: "test task".to_string(),
        reward: Decimal::new(150, 2),
        requirements: vec!["do the thing".to_string()],
        proof_type: ProofType::Text,
        created_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

fn make_submission(id: &str, user_id: &str, task_id: &str) -> SubmissionRecord {
    SubmissionRecord {
        id: id.to_string(),
        task_id: task_id.to_string(),
        user_id: user_id.to_string(),
        text_proof: Some("done".to_string()),
        image_proof_ref: None,
        status: SubmissionStatus::Pending,
        reward: Some(Decimal::new(150, 2)),
        submitted_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

fn make_transaction(id: &str, user_id: &str, kind: TransactionKind) -> TransactionRecord {
    TransactionRecord {
        id: id.to_string(),
        user_id: user_id.to_string(),
        kind,
        amount: Decimal::from(5),
        status: TransactionStatus::Pending,
        description: "test transaction".to_string(),
        metadata: TransactionMetadata::default(),
        created_at: "2026-01-01T00:00:00Z".to_string(),
    }
}
