use std::future::Future;
use std::sync::Arc;

use rust_decimal::Decimal;

use super::{make_account, TestResult};
use crate::{LedgerStorage, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_increments_never_lost",
        concurrent_increments_never_lost(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_inserts_same_id_exactly_one_wins",
        concurrent_inserts_same_id_exactly_one_wins(factory).await,
    ));

    results
}

// ── Read-modify-write under contention ──────────────────────────────────────

/// N tasks each open a snapshot, read the balance, yield, write balance + 1,
/// and commit. With a single writer the final balance is exactly N.
async fn concurrent_increments_never_lost<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    {
        let mut snap = storage
            .begin_snapshot()
            .await
            .map_err(|e| format!("begin: {e}"))?;
        storage
            .insert_account(&mut snap, make_account("a1"))
            .await
            .map_err(|e| format!("insert: {e}"))?;
        storage
            .commit_snapshot(snap)
            .await
            .map_err(|e| format!("commit seed: {e}"))?;
    }

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            let mut snap = s.begin_snapshot().await?;
            let mut account = s.get_account_for_update(&mut snap, "a1").await?;
            tokio::task::yield_now().await;
            account.balance += Decimal::ONE;
            s.update_account(&mut snap, account).await?;
            s.commit_snapshot(snap).await?;
            Ok::<(), StorageError>(())
        }));
    }

    for handle in handles {
        handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("storage error: {e}"))?;
    }

    let account = storage
        .get_account("a1")
        .await
        .map_err(|e| e.to_string())?;
    if account.balance != Decimal::from(N as u64) {
        return Err(format!(
            "expected balance {N} after {N} increments, got {}",
            account.balance
        ));
    }
    Ok(())
}

// ── Concurrent insertion: exactly one wins ──────────────────────────────────

/// N tasks each attempt to insert the same account id. Exactly one commits;
/// the rest must get AlreadyExists.
async fn concurrent_inserts_same_id_exactly_one_wins<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            let mut snap = s.begin_snapshot().await?;
            match s.insert_account(&mut snap, make_account("dup")).await {
                Ok(()) => {
                    s.commit_snapshot(snap).await?;
                    Ok(true)
                }
                Err(StorageError::AlreadyExists { .. }) => {
                    s.abort_snapshot(snap).await?;
                    Ok(false)
                }
                Err(e) => {
                    let _ = s.abort_snapshot(snap).await;
                    Err(e)
                }
            }
        }));
    }

    let mut winners = 0usize;
    for handle in handles {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        if won {
            winners += 1;
        }
    }

    if winners != 1 {
        return Err(format!("expected exactly 1 winner, got {winners}"));
    }
    Ok(())
}
