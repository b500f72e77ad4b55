use std::future::Future;

use rust_decimal::Decimal;

use super::{make_account, make_task, make_transaction, TestResult};
use crate::record::{AccountStatus, TransactionKind, TransactionStatus};
use crate::{LedgerStorage, TransactionFilter};

pub(super) async fn run_snapshot_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "snapshot",
        "insert_invisible_before_commit",
        insert_invisible_before_commit(factory).await,
    ));
    results.push(TestResult::from_result(
        "snapshot",
        "insert_visible_inside_snapshot",
        insert_visible_inside_snapshot(factory).await,
    ));
    results.push(TestResult::from_result(
        "snapshot",
        "update_invisible_before_commit",
        update_invisible_before_commit(factory).await,
    ));
    results.push(TestResult::from_result(
        "snapshot",
        "abort_discards_insert",
        abort_discards_insert(factory).await,
    ));
    results.push(TestResult::from_result(
        "snapshot",
        "dropped_snapshot_discards_changes",
        dropped_snapshot_discards_changes(factory).await,
    ));
    results.push(TestResult::from_result(
        "snapshot",
        "sequential_snapshots_see_prior_commits",
        sequential_snapshots_see_prior_commits(factory).await,
    ));
    results.push(TestResult::from_result(
        "snapshot",
        "deleted_task_invisible_after_commit",
        deleted_task_invisible_after_commit(factory).await,
    ));

    results
}

async fn insert_invisible_before_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.insert_account(&mut snap, make_account("a1"))
        .await
        .map_err(|e| e.to_string())?;

    let outside = s.get_account("a1").await;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    if outside.is_ok() {
        return Err("uncommitted account visible to readers".to_string());
    }
    s.get_account("a1")
        .await
        .map_err(|e| format!("committed account not visible: {e}"))?;
    Ok(())
}

async fn insert_visible_inside_snapshot<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.insert_transaction(&mut snap, make_transaction("t1", "a1", TransactionKind::Deposit))
        .await
        .map_err(|e| e.to_string())?;
    let found = s
        .find_transactions_for_update(
            &mut snap,
            &TransactionFilter::all()
                .user("a1")
                .kind(TransactionKind::Deposit)
                .status(TransactionStatus::Pending),
        )
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    if found.len() != 1 {
        return Err(format!(
            "expected own insert visible inside snapshot, found {}",
            found.len()
        ));
    }
    Ok(())
}

async fn update_invisible_before_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.insert_account(&mut snap, make_account("a1"))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let mut account = s
        .get_account_for_update(&mut snap, "a1")
        .await
        .map_err(|e| e.to_string())?;
    account.balance = Decimal::from(10);
    account.status = AccountStatus::Active;
    s.update_account(&mut snap, account)
        .await
        .map_err(|e| e.to_string())?;

    let outside = s.get_account("a1").await.map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    if outside.balance != Decimal::ZERO || outside.status != AccountStatus::Pending {
        return Err(format!(
            "uncommitted update visible: balance {} status {:?}",
            outside.balance, outside.status
        ));
    }
    let after = s.get_account("a1").await.map_err(|e| e.to_string())?;
    if after.balance != Decimal::from(10) {
        return Err(format!("expected balance 10 after commit, got {}", after.balance));
    }
    Ok(())
}

async fn abort_discards_insert<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.insert_task(&mut snap, make_task("t1"))
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    if s.get_task("t1").await.is_ok() {
        return Err("aborted task insert is visible".to_string());
    }
    Ok(())
}

async fn dropped_snapshot_discards_changes<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    {
        let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
        s.insert_account(&mut snap, make_account("a1"))
            .await
            .map_err(|e| e.to_string())?;
        drop(snap);
    }

    // A dropped snapshot must also release the writer.
    let snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    if s.get_account("a1").await.is_ok() {
        return Err("dropped snapshot's insert is visible".to_string());
    }
    Ok(())
}

async fn sequential_snapshots_see_prior_commits<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.insert_account(&mut snap, make_account("a1"))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let seen = s.get_account_for_update(&mut snap, "a1").await;
    let count = s.count_accounts(&mut snap).await;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    seen.map_err(|e| format!("second snapshot cannot see committed account: {e}"))?;
    match count {
        Ok(1) => Ok(()),
        other => Err(format!("expected count_accounts 1, got {:?}", other)),
    }
}

async fn deleted_task_invisible_after_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.insert_task(&mut snap, make_task("t1"))
        .await
        .map_err(|e| e.to_string())?;
    s.insert_task(&mut snap, make_task("t2"))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let removed = s
        .delete_task(&mut snap, "t1")
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    if !removed {
        return Err("delete_task returned false for an existing task".to_string());
    }
    let remaining: Vec<String> = s
        .list_tasks()
        .await
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|t| t.id)
        .collect();
    if remaining != ["t2"] {
        return Err(format!("expected only t2 to remain, got {:?}", remaining));
    }
    Ok(())
}
