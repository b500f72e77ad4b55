use std::future::Future;

use super::{make_account, TestResult};
use crate::{LedgerStorage, StorageError, SubmissionFilter, TransactionFilter};

pub(super) async fn run_error_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "error",
        "get_missing_records_not_found",
        get_missing_records_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "get_for_update_missing_records_not_found",
        get_for_update_missing_records_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "update_missing_account_not_found",
        update_missing_account_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "delete_missing_task_returns_false",
        delete_missing_task_returns_false(factory).await,
    ));
    results.push(TestResult::from_result(
        "error",
        "list_queries_empty_on_fresh_storage",
        list_queries_empty_on_fresh_storage(factory).await,
    ));

    results
}

fn expect_not_found<T: std::fmt::Debug>(
    what: &str,
    result: Result<T, StorageError>,
) -> Result<(), String> {
    match result {
        Err(StorageError::NotFound { .. }) => Ok(()),
        other => Err(format!("{what}: expected NotFound, got {:?}", other)),
    }
}

async fn get_missing_records_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    expect_not_found("get_account", s.get_account("nope").await)?;
    expect_not_found("get_task", s.get_task("nope").await)?;
    expect_not_found("get_submission", s.get_submission("nope").await)?;
    expect_not_found("get_transaction", s.get_transaction("nope").await)?;
    Ok(())
}

async fn get_for_update_missing_records_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let outcome = async {
        expect_not_found(
            "get_account_for_update",
            s.get_account_for_update(&mut snap, "nope").await,
        )?;
        expect_not_found(
            "get_task_for_update",
            s.get_task_for_update(&mut snap, "nope").await,
        )?;
        expect_not_found(
            "get_submission_for_update",
            s.get_submission_for_update(&mut snap, "nope").await,
        )?;
        expect_not_found(
            "get_transaction_for_update",
            s.get_transaction_for_update(&mut snap, "nope").await,
        )
    }
    .await;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    outcome
}

async fn update_missing_account_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s.update_account(&mut snap, make_account("ghost")).await;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    expect_not_found("update_account", result)
}

async fn delete_missing_task_returns_false<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let removed = s
        .delete_task(&mut snap, "nope")
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    if removed {
        return Err("delete_task reported removing a task that never existed".to_string());
    }
    Ok(())
}

async fn list_queries_empty_on_fresh_storage<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let txs = s
        .list_transactions(&TransactionFilter::all().user("nobody"))
        .await
        .map_err(|e| e.to_string())?;
    let subs = s
        .list_submissions(&SubmissionFilter::all())
        .await
        .map_err(|e| e.to_string())?;
    if !txs.is_empty() || !subs.is_empty() {
        return Err(format!(
            "expected empty listings, got {} transactions and {} submissions",
            txs.len(),
            subs.len()
        ));
    }
    Ok(())
}
