use std::future::Future;

use super::{make_account, make_submission, make_task, make_transaction, TestResult};
use crate::record::TransactionKind;
use crate::{LedgerStorage, StorageError};

pub(super) async fn run_init_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "init",
        "fresh_storage_is_empty",
        fresh_storage_is_empty(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "insert_account_fields_preserved",
        insert_account_fields_preserved(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "duplicate_account_id_rejected",
        duplicate_account_id_rejected(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "duplicate_transaction_id_rejected",
        duplicate_transaction_id_rejected(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "lists_preserve_insertion_order",
        lists_preserve_insertion_order(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "lookups_by_email_and_referral_code",
        lookups_by_email_and_referral_code(factory).await,
    ));
    results.push(TestResult::from_result(
        "init",
        "find_submission_by_pair",
        find_submission_by_pair(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn fresh_storage_is_empty<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let accounts = s.list_accounts().await.map_err(|e| e.to_string())?;
    let tasks = s.list_tasks().await.map_err(|e| e.to_string())?;
    if !accounts.is_empty() || !tasks.is_empty() {
        return Err(format!(
            "expected empty storage, got {} accounts and {} tasks",
            accounts.len(),
            tasks.len()
        ));
    }
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let count = s
        .count_accounts(&mut snap)
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    if count != 0 {
        return Err(format!("expected count_accounts 0, got {count}"));
    }
    Ok(())
}

async fn insert_account_fields_preserved<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut account = make_account("a1");
    account.referrer_id = Some("a0".to_string());

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.insert_account(&mut snap, account.clone())
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let stored = s.get_account("a1").await.map_err(|e| e.to_string())?;
    if stored != account {
        return Err(format!("expected {:?}, got {:?}", account, stored));
    }
    Ok(())
}

async fn duplicate_account_id_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
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
    let result = s.insert_account(&mut snap, make_account("a1")).await;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    match result {
        Err(StorageError::AlreadyExists { .. }) => Ok(()),
        other => Err(format!("expected AlreadyExists, got {:?}", other)),
    }
}

async fn duplicate_transaction_id_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
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
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let result = s
        .insert_transaction(
            &mut snap,
            make_transaction("t1", "a2", TransactionKind::Withdrawal),
        )
        .await;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    match result {
        Err(StorageError::AlreadyExists { .. }) => Ok(()),
        other => Err(format!("expected AlreadyExists, got {:?}", other)),
    }
}

async fn lists_preserve_insertion_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let ids = ["t-c", "t-a", "t-b"];
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    for id in ids {
        s.insert_task(&mut snap, make_task(id))
            .await
            .map_err(|e| e.to_string())?;
    }
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let listed: Vec<String> = s
        .list_tasks()
        .await
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|t| t.id)
        .collect();
    if listed != ids {
        return Err(format!("expected order {:?}, got {:?}", ids, listed));
    }
    Ok(())
}

async fn lookups_by_email_and_referral_code<S, F, Fut>(factory: &F) -> Result<(), String>
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
    s.insert_account(&mut snap, make_account("a2"))
        .await
        .map_err(|e| e.to_string())?;

    let by_email = s
        .find_account_by_email(&mut snap, "a2@example.com")
        .await
        .map_err(|e| e.to_string())?;
    let by_code = s
        .find_account_by_referral_code(&mut snap, "REF-a1")
        .await
        .map_err(|e| e.to_string())?;
    let missing = s
        .find_account_by_referral_code(&mut snap, "NOPE")
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    if by_email.map(|a| a.id).as_deref() != Some("a2") {
        return Err("email lookup did not return a2".to_string());
    }
    if by_code.map(|a| a.id).as_deref() != Some("a1") {
        return Err("referral code lookup did not return a1".to_string());
    }
    if missing.is_some() {
        return Err("unknown referral code matched an account".to_string());
    }
    Ok(())
}

async fn find_submission_by_pair<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.insert_submission(&mut snap, make_submission("s1", "a1", "t1"))
        .await
        .map_err(|e| e.to_string())?;
    s.insert_submission(&mut snap, make_submission("s2", "a1", "t2"))
        .await
        .map_err(|e| e.to_string())?;

    let hit = s
        .find_submission(&mut snap, "a1", "t2")
        .await
        .map_err(|e| e.to_string())?;
    let miss = s
        .find_submission(&mut snap, "a2", "t1")
        .await
        .map_err(|e| e.to_string())?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    if hit.map(|sub| sub.id).as_deref() != Some("s2") {
        return Err("expected (a1, t2) to resolve to s2".to_string());
    }
    if miss.is_some() {
        return Err("expected no submission for (a2, t1)".to_string());
    }
    Ok(())
}
