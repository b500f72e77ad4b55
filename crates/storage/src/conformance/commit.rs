use std::future::Future;

use rust_decimal::Decimal;

use super::{make_account, make_submission, make_transaction, TestResult};
use crate::record::{SubmissionStatus, TransactionKind, TransactionStatus};
use crate::{LedgerStorage, TransactionFilter};

pub(super) async fn run_commit_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "commit",
        "balance_and_transaction_visible_after_commit",
        balance_and_transaction_visible_after_commit(factory).await,
    ));
    results.push(TestResult::from_result(
        "commit",
        "balance_and_transaction_invisible_after_abort",
        balance_and_transaction_invisible_after_abort(factory).await,
    ));
    results.push(TestResult::from_result(
        "commit",
        "submission_and_reward_commit_together",
        submission_and_reward_commit_together(factory).await,
    ));
    results.push(TestResult::from_result(
        "commit",
        "multi_account_fan_out_all_or_nothing",
        multi_account_fan_out_all_or_nothing(factory).await,
    ));
    results.push(TestResult::from_result(
        "commit",
        "transaction_update_fields_preserved",
        transaction_update_fields_preserved(factory).await,
    ));

    results
}

/// Seed one committed account.
async fn seed_account<S: LedgerStorage>(s: &S, id: &str) -> Result<(), String> {
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.insert_account(&mut snap, make_account(id))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())
}

/// Credit an account by 5 and record the matching transaction in one snapshot.
async fn credit_in_snapshot<S: LedgerStorage>(
    s: &S,
    snap: &mut S::Snapshot,
    account_id: &str,
    tx_id: &str,
) -> Result<(), String> {
    let mut account = s
        .get_account_for_update(snap, account_id)
        .await
        .map_err(|e| e.to_string())?;
    account.balance += Decimal::from(5);
    s.update_account(snap, account)
        .await
        .map_err(|e| e.to_string())?;
    let mut tx = make_transaction(tx_id, account_id, TransactionKind::ReferralCommission);
    tx.status = TransactionStatus::Completed;
    s.insert_transaction(snap, tx)
        .await
        .map_err(|e| e.to_string())
}

async fn balance_and_transaction_visible_after_commit<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_account(&s, "a1").await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    credit_in_snapshot(&s, &mut snap, "a1", "t1").await?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let account = s.get_account("a1").await.map_err(|e| e.to_string())?;
    if account.balance != Decimal::from(5) {
        return Err(format!("expected balance 5, got {}", account.balance));
    }
    s.get_transaction("t1")
        .await
        .map_err(|e| format!("transaction missing after commit: {e}"))?;
    Ok(())
}

async fn balance_and_transaction_invisible_after_abort<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_account(&s, "a1").await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    credit_in_snapshot(&s, &mut snap, "a1", "t1").await?;
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;

    let account = s.get_account("a1").await.map_err(|e| e.to_string())?;
    if account.balance != Decimal::ZERO {
        return Err(format!("expected balance 0 after abort, got {}", account.balance));
    }
    if s.get_transaction("t1").await.is_ok() {
        return Err("aborted transaction is visible".to_string());
    }
    Ok(())
}

async fn submission_and_reward_commit_together<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_account(&s, "a1").await?;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    s.insert_submission(&mut snap, make_submission("s1", "a1", "task-1"))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let mut sub = s
        .get_submission_for_update(&mut snap, "s1")
        .await
        .map_err(|e| e.to_string())?;
    sub.status = SubmissionStatus::Approved;
    s.update_submission(&mut snap, sub)
        .await
        .map_err(|e| e.to_string())?;
    credit_in_snapshot(&s, &mut snap, "a1", "reward-1").await?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let sub = s.get_submission("s1").await.map_err(|e| e.to_string())?;
    let reward = s.get_transaction("reward-1").await;
    if sub.status != SubmissionStatus::Approved || reward.is_err() {
        return Err(format!(
            "expected approved submission with reward, got {:?} / {:?}",
            sub.status,
            reward.map(|t| t.id)
        ));
    }
    Ok(())
}

async fn multi_account_fan_out_all_or_nothing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let ids = ["u1", "u2", "u3", "u4", "u5"];
    for id in ids {
        seed_account(&s, id).await?;
    }

    // Aborted fan-out: nothing lands.
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    for (i, id) in ids.iter().enumerate() {
        credit_in_snapshot(&s, &mut snap, id, &format!("abort-{i}")).await?;
    }
    s.abort_snapshot(snap).await.map_err(|e| e.to_string())?;
    let txs = s
        .list_transactions(&TransactionFilter::all())
        .await
        .map_err(|e| e.to_string())?;
    if !txs.is_empty() {
        return Err(format!("aborted fan-out left {} transactions", txs.len()));
    }

    // Committed fan-out: everything lands.
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    for (i, id) in ids.iter().enumerate() {
        credit_in_snapshot(&s, &mut snap, id, &format!("fan-{i}")).await?;
    }
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    for id in ids {
        let account = s.get_account(id).await.map_err(|e| e.to_string())?;
        if account.balance != Decimal::from(5) {
            return Err(format!("{id}: expected balance 5, got {}", account.balance));
        }
    }
    let txs = s
        .list_transactions(&TransactionFilter::all().kind(TransactionKind::ReferralCommission))
        .await
        .map_err(|e| e.to_string())?;
    if txs.len() != ids.len() {
        return Err(format!("expected {} commissions, got {}", ids.len(), txs.len()));
    }
    Ok(())
}

async fn transaction_update_fields_preserved<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: LedgerStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let mut tx = make_transaction("t1", "a1", TransactionKind::Withdrawal);
    tx.metadata.payment_ref = Some("PAY-123".to_string());
    s.insert_transaction(&mut snap, tx)
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let mut tx = s
        .get_transaction_for_update(&mut snap, "t1")
        .await
        .map_err(|e| e.to_string())?;
    tx.status = TransactionStatus::Rejected;
    s.update_transaction(&mut snap, tx)
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;

    let stored = s.get_transaction("t1").await.map_err(|e| e.to_string())?;
    if stored.status != TransactionStatus::Rejected {
        return Err(format!("expected Rejected, got {:?}", stored.status));
    }
    if stored.metadata.payment_ref.as_deref() != Some("PAY-123") {
        return Err("payment_ref lost on update".to_string());
    }
    Ok(())
}
