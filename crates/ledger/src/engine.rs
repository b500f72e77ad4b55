//! Ledger engine.
//!
//! The only code that changes an account's balance, and the only code
//! that moves an account through PENDING -> REVIEW -> ACTIVE. Each public
//! operation is one storage snapshot: the transaction status change, every
//! touched account, and every new transaction commit together or not at
//! all.
//!
//! Balances only move when a transaction becomes COMPLETED, so for every
//! account `balance == sum(completed credits) - sum(completed debits)`.
//! [`reconcile`] checks exactly that.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use taskripple_storage::{
    AccountRecord, AccountStatus, LedgerStorage, SubmissionRecord, TransactionFilter,
    TransactionKind, TransactionMetadata, TransactionRecord, TransactionStatus,
};
use tracing::{debug, info};

use crate::atomic::settle;
use crate::commission::{compute_commissions, UplineLink};
use crate::config::{LedgerConfig, MAX_COMMISSION_LEVELS};
use crate::error::{LedgerError, OrMissing};
use crate::ids;

/// Result of approving an activation deposit.
#[derive(Debug, Clone, Serialize)]
pub struct ActivationOutcome {
    pub deposit: TransactionRecord,
    pub account: AccountRecord,
    /// Commission transactions created by the fan-out, level order.
    pub commissions: Vec<TransactionRecord>,
}

/// An account whose stored balance disagrees with its transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discrepancy {
    pub account_id: String,
    pub recorded: Decimal,
    pub expected: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub accounts_checked: usize,
    pub discrepancies: Vec<Discrepancy>,
}

impl ReconcileReport {
    pub fn is_balanced(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

// ── Activation ───────────────────────────────────────────────────────────────

/// Record a PENDING activation deposit for the configured fee and move the
/// account to REVIEW.
pub async fn request_activation<S: LedgerStorage>(
    storage: &S,
    config: &LedgerConfig,
    user_id: &str,
    payment_ref: &str,
    proof_ref: &str,
) -> Result<TransactionRecord, LedgerError> {
    let mut snapshot = storage.begin_snapshot().await?;
    let outcome = request_activation_in(
        storage,
        &mut snapshot,
        config.activation_fee,
        user_id,
        payment_ref,
        proof_ref,
    )
    .await;
    let deposit = settle(storage, snapshot, "request_activation", outcome).await?;
    info!(
        user_id,
        transaction_id = %deposit.id,
        amount = %deposit.amount,
        "activation requested"
    );
    Ok(deposit)
}

async fn request_activation_in<S: LedgerStorage>(
    storage: &S,
    snapshot: &mut S::Snapshot,
    fee: Decimal,
    user_id: &str,
    payment_ref: &str,
    proof_ref: &str,
) -> Result<TransactionRecord, LedgerError> {
    let mut account = load_account(storage, snapshot, user_id).await?;
    match account.status {
        AccountStatus::Pending => {}
        AccountStatus::Review => {
            return Err(LedgerError::ActivationAlreadyPending(user_id.to_string()));
        }
        status => {
            return Err(LedgerError::AccountNotEligible {
                id: user_id.to_string(),
                status,
                reason: "only pending accounts can request activation",
            });
        }
    }

    let pending = storage
        .find_transactions_for_update(
            snapshot,
            &TransactionFilter::all()
                .user(user_id)
                .kind(TransactionKind::Deposit)
                .status(TransactionStatus::Pending),
        )
        .await?;
    if !pending.is_empty() {
        return Err(LedgerError::ActivationAlreadyPending(user_id.to_string()));
    }

    let deposit = TransactionRecord {
        id: ids::new_id(),
        user_id: user_id.to_string(),
        kind: TransactionKind::Deposit,
        amount: fee,
        status: TransactionStatus::Pending,
        description: "Account Activation Fee".to_string(),
        metadata: TransactionMetadata {
            payment_ref: Some(payment_ref.to_string()),
            proof_ref: Some(proof_ref.to_string()),
            ..TransactionMetadata::default()
        },
        created_at: ids::now_rfc3339(),
    };
    storage.insert_transaction(snapshot, deposit.clone()).await?;

    account.status = AccountStatus::Review;
    storage.update_account(snapshot, account).await?;
    Ok(deposit)
}

/// Complete a pending activation deposit, activate its owner, and pay
/// commissions up the referrer chain.
pub async fn approve_activation<S: LedgerStorage>(
    storage: &S,
    config: &LedgerConfig,
    transaction_id: &str,
) -> Result<ActivationOutcome, LedgerError> {
    let mut snapshot = storage.begin_snapshot().await?;
    let outcome =
        approve_activation_in(storage, &mut snapshot, &config.referral_rates, transaction_id)
            .await;
    let activation = settle(storage, snapshot, "approve_activation", outcome).await?;

    info!(
        user_id = %activation.account.id,
        transaction_id,
        commissions = activation.commissions.len(),
        "activation approved"
    );
    for commission in &activation.commissions {
        info!(
            recipient = %commission.user_id,
            related_user_id = %activation.account.id,
            level = commission.metadata.level.unwrap_or_default(),
            amount = %commission.amount,
            transaction_id = %commission.id,
            "commission paid"
        );
    }
    Ok(activation)
}

async fn approve_activation_in<S: LedgerStorage>(
    storage: &S,
    snapshot: &mut S::Snapshot,
    rates: &[Decimal],
    transaction_id: &str,
) -> Result<ActivationOutcome, LedgerError> {
    let mut deposit = load_pending(storage, snapshot, transaction_id, TransactionKind::Deposit).await?;
    let mut account = load_account(storage, snapshot, &deposit.user_id).await?;

    deposit.status = TransactionStatus::Completed;
    storage.update_transaction(snapshot, deposit.clone()).await?;

    account.status = AccountStatus::Active;
    storage.update_account(snapshot, account.clone()).await?;

    let max_levels = rates.len().min(MAX_COMMISSION_LEVELS);
    let chain = upline_chain(storage, snapshot, account.referrer_id.clone(), max_levels).await?;
    let effects = compute_commissions(&chain, rates, max_levels);
    for link in &chain {
        if link.status != AccountStatus::Active {
            debug!(account_id = %link.account_id, status = ?link.status, "skipping inactive upline");
        }
    }

    let mut commissions = Vec::with_capacity(effects.len());
    for effect in effects {
        let mut upline = load_account(storage, snapshot, &effect.account_id).await?;
        upline.balance += effect.amount;
        storage.update_account(snapshot, upline).await?;

        let commission = TransactionRecord {
            id: ids::new_id(),
            user_id: effect.account_id,
            kind: TransactionKind::ReferralCommission,
            amount: effect.amount,
            status: TransactionStatus::Completed,
            description: format!("Referral Commission Level {}", effect.level),
            metadata: TransactionMetadata {
                related_user_id: Some(account.id.clone()),
                level: Some(effect.level),
                ..TransactionMetadata::default()
            },
            created_at: ids::now_rfc3339(),
        };
        storage.insert_transaction(snapshot, commission.clone()).await?;
        commissions.push(commission);
    }

    Ok(ActivationOutcome {
        deposit,
        account,
        commissions,
    })
}

/// Walk referrer ids upward from `start`, resolving at most `max_levels`
/// accounts. Stops early at a null or dangling id.
async fn upline_chain<S: LedgerStorage>(
    storage: &S,
    snapshot: &mut S::Snapshot,
    start: Option<String>,
    max_levels: usize,
) -> Result<Vec<UplineLink>, LedgerError> {
    let mut chain = Vec::with_capacity(max_levels);
    let mut next = start;
    while chain.len() < max_levels {
        let Some(id) = next.take() else {
            break;
        };
        let upline = match storage.get_account_for_update(snapshot, &id).await {
            Ok(account) => account,
            Err(e) if e.is_not_found() => {
                debug!(account_id = %id, level = chain.len() + 1, "referrer chain ends at dangling id");
                break;
            }
            Err(e) => return Err(e.into()),
        };
        next = upline.referrer_id;
        chain.push(UplineLink {
            account_id: upline.id,
            status: upline.status,
        });
    }
    Ok(chain)
}

/// Reject a pending activation deposit. The account goes back to PENDING
/// so the user can pay again; a ban placed meanwhile is kept.
pub async fn reject_activation<S: LedgerStorage>(
    storage: &S,
    transaction_id: &str,
) -> Result<TransactionRecord, LedgerError> {
    let mut snapshot = storage.begin_snapshot().await?;
    let outcome = reject_activation_in(storage, &mut snapshot, transaction_id).await;
    let deposit = settle(storage, snapshot, "reject_activation", outcome).await?;
    info!(user_id = %deposit.user_id, transaction_id, "activation rejected");
    Ok(deposit)
}

async fn reject_activation_in<S: LedgerStorage>(
    storage: &S,
    snapshot: &mut S::Snapshot,
    transaction_id: &str,
) -> Result<TransactionRecord, LedgerError> {
    let mut deposit = load_pending(storage, snapshot, transaction_id, TransactionKind::Deposit).await?;
    deposit.status = TransactionStatus::Rejected;
    storage.update_transaction(snapshot, deposit.clone()).await?;

    match storage.get_account_for_update(snapshot, &deposit.user_id).await {
        Ok(mut account) if account.status != AccountStatus::Banned => {
            account.status = AccountStatus::Pending;
            storage.update_account(snapshot, account).await?;
        }
        Ok(_) => {}
        Err(e) if e.is_not_found() => {
            debug!(user_id = %deposit.user_id, "rejected deposit has no owner account");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(deposit)
}

// ── Task rewards ─────────────────────────────────────────────────────────────

/// Credit the submitter of an approved submission and record the reward.
///
/// Runs inside the caller's snapshot so the submission's status change and
/// the credit commit together. Pays the reward captured at submission time;
/// only submissions without one fall back to the live task.
pub(crate) async fn credit_task_reward_in<S: LedgerStorage>(
    storage: &S,
    snapshot: &mut S::Snapshot,
    submission: &SubmissionRecord,
) -> Result<TransactionRecord, LedgerError> {
    let task = match storage.get_task_for_update(snapshot, &submission.task_id).await {
        Ok(task) => Some(task),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e.into()),
    };
    let reward = match (submission.reward, &task) {
        (Some(reward), _) => reward,
        (None, Some(task)) => task.reward,
        (None, None) => return Err(LedgerError::TaskNotFound(submission.task_id.clone())),
    };
    let title = task.map_or_else(|| submission.task_id.clone(), |t| t.title);

    let mut account = load_account(storage, snapshot, &submission.user_id).await?;
    account.balance += reward;
    storage.update_account(snapshot, account).await?;

    let credit = TransactionRecord {
        id: ids::new_id(),
        user_id: submission.user_id.clone(),
        kind: TransactionKind::TaskReward,
        amount: reward,
        status: TransactionStatus::Completed,
        description: format!("Reward for task: {title}"),
        metadata: TransactionMetadata {
            task_id: Some(submission.task_id.clone()),
            ..TransactionMetadata::default()
        },
        created_at: ids::now_rfc3339(),
    };
    storage.insert_transaction(snapshot, credit.clone()).await?;
    Ok(credit)
}

// ── Withdrawals ──────────────────────────────────────────────────────────────

/// Record a PENDING withdrawal. The balance is checked now and again at
/// approval, and only debited at approval.
pub async fn request_withdrawal<S: LedgerStorage>(
    storage: &S,
    user_id: &str,
    amount: Decimal,
    payment_ref: &str,
) -> Result<TransactionRecord, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!(
            "withdrawal amount must be positive, got {amount}"
        )));
    }
    let mut snapshot = storage.begin_snapshot().await?;
    let outcome = async {
        let account = load_account(storage, &mut snapshot, user_id).await?;
        ensure_covers(&account, amount)?;
        let withdrawal = TransactionRecord {
            id: ids::new_id(),
            user_id: user_id.to_string(),
            kind: TransactionKind::Withdrawal,
            amount,
            status: TransactionStatus::Pending,
            description: "Withdrawal Request".to_string(),
            metadata: TransactionMetadata {
                payment_ref: Some(payment_ref.to_string()),
                ..TransactionMetadata::default()
            },
            created_at: ids::now_rfc3339(),
        };
        storage
            .insert_transaction(&mut snapshot, withdrawal.clone())
            .await?;
        Ok::<_, LedgerError>(withdrawal)
    }
    .await;
    let withdrawal = settle(storage, snapshot, "request_withdrawal", outcome).await?;
    info!(
        user_id,
        transaction_id = %withdrawal.id,
        amount = %amount,
        "withdrawal requested"
    );
    Ok(withdrawal)
}

/// Debit the owner and complete a pending withdrawal. Fails with
/// `InsufficientBalance`, leaving the request PENDING, if the balance no
/// longer covers it.
pub async fn approve_withdrawal<S: LedgerStorage>(
    storage: &S,
    transaction_id: &str,
) -> Result<TransactionRecord, LedgerError> {
    let mut snapshot = storage.begin_snapshot().await?;
    let outcome = async {
        let mut withdrawal = load_pending(
            storage,
            &mut snapshot,
            transaction_id,
            TransactionKind::Withdrawal,
        )
        .await?;
        let mut account = load_account(storage, &mut snapshot, &withdrawal.user_id).await?;
        ensure_covers(&account, withdrawal.amount)?;

        account.balance -= withdrawal.amount;
        storage.update_account(&mut snapshot, account).await?;
        withdrawal.status = TransactionStatus::Completed;
        storage
            .update_transaction(&mut snapshot, withdrawal.clone())
            .await?;
        Ok::<_, LedgerError>(withdrawal)
    }
    .await;
    let withdrawal = settle(storage, snapshot, "approve_withdrawal", outcome).await?;
    info!(
        user_id = %withdrawal.user_id,
        transaction_id,
        amount = %withdrawal.amount,
        "withdrawal approved"
    );
    Ok(withdrawal)
}

/// Reject a pending withdrawal. Nothing was debited, so nothing is
/// refunded.
pub async fn reject_withdrawal<S: LedgerStorage>(
    storage: &S,
    transaction_id: &str,
) -> Result<TransactionRecord, LedgerError> {
    let mut snapshot = storage.begin_snapshot().await?;
    let outcome = async {
        let mut withdrawal = load_pending(
            storage,
            &mut snapshot,
            transaction_id,
            TransactionKind::Withdrawal,
        )
        .await?;
        withdrawal.status = TransactionStatus::Rejected;
        storage
            .update_transaction(&mut snapshot, withdrawal.clone())
            .await?;
        Ok::<_, LedgerError>(withdrawal)
    }
    .await;
    let withdrawal = settle(storage, snapshot, "reject_withdrawal", outcome).await?;
    info!(user_id = %withdrawal.user_id, transaction_id, "withdrawal rejected");
    Ok(withdrawal)
}

// ── Audit ────────────────────────────────────────────────────────────────────

/// Recompute every balance from completed transactions and report the
/// accounts that disagree. Reads committed state only.
pub async fn reconcile<S: LedgerStorage>(storage: &S) -> Result<ReconcileReport, LedgerError> {
    let accounts = storage.list_accounts().await?;
    let transactions = storage.list_transactions(&TransactionFilter::all()).await?;

    let mut expected: HashMap<&str, Decimal> = HashMap::new();
    for tx in &transactions {
        *expected.entry(tx.user_id.as_str()).or_default() += tx.signed_effect();
    }

    let discrepancies: Vec<Discrepancy> = accounts
        .iter()
        .filter_map(|account| {
            let want = expected
                .get(account.id.as_str())
                .copied()
                .unwrap_or_default();
            (account.balance != want).then(|| Discrepancy {
                account_id: account.id.clone(),
                recorded: account.balance,
                expected: want,
            })
        })
        .collect();

    Ok(ReconcileReport {
        accounts_checked: accounts.len(),
        discrepancies,
    })
}

// ── Helpers ──────────────────────────────────────────────────────────────────

async fn load_account<S: LedgerStorage>(
    storage: &S,
    snapshot: &mut S::Snapshot,
    id: &str,
) -> Result<AccountRecord, LedgerError> {
    storage
        .get_account_for_update(snapshot, id)
        .await
        .or_missing(|| LedgerError::AccountNotFound(id.to_string()))
}

/// Load a transaction that must be a PENDING `expected`.
async fn load_pending<S: LedgerStorage>(
    storage: &S,
    snapshot: &mut S::Snapshot,
    id: &str,
    expected: TransactionKind,
) -> Result<TransactionRecord, LedgerError> {
    let tx = storage
        .get_transaction_for_update(snapshot, id)
        .await
        .or_missing(|| LedgerError::TransactionNotFound(id.to_string()))?;
    if tx.kind != expected || tx.status != TransactionStatus::Pending {
        return Err(LedgerError::InvalidTransactionState {
            id: tx.id,
            kind: tx.kind,
            status: tx.status,
            expected,
        });
    }
    Ok(tx)
}

fn ensure_covers(account: &AccountRecord, amount: Decimal) -> Result<(), LedgerError> {
    if account.balance < amount {
        return Err(LedgerError::InsufficientBalance {
            requested: amount,
            available: account.balance,
        });
    }
    Ok(())
}
