//! Read-only dashboards and history views over committed state.

use rust_decimal::Decimal;
use serde::Serialize;
use taskripple_storage::{
    AccountStatus, LedgerStorage, SubmissionFilter, SubmissionStatus, TransactionFilter,
    TransactionKind, TransactionRecord, TransactionStatus,
};

use crate::error::{LedgerError, OrMissing};

/// Transactions shown on a user's dashboard.
pub const RECENT_TRANSACTIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminOverview {
    pub total_users: usize,
    pub active_users: usize,
    pub pending_deposits: usize,
    pub pending_withdrawals: usize,
    pub pending_submissions: usize,
    /// Sum of completed withdrawals.
    pub total_paid_out: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserOverview {
    pub balance: Decimal,
    pub status: AccountStatus,
    pub tasks_completed: usize,
    pub pending_tasks: usize,
    /// Completed task rewards plus completed commissions.
    pub total_earned: Decimal,
    /// Newest first.
    pub recent_transactions: Vec<TransactionRecord>,
}

pub async fn admin_overview<S: LedgerStorage>(storage: &S) -> Result<AdminOverview, LedgerError> {
    let accounts = storage.list_accounts().await?;
    let transactions = storage.list_transactions(&TransactionFilter::all()).await?;
    let pending_submissions = storage
        .list_submissions(&SubmissionFilter::all().status(SubmissionStatus::Pending))
        .await?
        .len();

    let pending_of = |kind: TransactionKind| {
        transactions
            .iter()
            .filter(|t| t.kind == kind && t.status == TransactionStatus::Pending)
            .count()
    };

    Ok(AdminOverview {
        total_users: accounts.len(),
        active_users: accounts
            .iter()
            .filter(|a| a.status == AccountStatus::Active)
            .count(),
        pending_deposits: pending_of(TransactionKind::Deposit),
        pending_withdrawals: pending_of(TransactionKind::Withdrawal),
        pending_submissions,
        total_paid_out: transactions
            .iter()
            .filter(|t| {
                t.kind == TransactionKind::Withdrawal && t.status == TransactionStatus::Completed
            })
            .map(|t| t.amount)
            .sum(),
    })
}

pub async fn user_overview<S: LedgerStorage>(
    storage: &S,
    user_id: &str,
) -> Result<UserOverview, LedgerError> {
    let account = storage
        .get_account(user_id)
        .await
        .or_missing(|| LedgerError::AccountNotFound(user_id.to_string()))?;
    let submissions = storage
        .list_submissions(&SubmissionFilter::all().user(user_id))
        .await?;
    let mut transactions = history(storage, &TransactionFilter::all().user(user_id)).await?;

    let total_earned = transactions
        .iter()
        .filter(|t| {
            t.status == TransactionStatus::Completed
                && matches!(
                    t.kind,
                    TransactionKind::TaskReward | TransactionKind::ReferralCommission
                )
        })
        .map(|t| t.amount)
        .sum();
    transactions.truncate(RECENT_TRANSACTIONS);

    Ok(UserOverview {
        balance: account.balance,
        status: account.status,
        tasks_completed: submissions
            .iter()
            .filter(|s| s.status == SubmissionStatus::Approved)
            .count(),
        pending_tasks: submissions
            .iter()
            .filter(|s| s.status == SubmissionStatus::Pending)
            .count(),
        total_earned,
        recent_transactions: transactions,
    })
}

/// Transactions matching `filter`, newest first.
pub async fn history<S: LedgerStorage>(
    storage: &S,
    filter: &TransactionFilter,
) -> Result<Vec<TransactionRecord>, LedgerError> {
    let mut transactions = storage.list_transactions(filter).await?;
    transactions.reverse();
    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::registry::{self, Registration};
    use crate::{catalog, engine, submissions};
    use taskripple_storage::{CollectionStorage, MemoryStore, ProofType};

    type Storage = CollectionStorage<MemoryStore>;

    async fn register(s: &Storage, name: &str, code: Option<String>) -> String {
        registry::register(
            s,
            Registration {
                full_name: name.to_string(),
                email: format!("{name}@example.com"),
                phone: "555".to_string(),
                secret: "pw".to_string(),
                referral_code: code,
            },
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn overviews_count_pending_work_and_earnings() {
        let s = CollectionStorage::open(MemoryStore::new()).await.unwrap();
        let config = LedgerConfig::default();

        let u1 = register(&s, "u1", None).await;
        let code = s.get_account(&u1).await.unwrap().referral_code;
        let u2 = register(&s, "u2", Some(code)).await;

        let d1 = engine::request_activation(&s, &config, &u1, "P1", "p1")
            .await
            .unwrap();
        engine::approve_activation(&s, &config, &d1.id).await.unwrap();
        let d2 = engine::request_activation(&s, &config, &u2, "P2", "p2")
            .await
            .unwrap();
        engine::approve_activation(&s, &config, &d2.id).await.unwrap();

        let task = catalog::create(
            &s,
            catalog::NewTask {
                title: "Review".to_string(),
                description: String::new(),
                reward: Decimal::ONE,
                requirements: vec![],
                proof_type: ProofType::Mixed,
            },
        )
        .await
        .unwrap();
        let sub = submissions::submit(&s, &u1, &task.id, submissions::Proof::default())
            .await
            .unwrap();
        submissions::decide(&s, &sub.id, submissions::Decision::Approved)
            .await
            .unwrap();

        let w = engine::request_withdrawal(&s, &u1, Decimal::from(5), "W1")
            .await
            .unwrap();
        engine::approve_withdrawal(&s, &w.id).await.unwrap();
        engine::request_withdrawal(&s, &u1, Decimal::ONE, "W2")
            .await
            .unwrap();
        let u3 = register(&s, "u3", None).await;
        engine::request_activation(&s, &config, &u3, "P3", "p3")
            .await
            .unwrap();

        let admin = admin_overview(&s).await.unwrap();
        assert_eq!(
            admin,
            AdminOverview {
                total_users: 3,
                active_users: 2,
                pending_deposits: 1,
                pending_withdrawals: 1,
                pending_submissions: 0,
                total_paid_out: Decimal::from(5),
            }
        );

        let user = user_overview(&s, &u1).await.unwrap();
        assert_eq!(user.balance, Decimal::ONE);
        assert_eq!(user.status, AccountStatus::Active);
        assert_eq!(user.tasks_completed, 1);
        assert_eq!(user.pending_tasks, 0);
        assert_eq!(user.total_earned, Decimal::from(6));
        assert_eq!(user.recent_transactions.len(), RECENT_TRANSACTIONS);
        assert_eq!(user.recent_transactions[0].description, "Withdrawal Request");
        assert_eq!(user.recent_transactions[0].status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn user_overview_for_unknown_account_fails() {
        let s = CollectionStorage::open(MemoryStore::new()).await.unwrap();
        assert!(matches!(
            user_overview(&s, "ghost").await,
            Err(LedgerError::AccountNotFound(_))
        ));
    }
}
