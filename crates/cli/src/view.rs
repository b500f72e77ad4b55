//! Output shapes shared by the CLI and the HTTP server.
//!
//! Account records carry the login secret, so everything that leaves the
//! process goes through [`AccountView`] instead.

use rust_decimal::Decimal;
use serde::Serialize;
use taskripple_ledger::storage::{
    AccountRecord, AccountStatus, Role, SubmissionRecord, TaskRecord, TransactionRecord,
};
use taskripple_ledger::{ActivationOutcome, DownlineLevel};

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AccountView {
    pub(crate) id: String,
    pub(crate) full_name: String,
    pub(crate) email: String,
    pub(crate) phone: String,
    pub(crate) role: Role,
    pub(crate) status: AccountStatus,
    pub(crate) balance: Decimal,
    pub(crate) referrer_id: Option<String>,
    pub(crate) referral_code: String,
    pub(crate) created_at: String,
}

impl From<&AccountRecord> for AccountView {
    fn from(account: &AccountRecord) -> Self {
        Self {
            id: account.id.clone(),
            full_name: account.full_name.clone(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            role: account.role,
            status: account.status,
            balance: account.balance,
            referrer_id: account.referrer_id.clone(),
            referral_code: account.referral_code.clone(),
            created_at: account.created_at.clone(),
        }
    }
}

pub(crate) fn accounts(records: &[AccountRecord]) -> Vec<AccountView> {
    records.iter().map(AccountView::from).collect()
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct DownlineView {
    pub(crate) level: u8,
    pub(crate) accounts: Vec<AccountView>,
}

pub(crate) fn downline(levels: &[DownlineLevel]) -> Vec<DownlineView> {
    levels
        .iter()
        .map(|l| DownlineView {
            level: l.level,
            accounts: accounts(&l.accounts),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ActivationView {
    pub(crate) deposit: TransactionRecord,
    pub(crate) account: AccountView,
    pub(crate) commissions: Vec<TransactionRecord>,
}

impl From<ActivationOutcome> for ActivationView {
    fn from(outcome: ActivationOutcome) -> Self {
        Self {
            account: AccountView::from(&outcome.account),
            deposit: outcome.deposit,
            commissions: outcome.commissions,
        }
    }
}

/// The wire name of a serde enum (`ACTIVE`, `TASK_REWARD`, ...).
pub(crate) fn label<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => "?".to_string(),
    }
}

pub(crate) fn account_line(a: &AccountView) -> String {
    format!(
        "{:<36}  {:<7}  {:<5}  {:>10}  {}",
        a.id,
        label(&a.status),
        label(&a.role),
        a.balance,
        a.email
    )
}

pub(crate) fn transaction_line(t: &TransactionRecord) -> String {
    format!(
        "{:<36}  {:<19}  {:<9}  {:>10}  {}",
        t.id,
        label(&t.kind),
        label(&t.status),
        t.amount,
        t.description
    )
}

pub(crate) fn task_line(t: &TaskRecord) -> String {
    format!(
        "{:<36}  {:>8}  {:<5}  {}",
        t.id,
        t.reward,
        label(&t.proof_type),
        t.title
    )
}

pub(crate) fn submission_line(s: &SubmissionRecord) -> String {
    format!(
        "{:<36}  task {}  {}",
        s.id,
        s.task_id,
        label(&s.status)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskripple_ledger::storage::TransactionKind;

    fn account() -> AccountRecord {
        AccountRecord {
            id: "u1".to_string(),
            full_name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: "555".to_string(),
            secret: "hunter2".to_string(),
            role: Role::User,
            status: AccountStatus::Active,
            balance: Decimal::new(550, 2),
            referrer_id: None,
            referral_code: "ABC1234".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn account_view_drops_secret() {
        let json = serde_json::to_string(&AccountView::from(&account())).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("\"status\":\"ACTIVE\""));
    }

    #[test]
    fn label_uses_wire_names() {
        assert_eq!(label(&TransactionKind::ReferralCommission), "REFERRAL_COMMISSION");
        assert_eq!(label(&AccountStatus::Review), "REVIEW");
    }

    #[test]
    fn account_line_shows_status_and_balance() {
        let line = account_line(&AccountView::from(&account()));
        assert!(line.starts_with("u1"));
        assert!(line.contains("ACTIVE"));
        assert!(line.contains("5.50"));
    }
}
