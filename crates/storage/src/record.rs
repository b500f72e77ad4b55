use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::durable::Collection;

/// A record that lives in one of the four top-level collections.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The collection this record type is stored in.
    const COLLECTION: Collection;

    fn id(&self) -> &str;
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
}

/// Account lifecycle status.
///
/// `Pending` (registered, unpaid) -> `Review` (activation payment submitted)
/// -> `Active`. `Banned` is an administrative override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Pending,
    Review,
    Active,
    Banned,
}

/// A registered account as stored in the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub secret: String,
    pub role: Role,
    pub status: AccountStatus,
    pub balance: Decimal,
    /// Weak reference to the referring account. May dangle.
    pub referrer_id: Option<String>,
    pub referral_code: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
}

impl Record for AccountRecord {
    const COLLECTION: Collection = Collection::Accounts;

    fn id(&self) -> &str {
        &self.id
    }
}

/// What kind of evidence a task asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProofType {
    Text,
    Image,
    Video,
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub reward: Decimal,
    pub requirements: Vec<String>,
    pub proof_type: ProofType,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
}

impl Record for TaskRecord {
    const COLLECTION: Collection = Collection::Tasks;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

/// Proof submitted by a user for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: String,
    pub task_id: String,
    pub user_id: String,
    pub text_proof: Option<String>,
    /// Opaque reference (URL or id) to a hosted image.
    pub image_proof_ref: Option<String>,
    pub status: SubmissionStatus,
    /// Task reward captured at submission time. Absent on records written
    /// before the snapshot was introduced.
    #[serde(default)]
    pub reward: Option<Decimal>,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub submitted_at: String,
}

impl Record for SubmissionRecord {
    const COLLECTION: Collection = Collection::Submissions;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Activation fee, paid off-platform.
    Deposit,
    Withdrawal,
    TaskReward,
    ReferralCommission,
}

/// How a completed transaction of a given kind moves its owner's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceEffect {
    Credit,
    Debit,
    Neutral,
}

impl TransactionKind {
    pub fn balance_effect(self) -> BalanceEffect {
        match self {
            TransactionKind::TaskReward | TransactionKind::ReferralCommission => {
                BalanceEffect::Credit
            }
            TransactionKind::Withdrawal => BalanceEffect::Debit,
            TransactionKind::Deposit => BalanceEffect::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Rejected,
}

impl TransactionStatus {
    /// Completed and rejected transactions never change again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransactionStatus::Completed | TransactionStatus::Rejected
        )
    }
}

/// Type-specific transaction details. Only the fields relevant to the
/// transaction kind are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_ref: Option<String>,
    /// For commissions: the account whose activation triggered the payout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_user_id: Option<String>,
    /// For commissions: upline level, 1-indexed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    /// Owner (debits) or recipient (credits).
    pub user_id: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub description: String,
    #[serde(default)]
    pub metadata: TransactionMetadata,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
}

impl TransactionRecord {
    /// Signed contribution of this transaction to its owner's balance.
    /// Zero unless the transaction is completed.
    pub fn signed_effect(&self) -> Decimal {
        if self.status != TransactionStatus::Completed {
            return Decimal::ZERO;
        }
        match self.kind.balance_effect() {
            BalanceEffect::Credit => self.amount,
            BalanceEffect::Debit => -self.amount,
            BalanceEffect::Neutral => Decimal::ZERO,
        }
    }
}

impl Record for TransactionRecord {
    const COLLECTION: Collection = Collection::Transactions;

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(kind: TransactionKind, status: TransactionStatus, amount: i64) -> TransactionRecord {
        TransactionRecord {
            id: "tx-1".to_string(),
            user_id: "u-1".to_string(),
            kind,
            amount: Decimal::from(amount),
            status,
            description: String::new(),
            metadata: TransactionMetadata::default(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn signed_effect_by_kind() {
        use TransactionKind::*;
        use TransactionStatus::*;
        assert_eq!(tx(TaskReward, Completed, 3).signed_effect(), Decimal::from(3));
        assert_eq!(
            tx(ReferralCommission, Completed, 5).signed_effect(),
            Decimal::from(5)
        );
        assert_eq!(tx(Withdrawal, Completed, 7).signed_effect(), Decimal::from(-7));
        assert_eq!(tx(Deposit, Completed, 25).signed_effect(), Decimal::ZERO);
        assert_eq!(tx(Withdrawal, Pending, 7).signed_effect(), Decimal::ZERO);
        assert_eq!(tx(TaskReward, Rejected, 3).signed_effect(), Decimal::ZERO);
    }

    #[test]
    fn terminal_statuses() {
        assert!(TransactionStatus::Completed.is_terminal());
        assert!(TransactionStatus::Rejected.is_terminal());
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(!TransactionStatus::Failed.is_terminal());
    }

    #[test]
    fn enums_use_screaming_case_on_the_wire() {
        let json = serde_json::to_string(&TransactionKind::ReferralCommission).unwrap();
        assert_eq!(json, "\"REFERRAL_COMMISSION\"");
        let status: AccountStatus = serde_json::from_str("\"REVIEW\"").unwrap();
        assert_eq!(status, AccountStatus::Review);
    }

    #[test]
    fn submission_without_reward_snapshot_deserializes() {
        let json = serde_json::json!({
            "id": "s-1",
            "task_id": "t-1",
            "user_id": "u-1",
            "text_proof": null,
            "image_proof_ref": null,
            "status": "PENDING",
            "submitted_at": "2026-01-01T00:00:00Z"
        });
        let sub: SubmissionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(sub.reward, None);
    }
}
