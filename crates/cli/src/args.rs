//! Command-line spellings of the ledger's enums.

use clap::ValueEnum;
use taskripple_ledger::storage::{
    AccountStatus, ProofType, Role, TransactionKind, TransactionStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum StatusArg {
    Pending,
    Review,
    Active,
    Banned,
}

impl From<StatusArg> for AccountStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => AccountStatus::Pending,
            StatusArg::Review => AccountStatus::Review,
            StatusArg::Active => AccountStatus::Active,
            StatusArg::Banned => AccountStatus::Banned,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum RoleArg {
    User,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::User => Role::User,
            RoleArg::Admin => Role::Admin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ProofTypeArg {
    Text,
    Image,
    Video,
    Mixed,
}

impl From<ProofTypeArg> for ProofType {
    fn from(arg: ProofTypeArg) -> Self {
        match arg {
            ProofTypeArg::Text => ProofType::Text,
            ProofTypeArg::Image => ProofType::Image,
            ProofTypeArg::Video => ProofType::Video,
            ProofTypeArg::Mixed => ProofType::Mixed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum KindArg {
    Deposit,
    Withdrawal,
    TaskReward,
    ReferralCommission,
}

impl From<KindArg> for TransactionKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Deposit => TransactionKind::Deposit,
            KindArg::Withdrawal => TransactionKind::Withdrawal,
            KindArg::TaskReward => TransactionKind::TaskReward,
            KindArg::ReferralCommission => TransactionKind::ReferralCommission,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum TxStatusArg {
    Pending,
    Completed,
    Failed,
    Rejected,
}

impl From<TxStatusArg> for TransactionStatus {
    fn from(arg: TxStatusArg) -> Self {
        match arg {
            TxStatusArg::Pending => TransactionStatus::Pending,
            TxStatusArg::Completed => TransactionStatus::Completed,
            TxStatusArg::Failed => TransactionStatus::Failed,
            TxStatusArg::Rejected => TransactionStatus::Rejected,
        }
    }
}
