use rust_decimal::Decimal;
use taskripple_storage::{AccountStatus, StorageError, TransactionKind, TransactionStatus};

/// Errors surfaced by registry, catalog, submission, and ledger operations.
///
/// Any error returned from an operation means its snapshot was aborted and
/// nothing it touched was written.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("account '{0}' not found")]
    AccountNotFound(String),

    #[error("task '{0}' not found")]
    TaskNotFound(String),

    #[error("submission '{0}' not found")]
    SubmissionNotFound(String),

    #[error("transaction '{0}' not found")]
    TransactionNotFound(String),

    #[error("email '{0}' is already registered")]
    DuplicateEmail(String),

    #[error("task '{task_id}' was already submitted by '{user_id}'")]
    DuplicateSubmission { user_id: String, task_id: String },

    #[error("an activation request is already pending for '{0}'")]
    ActivationAlreadyPending(String),

    #[error("transaction '{id}' is a {kind:?} in state {status:?}, expected a pending {expected:?}")]
    InvalidTransactionState {
        id: String,
        kind: TransactionKind,
        status: TransactionStatus,
        expected: TransactionKind,
    },

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid task: {0}")]
    InvalidTask(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("account '{id}' is {status:?}: {reason}")]
    AccountNotEligible {
        id: String,
        status: AccountStatus,
        reason: &'static str,
    },

    #[error("withdrawal of {requested} is below the minimum of {minimum}")]
    BelowMinimumWithdrawal { requested: Decimal, minimum: Decimal },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LedgerError {
    /// Stable machine-readable code, used in JSON output and HTTP bodies.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::AccountNotFound(_) => "account_not_found",
            LedgerError::TaskNotFound(_) => "task_not_found",
            LedgerError::SubmissionNotFound(_) => "submission_not_found",
            LedgerError::TransactionNotFound(_) => "transaction_not_found",
            LedgerError::DuplicateEmail(_) => "duplicate_email",
            LedgerError::DuplicateSubmission { .. } => "duplicate_submission",
            LedgerError::ActivationAlreadyPending(_) => "activation_already_pending",
            LedgerError::InvalidTransactionState { .. } => "invalid_transaction_state",
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::InvalidCredentials => "invalid_credentials",
            LedgerError::InvalidTask(_) => "invalid_task",
            LedgerError::PermissionDenied(_) => "permission_denied",
            LedgerError::AccountNotEligible { .. } => "account_not_eligible",
            LedgerError::BelowMinimumWithdrawal { .. } => "below_minimum_withdrawal",
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::Config(_) => "config",
            LedgerError::Storage(_) => "storage",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LedgerError::AccountNotFound(_)
                | LedgerError::TaskNotFound(_)
                | LedgerError::SubmissionNotFound(_)
                | LedgerError::TransactionNotFound(_)
        )
    }
}

/// Maps a storage `NotFound` onto the matching domain error, passing every
/// other storage failure through unchanged.
pub(crate) trait OrMissing<T> {
    fn or_missing(self, missing: impl FnOnce() -> LedgerError) -> Result<T, LedgerError>;
}

impl<T> OrMissing<T> for Result<T, StorageError> {
    fn or_missing(self, missing: impl FnOnce() -> LedgerError) -> Result<T, LedgerError> {
        self.map_err(|e| {
            if e.is_not_found() {
                missing()
            } else {
                LedgerError::Storage(e)
            }
        })
    }
}
