//! Caller-facing facade.
//!
//! [`Platform`] owns a storage backend and the configuration, takes the
//! caller's identity as an [`Actor`], and enforces who may do what before
//! delegating to the registry, catalog, submission, and ledger modules.

use rust_decimal::Decimal;
use serde::Serialize;
use taskripple_storage::{
    AccountRecord, AccountStatus, LedgerStorage, ProofType, Role, SubmissionFilter,
    SubmissionRecord, SubmissionStatus, TaskRecord, TransactionFilter, TransactionKind,
    TransactionRecord, TransactionStatus,
};
use tracing::info;

use crate::atomic::settle;
use crate::catalog::{self, NewTask};
use crate::config::LedgerConfig;
use crate::engine::{self, ActivationOutcome, ReconcileReport};
use crate::error::LedgerError;
use crate::ids;
use crate::registry::{self, DownlineLevel, Registration};
use crate::reports::{self, AdminOverview, UserOverview};
use crate::submissions::{self, Decision, DecisionOutcome, Proof};

/// The authenticated caller, as supplied by the identity boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub account_id: String,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&AccountRecord> for Actor {
    fn from(account: &AccountRecord) -> Self {
        Self {
            account_id: account.id.clone(),
            role: account.role,
        }
    }
}

/// Everything waiting on an admin decision.
#[derive(Debug, Clone, Serialize)]
pub struct PendingQueue {
    pub deposits: Vec<TransactionRecord>,
    pub withdrawals: Vec<TransactionRecord>,
    pub submissions: Vec<SubmissionRecord>,
}

pub struct Platform<S> {
    storage: S,
    config: LedgerConfig,
}

impl<S: LedgerStorage> Platform<S> {
    pub fn new(storage: S, config: LedgerConfig) -> Self {
        Self { storage, config }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Seed the administrator and the starter tasks into an empty store.
    /// Returns `false` and writes nothing when any account already exists.
    pub async fn bootstrap(&self) -> Result<bool, LedgerError> {
        let mut snapshot = self.storage.begin_snapshot().await?;
        let seed = &self.config.admin;
        let outcome: Result<bool, LedgerError> = async {
            if self.storage.count_accounts(&mut snapshot).await? > 0 {
                return Ok(false);
            }
            let now = ids::now_rfc3339();
            let admin = AccountRecord {
                id: seed.id.clone(),
                full_name: seed.full_name.clone(),
                email: seed.email.clone(),
                phone: seed.phone.clone(),
                secret: seed.secret.clone(),
                role: Role::Admin,
                status: AccountStatus::Active,
                balance: Decimal::ZERO,
                referrer_id: None,
                referral_code: seed.referral_code.clone(),
                created_at: now.clone(),
            };
            self.storage.insert_account(&mut snapshot, admin).await?;
            for task in starter_tasks(&now) {
                self.storage.insert_task(&mut snapshot, task).await?;
            }
            Ok(true)
        }
        .await;
        let seeded = settle(&self.storage, snapshot, "bootstrap", outcome).await?;

        if seeded {
            info!(admin_id = %seed.id, "seeded administrator and starter tasks");
        }
        Ok(seeded)
    }

    // ── Identity ─────────────────────────────────────────────────────────────

    pub async fn register(&self, registration: Registration) -> Result<AccountRecord, LedgerError> {
        registry::register(&self.storage, registration).await
    }

    pub async fn login(&self, email: &str, secret: &str) -> Result<AccountRecord, LedgerError> {
        registry::authenticate(&self.storage, email, secret).await
    }

    /// Build an [`Actor`] for an account id, taking the role from the store.
    pub async fn actor(&self, account_id: &str) -> Result<Actor, LedgerError> {
        let account = registry::get(&self.storage, account_id).await?;
        Ok(Actor::from(&account))
    }

    pub async fn account(&self, actor: &Actor) -> Result<AccountRecord, LedgerError> {
        registry::get(&self.storage, &actor.account_id).await
    }

    pub async fn display_name(&self, account_id: &str) -> Result<String, LedgerError> {
        registry::display_name(&self.storage, account_id).await
    }

    // ── User actions ─────────────────────────────────────────────────────────

    pub async fn request_activation(
        &self,
        actor: &Actor,
        payment_ref: &str,
        proof_ref: &str,
    ) -> Result<TransactionRecord, LedgerError> {
        let account = self.caller(actor).await?;
        match account.status {
            AccountStatus::Pending => {}
            AccountStatus::Review => {
                return Err(LedgerError::ActivationAlreadyPending(account.id));
            }
            status => {
                return Err(LedgerError::AccountNotEligible {
                    id: account.id,
                    status,
                    reason: "only pending accounts can request activation",
                });
            }
        }
        engine::request_activation(
            &self.storage,
            &self.config,
            &actor.account_id,
            payment_ref,
            proof_ref,
        )
        .await
    }

    pub async fn list_tasks(
        &self,
        proof_type: Option<ProofType>,
    ) -> Result<Vec<TaskRecord>, LedgerError> {
        catalog::list(&self.storage, proof_type).await
    }

    pub async fn submit_task(
        &self,
        actor: &Actor,
        task_id: &str,
        proof: Proof,
    ) -> Result<SubmissionRecord, LedgerError> {
        self.require_active(actor, "tasks are only open to active accounts")
            .await?;
        submissions::submit(&self.storage, &actor.account_id, task_id, proof).await
    }

    pub async fn my_submissions(&self, actor: &Actor) -> Result<Vec<SubmissionRecord>, LedgerError> {
        submissions::list(&self.storage, &SubmissionFilter::all().user(&actor.account_id)).await
    }

    pub async fn request_withdrawal(
        &self,
        actor: &Actor,
        amount: Decimal,
        payment_ref: &str,
    ) -> Result<TransactionRecord, LedgerError> {
        self.require_active(actor, "withdrawals are only open to active accounts")
            .await?;
        if amount < self.config.min_withdrawal {
            return Err(LedgerError::BelowMinimumWithdrawal {
                requested: amount,
                minimum: self.config.min_withdrawal,
            });
        }
        engine::request_withdrawal(&self.storage, &actor.account_id, amount, payment_ref).await
    }

    /// The caller's transactions, newest first, optionally narrowed by kind
    /// and status.
    pub async fn history(
        &self,
        actor: &Actor,
        kind: Option<TransactionKind>,
        status: Option<TransactionStatus>,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        let mut filter = TransactionFilter::all().user(&actor.account_id);
        if let Some(kind) = kind {
            filter = filter.kind(kind);
        }
        if let Some(status) = status {
            filter = filter.status(status);
        }
        reports::history(&self.storage, &filter).await
    }

    pub async fn overview(&self, actor: &Actor) -> Result<UserOverview, LedgerError> {
        reports::user_overview(&self.storage, &actor.account_id).await
    }

    pub async fn referrals(&self, actor: &Actor) -> Result<Vec<AccountRecord>, LedgerError> {
        registry::direct_referrals(&self.storage, &actor.account_id).await
    }

    pub async fn downline(&self, actor: &Actor) -> Result<Vec<DownlineLevel>, LedgerError> {
        registry::downline(&self.storage, &actor.account_id).await
    }

    // ── Admin actions ────────────────────────────────────────────────────────

    pub async fn approve_activation(
        &self,
        actor: &Actor,
        transaction_id: &str,
    ) -> Result<ActivationOutcome, LedgerError> {
        require_admin(actor)?;
        engine::approve_activation(&self.storage, &self.config, transaction_id).await
    }

    pub async fn reject_activation(
        &self,
        actor: &Actor,
        transaction_id: &str,
    ) -> Result<TransactionRecord, LedgerError> {
        require_admin(actor)?;
        engine::reject_activation(&self.storage, transaction_id).await
    }

    pub async fn decide_submission(
        &self,
        actor: &Actor,
        submission_id: &str,
        decision: Decision,
    ) -> Result<DecisionOutcome, LedgerError> {
        require_admin(actor)?;
        submissions::decide(&self.storage, submission_id, decision).await
    }

    pub async fn approve_withdrawal(
        &self,
        actor: &Actor,
        transaction_id: &str,
    ) -> Result<TransactionRecord, LedgerError> {
        require_admin(actor)?;
        engine::approve_withdrawal(&self.storage, transaction_id).await
    }

    pub async fn reject_withdrawal(
        &self,
        actor: &Actor,
        transaction_id: &str,
    ) -> Result<TransactionRecord, LedgerError> {
        require_admin(actor)?;
        engine::reject_withdrawal(&self.storage, transaction_id).await
    }

    pub async fn set_status(
        &self,
        actor: &Actor,
        account_id: &str,
        status: AccountStatus,
    ) -> Result<Option<AccountRecord>, LedgerError> {
        require_admin(actor)?;
        registry::set_status(&self.storage, account_id, status).await
    }

    pub async fn set_role(
        &self,
        actor: &Actor,
        account_id: &str,
        role: Role,
    ) -> Result<Option<AccountRecord>, LedgerError> {
        require_admin(actor)?;
        registry::set_role(&self.storage, account_id, role).await
    }

    pub async fn create_task(&self, actor: &Actor, task: NewTask) -> Result<TaskRecord, LedgerError> {
        require_admin(actor)?;
        catalog::create(&self.storage, task).await
    }

    pub async fn delete_task(&self, actor: &Actor, task_id: &str) -> Result<bool, LedgerError> {
        require_admin(actor)?;
        catalog::delete(&self.storage, task_id).await
    }

    pub async fn list_accounts(&self, actor: &Actor) -> Result<Vec<AccountRecord>, LedgerError> {
        require_admin(actor)?;
        registry::list(&self.storage).await
    }

    /// All transactions matching the filters, newest first.
    pub async fn transactions(
        &self,
        actor: &Actor,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        require_admin(actor)?;
        reports::history(&self.storage, filter).await
    }

    pub async fn pending(&self, actor: &Actor) -> Result<PendingQueue, LedgerError> {
        require_admin(actor)?;
        let pending_of = |kind| TransactionFilter::all().kind(kind).status(TransactionStatus::Pending);
        Ok(PendingQueue {
            deposits: self
                .storage
                .list_transactions(&pending_of(TransactionKind::Deposit))
                .await?,
            withdrawals: self
                .storage
                .list_transactions(&pending_of(TransactionKind::Withdrawal))
                .await?,
            submissions: submissions::list(
                &self.storage,
                &SubmissionFilter::all().status(SubmissionStatus::Pending),
            )
            .await?,
        })
    }

    pub async fn admin_overview(&self, actor: &Actor) -> Result<AdminOverview, LedgerError> {
        require_admin(actor)?;
        reports::admin_overview(&self.storage).await
    }

    pub async fn reconcile(&self, actor: &Actor) -> Result<ReconcileReport, LedgerError> {
        require_admin(actor)?;
        engine::reconcile(&self.storage).await
    }

    // ── Gating ───────────────────────────────────────────────────────────────

    /// The caller's current account, refusing banned callers.
    async fn caller(&self, actor: &Actor) -> Result<AccountRecord, LedgerError> {
        let account = registry::get(&self.storage, &actor.account_id).await?;
        if account.status == AccountStatus::Banned {
            return Err(LedgerError::AccountNotEligible {
                id: account.id,
                status: account.status,
                reason: "account is banned",
            });
        }
        Ok(account)
    }

    async fn require_active(
        &self,
        actor: &Actor,
        reason: &'static str,
    ) -> Result<AccountRecord, LedgerError> {
        let account = self.caller(actor).await?;
        if account.status != AccountStatus::Active {
            return Err(LedgerError::AccountNotEligible {
                id: account.id,
                status: account.status,
                reason,
            });
        }
        Ok(account)
    }
}

fn require_admin(actor: &Actor) -> Result<(), LedgerError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(LedgerError::PermissionDenied(format!(
            "'{}' is not an administrator",
            actor.account_id
        )))
    }
}

fn starter_tasks(now: &str) -> Vec<TaskRecord> {
    vec![
        TaskRecord {
            id: "task-001".to_string(),
            title: "Join Telegram Channel".to_string(),
            description: "Join our official channel and stay updated.".to_string(),
            reward: Decimal::new(50, 2),
            requirements: vec![
                "Join channel".to_string(),
                "Don't leave for 7 days".to_string(),
            ],
            proof_type: ProofType::Image,
            created_at: now.to_string(),
        },
        TaskRecord {
            id: "task-002".to_string(),
            title: "Write a 5-star Review".to_string(),
            description: "Review our app on the public forum.".to_string(),
            reward: Decimal::new(100, 2),
            requirements: vec![
                "Positive review".to_string(),
                "Include screenshot".to_string(),
            ],
            proof_type: ProofType::Mixed,
            created_at: now.to_string(),
        },
    ]
}
