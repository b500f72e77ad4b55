//! Commands a regular account runs on itself.

use rust_decimal::Decimal;
use serde_json::json;
use taskripple_ledger::storage::{TransactionKind, TransactionStatus};
use taskripple_ledger::Registration;

use super::{lines, CliError, Session};
use crate::view::{self, AccountView};

pub(crate) async fn cmd_init(session: &Session) -> Result<(), CliError> {
    let seeded = session.platform.bootstrap().await?;
    let admin = &session.platform.config().admin;
    session.emit(
        &json!({ "seeded": seeded, "admin_id": admin.id }),
        || {
            if seeded {
                format!(
                    "Seeded administrator '{}' ({}) and starter tasks",
                    admin.id, admin.email
                )
            } else {
                "Store already initialised; nothing seeded".to_string()
            }
        },
    )
}

pub(crate) async fn cmd_register(
    session: &Session,
    registration: Registration,
) -> Result<(), CliError> {
    let account = session.platform.register(registration).await?;
    let view = AccountView::from(&account);
    session.emit(&view, || {
        format!(
            "Registered {} (referral code {})",
            view.id, view.referral_code
        )
    })
}

pub(crate) async fn cmd_login(session: &Session, email: &str, secret: &str) -> Result<(), CliError> {
    let account = session.platform.login(email, secret).await?;
    let view = AccountView::from(&account);
    session.emit(&view, || {
        format!(
            "{}\nLogged in as {} ({}, {}); pass --as {} to act as this account",
            view.id,
            view.full_name,
            view::label(&view.role),
            view::label(&view.status),
            view.id
        )
    })
}

pub(crate) async fn cmd_activate(
    session: &Session,
    payment_ref: &str,
    proof_ref: &str,
) -> Result<(), CliError> {
    let actor = session.actor().await?;
    let deposit = session
        .platform
        .request_activation(&actor, payment_ref, proof_ref)
        .await?;
    session.emit(&deposit, || {
        format!(
            "Activation requested: transaction {} for {}, awaiting review",
            deposit.id, deposit.amount
        )
    })
}

pub(crate) async fn cmd_withdraw(
    session: &Session,
    amount: Decimal,
    payment_ref: &str,
) -> Result<(), CliError> {
    let actor = session.actor().await?;
    let withdrawal = session
        .platform
        .request_withdrawal(&actor, amount, payment_ref)
        .await?;
    session.emit(&withdrawal, || {
        format!(
            "Withdrawal requested: transaction {} for {}",
            withdrawal.id, withdrawal.amount
        )
    })
}

pub(crate) async fn cmd_history(
    session: &Session,
    kind: Option<TransactionKind>,
    status: Option<TransactionStatus>,
) -> Result<(), CliError> {
    let actor = session.actor().await?;
    let transactions = session.platform.history(&actor, kind, status).await?;
    session.emit(&transactions, || {
        lines(&transactions, "No transactions", view::transaction_line)
    })
}

pub(crate) async fn cmd_referrals(session: &Session, downline: bool) -> Result<(), CliError> {
    let actor = session.actor().await?;
    if downline {
        let levels = view::downline(&session.platform.downline(&actor).await?);
        return session.emit(&levels, || {
            lines(&levels, "No referrals", |level| {
                let mut out = format!("Level {} ({} accounts)", level.level, level.accounts.len());
                for account in &level.accounts {
                    out.push_str("\n  ");
                    out.push_str(&view::account_line(account));
                }
                out
            })
        });
    }
    let referrals = view::accounts(&session.platform.referrals(&actor).await?);
    session.emit(&referrals, || {
        lines(&referrals, "No referrals", view::account_line)
    })
}

/// Admins see the platform-wide dashboard, everyone else their own.
pub(crate) async fn cmd_overview(session: &Session) -> Result<(), CliError> {
    let actor = session.actor().await?;
    if actor.is_admin() {
        let overview = session.platform.admin_overview(&actor).await?;
        return session.emit(&overview, || {
            format!(
                "Users:               {} ({} active)\n\
                 Pending deposits:    {}\n\
                 Pending withdrawals: {}\n\
                 Pending submissions: {}\n\
                 Total paid out:      {}",
                overview.total_users,
                overview.active_users,
                overview.pending_deposits,
                overview.pending_withdrawals,
                overview.pending_submissions,
                overview.total_paid_out
            )
        });
    }
    let overview = session.platform.overview(&actor).await?;
    session.emit(&overview, || {
        let mut out = format!(
            "Status:          {}\n\
             Balance:         {}\n\
             Total earned:    {}\n\
             Tasks completed: {}\n\
             Tasks pending:   {}",
            view::label(&overview.status),
            overview.balance,
            overview.total_earned,
            overview.tasks_completed,
            overview.pending_tasks
        );
        if !overview.recent_transactions.is_empty() {
            out.push_str("\nRecent transactions:");
            for t in &overview.recent_transactions {
                out.push_str("\n  ");
                out.push_str(&view::transaction_line(t));
            }
        }
        out
    })
}
