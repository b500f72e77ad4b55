//! Administrator commands. The platform rejects them for non-admin callers.

use taskripple_ledger::storage::{AccountStatus, Role, TransactionFilter, TransactionRecord};
use taskripple_ledger::{Decision, LedgerError};

use super::{lines, CliError, Session};
use crate::view::{self, AccountView, ActivationView};

pub(crate) async fn cmd_approve_activation(
    session: &Session,
    transaction_id: &str,
) -> Result<(), CliError> {
    let actor = session.actor().await?;
    let outcome = ActivationView::from(
        session
            .platform
            .approve_activation(&actor, transaction_id)
            .await?,
    );
    session.emit(&outcome, || {
        let mut out = format!(
            "Activated {}; {} commission(s) paid",
            outcome.account.id,
            outcome.commissions.len()
        );
        for c in &outcome.commissions {
            out.push_str(&format!(
                "\n  level {}  {}  {}",
                c.metadata.level.unwrap_or_default(),
                c.user_id,
                c.amount
            ));
        }
        out
    })
}

fn decided(verb: &str, t: &TransactionRecord) -> String {
    format!("{} transaction {} ({})", verb, t.id, view::label(&t.status))
}

pub(crate) async fn cmd_reject_activation(
    session: &Session,
    transaction_id: &str,
) -> Result<(), CliError> {
    let actor = session.actor().await?;
    let deposit = session
        .platform
        .reject_activation(&actor, transaction_id)
        .await?;
    session.emit(&deposit, || decided("Rejected", &deposit))
}

pub(crate) async fn cmd_decide_submission(
    session: &Session,
    submission_id: &str,
    decision: Decision,
) -> Result<(), CliError> {
    let actor = session.actor().await?;
    let outcome = session
        .platform
        .decide_submission(&actor, submission_id, decision)
        .await?;
    session.emit(&outcome, || {
        let status = view::label(&outcome.submission.status);
        if !outcome.applied {
            return format!("Submission {} was already {}", submission_id, status);
        }
        match &outcome.reward {
            Some(reward) => format!(
                "Submission {} {}; credited {} to {}",
                submission_id, status, reward.amount, reward.user_id
            ),
            None => format!("Submission {} {}", submission_id, status),
        }
    })
}

pub(crate) async fn cmd_approve_withdrawal(
    session: &Session,
    transaction_id: &str,
) -> Result<(), CliError> {
    let actor = session.actor().await?;
    let withdrawal = session
        .platform
        .approve_withdrawal(&actor, transaction_id)
        .await?;
    session.emit(&withdrawal, || decided("Approved", &withdrawal))
}

pub(crate) async fn cmd_reject_withdrawal(
    session: &Session,
    transaction_id: &str,
) -> Result<(), CliError> {
    let actor = session.actor().await?;
    let withdrawal = session
        .platform
        .reject_withdrawal(&actor, transaction_id)
        .await?;
    session.emit(&withdrawal, || decided("Rejected", &withdrawal))
}

pub(crate) async fn cmd_set_status(
    session: &Session,
    account_id: &str,
    status: AccountStatus,
) -> Result<(), CliError> {
    let actor = session.actor().await?;
    let account = session
        .platform
        .set_status(&actor, account_id, status)
        .await?
        .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;
    let view = AccountView::from(&account);
    session.emit(&view, || {
        format!("Account {} is now {}", view.id, view::label(&view.status))
    })
}

pub(crate) async fn cmd_set_role(
    session: &Session,
    account_id: &str,
    role: Role,
) -> Result<(), CliError> {
    let actor = session.actor().await?;
    let account = session
        .platform
        .set_role(&actor, account_id, role)
        .await?
        .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;
    let view = AccountView::from(&account);
    session.emit(&view, || {
        format!("Account {} is now {}", view.id, view::label(&view.role))
    })
}

pub(crate) async fn cmd_users(session: &Session) -> Result<(), CliError> {
    let actor = session.actor().await?;
    let accounts = view::accounts(&session.platform.list_accounts(&actor).await?);
    session.emit(&accounts, || lines(&accounts, "No accounts", view::account_line))
}

pub(crate) async fn cmd_transactions(
    session: &Session,
    filter: &TransactionFilter,
) -> Result<(), CliError> {
    let actor = session.actor().await?;
    let transactions = session.platform.transactions(&actor, filter).await?;
    session.emit(&transactions, || {
        lines(&transactions, "No transactions", view::transaction_line)
    })
}

pub(crate) async fn cmd_pending(session: &Session) -> Result<(), CliError> {
    let actor = session.actor().await?;
    let queue = session.platform.pending(&actor).await?;
    session.emit(&queue, || {
        format!(
            "Deposits ({}):\n{}\nWithdrawals ({}):\n{}\nSubmissions ({}):\n{}",
            queue.deposits.len(),
            lines(&queue.deposits, "  none", |t| format!("  {}", view::transaction_line(t))),
            queue.withdrawals.len(),
            lines(&queue.withdrawals, "  none", |t| format!("  {}", view::transaction_line(t))),
            queue.submissions.len(),
            lines(&queue.submissions, "  none", |s| format!("  {}", view::submission_line(s))),
        )
    })
}

pub(crate) async fn cmd_reconcile(session: &Session) -> Result<(), CliError> {
    let actor = session.actor().await?;
    let report = session.platform.reconcile(&actor).await?;
    session.emit(&report, || {
        if report.is_balanced() {
            return format!(
                "Balanced: {} account(s) match their completed transactions",
                report.accounts_checked
            );
        }
        let mut out = format!(
            "{} discrepancy(ies) across {} account(s):",
            report.discrepancies.len(),
            report.accounts_checked
        );
        for d in &report.discrepancies {
            out.push_str(&format!(
                "\n  {}  recorded {}  expected {}",
                d.account_id, d.recorded, d.expected
            ));
        }
        out
    })
}
