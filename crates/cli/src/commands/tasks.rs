//! Task catalog and submission commands.

use serde_json::json;
use taskripple_ledger::storage::ProofType;
use taskripple_ledger::{NewTask, Proof};

use super::{lines, CliError, Session};
use crate::view;

pub(crate) async fn cmd_list(
    session: &Session,
    proof_type: Option<ProofType>,
) -> Result<(), CliError> {
    let tasks = session.platform.list_tasks(proof_type).await?;
    session.emit(&tasks, || lines(&tasks, "No tasks", view::task_line))
}

pub(crate) async fn cmd_create(session: &Session, task: NewTask) -> Result<(), CliError> {
    let actor = session.actor().await?;
    let task = session.platform.create_task(&actor, task).await?;
    session.emit(&task, || {
        format!("Created task {} '{}' paying {}", task.id, task.title, task.reward)
    })
}

pub(crate) async fn cmd_delete(session: &Session, task_id: &str) -> Result<(), CliError> {
    let actor = session.actor().await?;
    let deleted = session.platform.delete_task(&actor, task_id).await?;
    session.emit(&json!({ "task_id": task_id, "deleted": deleted }), || {
        if deleted {
            format!("Deleted task {}", task_id)
        } else {
            format!("No task {}; nothing deleted", task_id)
        }
    })
}

pub(crate) async fn cmd_submit(
    session: &Session,
    task_id: &str,
    proof: Proof,
) -> Result<(), CliError> {
    let actor = session.actor().await?;
    let submission = session.platform.submit_task(&actor, task_id, proof).await?;
    session.emit(&submission, || {
        format!(
            "Submitted {} for task {}, awaiting review",
            submission.id, submission.task_id
        )
    })
}

pub(crate) async fn cmd_my_submissions(session: &Session) -> Result<(), CliError> {
    let actor = session.actor().await?;
    let submissions = session.platform.my_submissions(&actor).await?;
    session.emit(&submissions, || {
        lines(&submissions, "No submissions", view::submission_line)
    })
}
