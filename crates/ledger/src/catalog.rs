//! Task catalog.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use taskripple_storage::{LedgerStorage, ProofType, TaskRecord};
use tracing::info;

use crate::atomic::settle;
use crate::error::{LedgerError, OrMissing};
use crate::ids;

/// Input to [`create`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub reward: Decimal,
    #[serde(default)]
    pub requirements: Vec<String>,
    pub proof_type: ProofType,
}

impl NewTask {
    fn validate(&self) -> Result<(), LedgerError> {
        if self.title.trim().is_empty() {
            return Err(LedgerError::InvalidTask("title must not be empty".to_string()));
        }
        if self.reward <= Decimal::ZERO {
            return Err(LedgerError::InvalidTask(format!(
                "reward must be positive, got {}",
                self.reward
            )));
        }
        Ok(())
    }
}

pub async fn create<S: LedgerStorage>(
    storage: &S,
    task: NewTask,
) -> Result<TaskRecord, LedgerError> {
    task.validate()?;
    let record = TaskRecord {
        id: ids::new_id(),
        title: task.title,
        description: task.description,
        reward: task.reward,
        requirements: task.requirements,
        proof_type: task.proof_type,
        created_at: ids::now_rfc3339(),
    };
    insert(storage, record).await
}

/// Insert a fully-formed task, keeping its id. Used for seeding.
pub(crate) async fn insert<S: LedgerStorage>(
    storage: &S,
    record: TaskRecord,
) -> Result<TaskRecord, LedgerError> {
    let mut snapshot = storage.begin_snapshot().await?;
    let outcome = storage
        .insert_task(&mut snapshot, record.clone())
        .await
        .map_err(LedgerError::from);
    settle(storage, snapshot, "create_task", outcome).await?;
    info!(task_id = %record.id, reward = %record.reward, "task created");
    Ok(record)
}

/// Remove a task. Submissions that reference it keep their reward
/// snapshot and can still be approved. Returns `false` for an unknown id.
pub async fn delete<S: LedgerStorage>(storage: &S, task_id: &str) -> Result<bool, LedgerError> {
    let mut snapshot = storage.begin_snapshot().await?;
    let outcome = storage
        .delete_task(&mut snapshot, task_id)
        .await
        .map_err(LedgerError::from);
    let removed = settle(storage, snapshot, "delete_task", outcome).await?;
    if removed {
        info!(task_id, "task deleted");
    }
    Ok(removed)
}

pub async fn get<S: LedgerStorage>(storage: &S, task_id: &str) -> Result<TaskRecord, LedgerError> {
    storage
        .get_task(task_id)
        .await
        .or_missing(|| LedgerError::TaskNotFound(task_id.to_string()))
}

/// Tasks in insertion order, optionally only those asking for one proof
/// type.
pub async fn list<S: LedgerStorage>(
    storage: &S,
    proof_type: Option<ProofType>,
) -> Result<Vec<TaskRecord>, LedgerError> {
    Ok(storage
        .list_tasks()
        .await?
        .into_iter()
        .filter(|t| proof_type.map_or(true, |p| t.proof_type == p))
        .collect())
}
