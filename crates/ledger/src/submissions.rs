//! Submission tracker: one proof per (user, task), decided once by an
//! admin.

use serde::{Deserialize, Serialize};
use taskripple_storage::{
    LedgerStorage, SubmissionFilter, SubmissionRecord, SubmissionStatus, TransactionRecord,
};
use tracing::{debug, info};

use crate::atomic::settle;
use crate::engine;
use crate::error::{LedgerError, OrMissing};
use crate::ids;

/// Evidence attached to a submission. Both parts are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Proof {
    #[serde(default)]
    pub text: Option<String>,
    /// Opaque reference to a hosted image.
    #[serde(default)]
    pub image_ref: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionOutcome {
    pub submission: SubmissionRecord,
    /// The reward paid, when this call approved the submission.
    pub reward: Option<TransactionRecord>,
    /// False when the submission had already been decided and nothing
    /// changed.
    pub applied: bool,
}

/// Create a PENDING submission and capture the task's current reward on
/// it.
pub async fn submit<S: LedgerStorage>(
    storage: &S,
    user_id: &str,
    task_id: &str,
    proof: Proof,
) -> Result<SubmissionRecord, LedgerError> {
    let mut snapshot = storage.begin_snapshot().await?;
    let outcome: Result<SubmissionRecord, LedgerError> = async {
        let task = storage
            .get_task_for_update(&mut snapshot, task_id)
            .await
            .or_missing(|| LedgerError::TaskNotFound(task_id.to_string()))?;
        if storage
            .find_submission(&mut snapshot, user_id, task_id)
            .await?
            .is_some()
        {
            return Err(LedgerError::DuplicateSubmission {
                user_id: user_id.to_string(),
                task_id: task_id.to_string(),
            });
        }
        let submission = SubmissionRecord {
            id: ids::new_id(),
            task_id: task_id.to_string(),
            user_id: user_id.to_string(),
            text_proof: proof.text,
            image_proof_ref: proof.image_ref,
            status: SubmissionStatus::Pending,
            reward: Some(task.reward),
            submitted_at: ids::now_rfc3339(),
        };
        storage
            .insert_submission(&mut snapshot, submission.clone())
            .await?;
        Ok(submission)
    }
    .await;
    let submission = settle(storage, snapshot, "submit_task", outcome).await?;
    info!(user_id, task_id, submission_id = %submission.id, "task submitted");
    Ok(submission)
}

/// Approve or reject a PENDING submission. Approval credits the reward in
/// the same snapshot as the status change. Deciding an already-decided
/// submission changes nothing.
pub async fn decide<S: LedgerStorage>(
    storage: &S,
    submission_id: &str,
    decision: Decision,
) -> Result<DecisionOutcome, LedgerError> {
    let mut snapshot = storage.begin_snapshot().await?;
    let outcome = decide_in(storage, &mut snapshot, submission_id, decision).await;
    let decided = settle(storage, snapshot, "decide_submission", outcome).await?;

    if !decided.applied {
        debug!(submission_id, status = ?decided.submission.status, "submission already decided");
    } else if let Some(reward) = &decided.reward {
        info!(
            submission_id,
            user_id = %reward.user_id,
            amount = %reward.amount,
            transaction_id = %reward.id,
            "submission approved"
        );
    } else {
        info!(submission_id, "submission rejected");
    }
    Ok(decided)
}

async fn decide_in<S: LedgerStorage>(
    storage: &S,
    snapshot: &mut S::Snapshot,
    submission_id: &str,
    decision: Decision,
) -> Result<DecisionOutcome, LedgerError> {
    let mut submission = storage
        .get_submission_for_update(snapshot, submission_id)
        .await
        .or_missing(|| LedgerError::SubmissionNotFound(submission_id.to_string()))?;
    if submission.status != SubmissionStatus::Pending {
        return Ok(DecisionOutcome {
            submission,
            reward: None,
            applied: false,
        });
    }

    let reward = match decision {
        Decision::Approved => {
            submission.status = SubmissionStatus::Approved;
            Some(engine::credit_task_reward_in(storage, snapshot, &submission).await?)
        }
        Decision::Rejected => {
            submission.status = SubmissionStatus::Rejected;
            None
        }
    };
    storage
        .update_submission(snapshot, submission.clone())
        .await?;
    Ok(DecisionOutcome {
        submission,
        reward,
        applied: true,
    })
}

pub async fn get<S: LedgerStorage>(
    storage: &S,
    submission_id: &str,
) -> Result<SubmissionRecord, LedgerError> {
    storage
        .get_submission(submission_id)
        .await
        .or_missing(|| LedgerError::SubmissionNotFound(submission_id.to_string()))
}

/// Submissions matching `filter`, in submission order.
pub async fn list<S: LedgerStorage>(
    storage: &S,
    filter: &SubmissionFilter,
) -> Result<Vec<SubmissionRecord>, LedgerError> {
    Ok(storage.list_submissions(filter).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{self, NewTask};
    use crate::registry::{self, Registration};
    use rust_decimal::Decimal;
    use taskripple_storage::{
        AccountRecord, CollectionStorage, MemoryStore, ProofType, TaskRecord, TransactionFilter,
        TransactionKind,
    };

    type Storage = CollectionStorage<MemoryStore>;

    async fn setup() -> (Storage, AccountRecord, TaskRecord) {
        let s = CollectionStorage::open(MemoryStore::new()).await.unwrap();
        let user = registry::register(
            &s,
            Registration {
                full_name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                phone: "555".to_string(),
                secret: "pw".to_string(),
                referral_code: None,
            },
        )
        .await
        .unwrap();
        let task = catalog::create(
            &s,
            NewTask {
                title: "Join Telegram Channel".to_string(),
                description: String::new(),
                reward: Decimal::new(50, 2),
                requirements: vec![],
                proof_type: ProofType::Image,
            },
        )
        .await
        .unwrap();
        (s, user, task)
    }

    fn proof() -> Proof {
        Proof {
            text: Some("done".to_string()),
            image_ref: Some("https://img.example/1.png".to_string()),
        }
    }

    #[tokio::test]
    async fn submit_captures_reward_and_starts_pending() {
        let (s, user, task) = setup().await;
        let sub = submit(&s, &user.id, &task.id, proof()).await.unwrap();
        assert_eq!(sub.status, SubmissionStatus::Pending);
        assert_eq!(sub.reward, Some(Decimal::new(50, 2)));
        assert_eq!(sub.image_proof_ref.as_deref(), Some("https://img.example/1.png"));
    }

    #[tokio::test]
    async fn submit_unknown_task_fails() {
        let (s, user, _) = setup().await;
        assert!(matches!(
            submit(&s, &user.id, "nope", proof()).await,
            Err(LedgerError::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn resubmission_fails_even_after_rejection() {
        let (s, user, task) = setup().await;
        let sub = submit(&s, &user.id, &task.id, proof()).await.unwrap();
        decide(&s, &sub.id, Decision::Rejected).await.unwrap();
        let err = submit(&s, &user.id, &task.id, proof()).await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateSubmission { .. }));
    }

    #[tokio::test]
    async fn approval_credits_once() {
        let (s, user, task) = setup().await;
        let sub = submit(&s, &user.id, &task.id, proof()).await.unwrap();

        let first = decide(&s, &sub.id, Decision::Approved).await.unwrap();
        assert!(first.applied);
        assert_eq!(first.submission.status, SubmissionStatus::Approved);
        let reward = first.reward.unwrap();
        assert_eq!(reward.kind, TransactionKind::TaskReward);
        assert_eq!(reward.metadata.task_id.as_deref(), Some(task.id.as_str()));

        let second = decide(&s, &sub.id, Decision::Approved).await.unwrap();
        assert!(!second.applied);
        assert!(second.reward.is_none());
        let third = decide(&s, &sub.id, Decision::Rejected).await.unwrap();
        assert_eq!(third.submission.status, SubmissionStatus::Approved);

        assert_eq!(
            s.get_account(&user.id).await.unwrap().balance,
            Decimal::new(50, 2)
        );
        let rewards = s
            .list_transactions(&TransactionFilter::all().kind(TransactionKind::TaskReward))
            .await
            .unwrap();
        assert_eq!(rewards.len(), 1);
    }

    #[tokio::test]
    async fn approval_after_task_deletion_pays_snapshot() {
        let (s, user, task) = setup().await;
        let sub = submit(&s, &user.id, &task.id, proof()).await.unwrap();
        assert!(catalog::delete(&s, &task.id).await.unwrap());

        let outcome = decide(&s, &sub.id, Decision::Approved).await.unwrap();
        assert_eq!(outcome.reward.unwrap().amount, Decimal::new(50, 2));
    }

    #[tokio::test]
    async fn approval_without_snapshot_or_task_rolls_back() {
        let (s, user, _) = setup().await;
        let mut snap = s.begin_snapshot().await.unwrap();
        s.insert_submission(
            &mut snap,
            SubmissionRecord {
                id: "legacy".to_string(),
                task_id: "gone".to_string(),
                user_id: user.id.clone(),
                text_proof: None,
                image_proof_ref: None,
                status: SubmissionStatus::Pending,
                reward: None,
                submitted_at: ids::now_rfc3339(),
            },
        )
        .await
        .unwrap();
        s.commit_snapshot(snap).await.unwrap();

        let err = decide(&s, "legacy", Decision::Approved).await.unwrap_err();
        assert!(matches!(err, LedgerError::TaskNotFound(_)));
        assert_eq!(
            get(&s, "legacy").await.unwrap().status,
            SubmissionStatus::Pending
        );
    }

    #[tokio::test]
    async fn decide_unknown_submission_fails() {
        let (s, _, _) = setup().await;
        assert!(matches!(
            decide(&s, "nope", Decision::Rejected).await,
            Err(LedgerError::SubmissionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_filters_by_user_and_status() {
        let (s, user, task) = setup().await;
        let sub = submit(&s, &user.id, &task.id, proof()).await.unwrap();
        let pending = list(&s, &SubmissionFilter::all().status(SubmissionStatus::Pending))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, sub.id);
        assert!(list(&s, &SubmissionFilter::all().user("someone-else"))
            .await
            .unwrap()
            .is_empty());
    }
}
