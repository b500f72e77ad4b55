use crate::record::{
    SubmissionRecord, SubmissionStatus, TransactionKind, TransactionRecord, TransactionStatus,
};

/// Filter for transaction listings. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub user_id: Option<String>,
    pub kind: Option<TransactionKind>,
    pub status: Option<TransactionStatus>,
}

impl TransactionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, record: &TransactionRecord) -> bool {
        self.user_id.as_deref().map_or(true, |u| record.user_id == u)
            && self.kind.map_or(true, |k| record.kind == k)
            && self.status.map_or(true, |s| record.status == s)
    }
}

/// Filter for submission listings. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionFilter {
    pub user_id: Option<String>,
    pub task_id: Option<String>,
    pub status: Option<SubmissionStatus>,
}

impl SubmissionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn task(mut self, task_id: &str) -> Self {
        self.task_id = Some(task_id.to_string());
        self
    }

    pub fn status(mut self, status: SubmissionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, record: &SubmissionRecord) -> bool {
        self.user_id.as_deref().map_or(true, |u| record.user_id == u)
            && self.task_id.as_deref().map_or(true, |t| record.task_id == t)
            && self.status.map_or(true, |s| record.status == s)
    }
}
