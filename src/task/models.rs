//! Queue row types / 队列行类型

use serde::{Deserialize, Serialize};

/// One queued job / 单个排队任务
///
/// `remote_id` is an opaque key; for query jobs it resolves to a dataset.
/// `claimed_at` is 0 while the job is up for grabs; `claim_after` delays
/// re-delivery after a release.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: i64,
    pub jobtype: String,
    pub remote_id: String,
    pub details: Option<String>,
    pub timestamp: i64,
    pub claim_after: i64,
    pub claimed_at: i64,
    pub attempts: i64,
}
