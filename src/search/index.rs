//! Full-text index failure taxonomy / 全文索引失败分类
//!
//! The engine cares about exactly two failure classes: the backend ran out
//! of its time budget (recoverable, user narrows the query), or it faulted
//! outright. Both end the job cleanly with zero rows; they differ in status
//! text and log severity.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    /// The query exceeded the configured time budget / 查询超出时间预算
    #[error("index query timed out after {elapsed:.1?}")]
    Timeout { elapsed: Duration },

    /// Any other backend fault (malformed predicate, service error) / 后端故障
    #[error("index backend error: {0}")]
    Backend(#[from] sqlx::Error),
}
