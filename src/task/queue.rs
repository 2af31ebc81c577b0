//! SQLite-backed job queue / 基于SQLite的任务队列
//!
//! The queue guarantees a single job key maps to at most one running
//! execution: claiming happens inside one transaction, and a claimed job is
//! invisible until finished or released. The engine relies on that and does
//! not lock on its own.

use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;

use super::models::Job;

#[derive(Clone)]
pub struct JobQueue {
    db: SqlitePool,
}

impl JobQueue {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Queue a job; duplicates per (jobtype, remote_id) are ignored / 入队
    pub async fn add_job(&self, jobtype: &str, remote_id: &str, delay_secs: i64) -> Result<()> {
        let now = Utc::now().timestamp();
        sqlx::query(
            "INSERT OR IGNORE INTO jobs (jobtype, remote_id, timestamp, claim_after) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(jobtype)
        .bind(remote_id)
        .bind(now)
        .bind(now + delay_secs.max(0))
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// Claim the oldest available job of a type, if any / 认领任务
    pub async fn claim(&self, jobtype: &str) -> Result<Option<Job>> {
        let now = Utc::now().timestamp();
        let mut tx = self.db.begin().await?;

        let job: Option<Job> = sqlx::query_as(
            "SELECT id, jobtype, remote_id, details, timestamp, claim_after, claimed_at, attempts \
             FROM jobs \
             WHERE jobtype = ? AND claimed_at = 0 AND claim_after <= ? \
             ORDER BY timestamp ASC LIMIT 1",
        )
        .bind(jobtype)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let job = match job {
            Some(mut job) => {
                sqlx::query("UPDATE jobs SET claimed_at = ?, attempts = attempts + 1 WHERE id = ?")
                    .bind(now)
                    .bind(job.id)
                    .execute(&mut *tx)
                    .await?;
                job.claimed_at = now;
                job.attempts += 1;
                Some(job)
            }
            None => None,
        };

        tx.commit().await?;
        Ok(job)
    }

    /// Finish a job: remove it from the queue / 完成任务（出队）
    pub async fn finish(&self, job: &Job) -> Result<()> {
        sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(job.id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Unclaim a job so it is re-delivered after `delay_secs` / 释放任务
    pub async fn release(&self, job: &Job, delay_secs: i64) -> Result<()> {
        sqlx::query("UPDATE jobs SET claimed_at = 0, claim_after = ? WHERE id = ?")
            .bind(Utc::now().timestamp() + delay_secs.max(0))
            .bind(job.id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Queued jobs by type, for the monitoring API / 按类型统计排队任务
    pub async fn counts_by_type(&self) -> Result<Vec<(String, i64)>> {
        let counts = sqlx::query_as::<_, (String, i64)>(
            "SELECT jobtype, COUNT(*) FROM jobs GROUP BY jobtype",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(counts)
    }
}
