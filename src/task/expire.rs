//! Dataset expiry worker / 数据集过期清理
//!
//! Recurring job: data sources may be configured to automatically delete
//! old datasets. The sweep deletes qualifying datasets (row, result file
//! and pending jobs) and re-queues itself by releasing its own job with the
//! configured interval.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::config::DataSourceConfig;
use crate::dataset::Dataset;

use super::models::Job;
use super::queue::JobQueue;

pub struct DatasetExpirer {
    db: SqlitePool,
    queue: JobQueue,
    results_dir: PathBuf,
    datasources: Vec<DataSourceConfig>,
    interval_secs: i64,
}

impl DatasetExpirer {
    pub fn new(
        db: SqlitePool,
        queue: JobQueue,
        results_dir: PathBuf,
        datasources: Vec<DataSourceConfig>,
        interval_secs: i64,
    ) -> Self {
        Self {
            db,
            queue,
            results_dir,
            datasources,
            interval_secs,
        }
    }

    /// One sweep over all configured data sources / 扫描一轮所有数据源
    pub async fn run(&self, job: &Job) -> Result<()> {
        for datasource in &self.datasources {
            // 默认永不过期
            let Some(expire_after) = datasource.expire_after_secs else {
                continue;
            };

            let cutoff = Utc::now().timestamp() - expire_after;
            let keys: Vec<String> = sqlx::query_scalar(
                "SELECT key FROM queries \
                 WHERE timestamp < ? AND json_extract(parameters, '$.datasource') = ?",
            )
            .bind(cutoff)
            .bind(&datasource.name)
            .fetch_all(&self.db)
            .await?;

            for key in keys {
                if let Some(dataset) = Dataset::load(&self.db, &key).await? {
                    dataset.delete(&self.results_dir).await?;
                    tracing::info!(
                        "Deleted dataset {}/{} (expired per configuration)",
                        datasource.name,
                        key
                    );
                }
            }
        }

        // 释放而非完成：任务按间隔周期性重投
        self.queue.release(job, self.interval_secs).await?;
        Ok(())
    }
}
