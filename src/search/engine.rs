//! Query orchestrator / 查询编排器
//!
//! Owns the lifecycle of one query job: resolve the dataset, pick exactly
//! one mode executor, write the result artifact and finalize dataset and
//! job. The outcome contract is three-way: a populated result, an explicit
//! empty result (header-only file), or null, a backend failure the executor
//! already reported through the status text.
//!
//! No failure here is fatal to the process; every path ends in a finished
//! job, never a stuck one.

use std::path::PathBuf;

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config;
use crate::dataset::Dataset;
use crate::datasource::DataSourceRegistry;
use crate::models::{PostRecord, QueryMode};
use crate::output;
use crate::task::{Job, JobQueue};

use super::{country, fulltext, random, StatusSink};

const STATUS_BACKEND_ERROR: &str =
    "Error during query. Administrators have been notified; try again later.";

pub struct SearchEngine {
    db: SqlitePool,
    queue: JobQueue,
    sources: DataSourceRegistry,
    results_dir: PathBuf,
}

impl SearchEngine {
    pub fn new(
        db: SqlitePool,
        queue: JobQueue,
        sources: DataSourceRegistry,
        results_dir: PathBuf,
    ) -> Self {
        Self {
            db,
            queue,
            sources,
            results_dir,
        }
    }

    /// Run one query job end to end / 端到端执行一个查询任务
    ///
    /// The job is finished exactly once on every path, including the
    /// no-ops: a deleted dataset was a deliberate user choice and a
    /// re-delivered finished one must not execute again.
    pub async fn run(&self, job: &Job) -> Result<()> {
        let key = job.remote_id.as_str();

        let mut dataset = match Dataset::load(&self.db, key).await? {
            Some(dataset) => dataset,
            None => {
                tracing::info!("Query job {} refers to non-existent query, finishing", key);
                self.queue.finish(job).await?;
                return Ok(());
            }
        };

        if dataset.is_finished() {
            tracing::info!(
                "Worker started for query {}, but query is already finished",
                key
            );
            self.queue.finish(job).await?;
            return Ok(());
        }

        dataset.update_version(&config::software_version()).await;

        let spec = match dataset.parameters() {
            Ok(spec) => spec,
            Err(e) => {
                tracing::error!("Query {} has unreadable parameters: {}", key, e);
                dataset.update_status(STATUS_BACKEND_ERROR).await;
                dataset.finish(0).await;
                self.queue.finish(job).await?;
                return Ok(());
            }
        };

        let source = match self.sources.get(&spec.datasource).await {
            Some(source) => source,
            None => {
                tracing::error!(
                    "Query {} references unregistered data source {:?}",
                    key,
                    spec.datasource
                );
                dataset.update_status(STATUS_BACKEND_ERROR).await;
                dataset.finish(0).await;
                self.queue.finish(job).await?;
                return Ok(());
            }
        };

        // 每个任务只运行一个模式执行器
        let result = match spec.mode() {
            QueryMode::RandomSample => random::execute(&spec, source.as_ref(), &dataset)
                .await
                .map(Some),
            QueryMode::Country => country::execute(&spec, source.as_ref(), &dataset)
                .await
                .map(Some),
            QueryMode::FullText => fulltext::execute(&spec, source.as_ref(), &dataset).await,
        };

        // 执行器边界外冒出的存储错误与索引崩溃同等对待：null结果
        let posts: Option<Vec<PostRecord>> = match result {
            Ok(posts) => posts,
            Err(e) => {
                tracing::error!("Backend error during query {}: {:#}", key, e);
                dataset.update_status(STATUS_BACKEND_ERROR).await;
                None
            }
        };

        let num_rows = match posts {
            Some(posts) => {
                if !posts.is_empty() {
                    dataset.update_status("Writing posts to result file").await;
                }
                let path = dataset.results_path(&self.results_dir);
                match output::posts_to_csv(&posts, &path) {
                    Ok(written) => {
                        if posts.is_empty() {
                            dataset
                                .update_status("Query finished, no results found.")
                                .await;
                        } else {
                            dataset
                                .update_status("Query finished, results are available.")
                                .await;
                        }
                        written as i64
                    }
                    Err(e) => {
                        tracing::error!("Failed to write result file for query {}: {:#}", key, e);
                        dataset.update_status(STATUS_BACKEND_ERROR).await;
                        0
                    }
                }
            }
            None => 0,
        };

        dataset.finish(num_rows).await;
        self.queue.finish(job).await?;
        tracing::info!("Query job {} finished with {} rows", key, num_rows);

        Ok(())
    }
}
