//! Bounded worker pool / 有界工作池
//!
//! Query execution is capped at a small configurable number of workers to
//! bound load on the shared full-text index and relational store. Within a
//! job there is no parallelism; concurrency exists only between jobs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::WorkerConfig;
use crate::search::SearchEngine;

use super::expire::DatasetExpirer;
use super::queue::JobQueue;
use super::{JOBTYPE_EXPIRE, JOBTYPE_QUERY};

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
    worker_counts: HashMap<String, usize>,
}

impl WorkerPool {
    /// Spawn the configured workers / 启动配置数量的工作协程
    pub fn start(
        engine: Arc<SearchEngine>,
        expirer: Arc<DatasetExpirer>,
        queue: JobQueue,
        config: &WorkerConfig,
    ) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let poll_interval = Duration::from_millis(config.poll_interval_ms.max(10));
        let mut handles = Vec::new();

        for worker_id in 0..config.query_workers.max(1) {
            let engine = engine.clone();
            let queue = queue.clone();
            let shutdown_rx = shutdown_rx.clone();
            handles.push(tokio::spawn(async move {
                query_worker_loop(worker_id, engine, queue, shutdown_rx, poll_interval).await;
            }));
        }

        {
            let expirer = expirer.clone();
            let queue = queue.clone();
            let shutdown_rx = shutdown_rx.clone();
            handles.push(tokio::spawn(async move {
                expire_worker_loop(expirer, queue, shutdown_rx, poll_interval).await;
            }));
        }

        let worker_counts = HashMap::from([
            (JOBTYPE_QUERY.to_string(), config.query_workers.max(1)),
            (JOBTYPE_EXPIRE.to_string(), 1),
        ]);

        tracing::info!(
            "Worker pool started: {} query workers, 1 expiry worker",
            config.query_workers.max(1)
        );

        Self {
            handles,
            shutdown,
            worker_counts,
        }
    }

    /// Running workers per job type, for the monitoring API / 各类型工作数
    pub fn worker_counts(&self) -> &HashMap<String, usize> {
        &self.worker_counts
    }

    /// Stop all workers and wait for them / 停止并等待所有工作协程
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        futures::future::join_all(self.handles).await;
        tracing::info!("Worker pool shut down");
    }
}

async fn query_worker_loop(
    worker_id: usize,
    engine: Arc<SearchEngine>,
    queue: JobQueue,
    mut shutdown: watch::Receiver<bool>,
    poll_interval: Duration,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        match queue.claim(JOBTYPE_QUERY).await {
            Ok(Some(job)) => {
                if let Err(e) = engine.run(&job).await {
                    // 引擎未接管的基础设施错误：延迟后重试，避免任务卡死
                    tracing::error!(
                        "Query worker {}: job {} failed: {:#}",
                        worker_id,
                        job.remote_id,
                        e
                    );
                    if let Err(e) = queue.release(&job, 10).await {
                        tracing::error!("Failed to release job {}: {}", job.id, e);
                    }
                }
            }
            Ok(None) => {
                tokio::select! {
                    _ = shutdown.changed() => {}
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
            Err(e) => {
                tracing::error!("Query worker {}: claim failed: {}", worker_id, e);
                tokio::time::sleep(poll_interval).await;
            }
        }
    }
    tracing::debug!("Query worker {} stopped", worker_id);
}

async fn expire_worker_loop(
    expirer: Arc<DatasetExpirer>,
    queue: JobQueue,
    mut shutdown: watch::Receiver<bool>,
    poll_interval: Duration,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        match queue.claim(JOBTYPE_EXPIRE).await {
            Ok(Some(job)) => {
                if let Err(e) = expirer.run(&job).await {
                    tracing::error!("Dataset expiry sweep failed: {:#}", e);
                    if let Err(e) = queue.release(&job, 60).await {
                        tracing::error!("Failed to release expiry job {}: {}", job.id, e);
                    }
                }
            }
            Ok(None) => {
                tokio::select! {
                    _ = shutdown.changed() => {}
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
            Err(e) => {
                tracing::error!("Expiry worker: claim failed: {}", e);
                tokio::time::sleep(poll_interval).await;
            }
        }
    }
    tracing::debug!("Expiry worker stopped");
}
