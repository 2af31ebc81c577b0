//! Internal monitoring API / 内部监控API
//!
//! Line-oriented JSON request/response over a local TCP socket. External
//! monitoring polls aggregate questions here: how many workers run, how many
//! jobs are queued per type, how many posts/threads were ingested in the
//! last minute/hour/day. The query engine itself never calls this; it only
//! has to keep job and queue state readable so answers stay truthful.
//!
//! Request: `{"request": "workers" | "jobs" | "posts" | "threads"}`.
//! Response: `{"error": false, "response": ...}` or an error object.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::config::DataSourceConfig;
use crate::task::JobQueue;

/// Read at most this much of a request before giving up / 请求大小上限
const MAX_REQUEST_BYTES: usize = 2048;

#[derive(Clone)]
pub struct ApiServer {
    db: SqlitePool,
    queue: JobQueue,
    worker_counts: HashMap<String, usize>,
    datasources: Vec<DataSourceConfig>,
}

impl ApiServer {
    pub fn new(
        db: SqlitePool,
        queue: JobQueue,
        worker_counts: HashMap<String, usize>,
        datasources: Vec<DataSourceConfig>,
    ) -> Self {
        Self {
            db,
            queue,
            worker_counts,
            datasources,
        }
    }

    /// Bind and serve forever / 绑定并持续服务
    pub async fn serve(self, bind_addr: &str) -> Result<()> {
        let listener = TcpListener::bind(bind_addr).await?;
        tracing::info!("Local API listening for requests at {}", bind_addr);
        self.serve_on(listener).await
    }

    pub async fn serve_on(self, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, address) = listener.accept().await?;
            let server = self.clone();
            tokio::spawn(async move {
                if let Err(e) = server.handle_connection(stream).await {
                    // 无效请求不是值得告警的事件
                    tracing::info!("API request from {} not answered: {}", address, e);
                }
            });
        }
    }

    async fn handle_connection(&self, mut stream: TcpStream) -> Result<()> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];

        // 一旦缓冲区成为合法JSON就开始处理
        let payload: Option<Value> = loop {
            let read = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut chunk)).await;
            let n = match read {
                Ok(Ok(n)) => n,
                Ok(Err(_)) | Err(_) => break None,
            };
            if n == 0 {
                break serde_json::from_slice(&buffer).ok();
            }
            buffer.extend_from_slice(&chunk[..n]);
            if let Ok(value) = serde_json::from_slice::<Value>(&buffer) {
                break Some(value);
            }
            if buffer.len() > MAX_REQUEST_BYTES {
                break None;
            }
        };

        let response = match payload
            .as_ref()
            .and_then(|p| p.get("request"))
            .and_then(|r| r.as_str())
        {
            Some(request) => self.process_request(request).await,
            None => None,
        };

        let reply = match response {
            Some(response) => json!({ "error": false, "response": response }),
            None => json!({ "error": "Invalid JSON" }),
        };
        stream.write_all(reply.to_string().as_bytes()).await?;
        stream.write_all(b"\n").await?;
        stream.shutdown().await?;

        Ok(())
    }

    /// Generate the response for one request type / 生成单个请求的响应
    async fn process_request(&self, request: &str) -> Option<Value> {
        match request {
            "workers" => {
                // 各类型工作数量
                let mut workers = serde_json::Map::new();
                let total: usize = self.worker_counts.values().sum();
                for (jobtype, count) in &self.worker_counts {
                    workers.insert(jobtype.clone(), json!(count));
                }
                workers.insert("total".to_string(), json!(total));
                Some(Value::Object(workers))
            }
            "jobs" => {
                // 排队任务，按类型统计
                let counts = self.queue.counts_by_type().await.ok()?;
                let mut jobs = serde_json::Map::new();
                let total: i64 = counts.iter().map(|(_, n)| n).sum();
                for (jobtype, count) in counts {
                    jobs.insert(jobtype, json!(count));
                }
                jobs.insert("total".to_string(), json!(total));
                Some(Value::Object(jobs))
            }
            "posts" => self.ingest_counts("posts", "timestamp").await,
            "threads" => self.ingest_counts("threads", "timestamp_scraped").await,
            _ => None,
        }
    }

    /// Items ingested in the last minute/hour/day across all sources
    /// 最近一分钟/小时/一天的入库数量
    async fn ingest_counts(&self, table: &str, field: &str) -> Option<Value> {
        let now = Utc::now().timestamp();
        let mut counts = HashMap::from([("1m", 0i64), ("1h", 0i64), ("1d", 0i64)]);

        for datasource in &self.datasources {
            for (bucket, cutoff) in [("1m", now - 60), ("1h", now - 3600), ("1d", now - 86400)] {
                let sql = format!(
                    "SELECT COUNT(*) FROM {}_{} WHERE {} > ?",
                    table, datasource.prefix, field
                );
                let count: i64 = sqlx::query_scalar(&sql)
                    .bind(cutoff)
                    .fetch_one(&self.db)
                    .await
                    .ok()?;
                *counts.entry(bucket).or_insert(0) += count;
            }
        }

        Some(json!({
            "1m": counts["1m"],
            "1h": counts["1h"],
            "1d": counts["1d"],
        }))
    }
}
