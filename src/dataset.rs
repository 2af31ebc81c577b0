//! Dataset records / 数据集记录
//!
//! A dataset is one row of the `queries` table: it owns the query parameters,
//! the mutable status text, the completion state and the result file name.
//! The engine mutates status and completion; creation and deletion belong to
//! the front-end and the expiry worker.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::models::QuerySpec;
use crate::search::StatusSink;

pub struct Dataset {
    db: SqlitePool,
    key: String,
    query: String,
    parameters: String,
    result_file: String,
    num_rows: i64,
    is_finished: bool,
}

impl Dataset {
    /// Create and persist a new dataset / 创建并保存新数据集
    pub async fn create(db: &SqlitePool, label: &str, spec: &QuerySpec) -> Result<Self> {
        let key = uuid::Uuid::new_v4().to_string();
        let parameters = serde_json::to_string(spec)?;
        // 结果文件名只保留安全字符
        let slug: String = label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let result_file = format!("{}-{}.csv", slug, key);

        sqlx::query(
            "INSERT INTO queries (key, query, parameters, result_file, timestamp) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&key)
        .bind(label)
        .bind(&parameters)
        .bind(&result_file)
        .bind(Utc::now().timestamp())
        .execute(db)
        .await?;

        Ok(Self {
            db: db.clone(),
            key,
            query: label.to_string(),
            parameters,
            result_file,
            num_rows: 0,
            is_finished: false,
        })
    }

    /// Load a dataset by key; `None` if it no longer exists / 按键加载
    pub async fn load(db: &SqlitePool, key: &str) -> Result<Option<Self>> {
        let row = sqlx::query(
            "SELECT key, query, parameters, result_file, num_rows, is_finished \
             FROM queries WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(db)
        .await?;

        Ok(row.map(|row| Self {
            db: db.clone(),
            key: row.get("key"),
            query: row.get("query"),
            parameters: row.get("parameters"),
            result_file: row.get("result_file"),
            num_rows: row.get("num_rows"),
            is_finished: row.get::<i64, _>("is_finished") != 0,
        }))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    pub fn num_rows(&self) -> i64 {
        self.num_rows
    }

    /// Parse the stored parameters into a QuerySpec / 解析查询参数
    pub fn parameters(&self) -> Result<QuerySpec> {
        Ok(serde_json::from_str(&self.parameters)?)
    }

    /// Result file location; wildcards from board names never reach the
    /// filesystem / 结果文件路径
    pub fn results_path(&self, results_dir: &Path) -> PathBuf {
        results_dir.join(self.result_file.replace('*', ""))
    }

    /// Record the software version that processed this dataset / 记录软件版本
    pub async fn update_version(&self, version: &str) {
        if let Err(e) = sqlx::query("UPDATE queries SET software_version = ? WHERE key = ?")
            .bind(version)
            .bind(&self.key)
            .execute(&self.db)
            .await
        {
            tracing::warn!("Failed to record version for query {}: {}", self.key, e);
        }
    }

    /// Mark the dataset finished with its final row count / 标记完成
    pub async fn finish(&mut self, num_rows: i64) {
        if self.is_finished {
            tracing::warn!("Query {} finished twice", self.key);
        }
        match sqlx::query("UPDATE queries SET is_finished = 1, num_rows = ? WHERE key = ?")
            .bind(num_rows)
            .bind(&self.key)
            .execute(&self.db)
            .await
        {
            Ok(_) => {
                self.is_finished = true;
                self.num_rows = num_rows;
            }
            Err(e) => tracing::warn!("Failed to finish query {}: {}", self.key, e),
        }
    }

    /// Delete this dataset, its result file and any jobs pointing at it
    /// 删除数据集、结果文件和相关任务
    pub async fn delete(&self, results_dir: &Path) -> Result<()> {
        let path = self.results_path(results_dir);
        if path.exists() {
            std::fs::remove_file(&path).ok();
        }

        sqlx::query("DELETE FROM queries WHERE key = ?")
            .bind(&self.key)
            .execute(&self.db)
            .await?;
        sqlx::query("DELETE FROM jobs WHERE remote_id = ?")
            .bind(&self.key)
            .execute(&self.db)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl StatusSink for Dataset {
    fn key(&self) -> &str {
        &self.key
    }

    async fn update_status(&self, status: &str) {
        tracing::debug!("Query {} status: {}", self.key, status);
        if let Err(e) = sqlx::query("UPDATE queries SET status = ? WHERE key = ?")
            .bind(status)
            .bind(&self.key)
            .execute(&self.db)
            .await
        {
            tracing::warn!("Failed to update status for query {}: {}", self.key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn test_pool() -> (SqlitePool, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::connect(&format!(
            "sqlite:{}?mode=rwc",
            dir.path().join("main.db").display()
        ))
        .await
        .unwrap();
        db::run_migrations(&pool).await.unwrap();
        (pool, dir)
    }

    fn spec() -> QuerySpec {
        serde_json::from_str(r#"{"datasource": "mock", "body_query": "hello"}"#).unwrap()
    }

    #[tokio::test]
    async fn test_create_load_roundtrip() {
        let (pool, _dir) = test_pool().await;

        let dataset = Dataset::create(&pool, "hello on /v/", &spec()).await.unwrap();
        let key = dataset.key().to_string();

        let loaded = Dataset::load(&pool, &key).await.unwrap().unwrap();
        assert!(!loaded.is_finished());
        assert_eq!(loaded.parameters().unwrap().body_query, "hello");
        assert_eq!(loaded.query(), "hello on /v/");
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let (pool, _dir) = test_pool().await;
        assert!(Dataset::load(&pool, "no-such-key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_finish_persists_row_count() {
        let (pool, _dir) = test_pool().await;

        let mut dataset = Dataset::create(&pool, "q", &spec()).await.unwrap();
        dataset.finish(42).await;

        let loaded = Dataset::load(&pool, dataset.key()).await.unwrap().unwrap();
        assert!(loaded.is_finished());
        assert_eq!(loaded.num_rows(), 42);
    }

    #[tokio::test]
    async fn test_status_and_version_updates() {
        let (pool, _dir) = test_pool().await;

        let dataset = Dataset::create(&pool, "q", &spec()).await.unwrap();
        dataset.update_status("Searching for matches").await;
        dataset.update_version("0.9.2 (test)").await;

        let row = sqlx::query("SELECT status, software_version FROM queries WHERE key = ?")
            .bind(dataset.key())
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.get::<String, _>("status"), "Searching for matches");
        assert_eq!(row.get::<String, _>("software_version"), "0.9.2 (test)");
    }

    #[tokio::test]
    async fn test_results_path_strips_wildcards() {
        let (pool, _dir) = test_pool().await;

        let dataset = Dataset::create(&pool, "q", &spec()).await.unwrap();
        let path = dataset.results_path(Path::new("/tmp/results"));
        assert!(!path.to_string_lossy().contains('*'));
    }

    #[tokio::test]
    async fn test_delete_removes_row_and_jobs() {
        let (pool, dir) = test_pool().await;

        let dataset = Dataset::create(&pool, "q", &spec()).await.unwrap();
        sqlx::query("INSERT INTO jobs (jobtype, remote_id, timestamp) VALUES ('query', ?, 0)")
            .bind(dataset.key())
            .execute(&pool)
            .await
            .unwrap();

        dataset.delete(dir.path()).await.unwrap();

        assert!(Dataset::load(&pool, dataset.key()).await.unwrap().is_none());
        let jobs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(jobs, 0);
    }
}
