//! Imageboard archive adapter / 贴图板归档适配器
//!
//! Shared SQL implementation for imageboard-style sources. Each platform
//! keeps its archive in posts_<prefix>/threads_<prefix> tables of the main
//! database, plus a standalone full-text index database (index_<prefix>.db,
//! one per source) holding an FTS5 table over body/subject.
//!
//! The index connection is opened per fetch and released on every exit path,
//! including both failure branches.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, SqliteConnection, SqlitePool};

use crate::models::{MatchRecord, PostRecord, ThreadStat, RETURN_COLUMNS};
use crate::search::index::IndexError;

use super::{validate_identifier, CountryFilter, DataSource, IndexValue};

/// SQLite caps bound parameters per statement; chunk large id lists / 分块大小
const MAX_BIND_PARAMS: usize = 500;

pub struct ChanSource {
    name: String,
    prefix: String,
    db: SqlitePool,
    index_path: PathBuf,
    index_timeout: Duration,
}

impl ChanSource {
    pub fn new(
        name: &str,
        prefix: &str,
        db: SqlitePool,
        index_path: PathBuf,
        index_timeout: Duration,
    ) -> Result<Self> {
        validate_identifier(prefix)?;
        Ok(Self {
            name: name.to_string(),
            prefix: prefix.to_string(),
            db,
            index_path,
            index_timeout,
        })
    }

    /// Create the index database schema if missing / 创建索引库结构
    ///
    /// Populating and syncing the index is the ingest pipeline's job; this
    /// only guarantees queries have a table to run against.
    pub async fn ensure_index_schema(&self) -> Result<()> {
        if let Some(parent) = self.index_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let mut conn = self.open_index().await?;
        let result = sqlx::query(
            "CREATE VIRTUAL TABLE IF NOT EXISTS post_index USING fts5(\
             body, subject, post_id UNINDEXED, thread_id UNINDEXED, \
             timestamp UNINDEXED, board UNINDEXED)",
        )
        .execute(&mut conn)
        .await;
        conn.close().await.ok();
        result?;
        Ok(())
    }

    async fn open_index(&self) -> std::result::Result<SqliteConnection, sqlx::Error> {
        SqliteConnectOptions::new()
            .filename(&self.index_path)
            .create_if_missing(true)
            .connect()
            .await
    }

    /// Hydrate rows keyed on a fixed column ("id" or "thread_id") / 按列取行
    async fn fetch_rows_by(&self, column: &str, ids: &[i64]) -> Result<Vec<PostRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let columns = RETURN_COLUMNS.join(", ");
        let mut rows = Vec::new();
        for chunk in ids.chunks(MAX_BIND_PARAMS) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT {} FROM posts_{} WHERE {} IN ({})",
                columns, self.prefix, column, placeholders
            );
            let mut query = sqlx::query_as::<_, PostRecord>(&sql);
            for id in chunk {
                query = query.bind(id);
            }
            rows.extend(query.fetch_all(&self.db).await?);
        }
        Ok(rows)
    }

    /// WHERE tail shared by the two country fetches / 国家查询共用的WHERE尾部
    fn country_clause(countries: &CountryFilter, max_date: Option<i64>) -> String {
        let date_clause = if max_date.is_some() {
            "timestamp >= ? AND timestamp <= ?"
        } else {
            "timestamp >= ?"
        };
        let country_clause = match countries {
            CountryFilter::Exact(_) => "country_code = ?".to_string(),
            CountryFilter::Any(codes) => {
                format!("country_code IN ({})", vec!["?"; codes.len()].join(", "))
            }
        };
        format!("{} AND {}", date_clause, country_clause)
    }
}

#[async_trait]
impl DataSource for ChanSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_posts(&self, ids: &[i64]) -> Result<Vec<PostRecord>> {
        self.fetch_rows_by("id", ids).await
    }

    async fn fetch_threads(&self, thread_ids: &[i64]) -> Result<Vec<PostRecord>> {
        self.fetch_rows_by("thread_id", thread_ids).await
    }

    async fn fetch_index_matches(
        &self,
        where_clause: &str,
        bindings: &[IndexValue],
    ) -> std::result::Result<Vec<MatchRecord>, IndexError> {
        let started = Instant::now();
        let mut conn = self.open_index().await?;

        let sql = if where_clause.is_empty() {
            "SELECT post_id, thread_id FROM post_index".to_string()
        } else {
            format!(
                "SELECT post_id, thread_id FROM post_index WHERE {}",
                where_clause
            )
        };

        let mut query = sqlx::query_as::<_, MatchRecord>(&sql);
        for value in bindings {
            query = match value {
                IndexValue::Int(v) => query.bind(*v),
                IndexValue::Text(v) => query.bind(v.clone()),
            };
        }

        let result = tokio::time::timeout(self.index_timeout, query.fetch_all(&mut conn)).await;

        // 无论成功失败都释放索引连接
        conn.close().await.ok();

        match result {
            Ok(Ok(matches)) => Ok(matches),
            Ok(Err(e)) => Err(IndexError::Backend(e)),
            Err(_) => Err(IndexError::Timeout {
                elapsed: started.elapsed(),
            }),
        }
    }

    async fn fetch_thread_stats(&self, thread_ids: &[i64]) -> Result<Vec<ThreadStat>> {
        if thread_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut stats = Vec::new();
        for chunk in thread_ids.chunks(MAX_BIND_PARAMS) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT id AS thread_id, num_replies FROM threads_{} WHERE id IN ({})",
                self.prefix, placeholders
            );
            let mut query = sqlx::query_as::<_, ThreadStat>(&sql);
            for id in chunk {
                query = query.bind(id);
            }
            stats.extend(query.fetch_all(&self.db).await?);
        }
        Ok(stats)
    }

    async fn fetch_random_ids(
        &self,
        min_date: i64,
        max_date: Option<i64>,
        amount: i64,
    ) -> Result<Vec<i64>> {
        let mut sql = format!("SELECT id FROM posts_{} WHERE timestamp >= ?", self.prefix);
        if max_date.is_some() {
            sql.push_str(" AND timestamp <= ?");
        }
        sql.push_str(" ORDER BY RANDOM() LIMIT ?");

        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(min_date);
        if let Some(max) = max_date {
            query = query.bind(max);
        }
        let ids = query.bind(amount).fetch_all(&self.db).await?;
        Ok(ids)
    }

    async fn fetch_country_posts(
        &self,
        countries: &CountryFilter,
        min_date: i64,
        max_date: Option<i64>,
    ) -> Result<Vec<PostRecord>> {
        let sql = format!(
            "SELECT {} FROM posts_{} WHERE {}",
            RETURN_COLUMNS.join(", "),
            self.prefix,
            Self::country_clause(countries, max_date)
        );

        let mut query = sqlx::query_as::<_, PostRecord>(&sql).bind(min_date);
        if let Some(max) = max_date {
            query = query.bind(max);
        }
        for code in countries.codes() {
            query = query.bind(code.to_string());
        }
        Ok(query.fetch_all(&self.db).await?)
    }

    async fn fetch_country_hits(
        &self,
        countries: &CountryFilter,
        min_date: i64,
        max_date: Option<i64>,
    ) -> Result<Vec<MatchRecord>> {
        let sql = format!(
            "SELECT id AS post_id, thread_id FROM posts_{} WHERE {}",
            self.prefix,
            Self::country_clause(countries, max_date)
        );

        let mut query = sqlx::query_as::<_, MatchRecord>(&sql).bind(min_date);
        if let Some(max) = max_date {
            query = query.bind(max);
        }
        for code in countries.codes() {
            query = query.bind(code.to_string());
        }
        Ok(query.fetch_all(&self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn test_source() -> (ChanSource, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("main.db");
        let pool = db::connect(&format!("sqlite:{}?mode=rwc", db_path.display()))
            .await
            .unwrap();
        db::ensure_source_tables(&pool, "testchan").await.unwrap();

        let source = ChanSource::new(
            "testchan",
            "testchan",
            pool,
            dir.path().join("index_testchan.db"),
            Duration::from_secs(5),
        )
        .unwrap();
        (source, dir)
    }

    async fn insert_post(source: &ChanSource, id: i64, thread_id: i64, ts: i64, country: &str) {
        sqlx::query(
            "INSERT INTO posts_testchan (id, thread_id, timestamp, body, subject, author, country_code, country_name) \
             VALUES (?, ?, ?, 'body', 'subject', 'anon', ?, ?)",
        )
        .bind(id)
        .bind(thread_id)
        .bind(ts)
        .bind(country)
        .bind(country)
        .execute(&source.db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_fetch_posts_and_threads() {
        let (source, _dir) = test_source().await;
        insert_post(&source, 1, 10, 100, "US").await;
        insert_post(&source, 2, 10, 110, "US").await;
        insert_post(&source, 3, 20, 120, "FR").await;

        let posts = source.fetch_posts(&[1, 3]).await.unwrap();
        assert_eq!(posts.len(), 2);

        let posts = source.fetch_threads(&[10]).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert!(posts.iter().all(|p| p.thread_id == 10));

        let posts = source.fetch_posts(&[]).await.unwrap();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_thread_stats() {
        let (source, _dir) = test_source().await;
        sqlx::query("INSERT INTO threads_testchan (id, num_replies) VALUES (10, 25), (20, 5)")
            .execute(&source.db)
            .await
            .unwrap();

        let mut stats = source.fetch_thread_stats(&[10, 20, 99]).await.unwrap();
        stats.sort_by_key(|s| s.thread_id);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].num_replies, 25);
        assert_eq!(stats[1].num_replies, 5);
    }

    #[tokio::test]
    async fn test_fetch_random_ids_respects_date_range() {
        let (source, _dir) = test_source().await;
        for id in 1..=20 {
            insert_post(&source, id, id, 100 + id, "US").await;
        }

        let ids = source.fetch_random_ids(100, Some(110), 5).await.unwrap();
        assert_eq!(ids.len(), 5);
        assert!(ids.iter().all(|id| (1..=10).contains(id)));

        // 无上界时只应用下界
        let ids = source.fetch_random_ids(115, None, 50).await.unwrap();
        assert_eq!(ids.len(), 6);

        // 空日期范围产生空结果
        let ids = source.fetch_random_ids(1000, None, 5).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_country_posts_and_hits() {
        let (source, _dir) = test_source().await;
        insert_post(&source, 1, 10, 100, "FR").await;
        insert_post(&source, 2, 10, 110, "US").await;
        insert_post(&source, 3, 20, 120, "DE").await;

        let filter = CountryFilter::Exact("FR".to_string());
        let posts = source.fetch_country_posts(&filter, 0, None).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, 1);

        let filter = CountryFilter::Any(vec!["FR".to_string(), "DE".to_string()]);
        let hits = source.fetch_country_hits(&filter, 0, None).await.unwrap();
        assert_eq!(hits.len(), 2);

        let hits = source
            .fetch_country_hits(&filter, 105, Some(115))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_unsafe_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::connect(&format!(
            "sqlite:{}?mode=rwc",
            dir.path().join("m.db").display()
        ))
        .await
        .unwrap();
        let result = ChanSource::new(
            "bad",
            "x; DROP TABLE jobs",
            pool,
            dir.path().join("i.db"),
            Duration::from_secs(1),
        );
        assert!(result.is_err());
    }
}
