//! Search module - query engine over the index/store federation / 查询引擎模块
//!
//! Architecture principles / 架构原则：
//! - The engine owns job lifecycle, status text and failure classification
//! - Mode executors translate one QuerySpec into backend queries; exactly one
//!   executor runs per job
//! - Data sources only expose primitive fetches; call direction is
//!   engine → executor → datasource (unidirectional) / 调用方向

use async_trait::async_trait;

pub mod assemble;
pub mod country;
pub mod dense;
pub mod engine;
pub mod fulltext;
pub mod index;
pub mod random;

pub use engine::SearchEngine;
pub use index::IndexError;

/// Job-visible progress surface, implemented by the dataset record / 进度接口
///
/// The status string is the only observability channel while a job runs;
/// executors push every phase transition through here. Updates are fire and
/// forget: a failed write is logged by the implementation, never surfaced.
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Unique key of the query this status belongs to / 查询键
    fn key(&self) -> &str;

    /// Replace the human-readable progress string / 更新进度文本
    async fn update_status(&self, status: &str);
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::Result;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::datasource::{CountryFilter, DataSource, IndexValue};
    use crate::models::{MatchRecord, PostRecord, ThreadStat};

    use super::index::IndexError;
    use super::StatusSink;

    /// Collects status updates in memory / 内存中的状态收集器
    #[derive(Default)]
    pub struct MemorySink {
        pub statuses: Mutex<Vec<String>>,
    }

    impl MemorySink {
        pub fn last(&self) -> Option<String> {
            self.statuses.lock().last().cloned()
        }
    }

    #[async_trait]
    impl StatusSink for MemorySink {
        fn key(&self) -> &str {
            "test-key"
        }

        async fn update_status(&self, status: &str) {
            self.statuses.lock().push(status.to_string());
        }
    }

    /// Scripted index responses / 预设的索引响应
    pub enum IndexResponse {
        Matches(Vec<MatchRecord>),
        Timeout,
        Crash,
    }

    /// In-memory data source for executor and engine tests / 测试用内存数据源
    pub struct MockSource {
        pub posts: Vec<PostRecord>,
        pub index_response: IndexResponse,
        pub thread_stats: Vec<ThreadStat>,
        pub index_calls: AtomicUsize,
        pub captured_predicate: Mutex<Option<(String, Vec<IndexValue>)>>,
    }

    impl MockSource {
        pub fn new() -> Self {
            Self {
                posts: Vec::new(),
                index_response: IndexResponse::Matches(Vec::new()),
                thread_stats: Vec::new(),
                index_calls: AtomicUsize::new(0),
                captured_predicate: Mutex::new(None),
            }
        }

        pub fn with_posts(mut self, posts: Vec<PostRecord>) -> Self {
            self.posts = posts;
            self
        }

        pub fn with_index_response(mut self, response: IndexResponse) -> Self {
            self.index_response = response;
            self
        }

        pub fn with_thread_stats(mut self, stats: Vec<ThreadStat>) -> Self {
            self.thread_stats = stats;
            self
        }
    }

    /// Shorthand post row / 帖子行简写
    pub fn post(thread_id: i64, id: i64, country: &str) -> PostRecord {
        PostRecord {
            thread_id,
            id,
            timestamp: 1500000000 + id,
            body: format!("body {}", id),
            subject: String::new(),
            author: "anon".to_string(),
            image_file: None,
            image_md5: None,
            country_code: Some(country.to_string()),
            country_name: None,
        }
    }

    #[async_trait]
    impl DataSource for MockSource {
        fn name(&self) -> &str {
            "mock"
        }

        async fn fetch_posts(&self, ids: &[i64]) -> Result<Vec<PostRecord>> {
            Ok(self
                .posts
                .iter()
                .filter(|p| ids.contains(&p.id))
                .cloned()
                .collect())
        }

        async fn fetch_threads(&self, thread_ids: &[i64]) -> Result<Vec<PostRecord>> {
            Ok(self
                .posts
                .iter()
                .filter(|p| thread_ids.contains(&p.thread_id))
                .cloned()
                .collect())
        }

        async fn fetch_index_matches(
            &self,
            where_clause: &str,
            bindings: &[IndexValue],
        ) -> std::result::Result<Vec<MatchRecord>, IndexError> {
            self.index_calls.fetch_add(1, Ordering::SeqCst);
            *self.captured_predicate.lock() =
                Some((where_clause.to_string(), bindings.to_vec()));
            match &self.index_response {
                IndexResponse::Matches(matches) => Ok(matches.clone()),
                IndexResponse::Timeout => Err(IndexError::Timeout {
                    elapsed: std::time::Duration::from_secs(60),
                }),
                IndexResponse::Crash => Err(IndexError::Backend(sqlx::Error::PoolClosed)),
            }
        }

        async fn fetch_thread_stats(&self, thread_ids: &[i64]) -> Result<Vec<ThreadStat>> {
            Ok(self
                .thread_stats
                .iter()
                .filter(|s| thread_ids.contains(&s.thread_id))
                .copied()
                .collect())
        }

        async fn fetch_random_ids(
            &self,
            min_date: i64,
            max_date: Option<i64>,
            amount: i64,
        ) -> Result<Vec<i64>> {
            Ok(self
                .posts
                .iter()
                .filter(|p| {
                    p.timestamp >= min_date && max_date.map_or(true, |max| p.timestamp <= max)
                })
                .map(|p| p.id)
                .take(amount.max(0) as usize)
                .collect())
        }

        async fn fetch_country_posts(
            &self,
            countries: &CountryFilter,
            min_date: i64,
            max_date: Option<i64>,
        ) -> Result<Vec<PostRecord>> {
            let codes = countries.codes();
            Ok(self
                .posts
                .iter()
                .filter(|p| {
                    p.timestamp >= min_date
                        && max_date.map_or(true, |max| p.timestamp <= max)
                        && p.country_code
                            .as_deref()
                            .map_or(false, |c| codes.contains(&c))
                })
                .cloned()
                .collect())
        }

        async fn fetch_country_hits(
            &self,
            countries: &CountryFilter,
            min_date: i64,
            max_date: Option<i64>,
        ) -> Result<Vec<MatchRecord>> {
            Ok(self
                .fetch_country_posts(countries, min_date, max_date)
                .await?
                .iter()
                .map(|p| MatchRecord {
                    post_id: p.id,
                    thread_id: p.thread_id,
                })
                .collect())
        }
    }
}
