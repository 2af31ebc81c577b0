//! Data source interface (provides only primitive fetch operations) / 数据源接口
//!
//! Architecture principles / 架构原则：
//! - A data source only exposes primitive fetches over its own archive:
//!   posts by id, posts by thread, index matches, thread stats
//! - The search engine owns control flow, status, and failure classification
//! - Call direction: search → datasource (unidirectional) / 调用方向
//!
//! Every supported forum platform provides one implementation; the engine and
//! the mode executors depend on this trait alone.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{MatchRecord, PostRecord, ThreadStat};
use crate::search::index::IndexError;

pub mod chan;
pub mod registry;

pub use registry::DataSourceRegistry;

/// Typed binding for index predicates; user input only ever travels through
/// these, never through predicate text / 索引查询绑定值
#[derive(Debug, Clone, PartialEq)]
pub enum IndexValue {
    Int(i64),
    Text(String),
}

/// Country filter resolved from the query's `country_flag` / 国家过滤条件
#[derive(Debug, Clone, PartialEq)]
pub enum CountryFilter {
    /// Exact country-code equality / 精确匹配
    Exact(String),
    /// Set membership over an enumerated code list / 集合匹配
    Any(Vec<String>),
}

impl CountryFilter {
    /// Number of bound placeholders this filter needs / 占位符数量
    pub fn len(&self) -> usize {
        match self {
            CountryFilter::Exact(_) => 1,
            CountryFilter::Any(codes) => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Codes in binding order / 按绑定顺序列出代码
    pub fn codes(&self) -> Vec<&str> {
        match self {
            CountryFilter::Exact(code) => vec![code.as_str()],
            CountryFilter::Any(codes) => codes.iter().map(|c| c.as_str()).collect(),
        }
    }
}

/// Reject anything that is not a known-safe SQL identifier fragment.
/// Table names are built as posts_<prefix>; the prefix must never carry
/// anything beyond lowercase alphanumerics and underscores.
pub fn validate_identifier(prefix: &str) -> Result<()> {
    let ok = !prefix.is_empty()
        && prefix.len() <= 32
        && prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if ok {
        Ok(())
    } else {
        anyhow::bail!("invalid data source prefix: {:?}", prefix)
    }
}

/// Data source interface / 数据源接口
///
/// The three fetches consumed by the full-text path (`fetch_posts`,
/// `fetch_threads`, `fetch_index_matches`) are the core contract; the
/// remaining primitives serve the random-sample and country modes and the
/// density filter, and live on the same per-source surface.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Adapter name as referenced by query parameters / 适配器名称
    fn name(&self) -> &str;

    /// Full rows for the given post ids / 按帖子ID取完整行
    async fn fetch_posts(&self, ids: &[i64]) -> Result<Vec<PostRecord>>;

    /// Full rows for every post in the given threads / 按串ID取全部帖子
    async fn fetch_threads(&self, thread_ids: &[i64]) -> Result<Vec<PostRecord>>;

    /// Query the full-text index. The where clause is assembled from fixed
    /// fragments by the caller; all values arrive through `bindings`. The
    /// index connection is scoped to this call and released on every exit
    /// path; failures are classified, not merged.
    async fn fetch_index_matches(
        &self,
        where_clause: &str,
        bindings: &[IndexValue],
    ) -> std::result::Result<Vec<MatchRecord>, IndexError>;

    /// Reply counts for the given threads / 串回复数统计
    async fn fetch_thread_stats(&self, thread_ids: &[i64]) -> Result<Vec<ThreadStat>>;

    /// Uniformly random post ids within the date range / 日期范围内随机帖子ID
    async fn fetch_random_ids(
        &self,
        min_date: i64,
        max_date: Option<i64>,
        amount: i64,
    ) -> Result<Vec<i64>>;

    /// Full rows for posts matching a country filter / 按国家过滤取完整行
    async fn fetch_country_posts(
        &self,
        countries: &CountryFilter,
        min_date: i64,
        max_date: Option<i64>,
    ) -> Result<Vec<PostRecord>>;

    /// (thread, post) pairs matching a country filter; used when the caller
    /// intends to density-filter before hydrating full rows
    async fn fetch_country_hits(
        &self,
        countries: &CountryFilter,
        min_date: i64,
        max_date: Option<i64>,
    ) -> Result<Vec<MatchRecord>>;
}
