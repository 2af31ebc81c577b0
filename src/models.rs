//! Core row types shared between the query engine and the data sources / 核心数据类型
//!
//! PostRecord field order is load-bearing: it is both the SQL column list and
//! the CSV header, so RETURN_COLUMNS is the single source of truth.

use serde::{Deserialize, Serialize};

/// Columns returned for every post, in result-file order / 返回列，按结果文件顺序
/// The first four are mandatory for any data source.
pub const RETURN_COLUMNS: [&str; 10] = [
    "thread_id",
    "id",
    "timestamp",
    "body",
    "subject",
    "author",
    "image_file",
    "image_md5",
    "country_code",
    "country_name",
];

/// Full post row as handed to the result writer / 完整帖子行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostRecord {
    pub thread_id: i64,
    pub id: i64,
    pub timestamp: i64,
    pub body: String,
    pub subject: String,
    pub author: String,
    pub image_file: Option<String>,
    pub image_md5: Option<String>,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
}

/// Minimal index hit, consumed internally only / 索引命中，仅内部使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct MatchRecord {
    pub post_id: i64,
    pub thread_id: i64,
}

/// Thread length statistic used by the density filter / 串长度统计
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct ThreadStat {
    pub thread_id: i64,
    pub num_replies: i64,
}

/// The three mutually exclusive search strategies / 三种互斥的查询模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    FullText,
    RandomSample,
    Country,
}

/// Immutable parameter bag for one query job / 单个查询任务的参数
///
/// Deserialized from the flat JSON `parameters` column of the dataset row.
/// Absent fields take their zero defaults; the accessors below translate the
/// wire conventions (`0` timestamps, `"*"` boards, empty strings) into
/// `Option`s so query builders never special-case them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Data source adapter name (e.g. "fourchan") / 数据源适配器名称
    #[serde(default)]
    pub datasource: String,
    /// Inclusive lower timestamp bound, 0 = unbounded / 起始时间戳，0为不限
    #[serde(default)]
    pub min_date: i64,
    /// Inclusive upper timestamp bound, 0 = unbounded / 结束时间戳，0为不限
    #[serde(default)]
    pub max_date: i64,
    /// Board filter, "*" or empty = all boards / 板块过滤
    #[serde(default)]
    pub board: String,
    /// Full-text predicate against post bodies / 正文全文检索词
    #[serde(default)]
    pub body_query: String,
    /// Full-text predicate against post subjects / 标题全文检索词
    #[serde(default)]
    pub subject_query: String,
    /// Expand matches to their whole threads / 扩展到完整串
    #[serde(default)]
    pub full_thread: bool,
    /// Keep only keyword-dense threads / 仅保留关键词密集串
    #[serde(default)]
    pub dense_threads: bool,
    /// Density threshold in percent / 密度阈值（百分比）
    #[serde(default)]
    pub dense_percentage: f64,
    /// Minimum thread length for the keyword density filter / 最小串长度
    #[serde(default)]
    pub dense_length: i64,
    /// Random sample size; absent or 0 disables the mode / 随机采样数量
    #[serde(default)]
    pub random_amount: Option<i64>,
    /// Country code, "europe", or "all" (= no filter) / 国家代码过滤
    #[serde(default)]
    pub country_flag: Option<String>,
    /// Density threshold for the country filter / 国家密度阈值
    #[serde(default)]
    pub dense_country_percentage: Option<f64>,
}

impl QuerySpec {
    /// Which executor runs this spec, always exactly one / 选择唯一执行器
    ///
    /// Precedence: random sample, then country filter, then full-text.
    /// A spec matching none of the first two degenerates to a full-text
    /// query with empty predicates (a bare date/board filter).
    pub fn mode(&self) -> QueryMode {
        if self.random_amount.map_or(false, |n| n > 0) {
            QueryMode::RandomSample
        } else if self
            .country_flag
            .as_deref()
            .map_or(false, |c| !c.is_empty() && c != "all")
        {
            QueryMode::Country
        } else {
            QueryMode::FullText
        }
    }

    /// Lower date bound, if one is set / 起始时间（如设置）
    pub fn min_date(&self) -> Option<i64> {
        (self.min_date > 0).then_some(self.min_date)
    }

    /// Upper date bound, if one is set. `0`/absent means unbounded; the
    /// clause is simply omitted rather than bound to a sentinel value.
    pub fn max_date(&self) -> Option<i64> {
        (self.max_date > 0).then_some(self.max_date)
    }

    /// Board filter; a wildcard or empty board means no filter / 板块过滤
    pub fn board(&self) -> Option<&str> {
        let board = self.board.trim();
        (!board.is_empty() && board != "*").then_some(board)
    }

    pub fn body_query(&self) -> Option<&str> {
        let q = self.body_query.trim();
        (!q.is_empty()).then_some(q)
    }

    pub fn subject_query(&self) -> Option<&str> {
        let q = self.subject_query.trim();
        (!q.is_empty()).then_some(q)
    }

    /// Country density threshold, if enabled (> 0) / 国家密度阈值（启用时）
    pub fn dense_country_percentage(&self) -> Option<f64> {
        self.dense_country_percentage.filter(|p| *p > 0.0)
    }
}
