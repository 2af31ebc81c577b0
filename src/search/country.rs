//! Country-flag mode / 国家旗帜模式
//!
//! Filters posts on their country attribute: a single code, or the symbolic
//! group "europe" which expands to a fixed enumerated set. With density
//! filtering requested, the first round-trip fetches only (thread, post)
//! pairs so full rows are never hydrated for threads that get filtered out.

use anyhow::Result;

use crate::datasource::{CountryFilter, DataSource};
use crate::models::{PostRecord, QuerySpec};

use super::{assemble, dense, StatusSink};

/// Country codes selectable in the web tool that are in Europe (as defined
/// by geographic location, using the Caucasus mountains as a border)
/// 欧洲国家代码（以高加索山脉为界）
pub const EUROPE_COUNTRY_CODES: [&str; 54] = [
    "GB", "DE", "NL", "RU", "FI", "FR", "RO", "PL", "SE", "NO", "ES", "IE", "IT", "SI", "RS",
    "DK", "HR", "GR", "BG", "BE", "AT", "HU", "CH", "PT", "LT", "CZ", "EE", "UY", "LV", "SK",
    "MK", "UA", "IS", "BA", "CY", "GE", "LU", "ME", "AL", "MD", "IM", "EU", "BY", "MC", "AX",
    "KZ", "AM", "GG", "JE", "MT", "FO", "AZ", "LI", "AD",
];

/// Resolve a requested flag to its filter predicate / 解析国家过滤条件
pub fn resolve_country_filter(flag: &str) -> CountryFilter {
    if flag == "europe" {
        CountryFilter::Any(
            EUROPE_COUNTRY_CODES
                .iter()
                .map(|c| c.to_string())
                .collect(),
        )
    } else {
        CountryFilter::Exact(flag.to_string())
    }
}

pub async fn execute(
    spec: &QuerySpec,
    source: &dyn DataSource,
    status: &dyn StatusSink,
) -> Result<Vec<PostRecord>> {
    let flag = spec.country_flag.as_deref().unwrap_or("");
    let filter = resolve_country_filter(flag);

    status
        .update_status("Querying database for country-specific posts")
        .await;

    let posts = if let Some(percentage) = spec.dense_country_percentage() {
        // 先取(串,帖)对，密度过滤后再取完整行
        let hits = source
            .fetch_country_hits(&filter, spec.min_date, spec.max_date())
            .await?;
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        status
            .update_status("Post data collected. Filtering dense threads")
            .await;

        let hit_threads: Vec<i64> = hits.iter().map(|m| m.thread_id).collect();
        let stats = source
            .fetch_thread_stats(&assemble::unique_sorted(&hit_threads))
            .await?;
        // 国家密度过滤不应用最小串长度阈值（与关键词路径不同）
        let narrowed = dense::filter(&hit_threads, &stats, percentage, None);
        tracing::info!(
            "Dense thread filtering finished, {} of {} threads left",
            narrowed.len(),
            stats.len()
        );
        if narrowed.is_empty() {
            return Ok(Vec::new());
        }

        assemble::by_thread_ids(source, &narrowed).await?
    } else {
        // 无密度过滤：单次往返直接取完整行
        let mut posts = source
            .fetch_country_posts(&filter, spec.min_date, spec.max_date())
            .await?;
        if posts.is_empty() {
            return Ok(Vec::new());
        }
        assemble::sort_posts(&mut posts);
        posts
    };

    status
        .update_status(&format!(
            "Post data collected. {} country-specific posts found.",
            posts.len()
        ))
        .await;

    Ok(posts)
}
