//! Full-text search mode / 全文检索模式
//!
//! Two-phase execution: the full-text index yields (post, thread) matches
//! for the predicate, then the relational store hydrates full rows: either
//! the exact matches, or every post of every matched thread, optionally
//! narrowed to keyword-dense threads first.
//!
//! Index failures are classified, never merged: a timeout asks the user to
//! narrow the query, a backend crash reports a generic error. Both return
//! None (distinct from an empty result) and leave the job finishable.

use std::time::Instant;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::datasource::{DataSource, IndexValue};
use crate::models::{PostRecord, QuerySpec};

use super::index::IndexError;
use super::{assemble, dense, StatusSink};

/// Characters with operator meaning in the index query syntax / 索引语法特殊字符
static INDEX_SYNTAX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([=()|\-!@~"&/\\^$])"#).expect("escape pattern is valid"));

/// Escape user text for insertion into a match clause / 转义用户输入
///
/// Each special character gets a single backslash prefix so user input can
/// never be read as query operators. A string without special characters
/// passes through unchanged.
pub fn escape_for_index(text: &str) -> String {
    INDEX_SYNTAX.replace_all(text, r"\$1").into_owned()
}

/// Build the conjunctive index predicate for a spec / 构建索引查询谓词
///
/// Returns fixed where-clause fragments plus the binding list; user values
/// never appear in the clause text itself. Body and subject predicates are
/// combined into a single MATCH binding.
pub fn build_index_predicate(spec: &QuerySpec) -> (String, Vec<IndexValue>) {
    let mut clauses = Vec::new();
    let mut bindings = Vec::new();

    if let Some(min) = spec.min_date() {
        clauses.push("timestamp >= ?");
        bindings.push(IndexValue::Int(min));
    }
    if let Some(max) = spec.max_date() {
        clauses.push("timestamp <= ?");
        bindings.push(IndexValue::Int(max));
    }
    if let Some(board) = spec.board() {
        clauses.push("board = ?");
        bindings.push(IndexValue::Text(board.to_string()));
    }

    let mut match_parts = Vec::new();
    if let Some(body) = spec.body_query() {
        match_parts.push(format!("body: ({})", escape_for_index(body)));
    }
    if let Some(subject) = spec.subject_query() {
        match_parts.push(format!("subject: ({})", escape_for_index(subject)));
    }
    if !match_parts.is_empty() {
        clauses.push("post_index MATCH ?");
        bindings.push(IndexValue::Text(match_parts.join(" ")));
    }

    (clauses.join(" AND "), bindings)
}

/// Run the full-text mode / 执行全文检索模式
///
/// `None` means a backend failure already reported through the status sink;
/// an empty vec means the query ran fine and matched nothing downstream.
pub async fn execute(
    spec: &QuerySpec,
    source: &dyn DataSource,
    status: &dyn StatusSink,
) -> Result<Option<Vec<PostRecord>>> {
    let (where_clause, bindings) = build_index_predicate(spec);

    status.update_status("Searching for matches").await;
    let index_start = Instant::now();

    let matches = match source.fetch_index_matches(&where_clause, &bindings).await {
        Ok(matches) => matches,
        Err(IndexError::Timeout { elapsed }) => {
            status
                .update_status(
                    "Your query timed out. This is likely because it matches too many posts. \
                     Try again with a narrower date range or a more specific search query.",
                )
                .await;
            tracing::info!(
                "Index query (body: {:?}/subject: {:?}) timed out after {} seconds",
                spec.body_query().unwrap_or(""),
                spec.subject_query().unwrap_or(""),
                elapsed.as_secs()
            );
            return Ok(None);
        }
        Err(IndexError::Backend(e)) => {
            status
                .update_status(
                    "Error during query. Administrators have been notified; try again later.",
                )
                .await;
            tracing::error!("Index crash during query {}: {}", status.key(), e);
            return Ok(None);
        }
    };

    tracing::info!(
        "Index query finished in {} seconds, {} results",
        index_start.elapsed().as_secs(),
        matches.len()
    );

    if matches.is_empty() {
        status
            .update_status("Query finished, but no results were found.")
            .await;
        return Ok(None);
    }

    status
        .update_status(&format!(
            "Found {} matches. Collecting post data",
            matches.len()
        ))
        .await;

    let store_start = Instant::now();

    let posts = if !spec.full_thread && !spec.dense_threads {
        // 只取索引命中的帖子本身
        let post_ids: Vec<i64> = matches.iter().map(|m| m.post_id).collect();
        assemble::by_ids(source, &post_ids).await?
    } else {
        // 扩展到命中串的全部帖子
        let hit_threads: Vec<i64> = matches.iter().map(|m| m.thread_id).collect();

        let thread_ids = if spec.dense_threads && spec.body_query().is_some() {
            status
                .update_status("Post data collected. Filtering dense threads")
                .await;

            let stats = source
                .fetch_thread_stats(&assemble::unique_sorted(&hit_threads))
                .await?;
            let narrowed = dense::filter(
                &hit_threads,
                &stats,
                spec.dense_percentage,
                Some(spec.dense_length),
            );
            tracing::info!(
                "Dense thread filtering finished, {} of {} threads left",
                narrowed.len(),
                stats.len()
            );

            // 密集过滤淘汰所有串：空结果，而不是失败
            if narrowed.is_empty() {
                return Ok(Some(Vec::new()));
            }
            narrowed
        } else {
            assemble::unique_sorted(&hit_threads)
        };

        assemble::by_thread_ids(source, &thread_ids).await?
    };

    status.update_status("Post data collected").await;
    tracing::info!(
        "Full posts query finished in {} seconds",
        store_start.elapsed().as_secs()
    );

    Ok(Some(posts))
}
