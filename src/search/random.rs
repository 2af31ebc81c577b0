//! Random-sample mode / 随机采样模式
//!
//! Draws post identifiers uniformly at random within the date range and
//! hydrates them to full rows. Never returns null: an empty date range is
//! an empty result, not a failure.

use anyhow::Result;

use crate::datasource::DataSource;
use crate::models::{PostRecord, QuerySpec};

use super::{assemble, StatusSink};

pub async fn execute(
    spec: &QuerySpec,
    source: &dyn DataSource,
    status: &dyn StatusSink,
) -> Result<Vec<PostRecord>> {
    status.update_status("Fetching random posts").await;

    let amount = spec.random_amount.unwrap_or(0);
    // 下界始终绑定；上界仅在设置时追加（0/缺省即不限）
    let ids = source
        .fetch_random_ids(spec.min_date, spec.max_date(), amount)
        .await?;

    let posts = assemble::by_ids(source, &ids).await?;
    status.update_status("Post data collected").await;

    Ok(posts)
}
