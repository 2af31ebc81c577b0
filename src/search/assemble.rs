//! Result assembly: identifier sets to ordered post rows / 结果组装
//!
//! The result writer depends on ascending (thread_id, id) ordering no matter
//! which mode produced the rows. Adapter return order is treated as
//! unspecified, so the sort happens here, at the edge.

use anyhow::Result;

use crate::datasource::DataSource;
use crate::models::PostRecord;

/// Full rows for exact post ids, ordered / 按帖子ID组装
pub async fn by_ids(source: &dyn DataSource, ids: &[i64]) -> Result<Vec<PostRecord>> {
    let mut posts = source.fetch_posts(ids).await?;
    sort_posts(&mut posts);
    Ok(posts)
}

/// Full rows for every post in the given threads, ordered / 按串ID组装
pub async fn by_thread_ids(source: &dyn DataSource, thread_ids: &[i64]) -> Result<Vec<PostRecord>> {
    let mut posts = source.fetch_threads(thread_ids).await?;
    sort_posts(&mut posts);
    Ok(posts)
}

/// The ordering contract of the result file / 结果文件的排序约定
pub fn sort_posts(posts: &mut [PostRecord]) {
    posts.sort_unstable_by_key(|p| (p.thread_id, p.id));
}

/// Deduplicated, sorted copy of an id list / 去重排序后的ID副本
pub(crate) fn unique_sorted(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::testutil::{post, MockSource};

    fn is_ordered(posts: &[PostRecord]) -> bool {
        posts
            .windows(2)
            .all(|w| (w[0].thread_id, w[0].id) <= (w[1].thread_id, w[1].id))
    }

    #[tokio::test]
    async fn test_by_ids_sorts_regardless_of_adapter_order() {
        // 模拟数据源乱序返回
        let source = MockSource::new().with_posts(vec![
            post(20, 7, "US"),
            post(10, 9, "US"),
            post(10, 2, "US"),
            post(20, 1, "US"),
        ]);

        let posts = by_ids(&source, &[7, 9, 2, 1]).await.unwrap();
        assert_eq!(posts.len(), 4);
        assert!(is_ordered(&posts));
        assert_eq!(posts[0].thread_id, 10);
        assert_eq!(posts[0].id, 2);
    }

    #[tokio::test]
    async fn test_by_thread_ids_sorts() {
        let source = MockSource::new().with_posts(vec![
            post(30, 5, "US"),
            post(10, 8, "US"),
            post(30, 2, "US"),
        ]);

        let posts = by_thread_ids(&source, &[30, 10]).await.unwrap();
        assert_eq!(posts.len(), 3);
        assert!(is_ordered(&posts));
    }

    #[test]
    fn test_unique_sorted() {
        assert_eq!(unique_sorted(&[3, 1, 3, 2, 1]), vec![1, 2, 3]);
        assert!(unique_sorted(&[]).is_empty());
    }
}
