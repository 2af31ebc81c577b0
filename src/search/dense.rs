//! Thread-density filter / 串密度过滤
//!
//! A dense thread is one where the share of matching posts meets a
//! percentage threshold, optionally on top of a minimum total length. Used
//! by the full-text path (keyword density, with length threshold) and the
//! country path (attribute density, without one).

use std::collections::HashMap;

use crate::models::ThreadStat;

/// Narrow `thread_ids` down to the dense ones / 过滤出密集串
///
/// `thread_ids` carries one entry per match, so duplicates are the
/// per-thread match multiplicity. Only threads present in `stats` are
/// considered. Threads with a zero reply count never qualify; a `min_length`
/// of `None` skips the length check entirely. The input is left untouched;
/// output order is unspecified.
pub fn filter(
    thread_ids: &[i64],
    stats: &[ThreadStat],
    percentage: f64,
    min_length: Option<i64>,
) -> Vec<i64> {
    // 每个串的命中次数
    let mut match_counts: HashMap<i64, i64> = HashMap::new();
    for thread_id in thread_ids {
        *match_counts.entry(*thread_id).or_insert(0) += 1;
    }

    let mut qualified = Vec::new();
    for stat in stats {
        if let Some(length) = min_length {
            if stat.num_replies < length {
                continue;
            }
        }
        // 回复数为零的串视为不合格，而不是除零错误
        if stat.num_replies <= 0 {
            continue;
        }

        let matches = match_counts.get(&stat.thread_id).copied().unwrap_or(0);
        let density = matches as f64 / stat.num_replies as f64 * 100.0;
        if density >= percentage {
            qualified.push(stat.thread_id);
        }
    }

    qualified
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(thread_id: i64, num_replies: i64) -> ThreadStat {
        ThreadStat {
            thread_id,
            num_replies,
        }
    }

    #[test]
    fn test_density_threshold() {
        // A: 10回复4命中=40%，B: 5回复4命中=80%
        let thread_ids = vec![1, 1, 1, 1, 2, 2, 2, 2];
        let stats = vec![stat(1, 10), stat(2, 5)];

        let result = filter(&thread_ids, &stats, 50.0, Some(0));
        assert_eq!(result, vec![2]);
    }

    #[test]
    fn test_minimum_length_threshold() {
        // A未达密度，B未达长度
        let thread_ids = vec![1, 1, 1, 1, 2, 2, 2, 2];
        let stats = vec![stat(1, 10), stat(2, 5)];

        let result = filter(&thread_ids, &stats, 50.0, Some(6));
        assert!(result.is_empty());
    }

    #[test]
    fn test_no_length_threshold() {
        let thread_ids = vec![1, 1, 2];
        let stats = vec![stat(1, 2), stat(2, 100)];

        // 无长度阈值时短串也可合格
        let result = filter(&thread_ids, &stats, 50.0, None);
        assert_eq!(result, vec![1]);
    }

    #[test]
    fn test_zero_replies_is_exclusion_not_fault() {
        let thread_ids = vec![1, 1];
        let stats = vec![stat(1, 0)];

        assert!(filter(&thread_ids, &stats, 50.0, None).is_empty());
        assert!(filter(&thread_ids, &stats, 0.0, Some(0)).is_empty());
    }

    #[test]
    fn test_input_not_mutated_and_threads_without_stats_ignored() {
        let thread_ids = vec![7, 7, 7, 8];
        let stats = vec![stat(7, 10)];

        let result = filter(&thread_ids, &stats, 30.0, None);
        assert_eq!(result, vec![7]);
        // 8没有统计信息，不会出现在输出里
        assert_eq!(thread_ids, vec![7, 7, 7, 8]);
    }

    #[test]
    fn test_boundary_density_inclusive() {
        // 恰好等于阈值时包含
        let thread_ids = vec![1, 1, 1, 1, 1];
        let stats = vec![stat(1, 10)];
        assert_eq!(filter(&thread_ids, &stats, 50.0, None), vec![1]);
    }
}
