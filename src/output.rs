//! Result file writer / 结果文件写出
//!
//! One CSV row per post, columns exactly RETURN_COLUMNS in order. The header
//! is written unconditionally so an empty result still produces a
//! header-only file the downstream tools can open.

use std::path::Path;

use anyhow::Result;

use crate::models::{PostRecord, RETURN_COLUMNS};

/// Write posts to a CSV file, returning the row count / 写出CSV，返回行数
pub fn posts_to_csv(posts: &[PostRecord], path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;

    writer.write_record(RETURN_COLUMNS)?;
    for post in posts {
        writer.serialize(post)?;
    }
    writer.flush()?;

    Ok(posts.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(thread_id: i64, id: i64) -> PostRecord {
        PostRecord {
            thread_id,
            id,
            timestamp: 1500000000,
            body: "a body, with a comma".to_string(),
            subject: String::new(),
            author: "anon".to_string(),
            image_file: None,
            image_md5: None,
            country_code: Some("NL".to_string()),
            country_name: Some("Netherlands".to_string()),
        }
    }

    #[test]
    fn test_empty_input_writes_header_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        let written = posts_to_csv(&[], &path).unwrap();
        assert_eq!(written, 0);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], RETURN_COLUMNS.join(","));
    }

    #[test]
    fn test_rows_follow_header_in_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.csv");

        let written = posts_to_csv(&[post(10, 1), post(10, 2)], &path).unwrap();
        assert_eq!(written, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("10,1,"));
        assert!(lines[2].starts_with("10,2,"));
        // 带逗号的正文被正确引用
        assert!(lines[1].contains("\"a body, with a comma\""));
    }

    #[test]
    fn test_missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");

        posts_to_csv(&[post(1, 1)], &path).unwrap();
        assert!(path.exists());
    }
}
