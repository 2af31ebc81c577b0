//! Main database setup and migrations / 主数据库与迁移
//!
//! One SQLite database (WAL mode) holds the job queue, the dataset records
//! and the per-source post/thread archives. Tables are created idempotently;
//! existing data is never dropped.

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::datasource::validate_identifier;

/// Open the main connection pool / 打开主连接池
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect(database_url)
        .await?;

    // 启用WAL模式，提高并发性能
    sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
    // 设置busy_timeout，避免锁超时
    sqlx::query("PRAGMA busy_timeout=10000").execute(&pool).await?;
    sqlx::query("PRAGMA synchronous=NORMAL").execute(&pool).await?;

    Ok(pool)
}

/// Run database migrations / 运行数据库迁移
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Dataset records, one per submitted query / 数据集记录
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS queries (
            key TEXT PRIMARY KEY,
            query TEXT NOT NULL DEFAULT '',
            parameters TEXT NOT NULL DEFAULT '{}',
            result_file TEXT NOT NULL DEFAULT '',
            timestamp INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT '',
            num_rows INTEGER NOT NULL DEFAULT 0,
            is_finished INTEGER NOT NULL DEFAULT 0,
            software_version TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Job queue; a job is unique per (jobtype, remote_id) / 任务队列
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            jobtype TEXT NOT NULL,
            remote_id TEXT NOT NULL DEFAULT '',
            details TEXT,
            timestamp INTEGER NOT NULL DEFAULT 0,
            claim_after INTEGER NOT NULL DEFAULT 0,
            claimed_at INTEGER NOT NULL DEFAULT 0,
            attempts INTEGER NOT NULL DEFAULT 0,
            UNIQUE(jobtype, remote_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_claim ON jobs(jobtype, claimed_at, claim_after)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the archive tables for one data source / 创建单个数据源的归档表
///
/// The prefix is concatenated into identifiers and must come from the
/// configured allow-list; anything else is rejected before it reaches SQL.
pub async fn ensure_source_tables(pool: &SqlitePool, prefix: &str) -> Result<()> {
    validate_identifier(prefix)?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS posts_{prefix} (
            id INTEGER PRIMARY KEY,
            thread_id INTEGER NOT NULL,
            timestamp INTEGER NOT NULL DEFAULT 0,
            body TEXT NOT NULL DEFAULT '',
            subject TEXT NOT NULL DEFAULT '',
            author TEXT NOT NULL DEFAULT '',
            image_file TEXT,
            image_md5 TEXT,
            country_code TEXT,
            country_name TEXT,
            board TEXT NOT NULL DEFAULT ''
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_posts_{prefix}_thread ON posts_{prefix}(thread_id)"
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_posts_{prefix}_timestamp ON posts_{prefix}(timestamp)"
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_posts_{prefix}_country ON posts_{prefix}(country_code)"
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS threads_{prefix} (
            id INTEGER PRIMARY KEY,
            board TEXT NOT NULL DEFAULT '',
            timestamp INTEGER NOT NULL DEFAULT 0,
            timestamp_scraped INTEGER NOT NULL DEFAULT 0,
            num_replies INTEGER NOT NULL DEFAULT 0
        )
        "#
    ))
    .execute(pool)
    .await?;

    Ok(())
}
