//! 8chan data source / 8chan数据源
//!
//! Same archive layout as the 4chan source under its own table prefix
//! (default "8chan") and index database. 8chan boards are user-created, so
//! the board column carries arbitrary names; the engine treats it as an
//! opaque filter value either way.

use std::time::Duration;

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::{AppConfig, DataSourceConfig};
use crate::datasource::chan::ChanSource;

/// Build the 8chan adapter from configuration / 由配置构建8chan适配器
pub fn create(
    pool: SqlitePool,
    datasource: &DataSourceConfig,
    config: &AppConfig,
) -> Result<ChanSource> {
    ChanSource::new(
        "eightchan",
        &datasource.prefix,
        pool,
        config.get_index_db_path(&datasource.prefix),
        Duration::from_secs(config.index.timeout_secs),
    )
}
