//! 4chan data source / 4chan数据源
//!
//! Archives scraped from 4chan live in posts_4chan/threads_4chan (default
//! prefix "4chan") with a full-text index over body and subject. Country
//! attributes are only populated for boards that expose flags (/pol/, /int/,
//! /sp/, /bant/); elsewhere the columns stay NULL and country queries simply
//! match nothing.

use std::time::Duration;

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::{AppConfig, DataSourceConfig};
use crate::datasource::chan::ChanSource;

/// Build the 4chan adapter from configuration / 由配置构建4chan适配器
pub fn create(
    pool: SqlitePool,
    datasource: &DataSourceConfig,
    config: &AppConfig,
) -> Result<ChanSource> {
    ChanSource::new(
        "fourchan",
        &datasource.prefix,
        pool,
        config.get_index_db_path(&datasource.prefix),
        Duration::from_secs(config.index.timeout_secs),
    )
}
