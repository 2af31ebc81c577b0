// Data source package / 数据源包
pub mod eightchan;
pub mod fourchan;

use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::datasource::chan::ChanSource;
use crate::datasource::DataSourceRegistry;
use crate::db;

/// Register all configured data sources / 注册所有已配置数据源
///
/// Creates the archive tables and the index database schema for each source
/// before it goes live; unknown names in the configuration are skipped with
/// a warning rather than failing startup.
pub async fn register_all(
    registry: &DataSourceRegistry,
    pool: &SqlitePool,
    config: &AppConfig,
) -> anyhow::Result<()> {
    for datasource in &config.datasources {
        let source: ChanSource = match datasource.name.as_str() {
            // 4chan archive adapter / 4chan归档适配器
            "fourchan" => fourchan::create(pool.clone(), datasource, config)?,
            // 8chan archive adapter / 8chan归档适配器
            "eightchan" => eightchan::create(pool.clone(), datasource, config)?,
            other => {
                tracing::warn!("Unknown data source {:?} in configuration, skipping", other);
                continue;
            }
        };

        db::ensure_source_tables(pool, &datasource.prefix).await?;
        source.ensure_index_schema().await?;
        registry.register(std::sync::Arc::new(source)).await;
    }
    Ok(())
}
