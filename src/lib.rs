pub mod api;
pub mod config;
pub mod dataset;
pub mod datasource;
pub mod db;
pub mod models;
pub mod output;
pub mod search;
pub mod task;

// Data source modules (point to project root datasources via path attribute) / 数据源模块
#[path = "../datasources/mod.rs"]
pub mod datasources;

// Register all configured data sources (call unified registration function) / 注册所有数据源
pub async fn register_data_sources(
    registry: &datasource::DataSourceRegistry,
    pool: &sqlx::SqlitePool,
    app_config: &config::AppConfig,
) -> anyhow::Result<()> {
    datasources::register_all(registry, pool, app_config).await
}
