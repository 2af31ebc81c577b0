use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forumsift_backend::datasource::DataSourceRegistry;
use forumsift_backend::search::SearchEngine;
use forumsift_backend::task::{DatasetExpirer, JobQueue, WorkerPool, JOBTYPE_EXPIRE};
use forumsift_backend::{api, config, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forumsift_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration / 加载配置
    let app_config = config::load_config()?;
    tracing::info!(
        "forumsift backend {} starting",
        config::software_version()
    );

    // Create data directories if missing / 创建数据目录
    for dir in [
        app_config.get_data_dir(),
        app_config.get_index_dir(),
        app_config.get_results_dir(),
    ] {
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
            tracing::info!("Created directory: {:?}", dir);
        }
    }

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| app_config.get_database_url());
    let pool = db::connect(&database_url).await?;
    db::run_migrations(&pool).await?;

    // Register all configured data sources / 注册所有已配置数据源
    let registry = DataSourceRegistry::new();
    forumsift_backend::register_data_sources(&registry, &pool, &app_config).await?;
    tracing::info!("Data sources registered: {:?}", registry.names().await);

    let queue = JobQueue::new(pool.clone());
    // 常驻的过期清理任务（重复入队会被忽略）
    queue.add_job(JOBTYPE_EXPIRE, "", 0).await?;

    let engine = Arc::new(SearchEngine::new(
        pool.clone(),
        queue.clone(),
        registry.clone(),
        app_config.get_results_dir(),
    ));
    let expirer = Arc::new(DatasetExpirer::new(
        pool.clone(),
        queue.clone(),
        app_config.get_results_dir(),
        app_config.datasources.clone(),
        app_config.workers.expire_interval_secs,
    ));

    let workers = WorkerPool::start(engine, expirer, queue.clone(), &app_config.workers);

    // Monitoring API; port 0 disables it / 监控API，端口0为禁用
    if app_config.api.port != 0 {
        let api_server = api::ApiServer::new(
            pool.clone(),
            queue.clone(),
            workers.worker_counts().clone(),
            app_config.datasources.clone(),
        );
        let bind_addr = app_config.get_api_bind_address();
        tokio::spawn(async move {
            if let Err(e) = api_server.serve(&bind_addr).await {
                tracing::error!("Local API stopped: {:#}", e);
            }
        });
    } else {
        tracing::info!("Local API not available per configuration");
    }

    tracing::info!(
        "Backend running with {} query workers",
        app_config.workers.query_workers
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    workers.shutdown().await;

    Ok(())
}
