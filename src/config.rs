//! Application configuration module / 应用配置模块
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Global configuration instance / 全局配置实例
static CONFIG: OnceCell<Arc<RwLock<AppConfig>>> = OnceCell::new();

/// Software version recorded on every dataset the engine touches / 软件版本标识
pub fn software_version() -> String {
    format!("{} ({})", env!("CARGO_PKG_VERSION"), env!("BUILD_TIME"))
}

/// Application configuration / 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Monitoring API socket configuration / 监控API配置
    pub api: ApiConfig,
    /// Database configuration / 数据库配置
    pub database: DatabaseConfig,
    /// Full-text index configuration / 全文索引配置
    pub index: IndexConfig,
    /// Worker pool configuration / 工作池配置
    pub workers: WorkerConfig,
    /// Result file configuration / 结果文件配置
    pub results: ResultConfig,
    /// Registered data sources / 已注册数据源
    pub datasources: Vec<DataSourceConfig>,
}

/// Monitoring API socket configuration / 监控API配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Listen address, local by design / 监听地址
    pub host: String,
    /// Listen port, 0 disables the API / 监听端口，0为禁用
    pub port: u16,
}

/// Database configuration / 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Data directory path / 数据目录路径
    pub data_dir: String,
    /// Main database file path (relative to data_dir) / 主数据库文件路径
    pub db_file: String,
}

/// Full-text index configuration / 全文索引配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index database directory (relative to data_dir) / 索引数据库目录
    pub db_dir: String,
    /// Index query time budget in seconds / 索引查询时间预算（秒）
    pub timeout_secs: u64,
}

/// Worker pool configuration / 工作池配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Concurrent query jobs; bounds load on the shared backends / 并发查询任务数
    pub query_workers: usize,
    /// Queue poll interval in milliseconds / 队列轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// Dataset expiry sweep interval in seconds / 数据集过期清理间隔（秒）
    pub expire_interval_secs: i64,
}

/// Result file configuration / 结果文件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultConfig {
    /// Result file directory (relative to data_dir) / 结果文件目录
    pub dir: String,
}

/// One data source entry / 单个数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceConfig {
    /// Adapter name, must match a registered adapter / 适配器名称
    pub name: String,
    /// Table prefix (posts_<prefix>, threads_<prefix>) / 表前缀
    pub prefix: String,
    /// Delete datasets older than this many seconds; absent = keep forever
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_after_secs: Option<i64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            database: DatabaseConfig::default(),
            index: IndexConfig::default(),
            workers: WorkerConfig::default(),
            results: ResultConfig::default(),
            datasources: vec![
                DataSourceConfig {
                    name: "fourchan".to_string(),
                    prefix: "4chan".to_string(),
                    expire_after_secs: None,
                },
                DataSourceConfig {
                    name: "eightchan".to_string(),
                    prefix: "8chan".to_string(),
                    expire_after_secs: None,
                },
            ],
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4444,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            db_file: "forumsift.db".to_string(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            db_dir: "index".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            query_workers: 2,
            poll_interval_ms: 1000,
            expire_interval_secs: 3600,
        }
    }
}

impl Default for ResultConfig {
    fn default() -> Self {
        Self {
            dir: "results".to_string(),
        }
    }
}

impl AppConfig {
    /// Get the full database URL / 获取完整的数据库URL
    pub fn get_database_url(&self) -> String {
        let db_path = Path::new(&self.database.data_dir).join(&self.database.db_file);
        format!("sqlite:{}?mode=rwc", db_path.to_string_lossy())
    }

    /// Get the full data directory path / 获取完整的数据目录路径
    pub fn get_data_dir(&self) -> PathBuf {
        PathBuf::from(&self.database.data_dir)
    }

    /// Get the index database directory / 获取索引数据库目录
    pub fn get_index_dir(&self) -> PathBuf {
        self.get_data_dir().join(&self.index.db_dir)
    }

    /// Get the index database path for one source / 获取指定数据源的索引数据库路径
    pub fn get_index_db_path(&self, prefix: &str) -> PathBuf {
        self.get_index_dir().join(format!("index_{}.db", prefix))
    }

    /// Get the result file directory / 获取结果文件目录
    pub fn get_results_dir(&self) -> PathBuf {
        self.get_data_dir().join(&self.results.dir)
    }

    /// Get the monitoring API bind address / 获取监控API监听地址
    pub fn get_api_bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

/// Load configuration from config.json, creating a default file if absent
/// 从config.json加载配置，不存在时写出默认配置
pub fn load_config() -> anyhow::Result<AppConfig> {
    let config_path = Path::new("config.json");

    let config = if config_path.exists() {
        let content = std::fs::read_to_string(config_path)?;
        serde_json::from_str(&content)?
    } else {
        let config = AppConfig::default();
        let content = serde_json::to_string_pretty(&config)?;
        std::fs::write(config_path, content)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        config
    };

    CONFIG
        .set(Arc::new(RwLock::new(config.clone())))
        .map_err(|_| anyhow::anyhow!("configuration already loaded"))?;

    Ok(config)
}

/// Access the global configuration / 访问全局配置
pub fn config() -> AppConfig {
    CONFIG
        .get()
        .map(|c| c.read().clone())
        .unwrap_or_default()
}
