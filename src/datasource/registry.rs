//! Data source registry / 数据源注册表

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::DataSource;

/// Maps adapter names to live adapters / 名称到适配器的映射
#[derive(Clone, Default)]
pub struct DataSourceRegistry {
    sources: Arc<RwLock<HashMap<String, Arc<dyn DataSource>>>>,
}

impl DataSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own name / 注册适配器
    pub async fn register(&self, source: Arc<dyn DataSource>) {
        let name = source.name().to_string();
        let mut sources = self.sources.write().await;
        if sources.insert(name.clone(), source).is_some() {
            tracing::warn!("Data source {} registered twice, replacing", name);
        } else {
            tracing::info!("Data source registered: {}", name);
        }
    }

    /// Look up an adapter by name / 按名称查找适配器
    pub async fn get(&self, name: &str) -> Option<Arc<dyn DataSource>> {
        let sources = self.sources.read().await;
        sources.get(name).cloned()
    }

    /// Registered adapter names / 已注册的适配器名称
    pub async fn names(&self) -> Vec<String> {
        let sources = self.sources.read().await;
        sources.keys().cloned().collect()
    }
}
