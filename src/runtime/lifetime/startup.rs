use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::get_config;
use crate::services::{ContentService, EngagementService, StatisticsService};
use crate::storage::{SeaOrmStorage, StorageFactory};
use crate::system::MaintenanceTask;

/// 服务端和 CLI 共用的服务集合
#[derive(Clone)]
pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub statistics: Arc<StatisticsService>,
    pub engagement: Arc<EngagementService>,
    pub content: Arc<ContentService>,
}

impl StartupContext {
    /// 在已有存储上装配服务
    pub fn from_storage(storage: Arc<SeaOrmStorage>) -> Self {
        let statistics = Arc::new(StatisticsService::new(storage.clone()));
        let engagement = Arc::new(EngagementService::new(
            storage.clone(),
            statistics.clone(),
        ));
        let content = Arc::new(ContentService::new(
            storage.clone(),
            engagement.clone(),
            statistics.clone(),
        ));

        Self {
            storage,
            statistics,
            engagement,
            content,
        }
    }

    pub fn maintenance_task(&self) -> MaintenanceTask {
        MaintenanceTask::new(
            self.statistics.clone(),
            self.engagement.clone(),
            &get_config().statistics,
        )
    }
}

/// 连接数据库、运行迁移并装配服务
pub async fn prepare_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.get_backend_name());

    let context = StartupContext::from_storage(storage);

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );
    Ok(context)
}
