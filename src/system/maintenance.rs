//! 统计日志保留期清理 + 计数器对账
//!
//! 不在请求路径上运行，由后台任务按 `statistics.cleanup_interval_hours` 周期触发。

use std::sync::Arc;
use std::time::Duration as StdDuration;

use tracing::{error, info};

use crate::config::StatisticsConfig;
use crate::services::{EngagementService, StatisticsService};
use crate::storage::ReconcileReport;

/// 首次运行前的延迟
const INITIAL_DELAY_SECS: u64 = 300;

/// 一次维护运行的结果
#[derive(Debug, Default)]
pub struct MaintenanceReport {
    /// 删除的统计事件数量
    pub stats_deleted: u64,
    /// 各内容类型的对账结果（关闭对账时为空）
    pub reconciled: Vec<ReconcileReport>,
}

pub struct MaintenanceTask {
    statistics: Arc<StatisticsService>,
    engagement: Arc<EngagementService>,
    retention_days: u64,
    reconcile_counters: bool,
}

impl MaintenanceTask {
    pub fn new(
        statistics: Arc<StatisticsService>,
        engagement: Arc<EngagementService>,
        config: &StatisticsConfig,
    ) -> Self {
        Self {
            statistics,
            engagement,
            retention_days: config.retention_days,
            reconcile_counters: config.reconcile_counters,
        }
    }

    /// 运行一次完整维护；单个步骤失败只记录日志
    pub async fn run_once(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        match self.statistics.clean_old_stats(self.retention_days).await {
            Ok(deleted) => report.stats_deleted = deleted,
            Err(e) => error!("Failed to clean up statistics: {}", e),
        }

        if self.reconcile_counters {
            report.reconciled = self.engagement.reconcile_all().await;
        }

        info!(
            "Maintenance completed: {} statistics rows deleted, {} content types reconciled",
            report.stats_deleted,
            report.reconciled.len()
        );
        report
    }

    /// 启动后台维护任务
    pub fn spawn_background_task(self: Arc<Self>, interval_hours: u64) {
        let interval_hours = interval_hours.max(1);
        tokio::spawn(async move {
            let interval = StdDuration::from_secs(interval_hours * 60 * 60);

            tokio::time::sleep(StdDuration::from_secs(INITIAL_DELAY_SECS)).await;

            loop {
                self.run_once().await;
                tokio::time::sleep(interval).await;
            }
        });

        info!(
            "Maintenance background task started (interval: {} hours)",
            interval_hours
        );
    }
}
