//! Like/share toggle protocol
//!
//! The ledger decides the outcome, the counter follows it:
//!
//! - ledger row absent: insert it, then `count + 1`
//! - ledger row present: delete it, then `count - 1 WHERE count > 0`
//!
//! A second concurrent insert for the same natural key hits the unique index
//! and is reported as "engaged" without moving the counter again. A delete
//! that finds nothing (a concurrent un-toggle won) is reported as "not
//! engaged" without a second decrement.
//!
//! The ledger write and the counter write are separate single-row statements.
//! If the counter write fails after the ledger write succeeded the error is
//! returned and the ledger row stays; [`EngagementService::reconcile`] brings
//! the counter back in line.
//!
//! Raw increments ([`EngagementService::increment_share_count`],
//! [`EngagementService::increment_view_count`]) never touch the ledger.

use std::sync::Arc;

use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use super::identity::{ClientInfo, IdentityResolver};
use super::statistics_service::{StatVerb, StatisticsService, action_name};
use crate::config::get_config;
use crate::errors::{EngagementError, Result};
use crate::storage::{
    ContentType, CounterColumn, EngagementAction, InsertOutcome, ReconcileReport, SeaOrmStorage,
};

/// toggle 的通用结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub engaged: bool,
    /// liked / unliked / shared / unshared
    pub action: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LikeResult {
    pub liked: bool,
    pub action: String,
}

impl From<ToggleOutcome> for LikeResult {
    fn from(outcome: ToggleOutcome) -> Self {
        Self {
            liked: outcome.engaged,
            action: outcome.action.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareResult {
    pub shared: bool,
    pub action: String,
}

impl From<ToggleOutcome> for ShareResult {
    fn from(outcome: ToggleOutcome) -> Self {
        Self {
            shared: outcome.engaged,
            action: outcome.action.to_string(),
        }
    }
}

pub struct EngagementService {
    storage: Arc<SeaOrmStorage>,
    resolver: IdentityResolver,
    /// None = 不写统计日志
    statistics: Option<Arc<StatisticsService>>,
}

impl EngagementService {
    /// 从全局配置构建
    pub fn new(storage: Arc<SeaOrmStorage>, statistics: Arc<StatisticsService>) -> Self {
        let config = get_config();
        let statistics = config.engagement.record_statistics.then_some(statistics);
        Self::with_options(
            storage,
            IdentityResolver::from(&config.engagement),
            statistics,
        )
    }

    pub fn with_options(
        storage: Arc<SeaOrmStorage>,
        resolver: IdentityResolver,
        statistics: Option<Arc<StatisticsService>>,
    ) -> Self {
        Self {
            storage,
            resolver,
            statistics,
        }
    }

    /// 翻转某个身份对内容的 like/share 状态
    pub async fn toggle(
        &self,
        content_type: ContentType,
        content_id: i64,
        action: EngagementAction,
        client: &ClientInfo,
    ) -> Result<ToggleOutcome> {
        ensure_content_id(content_id)?;
        let key = self
            .resolver
            .resolve(client, content_type, content_id, action)?;
        let counter = action.counter();

        let outcome = if self.storage.engagement_exists(&key).await? {
            if self.storage.delete_engagement(&key).await? {
                self.storage
                    .decrement_counter(content_type, content_id, counter)
                    .await?;
            } else {
                debug!(
                    "{} on {}#{} was already removed by a concurrent request",
                    action, content_type, content_id
                );
            }
            ToggleOutcome {
                engaged: false,
                action: action.disengaged_verb(),
            }
        } else {
            match self.storage.insert_engagement(&key).await? {
                InsertOutcome::Inserted => {
                    self.storage
                        .increment_counter(content_type, content_id, counter)
                        .await?;
                }
                InsertOutcome::AlreadyExists => {
                    debug!(
                        "{} on {}#{} was already recorded by a concurrent request",
                        action, content_type, content_id
                    );
                }
            }
            ToggleOutcome {
                engaged: true,
                action: action.engaged_verb(),
            }
        };

        let verb = match (action, outcome.engaged) {
            (EngagementAction::Like, true) => StatVerb::Like,
            (EngagementAction::Like, false) => StatVerb::Unlike,
            (EngagementAction::Share, true) => StatVerb::Share,
            (EngagementAction::Share, false) => StatVerb::Unshare,
        };
        self.log_best_effort(content_type, content_id, verb, client)
            .await;

        Ok(outcome)
    }

    pub async fn toggle_like(
        &self,
        content_type: ContentType,
        content_id: i64,
        client: &ClientInfo,
    ) -> Result<LikeResult> {
        self.toggle(content_type, content_id, EngagementAction::Like, client)
            .await
            .map(LikeResult::from)
    }

    pub async fn toggle_share(
        &self,
        content_type: ContentType,
        content_id: i64,
        client: &ClientInfo,
    ) -> Result<ShareResult> {
        self.toggle(content_type, content_id, EngagementAction::Share, client)
            .await
            .map(ShareResult::from)
    }

    /// 纯存在性检查，无副作用
    pub async fn has_engaged(
        &self,
        content_type: ContentType,
        content_id: i64,
        action: EngagementAction,
        client: &ClientInfo,
    ) -> Result<bool> {
        let key = self
            .resolver
            .resolve(client, content_type, content_id, action)?;
        self.storage.engagement_exists(&key).await
    }

    pub async fn has_user_liked(
        &self,
        content_type: ContentType,
        content_id: i64,
        client: &ClientInfo,
    ) -> Result<bool> {
        self.has_engaged(content_type, content_id, EngagementAction::Like, client)
            .await
    }

    pub async fn has_user_shared(
        &self,
        content_type: ContentType,
        content_id: i64,
        client: &ClientInfo,
    ) -> Result<bool> {
        self.has_engaged(content_type, content_id, EngagementAction::Share, client)
            .await
    }

    /// 匿名/外部分享：只加计数，不去重，不写账本
    pub async fn increment_share_count(
        &self,
        content_type: ContentType,
        content_id: i64,
    ) -> Result<bool> {
        ensure_content_id(content_id)?;
        self.storage
            .increment_counter(content_type, content_id, CounterColumn::SharedCount)
            .await
    }

    /// 外部分享：raw 计数 + `<type>_external_share` 统计事件
    pub async fn record_external_share(
        &self,
        content_type: ContentType,
        content_id: i64,
        client: &ClientInfo,
    ) -> Result<bool> {
        let matched = self.increment_share_count(content_type, content_id).await?;
        if matched {
            self.log_best_effort(content_type, content_id, StatVerb::ExternalShare, client)
                .await;
        }
        Ok(matched)
    }

    /// 浏览计数，每次读取内容调用一次
    pub async fn increment_view_count(
        &self,
        content_type: ContentType,
        content_id: i64,
    ) -> Result<bool> {
        ensure_content_id(content_id)?;
        self.storage
            .increment_counter(content_type, content_id, CounterColumn::ViewCount)
            .await
    }

    pub async fn count_engagements(
        &self,
        content_type: ContentType,
        content_id: i64,
        action: EngagementAction,
    ) -> Result<u64> {
        self.storage
            .count_engagements(content_type, content_id, action)
            .await
    }

    /// 删除内容时清理账本
    pub async fn purge_content(&self, content_type: ContentType, content_id: i64) -> Result<u64> {
        self.storage
            .purge_engagements(content_type, content_id)
            .await
    }

    pub async fn reconcile(&self, content_type: ContentType) -> Result<ReconcileReport> {
        self.storage.reconcile_counters(content_type).await
    }

    /// 对所有内容类型对账；单个类型失败不影响其它类型
    pub async fn reconcile_all(&self) -> Vec<ReconcileReport> {
        let mut reports = Vec::new();
        for content_type in ContentType::iter() {
            match self.reconcile(content_type).await {
                Ok(report) => reports.push(report),
                Err(e) => warn!("Counter reconciliation for {} failed: {}", content_type, e),
            }
        }
        let fixed: u64 = reports
            .iter()
            .map(|r| r.likes_fixed + r.shares_fixed)
            .sum();
        info!("Counter reconciliation finished, {} counters fixed", fixed);
        reports
    }

    async fn log_best_effort(
        &self,
        content_type: ContentType,
        content_id: i64,
        verb: StatVerb,
        client: &ClientInfo,
    ) {
        let Some(statistics) = &self.statistics else {
            return;
        };
        let action = action_name(content_type, verb);
        if let Err(e) = statistics.log_action(&action, content_id, client).await {
            warn!("Failed to record '{}' for #{}: {}", action, content_id, e);
        }
    }
}

fn ensure_content_id(content_id: i64) -> Result<()> {
    if content_id <= 0 {
        return Err(EngagementError::validation(format!(
            "Invalid content id: {}",
            content_id
        )));
    }
    Ok(())
}
