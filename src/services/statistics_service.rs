//! Statistics recorder and aggregator
//!
//! Action names follow `"<entityType>_<verb>"`; [`entity_type_from_action`]
//! recovers the entity type by splitting on the first `_`. Callers of
//! [`StatisticsService::log_action`] rely on that convention, so every action
//! name produced here goes through [`action_name`].

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{debug, info};

use super::identity::ClientInfo;
use crate::config::get_config;
use crate::errors::{EngagementError, Result};
use crate::storage::backend::{day_bounds, days_before};
use crate::storage::{
    ContentType, DailySummaryRow, GeoRow, SeaOrmStorage, StatisticsEvent, StatisticsRecord,
    TopContentRow,
};
use crate::utils::truncate_chars;

/// 排行榜条数上限
pub const MAX_TOP_LIMIT: u64 = 100;
/// 聚合查询的时间窗口上限（天），更大的窗口等同于全部数据
pub const MAX_WINDOW_DAYS: u64 = 36_500;

/// 动作名中的动词部分
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum StatVerb {
    View,
    Create,
    Like,
    Unlike,
    Share,
    Unshare,
    ExternalShare,
}

/// `<entityType>_<verb>`，例如 `article_view`
pub fn action_name(content_type: ContentType, verb: StatVerb) -> String {
    format!("{}_{}", content_type, verb)
}

/// 从动作名推导实体类型：按第一个 `_` 切分，没有 `_` 时整个字符串即实体类型
pub fn entity_type_from_action(action: &str) -> &str {
    action
        .split_once('_')
        .map(|(entity_type, _)| entity_type)
        .unwrap_or(action)
}

pub struct StatisticsService {
    storage: Arc<SeaOrmStorage>,
    summary_days: u64,
}

impl StatisticsService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        let summary_days = get_config()
            .statistics
            .summary_days
            .clamp(1, MAX_WINDOW_DAYS);
        Self {
            storage,
            summary_days,
        }
    }

    pub fn storage(&self) -> &Arc<SeaOrmStorage> {
        &self.storage
    }

    /// 追加一条事件，返回生成的 id
    pub async fn record_event(&self, mut event: StatisticsEvent) -> Result<i64> {
        if event.entity_type.trim().is_empty() || event.action.trim().is_empty() {
            return Err(EngagementError::validation(
                "Statistics event requires entity_type and action",
            ));
        }

        event.ip_address = clip(event.ip_address, 45);
        event.user_agent = clip(event.user_agent, 255);
        event.country = clip(event.country, 64);
        event.city = clip(event.city, 100);

        let id = self.storage.insert_statistic(&event).await?;
        debug!(
            "Recorded statistic #{} {} for {}#{}",
            id, event.action, event.entity_type, event.entity_id
        );
        Ok(id)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        &self,
        entity_type: &str,
        entity_id: i64,
        action: &str,
        ip: Option<&str>,
        user_agent: Option<&str>,
        country: Option<&str>,
        city: Option<&str>,
    ) -> Result<i64> {
        let mut event = StatisticsEvent::new(entity_type, entity_id, action);
        event.ip_address = ip.map(String::from);
        event.user_agent = user_agent.map(String::from);
        event.country = country.map(String::from);
        event.city = city.map(String::from);
        self.record_event(event).await
    }

    /// 记录动作，实体类型由动作名推导
    pub async fn log_action(&self, action: &str, entity_id: i64, client: &ClientInfo) -> Result<i64> {
        let entity_type = entity_type_from_action(action);
        let mut event = StatisticsEvent::new(entity_type, entity_id, action);
        event.ip_address = Some(client.ip.clone()).filter(|ip| !ip.is_empty());
        event.user_agent = Some(client.user_agent.clone()).filter(|ua| !ua.is_empty());
        event.country = client.country.clone();
        event.city = client.city.clone();
        self.record_event(event).await
    }

    pub async fn get_by_entity(
        &self,
        entity_type: &str,
        entity_id: i64,
        limit: u64,
    ) -> Result<Vec<StatisticsRecord>> {
        self.storage
            .statistics_by_entity(entity_type, entity_id, limit.clamp(1, 1000))
            .await
    }

    /// 指定日期时只统计该 UTC 自然日；否则统计最近 summary_days 天
    pub async fn get_daily_summary(
        &self,
        date: Option<NaiveDate>,
        entity_type: Option<&str>,
    ) -> Result<Vec<DailySummaryRow>> {
        let (start, end) = match date {
            Some(day) => day_bounds(day)?,
            None => {
                let (_, end) = day_bounds(Utc::now().date_naive())?;
                (days_before(end, self.summary_days)?, end)
            }
        };
        self.storage.daily_summary(start, end, entity_type).await
    }

    pub async fn get_top_content(
        &self,
        entity_type: &str,
        action: &str,
        limit: u64,
        days: u64,
    ) -> Result<Vec<TopContentRow>> {
        let since = days_before(Utc::now(), days.clamp(1, MAX_WINDOW_DAYS))?;
        self.storage
            .top_content(entity_type, action, since, limit.clamp(1, MAX_TOP_LIMIT))
            .await
    }

    pub async fn get_geographic_stats(
        &self,
        entity_type: Option<&str>,
        days: u64,
    ) -> Result<Vec<GeoRow>> {
        let since = days_before(Utc::now(), days.clamp(1, MAX_WINDOW_DAYS))?;
        self.storage.geographic_stats(entity_type, since).await
    }

    /// 删除早于保留期的事件，返回删除行数
    ///
    /// 保留期无法换算成时间点时返回 Validation 错误，不删除任何数据
    pub async fn clean_old_stats(&self, days_to_keep: u64) -> Result<u64> {
        let deleted = self.storage.clean_old_stats(days_to_keep).await?;
        info!(
            "Statistics cleanup removed {} rows older than {} days",
            deleted, days_to_keep
        );
        Ok(deleted)
    }
}

fn clip(value: Option<String>, max_chars: usize) -> Option<String> {
    value.map(|v| truncate_chars(&v, max_chars).to_string())
}
