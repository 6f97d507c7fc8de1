//! Statistics event log
//!
//! Append-only. Rows are inserted by [`SeaOrmStorage::insert_statistic`] and
//! only ever removed by the age-based sweep in
//! [`SeaOrmStorage::clean_old_stats`]. Aggregations are point-in-time reads.

use std::time::Duration as StdDuration;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DbBackend, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{SeaOrmStorage, retry};
use crate::errors::{EngagementError, Result};

use migration::entities::statistic;

/// 每批删除的行数
const CLEANUP_BATCH_SIZE: u64 = 5000;
/// 防止无限循环
const CLEANUP_MAX_ITERATIONS: u32 = 1000;

/// 一条原始统计事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsEvent {
    pub entity_type: String,
    pub entity_id: i64,
    pub action: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StatisticsEvent {
    pub fn new(entity_type: impl Into<String>, entity_id: i64, action: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id,
            action: action.into(),
            ip_address: None,
            user_agent: None,
            country: None,
            city: None,
            created_at: Utc::now(),
        }
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// 已存储的统计事件（带 id）
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsRecord {
    pub id: i64,
    #[serde(flatten)]
    pub event: StatisticsEvent,
}

impl From<statistic::Model> for StatisticsRecord {
    fn from(model: statistic::Model) -> Self {
        Self {
            id: model.id,
            event: StatisticsEvent {
                entity_type: model.entity_type,
                entity_id: model.entity_id,
                action: model.action,
                ip_address: model.ip_address,
                user_agent: model.user_agent,
                country: model.country,
                city: model.city,
                created_at: model.created_at,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromQueryResult)]
pub struct DailySummaryRow {
    /// YYYY-MM-DD (UTC)
    pub day: String,
    pub entity_type: String,
    pub action: String,
    pub total: i64,
    pub unique_visitors: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromQueryResult)]
pub struct TopContentRow {
    pub entity_id: i64,
    pub total: i64,
    pub unique_visitors: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromQueryResult)]
pub struct GeoRow {
    pub country: Option<String>,
    pub city: Option<String>,
    pub total: i64,
    pub unique_visitors: i64,
}

/// `created_at` 按 UTC 自然日格式化（YYYY-MM-DD），与 [`day_bounds`] 的过滤口径一致
fn day_expr(backend: DbBackend) -> Expr {
    match backend {
        DbBackend::Sqlite => Expr::cust("strftime('%Y-%m-%d', created_at)"),
        DbBackend::MySql => Expr::cust(
            "DATE_FORMAT(CONVERT_TZ(created_at, @@session.time_zone, '+00:00'), '%Y-%m-%d')",
        ),
        _ => Expr::cust("TO_CHAR(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD')"),
    }
}

fn unique_visitors_expr() -> Expr {
    Expr::cust("COUNT(DISTINCT ip_address)")
}

/// 一个 UTC 自然日的 [start, end)
pub(crate) fn day_bounds(day: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let next = day
        .succ_opt()
        .ok_or_else(|| EngagementError::validation(format!("Date out of range: {}", day)))?;
    Ok((
        day.and_time(NaiveTime::MIN).and_utc(),
        next.and_time(NaiveTime::MIN).and_utc(),
    ))
}

/// `now - days`，超出 chrono 可表示范围时返回 Validation 错误
pub(crate) fn days_before(now: DateTime<Utc>, days: u64) -> Result<DateTime<Utc>> {
    i64::try_from(days)
        .ok()
        .and_then(TimeDelta::try_days)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| {
            EngagementError::validation(format!("Day window out of range: {} days", days))
        })
}

impl SeaOrmStorage {
    /// 追加一条统计事件，返回生成的 id（只执行一次）
    pub async fn insert_statistic(&self, event: &StatisticsEvent) -> Result<i64> {
        let model = statistic::ActiveModel {
            entity_type: Set(event.entity_type.clone()),
            entity_id: Set(event.entity_id),
            action: Set(event.action.clone()),
            ip_address: Set(event.ip_address.clone()),
            user_agent: Set(event.user_agent.clone()),
            country: Set(event.country.clone()),
            city: Set(event.city.clone()),
            created_at: Set(event.created_at),
            ..Default::default()
        };

        let result = statistic::Entity::insert(model)
            .exec(&self.db)
            .await
            .map_err(|e| {
                EngagementError::database_operation(format!(
                    "Failed to record statistic '{}' for {}#{}: {}",
                    event.action, event.entity_type, event.entity_id, e
                ))
            })?;

        Ok(result.last_insert_id)
    }

    /// 某个实体的统计事件，最新的在前
    pub async fn statistics_by_entity(
        &self,
        entity_type: &str,
        entity_id: i64,
        limit: u64,
    ) -> Result<Vec<StatisticsRecord>> {
        let db = &self.db;
        let models = retry::with_retry("statistics_by_entity", self.retry_config, || async {
            statistic::Entity::find()
                .filter(statistic::Column::EntityType.eq(entity_type))
                .filter(statistic::Column::EntityId.eq(entity_id))
                .order_by_desc(statistic::Column::CreatedAt)
                .order_by_desc(statistic::Column::Id)
                .limit(limit)
                .all(db)
                .await
        })
        .await?;

        Ok(models.into_iter().map(StatisticsRecord::from).collect())
    }

    /// 按 (day, entity_type, action) 分组，时间范围 [start, end)
    pub async fn daily_summary(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        entity_type: Option<&str>,
    ) -> Result<Vec<DailySummaryRow>> {
        let db = &self.db;
        let day = day_expr(self.db_backend());
        let day_ref = &day;

        let rows = retry::with_retry("daily_summary", self.retry_config, || async {
            let mut query = statistic::Entity::find()
                .select_only()
                .column_as(day_ref.clone(), "day")
                .column(statistic::Column::EntityType)
                .column(statistic::Column::Action)
                .column_as(statistic::Column::Id.count(), "total")
                .column_as(unique_visitors_expr(), "unique_visitors")
                .filter(statistic::Column::CreatedAt.gte(start))
                .filter(statistic::Column::CreatedAt.lt(end));
            if let Some(entity_type) = entity_type {
                query = query.filter(statistic::Column::EntityType.eq(entity_type));
            }
            query
                .group_by(day_ref.clone())
                .group_by(statistic::Column::EntityType)
                .group_by(statistic::Column::Action)
                .order_by_desc(Expr::cust("day"))
                .order_by_desc(Expr::cust("total"))
                .into_model::<DailySummaryRow>()
                .all(db)
                .await
        })
        .await?;

        Ok(rows)
    }

    /// 某类实体某个动作在 since 之后的热门排行
    pub async fn top_content(
        &self,
        entity_type: &str,
        action: &str,
        since: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<TopContentRow>> {
        let db = &self.db;
        let rows = retry::with_retry("top_content", self.retry_config, || async {
            statistic::Entity::find()
                .select_only()
                .column(statistic::Column::EntityId)
                .column_as(statistic::Column::Id.count(), "total")
                .column_as(unique_visitors_expr(), "unique_visitors")
                .filter(statistic::Column::EntityType.eq(entity_type))
                .filter(statistic::Column::Action.eq(action))
                .filter(statistic::Column::CreatedAt.gte(since))
                .group_by(statistic::Column::EntityId)
                .order_by_desc(Expr::cust("total"))
                .order_by_asc(statistic::Column::EntityId)
                .limit(limit)
                .into_model::<TopContentRow>()
                .all(db)
                .await
        })
        .await?;

        Ok(rows)
    }

    /// 按 (country, city) 分组；未知地区以 NULL 出现
    pub async fn geographic_stats(
        &self,
        entity_type: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<GeoRow>> {
        let db = &self.db;
        let rows = retry::with_retry("geographic_stats", self.retry_config, || async {
            let mut query = statistic::Entity::find()
                .select_only()
                .column(statistic::Column::Country)
                .column(statistic::Column::City)
                .column_as(statistic::Column::Id.count(), "total")
                .column_as(unique_visitors_expr(), "unique_visitors")
                .filter(statistic::Column::CreatedAt.gte(since));
            if let Some(entity_type) = entity_type {
                query = query.filter(statistic::Column::EntityType.eq(entity_type));
            }
            query
                .group_by(statistic::Column::Country)
                .group_by(statistic::Column::City)
                .order_by_desc(Expr::cust("total"))
                .into_model::<GeoRow>()
                .all(db)
                .await
        })
        .await?;

        Ok(rows)
    }

    /// 删除早于 now - days_to_keep 的统计事件（分批删除避免长事务）
    pub async fn clean_old_stats(&self, days_to_keep: u64) -> Result<u64> {
        let cutoff = days_before(Utc::now(), days_to_keep)?;
        let db = &self.db;

        let mut total_deleted = 0u64;
        let mut iterations = 0u32;

        loop {
            if iterations >= CLEANUP_MAX_ITERATIONS {
                warn!(
                    "Statistics cleanup reached max iterations {} (deleted {} rows)",
                    CLEANUP_MAX_ITERATIONS, total_deleted
                );
                break;
            }

            let ids: Vec<i64> = retry::with_retry("clean_old_stats_select", self.retry_config, || async {
                statistic::Entity::find()
                    .select_only()
                    .column(statistic::Column::Id)
                    .filter(statistic::Column::CreatedAt.lt(cutoff))
                    .order_by_asc(statistic::Column::Id)
                    .limit(CLEANUP_BATCH_SIZE)
                    .into_tuple()
                    .all(db)
                    .await
            })
            .await?;

            if ids.is_empty() {
                break;
            }

            let ids_ref = &ids;
            let deleted = retry::with_retry("clean_old_stats_delete", self.retry_config, || async {
                statistic::Entity::delete_many()
                    .filter(statistic::Column::Id.is_in(ids_ref.iter().copied()))
                    .exec(db)
                    .await
            })
            .await?
            .rows_affected;

            total_deleted += deleted;
            iterations += 1;

            debug!(
                "Statistics cleanup batch {}: deleted {} rows (total {})",
                iterations, deleted, total_deleted
            );

            if (ids.len() as u64) < CLEANUP_BATCH_SIZE {
                break;
            }

            tokio::time::sleep(StdDuration::from_millis(50)).await;
        }

        Ok(total_deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_day_bounds_cover_one_utc_day() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let (start, end) = day_bounds(day).unwrap();
        assert_eq!(start.to_rfc3339(), "2026-03-01T00:00:00+00:00");
        assert_eq!(end - start, Duration::days(1));

        assert!(matches!(
            day_bounds(NaiveDate::MAX),
            Err(EngagementError::Validation(_))
        ));
    }

    #[test]
    fn test_days_before_rejects_unrepresentable_windows() {
        let now = Utc::now();
        assert_eq!(days_before(now, 0).unwrap(), now);
        assert_eq!(days_before(now, 7).unwrap(), now - Duration::days(7));

        // u64::MAX 不能被截断成负数（那样截止点会落在未来）
        for days in [u64::MAX, i64::MAX as u64, 100_000_000] {
            assert!(
                matches!(days_before(now, days), Err(EngagementError::Validation(_))),
                "{days} days"
            );
        }
    }

    #[test]
    fn test_day_expr_buckets_in_utc() {
        let mysql = format!("{:?}", day_expr(DbBackend::MySql));
        assert!(mysql.contains("CONVERT_TZ"));
        let postgres = format!("{:?}", day_expr(DbBackend::Postgres));
        assert!(postgres.contains("AT TIME ZONE 'UTC'"));
    }

    #[test]
    fn test_event_builder_defaults() {
        let past = Utc::now() - Duration::days(3);
        let event = StatisticsEvent::new("article", 42, "article_view").at(past);
        assert_eq!(event.entity_type, "article");
        assert_eq!(event.created_at, past);
        assert!(event.ip_address.is_none());
    }
}
