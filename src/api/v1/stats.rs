//! 统计查询接口

use actix_web::{HttpResponse, Result as ActixResult, web};
use chrono::NaiveDate;
use std::sync::Arc;

use crate::errors::EngagementError;
use crate::services::StatisticsService;

use super::helpers::{api_result, error_from_engagement};
use super::types::{DailySummaryQuery, EntityStatsQuery, GeoQuery, TopContentQuery};

const DEFAULT_TOP_LIMIT: u64 = 10;
const DEFAULT_WINDOW_DAYS: u64 = 7;
const DEFAULT_ENTITY_LIMIT: u64 = 100;

fn parse_date(value: &str) -> Result<NaiveDate, EngagementError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        EngagementError::date_parse(format!(
            "Invalid date '{}', expected YYYY-MM-DD",
            value
        ))
    })
}

/// GET /stats/daily?date=&entity_type=
pub async fn daily_summary(
    query: web::Query<DailySummaryQuery>,
    statistics: web::Data<Arc<StatisticsService>>,
) -> ActixResult<HttpResponse> {
    let date = match query.date.as_deref().map(parse_date).transpose() {
        Ok(date) => date,
        Err(e) => return Ok(error_from_engagement(&e)),
    };
    Ok(api_result(
        statistics
            .get_daily_summary(date, query.entity_type.as_deref())
            .await,
    ))
}

/// GET /stats/top?entity_type=&action=&limit=&days=
pub async fn top_content(
    query: web::Query<TopContentQuery>,
    statistics: web::Data<Arc<StatisticsService>>,
) -> ActixResult<HttpResponse> {
    let action = query
        .action
        .clone()
        .unwrap_or_else(|| format!("{}_view", query.entity_type));
    Ok(api_result(
        statistics
            .get_top_content(
                &query.entity_type,
                &action,
                query.limit.unwrap_or(DEFAULT_TOP_LIMIT),
                query.days.unwrap_or(DEFAULT_WINDOW_DAYS),
            )
            .await,
    ))
}

/// GET /stats/geo?entity_type=&days=
pub async fn geographic_stats(
    query: web::Query<GeoQuery>,
    statistics: web::Data<Arc<StatisticsService>>,
) -> ActixResult<HttpResponse> {
    Ok(api_result(
        statistics
            .get_geographic_stats(
                query.entity_type.as_deref(),
                query.days.unwrap_or(DEFAULT_WINDOW_DAYS),
            )
            .await,
    ))
}

/// GET /stats/{entity_type}/{entity_id}
pub async fn entity_stats(
    path: web::Path<(String, i64)>,
    query: web::Query<EntityStatsQuery>,
    statistics: web::Data<Arc<StatisticsService>>,
) -> ActixResult<HttpResponse> {
    let (entity_type, entity_id) = path.into_inner();
    Ok(api_result(
        statistics
            .get_by_entity(
                &entity_type,
                entity_id,
                query.limit.unwrap_or(DEFAULT_ENTITY_LIMIT),
            )
            .await,
    ))
}
