//! Statistics recorder / aggregator tests

use std::sync::{Arc, Once};

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use engagement_core::config::init_config;
use engagement_core::errors::EngagementError;
use engagement_core::services::{ClientInfo, StatisticsService};
use engagement_core::storage::{SeaOrmStorage, StatisticsEvent};
use tempfile::TempDir;

static INIT: Once = Once::new();

fn init_test_config() {
    INIT.call_once(|| {
        init_config();
    });
}

async fn create_service() -> (StatisticsService, TempDir) {
    init_test_config();

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("statistics.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let storage = SeaOrmStorage::new(&db_url, "sqlite")
        .await
        .expect("Failed to create storage");

    (StatisticsService::new(Arc::new(storage)), temp_dir)
}

fn event(
    entity_type: &str,
    entity_id: i64,
    action: &str,
    ip: &str,
    at: chrono::DateTime<Utc>,
) -> StatisticsEvent {
    let mut event = StatisticsEvent::new(entity_type, entity_id, action).at(at);
    event.ip_address = Some(ip.to_string());
    event
}

#[tokio::test]
async fn test_record_then_get_by_entity() {
    let (service, _dir) = create_service().await;

    let id = service
        .record(
            "article",
            42,
            "article_view",
            Some("203.0.113.5"),
            Some("UA-X"),
            Some("DE"),
            Some("Berlin"),
        )
        .await
        .unwrap();
    assert!(id > 0);

    let rows = service.get_by_entity("article", 42, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, id);
    assert_eq!(rows[0].event.action, "article_view");
    assert_eq!(rows[0].event.country.as_deref(), Some("DE"));
    assert_eq!(rows[0].event.city.as_deref(), Some("Berlin"));
}

#[tokio::test]
async fn test_record_is_append_only_without_dedup() {
    let (service, _dir) = create_service().await;

    let first = service
        .record("post", 1, "post_view", Some("10.0.0.1"), None, None, None)
        .await
        .unwrap();
    let second = service
        .record("post", 1, "post_view", Some("10.0.0.1"), None, None, None)
        .await
        .unwrap();
    assert_ne!(first, second);

    let rows = service.get_by_entity("post", 1, 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    // 最新的在前
    assert_eq!(rows[0].id, second);
}

#[tokio::test]
async fn test_record_rejects_empty_action() {
    let (service, _dir) = create_service().await;
    assert!(
        service
            .record("post", 1, "", None, None, None, None)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_log_action_derives_entity_type() {
    let (service, _dir) = create_service().await;
    let client = ClientInfo::new("203.0.113.5", "UA-X")
        .with_geo(Some("FR".to_string()), Some("Paris".to_string()));

    service.log_action("video_create", 7, &client).await.unwrap();

    let rows = service.get_by_entity("video", 7, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].event.entity_type, "video");
    assert_eq!(rows[0].event.ip_address.as_deref(), Some("203.0.113.5"));
    assert_eq!(rows[0].event.user_agent.as_deref(), Some("UA-X"));
    assert_eq!(rows[0].event.country.as_deref(), Some("FR"));
}

#[tokio::test]
async fn test_clean_old_stats_zero_keeps_newer_rows() {
    let (service, _dir) = create_service().await;
    let now = Utc::now();

    for hours in [1, 24, 24 * 40] {
        service
            .record_event(event("post", 1, "post_view", "10.0.0.1", now - Duration::hours(hours)))
            .await
            .unwrap();
    }
    let future_id = service
        .record_event(event("post", 1, "post_view", "10.0.0.2", now + Duration::hours(1)))
        .await
        .unwrap();

    let deleted = service.clean_old_stats(0).await.unwrap();
    assert_eq!(deleted, 3);

    let rows = service.get_by_entity("post", 1, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, future_id);
}

#[tokio::test]
async fn test_clean_old_stats_respects_retention_window() {
    let (service, _dir) = create_service().await;
    let now = Utc::now();

    service
        .record_event(event("post", 1, "post_view", "10.0.0.1", now - Duration::days(100)))
        .await
        .unwrap();
    service
        .record_event(event("post", 1, "post_view", "10.0.0.1", now - Duration::days(10)))
        .await
        .unwrap();

    assert_eq!(service.clean_old_stats(90).await.unwrap(), 1);
    assert_eq!(service.clean_old_stats(90).await.unwrap(), 0);
    assert_eq!(service.get_by_entity("post", 1, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_daily_summary_for_fixed_date() {
    let (service, _dir) = create_service().await;
    let day = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
    let next_day = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();

    for ip in ["10.0.0.1", "10.0.0.1", "10.0.0.2"] {
        service
            .record_event(event("article", 42, "article_view", ip, day))
            .await
            .unwrap();
    }
    service
        .record_event(event("article", 42, "article_like", "10.0.0.1", day))
        .await
        .unwrap();
    service
        .record_event(event("post", 5, "post_view", "10.0.0.3", next_day))
        .await
        .unwrap();

    let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    let rows = service.get_daily_summary(Some(date), None).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].day, "2026-03-01");
    assert_eq!(rows[0].entity_type, "article");
    assert_eq!(rows[0].action, "article_view");
    assert_eq!(rows[0].total, 3);
    assert_eq!(rows[0].unique_visitors, 2);
    assert_eq!(rows[1].action, "article_like");
    assert_eq!(rows[1].total, 1);

    let posts = service
        .get_daily_summary(Some(date), Some("post"))
        .await
        .unwrap();
    assert!(posts.is_empty());

    let next = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
    let posts = service
        .get_daily_summary(Some(next), Some("post"))
        .await
        .unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].action, "post_view");
}

#[tokio::test]
async fn test_daily_summary_trailing_window_orders_by_day_desc() {
    let (service, _dir) = create_service().await;
    let now = Utc::now();

    service
        .record_event(event("event", 1, "event_view", "10.0.0.1", now - Duration::days(2)))
        .await
        .unwrap();
    service
        .record_event(event("event", 1, "event_view", "10.0.0.1", now))
        .await
        .unwrap();
    service
        .record_event(event("event", 1, "event_view", "10.0.0.1", now - Duration::days(400)))
        .await
        .unwrap();

    let rows = service.get_daily_summary(None, Some("event")).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].day > rows[1].day);
}

#[tokio::test]
async fn test_top_content_within_window() {
    let (service, _dir) = create_service().await;
    let now = Utc::now();

    for ip in ["10.0.0.1", "10.0.0.2", "10.0.0.2"] {
        service
            .record_event(event("article", 1, "article_view", ip, now - Duration::hours(2)))
            .await
            .unwrap();
    }
    service
        .record_event(event("article", 2, "article_view", "10.0.0.1", now - Duration::hours(2)))
        .await
        .unwrap();
    // 窗口之外
    for _ in 0..5 {
        service
            .record_event(event("article", 2, "article_view", "10.0.0.9", now - Duration::days(30)))
            .await
            .unwrap();
    }
    // 其它动作
    service
        .record_event(event("article", 3, "article_like", "10.0.0.1", now))
        .await
        .unwrap();

    let rows = service
        .get_top_content("article", "article_view", 10, 7)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].entity_id, 1);
    assert_eq!(rows[0].total, 3);
    assert_eq!(rows[0].unique_visitors, 2);
    assert_eq!(rows[1].entity_id, 2);
    assert_eq!(rows[1].total, 1);

    let limited = service
        .get_top_content("article", "article_view", 0, 7)
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn test_geographic_stats() {
    let (service, _dir) = create_service().await;

    let berlin = ClientInfo::new("10.0.0.1", "UA")
        .with_geo(Some("DE".to_string()), Some("Berlin".to_string()));
    let berlin_2 = ClientInfo::new("10.0.0.2", "UA")
        .with_geo(Some("DE".to_string()), Some("Berlin".to_string()));
    let us = ClientInfo::new("10.0.0.3", "UA").with_geo(Some("US".to_string()), None);
    let unknown = ClientInfo::new("10.0.0.4", "UA");

    for client in [&berlin, &berlin_2, &berlin, &us, &unknown] {
        service.log_action("post_view", 1, client).await.unwrap();
    }
    service.log_action("video_view", 9, &us).await.unwrap();

    let rows = service.get_geographic_stats(Some("post"), 7).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].country.as_deref(), Some("DE"));
    assert_eq!(rows[0].city.as_deref(), Some("Berlin"));
    assert_eq!(rows[0].total, 3);
    assert_eq!(rows[0].unique_visitors, 2);
    assert!(rows.iter().any(|r| r.country.is_none() && r.total == 1));

    let all = service.get_geographic_stats(None, 7).await.unwrap();
    let us_row = all
        .iter()
        .find(|r| r.country.as_deref() == Some("US"))
        .unwrap();
    assert_eq!(us_row.total, 2);
}

#[tokio::test]
async fn test_huge_day_windows_cover_everything() {
    let (service, _dir) = create_service().await;
    let now = Utc::now();

    let mut old = event("video", 3, "video_view", "10.0.0.1", now - Duration::days(3650));
    old.country = Some("FR".to_string());
    service.record_event(old).await.unwrap();

    for days in [100_000_000, u64::MAX] {
        let top = service
            .get_top_content("video", "video_view", 10, days)
            .await
            .unwrap();
        assert_eq!(top.len(), 1, "{days} days");
        assert_eq!(top[0].entity_id, 3);

        let geo = service
            .get_geographic_stats(Some("video"), days)
            .await
            .unwrap();
        assert_eq!(geo.len(), 1, "{days} days");
        assert_eq!(geo[0].country.as_deref(), Some("FR"));
    }
}

#[tokio::test]
async fn test_clean_old_stats_rejects_unrepresentable_retention() {
    let (service, _dir) = create_service().await;
    let now = Utc::now();

    service
        .record_event(event("post", 5, "post_view", "10.0.0.1", now - Duration::hours(1)))
        .await
        .unwrap();
    service
        .record_event(event("post", 5, "post_view", "10.0.0.1", now + Duration::hours(1)))
        .await
        .unwrap();

    for days in [u64::MAX, 100_000_000] {
        assert!(
            matches!(
                service.clean_old_stats(days).await,
                Err(EngagementError::Validation(_))
            ),
            "{days} days"
        );
    }
    assert_eq!(service.get_by_entity("post", 5, 10).await.unwrap().len(), 2);

    // 可表示但远超数据年龄的保留期：什么都不删
    assert_eq!(service.clean_old_stats(10_000_000).await.unwrap(), 0);
    assert_eq!(service.get_by_entity("post", 5, 10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_daily_summary_rejects_last_representable_date() {
    let (service, _dir) = create_service().await;
    assert!(matches!(
        service.get_daily_summary(Some(NaiveDate::MAX), None).await,
        Err(EngagementError::Validation(_))
    ));
}
