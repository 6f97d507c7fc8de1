//! Toggle protocol tests
//!
//! Ledger + counter behaviour of like/share toggles against temporary SQLite
//! databases.

use std::sync::{Arc, Once};

use engagement_core::config::init_config;
use engagement_core::services::{ClientInfo, EngagementService, StatisticsService};
use engagement_core::storage::{
    ContentType, CounterColumn, EngagementAction, InsertOutcome, NaturalKey, NewContent,
    SeaOrmStorage,
};
use tempfile::TempDir;

static INIT: Once = Once::new();

fn init_test_config() {
    INIT.call_once(|| {
        init_config();
    });
}

async fn create_temp_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    init_test_config();

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("engagement.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let storage = SeaOrmStorage::new(&db_url, "sqlite")
        .await
        .expect("Failed to create storage");

    (Arc::new(storage), temp_dir)
}

fn engagement_service(storage: &Arc<SeaOrmStorage>) -> EngagementService {
    let statistics = Arc::new(StatisticsService::new(storage.clone()));
    EngagementService::new(storage.clone(), statistics)
}

async fn create_article(storage: &SeaOrmStorage, title: &str) -> i64 {
    storage
        .insert_content(
            ContentType::Article,
            &NewContent {
                title: title.to_string(),
                body: None,
            },
        )
        .await
        .expect("Failed to create article")
}

async fn like_count(storage: &SeaOrmStorage, content_type: ContentType, id: i64) -> i64 {
    storage
        .find_content(content_type, id)
        .await
        .unwrap()
        .expect("content should exist")
        .like_count
}

async fn shared_count(storage: &SeaOrmStorage, content_type: ContentType, id: i64) -> i64 {
    storage
        .find_content(content_type, id)
        .await
        .unwrap()
        .expect("content should exist")
        .shared_count
}

fn client_x() -> ClientInfo {
    ClientInfo::new("203.0.113.5", "UA-X")
}

fn client_y() -> ClientInfo {
    ClientInfo::new("203.0.113.9", "UA-Y")
}

// =============================================================================
// 具体场景：article 42
// =============================================================================

#[tokio::test]
async fn test_like_scenario_on_article_42() {
    let (storage, _dir) = create_temp_storage().await;
    let service = engagement_service(&storage);

    let mut id = 0;
    while id < 42 {
        id = create_article(&storage, "filler").await;
    }
    assert_eq!(id, 42);
    assert_eq!(like_count(&storage, ContentType::Article, 42).await, 0);

    let x = client_x();
    let y = client_y();

    let result = service.toggle_like(ContentType::Article, 42, &x).await.unwrap();
    assert!(result.liked);
    assert_eq!(result.action, "liked");
    assert_eq!(like_count(&storage, ContentType::Article, 42).await, 1);
    assert!(service.has_user_liked(ContentType::Article, 42, &x).await.unwrap());

    let result = service.toggle_like(ContentType::Article, 42, &x).await.unwrap();
    assert!(!result.liked);
    assert_eq!(result.action, "unliked");
    assert_eq!(like_count(&storage, ContentType::Article, 42).await, 0);
    assert!(!service.has_user_liked(ContentType::Article, 42, &x).await.unwrap());

    let result = service.toggle_like(ContentType::Article, 42, &y).await.unwrap();
    assert!(result.liked);
    assert_eq!(like_count(&storage, ContentType::Article, 42).await, 1);
    assert!(service.has_user_liked(ContentType::Article, 42, &y).await.unwrap());
    assert!(!service.has_user_liked(ContentType::Article, 42, &x).await.unwrap());
}

// =============================================================================
// Toggle 性质
// =============================================================================

#[tokio::test]
async fn test_toggle_twice_restores_counter() {
    let (storage, _dir) = create_temp_storage().await;
    let service = engagement_service(&storage);
    let id = create_article(&storage, "share me").await;
    let client = client_x();

    let first = service.toggle_share(ContentType::Article, id, &client).await.unwrap();
    assert!(first.shared);
    assert_eq!(first.action, "shared");
    assert!(service.has_user_shared(ContentType::Article, id, &client).await.unwrap());
    assert_eq!(shared_count(&storage, ContentType::Article, id).await, 1);

    let second = service.toggle_share(ContentType::Article, id, &client).await.unwrap();
    assert!(!second.shared);
    assert_eq!(second.action, "unshared");
    assert!(!service.has_user_shared(ContentType::Article, id, &client).await.unwrap());
    assert_eq!(shared_count(&storage, ContentType::Article, id).await, 0);
}

#[tokio::test]
async fn test_like_and_share_are_independent() {
    let (storage, _dir) = create_temp_storage().await;
    let service = engagement_service(&storage);
    let id = create_article(&storage, "both").await;
    let client = client_x();

    service.toggle_like(ContentType::Article, id, &client).await.unwrap();
    assert!(service.has_user_liked(ContentType::Article, id, &client).await.unwrap());
    assert!(!service.has_user_shared(ContentType::Article, id, &client).await.unwrap());

    let record = storage.find_content(ContentType::Article, id).await.unwrap().unwrap();
    assert_eq!(record.like_count, 1);
    assert_eq!(record.shared_count, 0);
}

#[tokio::test]
async fn test_same_ip_different_user_agent_is_distinct_identity() {
    let (storage, _dir) = create_temp_storage().await;
    let service = engagement_service(&storage);
    let id = create_article(&storage, "nat").await;

    let phone = ClientInfo::new("198.51.100.1", "Phone");
    let laptop = ClientInfo::new("198.51.100.1", "Laptop");

    service.toggle_like(ContentType::Article, id, &phone).await.unwrap();
    service.toggle_like(ContentType::Article, id, &laptop).await.unwrap();
    assert_eq!(like_count(&storage, ContentType::Article, id).await, 2);

    service.toggle_like(ContentType::Article, id, &phone).await.unwrap();
    assert!(!service.has_user_liked(ContentType::Article, id, &phone).await.unwrap());
    assert!(service.has_user_liked(ContentType::Article, id, &laptop).await.unwrap());
    assert_eq!(like_count(&storage, ContentType::Article, id).await, 1);
}

#[tokio::test]
async fn test_fingerprint_identity_survives_ip_change() {
    let (storage, _dir) = create_temp_storage().await;
    let service = engagement_service(&storage);
    let id = create_article(&storage, "roaming").await;

    let at_home = ClientInfo::new("203.0.113.5", "UA-X").with_fingerprint("device-1");
    let on_mobile = ClientInfo::new("192.0.2.77", "UA-X").with_fingerprint("device-1");

    service.toggle_like(ContentType::Article, id, &at_home).await.unwrap();
    assert!(service.has_user_liked(ContentType::Article, id, &on_mobile).await.unwrap());

    let result = service.toggle_like(ContentType::Article, id, &on_mobile).await.unwrap();
    assert!(!result.liked);
    assert_eq!(like_count(&storage, ContentType::Article, id).await, 0);
}

#[tokio::test]
async fn test_content_types_do_not_share_ledger_rows() {
    let (storage, _dir) = create_temp_storage().await;
    let service = engagement_service(&storage);
    let article = create_article(&storage, "a").await;
    let post = storage
        .insert_content(
            ContentType::Post,
            &NewContent {
                title: "p".to_string(),
                body: Some("body".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(article, post);

    let client = client_x();
    service.toggle_like(ContentType::Article, article, &client).await.unwrap();
    assert!(!service.has_user_liked(ContentType::Post, post, &client).await.unwrap());
    assert_eq!(like_count(&storage, ContentType::Post, post).await, 0);
}

#[tokio::test]
async fn test_missing_identity_is_validation_error() {
    let (storage, _dir) = create_temp_storage().await;
    let service = engagement_service(&storage);
    let id = create_article(&storage, "anon").await;

    let err = service
        .toggle_like(ContentType::Article, id, &ClientInfo::new("", "UA"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        engagement_core::errors::EngagementError::Validation(_)
    ));
    assert_eq!(like_count(&storage, ContentType::Article, id).await, 0);
}

// =============================================================================
// 计数器
// =============================================================================

#[tokio::test]
async fn test_counter_never_goes_negative() {
    let (storage, _dir) = create_temp_storage().await;
    let id = create_article(&storage, "drift").await;

    let moved = storage
        .decrement_counter(ContentType::Article, id, CounterColumn::LikeCount)
        .await
        .unwrap();
    assert!(!moved);
    assert_eq!(like_count(&storage, ContentType::Article, id).await, 0);

    assert!(
        storage
            .increment_counter(ContentType::Article, id, CounterColumn::LikeCount)
            .await
            .unwrap()
    );
    assert!(
        storage
            .decrement_counter(ContentType::Article, id, CounterColumn::LikeCount)
            .await
            .unwrap()
    );
    assert!(
        !storage
            .decrement_counter(ContentType::Article, id, CounterColumn::LikeCount)
            .await
            .unwrap()
    );
    assert_eq!(like_count(&storage, ContentType::Article, id).await, 0);
}

#[tokio::test]
async fn test_unlike_with_drifted_counter_clamps_at_zero() {
    let (storage, _dir) = create_temp_storage().await;
    let service = engagement_service(&storage);
    let id = create_article(&storage, "drifted").await;
    let client = client_x();

    service.toggle_like(ContentType::Article, id, &client).await.unwrap();
    // 人为制造漂移：账本有行，计数为 0
    storage
        .decrement_counter(ContentType::Article, id, CounterColumn::LikeCount)
        .await
        .unwrap();

    let result = service.toggle_like(ContentType::Article, id, &client).await.unwrap();
    assert!(!result.liked);
    assert_eq!(like_count(&storage, ContentType::Article, id).await, 0);
}

#[tokio::test]
async fn test_raw_share_increment_bypasses_ledger() {
    let (storage, _dir) = create_temp_storage().await;
    let service = engagement_service(&storage);
    let id = create_article(&storage, "viral").await;

    for _ in 0..5 {
        assert!(service.increment_share_count(ContentType::Article, id).await.unwrap());
    }

    assert_eq!(shared_count(&storage, ContentType::Article, id).await, 5);
    assert_eq!(
        service
            .count_engagements(ContentType::Article, id, EngagementAction::Share)
            .await
            .unwrap(),
        0
    );
    assert!(!service.has_user_shared(ContentType::Article, id, &client_x()).await.unwrap());
}

#[tokio::test]
async fn test_increments_on_missing_content_report_false() {
    let (storage, _dir) = create_temp_storage().await;
    let service = engagement_service(&storage);

    assert!(!service.increment_share_count(ContentType::Video, 999).await.unwrap());
    assert!(!service.increment_view_count(ContentType::Video, 999).await.unwrap());
}

#[tokio::test]
async fn test_view_count_is_unconditional() {
    let (storage, _dir) = create_temp_storage().await;
    let service = engagement_service(&storage);
    let id = create_article(&storage, "popular").await;

    for _ in 0..3 {
        service.increment_view_count(ContentType::Article, id).await.unwrap();
    }
    let record = storage.find_content(ContentType::Article, id).await.unwrap().unwrap();
    assert_eq!(record.view_count, 3);
    assert_eq!(record.like_count, 0);
}

// =============================================================================
// 唯一约束与并发
// =============================================================================

#[tokio::test]
async fn test_duplicate_insert_hits_natural_key_constraint() {
    let (storage, _dir) = create_temp_storage().await;
    let id = create_article(&storage, "dup").await;

    let key = NaturalKey {
        identity_key: "203.0.113.5".to_string(),
        user_agent: "UA-X".to_string(),
        content_type: ContentType::Article,
        content_id: id,
        action: EngagementAction::Like,
    };

    assert_eq!(
        storage.insert_engagement(&key).await.unwrap(),
        InsertOutcome::Inserted
    );
    assert_eq!(
        storage.insert_engagement(&key).await.unwrap(),
        InsertOutcome::AlreadyExists
    );
    assert_eq!(
        storage
            .count_engagements(ContentType::Article, id, EngagementAction::Like)
            .await
            .unwrap(),
        1
    );

    assert!(storage.delete_engagement(&key).await.unwrap());
    assert!(!storage.delete_engagement(&key).await.unwrap());
}

#[tokio::test]
async fn test_concurrent_toggles_keep_counter_and_ledger_aligned() {
    let (storage, _dir) = create_temp_storage().await;
    let service = Arc::new(engagement_service(&storage));
    let id = create_article(&storage, "race").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .toggle_like(ContentType::Article, id, &client_x())
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let ledger = service
        .count_engagements(ContentType::Article, id, EngagementAction::Like)
        .await
        .unwrap();
    let counter = like_count(&storage, ContentType::Article, id).await;
    assert!(ledger <= 1);
    assert!(counter >= 0);
    assert_eq!(counter, ledger as i64);
}

// =============================================================================
// 对账
// =============================================================================

#[tokio::test]
async fn test_reconcile_restores_like_count_from_ledger() {
    let (storage, _dir) = create_temp_storage().await;
    let service = engagement_service(&storage);
    let id = create_article(&storage, "reconcile").await;

    service.toggle_like(ContentType::Article, id, &client_x()).await.unwrap();
    service.toggle_like(ContentType::Article, id, &client_y()).await.unwrap();
    for _ in 0..3 {
        storage
            .increment_counter(ContentType::Article, id, CounterColumn::LikeCount)
            .await
            .unwrap();
    }
    assert_eq!(like_count(&storage, ContentType::Article, id).await, 5);

    let report = service.reconcile(ContentType::Article).await.unwrap();
    assert_eq!(report.content_type, Some(ContentType::Article));
    assert_eq!(report.rows_scanned, 1);
    assert_eq!(report.likes_fixed, 1);
    assert_eq!(like_count(&storage, ContentType::Article, id).await, 2);

    let again = service.reconcile(ContentType::Article).await.unwrap();
    assert_eq!(again.likes_fixed, 0);
}

#[tokio::test]
async fn test_reconcile_never_lowers_shared_count() {
    let (storage, _dir) = create_temp_storage().await;
    let service = engagement_service(&storage);
    let id = create_article(&storage, "shares").await;

    service.toggle_share(ContentType::Article, id, &client_x()).await.unwrap();
    service.increment_share_count(ContentType::Article, id).await.unwrap();
    service.increment_share_count(ContentType::Article, id).await.unwrap();
    assert_eq!(shared_count(&storage, ContentType::Article, id).await, 3);

    let report = service.reconcile(ContentType::Article).await.unwrap();
    assert_eq!(report.shares_fixed, 0);
    assert_eq!(shared_count(&storage, ContentType::Article, id).await, 3);

    for _ in 0..3 {
        storage
            .decrement_counter(ContentType::Article, id, CounterColumn::SharedCount)
            .await
            .unwrap();
    }
    assert_eq!(shared_count(&storage, ContentType::Article, id).await, 0);

    let report = service.reconcile(ContentType::Article).await.unwrap();
    assert_eq!(report.shares_fixed, 1);
    assert_eq!(shared_count(&storage, ContentType::Article, id).await, 1);
}

#[tokio::test]
async fn test_reconcile_pages_keep_ledger_counts_per_page() {
    let (storage, _dir) = create_temp_storage().await;
    let service = engagement_service(&storage);

    // 两页以上（每页 500 行），第一页首行和第二页末行都有账本记录
    let mut ids = Vec::new();
    for i in 0..502 {
        ids.push(create_article(&storage, &format!("page-{i}")).await);
    }
    let (first, last) = (ids[0], ids[ids.len() - 1]);

    service.toggle_like(ContentType::Article, first, &client_x()).await.unwrap();
    service.toggle_like(ContentType::Article, last, &client_x()).await.unwrap();
    service.toggle_like(ContentType::Article, last, &client_y()).await.unwrap();
    for id in [first, last, ids[250]] {
        storage
            .increment_counter(ContentType::Article, id, CounterColumn::LikeCount)
            .await
            .unwrap();
    }

    let report = service.reconcile(ContentType::Article).await.unwrap();
    assert_eq!(report.rows_scanned, 502);
    assert_eq!(report.likes_fixed, 3);
    assert_eq!(like_count(&storage, ContentType::Article, first).await, 1);
    assert_eq!(like_count(&storage, ContentType::Article, ids[250]).await, 0);
    assert_eq!(like_count(&storage, ContentType::Article, last).await, 2);
}

#[tokio::test]
async fn test_reconcile_all_covers_every_content_type() {
    let (storage, _dir) = create_temp_storage().await;
    let service = engagement_service(&storage);

    let reports = service.reconcile_all().await;
    assert_eq!(reports.len(), 5);
    assert!(reports.iter().all(|r| r.rows_scanned == 0));
}

#[tokio::test]
async fn test_purge_removes_all_ledger_rows_of_content() {
    let (storage, _dir) = create_temp_storage().await;
    let service = engagement_service(&storage);
    let id = create_article(&storage, "gone").await;

    service.toggle_like(ContentType::Article, id, &client_x()).await.unwrap();
    service.toggle_like(ContentType::Article, id, &client_y()).await.unwrap();
    service.toggle_share(ContentType::Article, id, &client_y()).await.unwrap();

    assert_eq!(service.purge_content(ContentType::Article, id).await.unwrap(), 3);
    assert!(!service.has_user_liked(ContentType::Article, id, &client_x()).await.unwrap());
}
