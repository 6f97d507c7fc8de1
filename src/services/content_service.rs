//! Content repository
//!
//! Minimal CRUD over the content tables. Reads go through
//! [`ContentService::view`], which bumps `view_count` once per call and
//! reports whether the requesting client already liked or shared the item.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::engagement_service::EngagementService;
use super::identity::ClientInfo;
use super::statistics_service::{StatVerb, StatisticsService, action_name};
use crate::errors::{EngagementError, Result};
use crate::storage::{ContentRecord, ContentType, NewContent, SeaOrmStorage};

/// 内容 + 当前客户端的互动状态
#[derive(Debug, Clone, Serialize)]
pub struct ContentView {
    #[serde(flatten)]
    pub content: ContentRecord,
    pub liked: bool,
    pub shared: bool,
}

pub struct ContentService {
    storage: Arc<SeaOrmStorage>,
    engagement: Arc<EngagementService>,
    statistics: Arc<StatisticsService>,
}

impl ContentService {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        engagement: Arc<EngagementService>,
        statistics: Arc<StatisticsService>,
    ) -> Self {
        Self {
            storage,
            engagement,
            statistics,
        }
    }

    pub async fn create(
        &self,
        content_type: ContentType,
        new: &NewContent,
        client: Option<&ClientInfo>,
    ) -> Result<i64> {
        if new.title.trim().is_empty() {
            return Err(EngagementError::validation("title must not be empty"));
        }

        let id = self.storage.insert_content(content_type, new).await?;

        let action = action_name(content_type, StatVerb::Create);
        let client = client.cloned().unwrap_or_default();
        if let Err(e) = self.statistics.log_action(&action, id, &client).await {
            warn!("Failed to record '{}' for #{}: {}", action, id, e);
        }
        Ok(id)
    }

    pub async fn get(&self, content_type: ContentType, id: i64) -> Result<Option<ContentRecord>> {
        self.storage.find_content(content_type, id).await
    }

    /// 读取内容：view_count + 1，记录 `<type>_view`，附带已赞/已分享状态
    pub async fn view(
        &self,
        content_type: ContentType,
        id: i64,
        client: &ClientInfo,
    ) -> Result<Option<ContentView>> {
        if !self.engagement.increment_view_count(content_type, id).await? {
            return Ok(None);
        }

        let action = action_name(content_type, StatVerb::View);
        if let Err(e) = self.statistics.log_action(&action, id, client).await {
            warn!("Failed to record '{}' for #{}: {}", action, id, e);
        }

        let Some(content) = self.storage.find_content(content_type, id).await? else {
            return Ok(None);
        };

        // 没有身份信息时直接视为未互动
        let (liked, shared) = if client.validate().is_ok() {
            (
                self.engagement
                    .has_user_liked(content_type, id, client)
                    .await?,
                self.engagement
                    .has_user_shared(content_type, id, client)
                    .await?,
            )
        } else {
            (false, false)
        };

        Ok(Some(ContentView {
            content,
            liked,
            shared,
        }))
    }

    /// 删除内容及其账本行
    pub async fn delete(&self, content_type: ContentType, id: i64) -> Result<bool> {
        let deleted = self.storage.delete_content(content_type, id).await?;
        if deleted {
            let purged = self.engagement.purge_content(content_type, id).await?;
            info!(
                "Deleted {} #{} ({} ledger rows purged)",
                content_type, id, purged
            );
        }
        Ok(deleted)
    }
}
