//! Engagement ledger operations
//!
//! Presence of a row means "engaged". Rows are only ever inserted or
//! deleted, never updated. The unique index on the natural key makes a
//! duplicate insert fail instead of creating a second row.

use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Condition, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QuerySelect, SqlErr,
};
use tracing::{debug, trace};

use super::{SeaOrmStorage, retry};
use crate::errors::{EngagementError, Result};
use crate::storage::models::{ContentType, EngagementAction};

use migration::entities::engagement;

/// (identity_key, user_agent, content_type, content_id, action)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaturalKey {
    pub identity_key: String,
    pub user_agent: String,
    pub content_type: ContentType,
    pub content_id: i64,
    pub action: EngagementAction,
}

impl NaturalKey {
    fn condition(&self) -> Condition {
        Condition::all()
            .add(engagement::Column::IdentityKey.eq(self.identity_key.as_str()))
            .add(engagement::Column::UserAgent.eq(self.user_agent.as_str()))
            .add(engagement::Column::ContentType.eq(self.content_type.as_ref()))
            .add(engagement::Column::ContentId.eq(self.content_id))
            .add(engagement::Column::Action.eq(self.action.as_ref()))
    }
}

/// 插入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// 唯一约束冲突：同一身份已经互动过（并发 toggle 的第二次插入）
    AlreadyExists,
}

#[derive(Debug, FromQueryResult)]
pub(super) struct LedgerCountRow {
    pub content_id: i64,
    pub count: i64,
}

impl SeaOrmStorage {
    /// 账本中是否存在该自然键
    pub async fn engagement_exists(&self, key: &NaturalKey) -> Result<bool> {
        let db = &self.db;
        let condition = key.condition();
        let cond = &condition;

        let count = retry::with_retry("engagement_exists", self.retry_config, || async {
            engagement::Entity::find()
                .filter(cond.clone())
                .count(db)
                .await
        })
        .await?;

        trace!(
            "Ledger lookup {} {}#{} for '{}': {}",
            key.action, key.content_type, key.content_id, key.identity_key, count
        );
        Ok(count > 0)
    }

    /// 插入账本行，只执行一次，不重试
    pub async fn insert_engagement(&self, key: &NaturalKey) -> Result<InsertOutcome> {
        let model = engagement::ActiveModel {
            identity_key: Set(key.identity_key.clone()),
            user_agent: Set(key.user_agent.clone()),
            content_type: Set(key.content_type.to_string()),
            content_id: Set(key.content_id),
            action: Set(key.action.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        match engagement::Entity::insert(model).exec(&self.db).await {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                debug!(
                    "Ledger insert for {} {}#{} hit the natural key constraint",
                    key.action, key.content_type, key.content_id
                );
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(e) => Err(EngagementError::database_operation(format!(
                "Failed to insert {} for {}#{}: {}",
                key.action, key.content_type, key.content_id, e
            ))),
        }
    }

    /// 删除账本行，返回是否真的删除了一行
    pub async fn delete_engagement(&self, key: &NaturalKey) -> Result<bool> {
        let result = engagement::Entity::delete_many()
            .filter(key.condition())
            .exec(&self.db)
            .await
            .map_err(|e| {
                EngagementError::database_operation(format!(
                    "Failed to delete {} for {}#{}: {}",
                    key.action, key.content_type, key.content_id, e
                ))
            })?;

        Ok(result.rows_affected > 0)
    }

    /// 账本推导出的互动数
    pub async fn count_engagements(
        &self,
        content_type: ContentType,
        content_id: i64,
        action: EngagementAction,
    ) -> Result<u64> {
        let db = &self.db;
        let count = retry::with_retry("count_engagements", self.retry_config, || async {
            engagement::Entity::find()
                .filter(engagement::Column::ContentType.eq(content_type.as_ref()))
                .filter(engagement::Column::ContentId.eq(content_id))
                .filter(engagement::Column::Action.eq(action.as_ref()))
                .count(db)
                .await
        })
        .await?;
        Ok(count)
    }

    /// 删除某个内容的所有账本行（内容被删除时调用）
    pub async fn purge_engagements(
        &self,
        content_type: ContentType,
        content_id: i64,
    ) -> Result<u64> {
        let result = engagement::Entity::delete_many()
            .filter(engagement::Column::ContentType.eq(content_type.as_ref()))
            .filter(engagement::Column::ContentId.eq(content_id))
            .exec(&self.db)
            .await?;

        debug!(
            "Purged {} ledger rows for {}#{}",
            result.rows_affected, content_type, content_id
        );
        Ok(result.rows_affected)
    }

    /// 按 content_id 分组的账本计数，只统计 [first_id, last_id] 内的内容（对账分页使用）
    pub(super) async fn ledger_counts(
        &self,
        content_type: ContentType,
        action: EngagementAction,
        first_id: i64,
        last_id: i64,
    ) -> Result<Vec<LedgerCountRow>> {
        let db = &self.db;
        let rows = retry::with_retry("ledger_counts", self.retry_config, || async {
            engagement::Entity::find()
                .select_only()
                .column(engagement::Column::ContentId)
                .column_as(engagement::Column::Id.count(), "count")
                .filter(engagement::Column::ContentType.eq(content_type.as_ref()))
                .filter(engagement::Column::Action.eq(action.as_ref()))
                .filter(engagement::Column::ContentId.between(first_id, last_id))
                .group_by(engagement::Column::ContentId)
                .into_model::<LedgerCountRow>()
                .all(db)
                .await
        })
        .await?;
        Ok(rows)
    }
}
