//! Content table access
//!
//! posts / articles / comments / videos / events share one column layout, so
//! they are addressed through a single iden set and the table name of the
//! [`ContentType`] instead of five near-identical entities.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Alias, Expr, Order, Query, SelectStatement};
use sea_orm::{ConnectionTrait, DeriveIden, ExprTrait, FromQueryResult};
use tracing::{debug, info};

use super::{SeaOrmStorage, retry};
use crate::errors::{EngagementError, Result};
use crate::storage::models::{ContentRecord, ContentType, CounterColumn, NewContent};

#[derive(DeriveIden, Clone, Copy)]
pub(super) enum ContentIden {
    Id,
    Title,
    Body,
    LikeCount,
    SharedCount,
    ViewCount,
    CreatedAt,
}

impl From<CounterColumn> for ContentIden {
    fn from(column: CounterColumn) -> Self {
        match column {
            CounterColumn::LikeCount => ContentIden::LikeCount,
            CounterColumn::SharedCount => ContentIden::SharedCount,
            CounterColumn::ViewCount => ContentIden::ViewCount,
        }
    }
}

pub(super) fn content_table(content_type: ContentType) -> Alias {
    Alias::new(content_type.table_name())
}

#[derive(Debug, FromQueryResult)]
struct ContentRow {
    id: i64,
    title: String,
    body: Option<String>,
    like_count: i64,
    shared_count: i64,
    view_count: i64,
    created_at: DateTime<Utc>,
}

impl ContentRow {
    fn into_record(self, content_type: ContentType) -> ContentRecord {
        ContentRecord {
            id: self.id,
            content_type,
            title: self.title,
            body: self.body,
            like_count: self.like_count,
            shared_count: self.shared_count,
            view_count: self.view_count,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct InsertedId {
    id: i64,
}

fn select_content(content_type: ContentType) -> SelectStatement {
    Query::select()
        .columns([
            ContentIden::Id,
            ContentIden::Title,
            ContentIden::Body,
            ContentIden::LikeCount,
            ContentIden::SharedCount,
            ContentIden::ViewCount,
            ContentIden::CreatedAt,
        ])
        .from(content_table(content_type))
        .to_owned()
}

impl SeaOrmStorage {
    /// 新建内容行，计数器从 0 开始
    pub async fn insert_content(&self, content_type: ContentType, new: &NewContent) -> Result<i64> {
        let mut stmt = Query::insert();
        stmt.into_table(content_table(content_type))
            .columns([
                ContentIden::Title,
                ContentIden::Body,
                ContentIden::LikeCount,
                ContentIden::SharedCount,
                ContentIden::ViewCount,
                ContentIden::CreatedAt,
            ])
            .values([
                Expr::val(new.title.clone()),
                Expr::val(new.body.clone()),
                Expr::val(0i64),
                Expr::val(0i64),
                Expr::val(0i64),
                Expr::val(Utc::now()),
            ])
            .map_err(|e| EngagementError::database_operation(e.to_string()))?;

        let backend = self.db.get_database_backend();
        let id = if backend.support_returning() {
            stmt.returning_col(ContentIden::Id);
            InsertedId::find_by_statement(backend.build(&stmt))
                .one(&self.db)
                .await?
                .map(|row| row.id)
                .ok_or_else(|| {
                    EngagementError::database_operation(format!(
                        "Insert into {} returned no id",
                        content_type.table_name()
                    ))
                })?
        } else {
            let result = self.db.execute(&stmt).await?;
            result.last_insert_id() as i64
        };

        info!("Created {} #{}", content_type, id);
        Ok(id)
    }

    pub async fn find_content(
        &self,
        content_type: ContentType,
        id: i64,
    ) -> Result<Option<ContentRecord>> {
        let stmt = select_content(content_type)
            .and_where(Expr::col(ContentIden::Id).eq(id))
            .to_owned();
        let statement = self.db_backend().build(&stmt);
        let db = &self.db;
        let statement_ref = &statement;

        let row = retry::with_retry("find_content", self.retry_config, || async {
            ContentRow::find_by_statement(statement_ref.clone())
                .one(db)
                .await
        })
        .await?;

        Ok(row.map(|r| r.into_record(content_type)))
    }

    /// 按 id 升序分页读取内容行（id > after_id）
    pub async fn list_content_after(
        &self,
        content_type: ContentType,
        after_id: i64,
        limit: u64,
    ) -> Result<Vec<ContentRecord>> {
        let stmt = select_content(content_type)
            .and_where(Expr::col(ContentIden::Id).gt(after_id))
            .order_by(ContentIden::Id, Order::Asc)
            .limit(limit)
            .to_owned();
        let statement = self.db_backend().build(&stmt);
        let db = &self.db;
        let statement_ref = &statement;

        let rows = retry::with_retry("list_content_after", self.retry_config, || async {
            ContentRow::find_by_statement(statement_ref.clone())
                .all(db)
                .await
        })
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_record(content_type))
            .collect())
    }

    pub async fn delete_content(&self, content_type: ContentType, id: i64) -> Result<bool> {
        let stmt = Query::delete()
            .from_table(content_table(content_type))
            .and_where(Expr::col(ContentIden::Id).eq(id))
            .to_owned();

        let result = self.db.execute(&stmt).await?;
        let deleted = result.rows_affected() > 0;
        debug!("Delete {} #{}: {}", content_type, id, deleted);
        Ok(deleted)
    }
}
