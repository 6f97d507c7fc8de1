//! Denormalized counter maintenance
//!
//! Every update is a single-row conditional UPDATE on the content table.
//! Increments are unconditional; decrements carry `WHERE count > 0` so a
//! counter never goes negative. A decrement that matches no row is a no-op.

use std::collections::HashMap;

use sea_orm::sea_query::{Expr, Query};
use sea_orm::{ConnectionTrait, ExprTrait};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::SeaOrmStorage;
use super::content::{ContentIden, content_table};
use crate::errors::{EngagementError, Result};
use crate::storage::models::{ContentType, CounterColumn, EngagementAction};

const RECONCILE_PAGE_SIZE: u64 = 500;

/// 对账结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub content_type: Option<ContentType>,
    pub rows_scanned: u64,
    pub likes_fixed: u64,
    pub shares_fixed: u64,
}

impl SeaOrmStorage {
    /// `count = count + 1`，返回是否命中内容行
    pub async fn increment_counter(
        &self,
        content_type: ContentType,
        id: i64,
        column: CounterColumn,
    ) -> Result<bool> {
        let col = ContentIden::from(column);
        let stmt = Query::update()
            .table(content_table(content_type))
            .value(col, Expr::col(col).add(Expr::val(1i64)))
            .and_where(Expr::col(ContentIden::Id).eq(id))
            .to_owned();

        let result = self.db.execute(&stmt).await.map_err(|e| {
            EngagementError::database_operation(format!(
                "Failed to increment {} on {}#{}: {}",
                column.as_ref(),
                content_type,
                id,
                e
            ))
        })?;

        let matched = result.rows_affected() > 0;
        if !matched {
            debug!(
                "Increment of {} on {}#{} matched no row",
                column.as_ref(),
                content_type,
                id
            );
        }
        Ok(matched)
    }

    /// `count = count - 1 WHERE count > 0`
    ///
    /// Returns `false` when the guard refused the decrement (or the row does
    /// not exist); that is drift clamping, not an error.
    pub async fn decrement_counter(
        &self,
        content_type: ContentType,
        id: i64,
        column: CounterColumn,
    ) -> Result<bool> {
        let col = ContentIden::from(column);
        let stmt = Query::update()
            .table(content_table(content_type))
            .value(col, Expr::col(col).sub(Expr::val(1i64)))
            .and_where(Expr::col(ContentIden::Id).eq(id))
            .and_where(Expr::col(col).gt(0))
            .to_owned();

        let result = self.db.execute(&stmt).await.map_err(|e| {
            EngagementError::database_operation(format!(
                "Failed to decrement {} on {}#{}: {}",
                column.as_ref(),
                content_type,
                id,
                e
            ))
        })?;

        let matched = result.rows_affected() > 0;
        if !matched {
            warn!(
                "Decrement of {} on {}#{} clamped at zero (counter drift)",
                column.as_ref(),
                content_type,
                id
            );
        }
        Ok(matched)
    }

    /// Compare-and-set: `count = expected WHERE count = observed`
    async fn swap_counter(
        &self,
        content_type: ContentType,
        id: i64,
        column: CounterColumn,
        observed: i64,
        expected: i64,
    ) -> Result<bool> {
        let col = ContentIden::from(column);
        let stmt = Query::update()
            .table(content_table(content_type))
            .value(col, Expr::val(expected))
            .and_where(Expr::col(ContentIden::Id).eq(id))
            .and_where(Expr::col(col).eq(observed))
            .to_owned();

        let result = self.db.execute(&stmt).await?;
        Ok(result.rows_affected() > 0)
    }

    /// 从账本重新计算某类内容的计数器
    ///
    /// - like_count 精确对齐账本计数
    /// - shared_count 只上调到账本计数，不下调（匿名外部分享不进账本）
    ///
    /// Counters are read before the ledger and written with compare-and-set,
    /// so a toggle that lands mid-pass makes the swap miss instead of being
    /// overwritten. The next pass picks the row up again.
    pub async fn reconcile_counters(&self, content_type: ContentType) -> Result<ReconcileReport> {
        let mut report = ReconcileReport {
            content_type: Some(content_type),
            ..Default::default()
        };

        let mut after_id = 0i64;
        loop {
            let page = self
                .list_content_after(content_type, after_id, RECONCILE_PAGE_SIZE)
                .await?;
            let (Some(first), Some(last)) = (page.first(), page.last()) else {
                break;
            };
            let (first_id, last_id) = (first.id, last.id);
            after_id = last_id;

            let likes = self
                .ledger_count_map(content_type, EngagementAction::Like, first_id, last_id)
                .await?;
            let shares = self
                .ledger_count_map(content_type, EngagementAction::Share, first_id, last_id)
                .await?;

            for record in &page {
                report.rows_scanned += 1;

                let ledger_likes = likes.get(&record.id).copied().unwrap_or(0);
                if record.like_count != ledger_likes
                    && self
                        .swap_counter(
                            content_type,
                            record.id,
                            CounterColumn::LikeCount,
                            record.like_count,
                            ledger_likes,
                        )
                        .await?
                {
                    report.likes_fixed += 1;
                }

                let ledger_shares = shares.get(&record.id).copied().unwrap_or(0);
                if record.shared_count < ledger_shares
                    && self
                        .swap_counter(
                            content_type,
                            record.id,
                            CounterColumn::SharedCount,
                            record.shared_count,
                            ledger_shares,
                        )
                        .await?
                {
                    report.shares_fixed += 1;
                }
            }

            if (page.len() as u64) < RECONCILE_PAGE_SIZE {
                break;
            }
        }

        info!(
            "Reconciled {} counters: scanned {}, likes fixed {}, shares fixed {}",
            content_type, report.rows_scanned, report.likes_fixed, report.shares_fixed
        );
        Ok(report)
    }

    async fn ledger_count_map(
        &self,
        content_type: ContentType,
        action: EngagementAction,
        first_id: i64,
        last_id: i64,
    ) -> Result<HashMap<i64, i64>> {
        Ok(self
            .ledger_counts(content_type, action, first_id, last_id)
            .await?
            .into_iter()
            .map(|row| (row.content_id, row.count))
            .collect())
    }
}
