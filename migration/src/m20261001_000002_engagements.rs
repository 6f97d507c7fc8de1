//! 互动账本（engagements）表迁移
//!
//! like 与 share 两个逻辑分区共用一张表，以 action 列区分。
//! 自然键 (identity_key, user_agent, content_type, content_id, action)
//! 上建唯一索引，并发 toggle 的第二次插入会被数据库拒绝。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Engagements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Engagements::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Engagements::IdentityKey)
                            .string_len(45)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Engagements::UserAgent)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Engagements::ContentType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Engagements::ContentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Engagements::Action).string_len(8).not_null())
                    .col(
                        ColumnDef::new(Engagements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 自然键唯一索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uniq_engagements_natural_key")
                    .table(Engagements::Table)
                    .col(Engagements::IdentityKey)
                    .col(Engagements::UserAgent)
                    .col(Engagements::ContentType)
                    .col(Engagements::ContentId)
                    .col(Engagements::Action)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 按内容统计（计数器对账）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_engagements_content")
                    .table(Engagements::Table)
                    .col(Engagements::ContentType)
                    .col(Engagements::ContentId)
                    .col(Engagements::Action)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_engagements_content").to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("uniq_engagements_natural_key")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Engagements::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Engagements {
    #[sea_orm(iden = "engagements")]
    Table,
    Id,
    IdentityKey,
    UserAgent,
    ContentType,
    ContentId,
    Action,
    CreatedAt,
}
