//! 内容表迁移
//!
//! posts / articles / comments / events / videos 共用同一结构：
//! - 标题与正文
//! - 反规范化计数器 like_count / shared_count / view_count

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const CONTENT_TABLES: [ContentTable; 5] = [
    ContentTable::Posts,
    ContentTable::Articles,
    ContentTable::Comments,
    ContentTable::Events,
    ContentTable::Videos,
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in CONTENT_TABLES {
            manager
                .create_table(
                    Table::create()
                        .table(table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Content::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Content::Title).string_len(255).not_null())
                        .col(ColumnDef::new(Content::Body).text().null())
                        .col(
                            ColumnDef::new(Content::LikeCount)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Content::SharedCount)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Content::ViewCount)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Content::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in CONTENT_TABLES {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden, Clone, Copy)]
enum ContentTable {
    Posts,
    Articles,
    Comments,
    Events,
    Videos,
}

#[derive(DeriveIden)]
enum Content {
    Id,
    Title,
    Body,
    LikeCount,
    SharedCount,
    ViewCount,
    CreatedAt,
}
