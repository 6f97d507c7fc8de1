//! 统计事件日志表迁移
//!
//! 只追加的原始事件日志，用于每日汇总、热门内容和地理分布查询。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Statistics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Statistics::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Statistics::EntityType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Statistics::EntityId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Statistics::Action).string_len(64).not_null())
                    .col(ColumnDef::new(Statistics::IpAddress).string_len(45).null())
                    .col(ColumnDef::new(Statistics::UserAgent).string_len(255).null())
                    .col(ColumnDef::new(Statistics::Country).string_len(64).null())
                    .col(ColumnDef::new(Statistics::City).string_len(100).null())
                    .col(
                        ColumnDef::new(Statistics::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 时间范围查询 + 保留期清理
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_statistics_created_at")
                    .table(Statistics::Table)
                    .col(Statistics::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_statistics_entity")
                    .table(Statistics::Table)
                    .col(Statistics::EntityType)
                    .col(Statistics::EntityId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_statistics_geo")
                    .table(Statistics::Table)
                    .col(Statistics::Country)
                    .col(Statistics::City)
                    .col(Statistics::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_statistics_geo",
            "idx_statistics_entity",
            "idx_statistics_created_at",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }

        manager
            .drop_table(Table::drop().table(Statistics::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Statistics {
    #[sea_orm(iden = "statistics")]
    Table,
    Id,
    EntityType,
    EntityId,
    Action,
    IpAddress,
    UserAgent,
    Country,
    City,
    CreatedAt,
}
