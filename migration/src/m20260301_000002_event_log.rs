//! 事件日志表迁移
//!
//! 创建 events（原始交互事件，只追加）和 events_archive（归档表）：
//! - events 按 (product_id, created_at)、(store_id, created_at)、created_at 建索引
//! - events_archive 的主键沿用原始事件 id，重复归档时 ON CONFLICT DO NOTHING

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Events::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Events::EventType).string_len(20).not_null())
                    .col(ColumnDef::new(Events::ProductId).big_integer().null())
                    .col(ColumnDef::new(Events::StoreId).big_integer().null())
                    .col(ColumnDef::new(Events::UserId).big_integer().null())
                    .col(ColumnDef::new(Events::InvokedOn).string_len(10).not_null())
                    .col(ColumnDef::new(Events::Value).big_integer().null())
                    .col(
                        ColumnDef::new(Events::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 单商品时间序列查询
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_events_product_time")
                    .table(Events::Table)
                    .col(Events::ProductId)
                    .col(Events::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // 单店铺时间序列查询
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_events_store_time")
                    .table(Events::Table)
                    .col(Events::StoreId)
                    .col(Events::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // 归档扫描
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_events_created_at")
                    .table(Events::Table)
                    .col(Events::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EventsArchive::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EventsArchive::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EventsArchive::EventType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(EventsArchive::ProductId).big_integer().null())
                    .col(ColumnDef::new(EventsArchive::StoreId).big_integer().null())
                    .col(ColumnDef::new(EventsArchive::UserId).big_integer().null())
                    .col(
                        ColumnDef::new(EventsArchive::InvokedOn)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(ColumnDef::new(EventsArchive::Value).big_integer().null())
                    .col(
                        ColumnDef::new(EventsArchive::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventsArchive::ArchivedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_events_archive_product")
                    .table(EventsArchive::Table)
                    .col(EventsArchive::ProductId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_events_archive_store")
                    .table(EventsArchive::Table)
                    .col(EventsArchive::StoreId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_events_archive_store").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_events_archive_product").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EventsArchive::Table).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_events_created_at").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_events_store_time").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_events_product_time").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Events {
    #[sea_orm(iden = "events")]
    Table,
    Id,
    EventType,
    ProductId,
    StoreId,
    UserId,
    InvokedOn,
    Value,
    CreatedAt,
}

#[derive(DeriveIden)]
enum EventsArchive {
    #[sea_orm(iden = "events_archive")]
    Table,
    Id,
    EventType,
    ProductId,
    StoreId,
    UserId,
    InvokedOn,
    Value,
    CreatedAt,
    ArchivedAt,
}
