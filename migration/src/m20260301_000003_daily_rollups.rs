//! 天级汇总表迁移
//!
//! 每个实体每天一行，(day, entity_id) 唯一，供分析服务的 aggregatedStats 层读取。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductStatsDaily::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductStatsDaily::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProductStatsDaily::Day).date().not_null())
                    .col(
                        ColumnDef::new(ProductStatsDaily::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProductStatsDaily::StoreId).big_integer().null())
                    .col(metric(ProductStatsDaily::Views))
                    .col(metric(ProductStatsDaily::Purchases))
                    .col(metric(ProductStatsDaily::AddToCarts))
                    .col(metric(ProductStatsDaily::Checkouts))
                    .col(metric(ProductStatsDaily::Revenue))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_product_stats_daily_day_product")
                    .table(ProductStatsDaily::Table)
                    .col(ProductStatsDaily::Day)
                    .col(ProductStatsDaily::ProductId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_product_stats_daily_product_day")
                    .table(ProductStatsDaily::Table)
                    .col(ProductStatsDaily::ProductId)
                    .col(ProductStatsDaily::Day)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StoreStatsDaily::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StoreStatsDaily::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StoreStatsDaily::Day).date().not_null())
                    .col(
                        ColumnDef::new(StoreStatsDaily::StoreId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(metric(StoreStatsDaily::Views))
                    .col(metric(StoreStatsDaily::Purchases))
                    .col(metric(StoreStatsDaily::AddToCarts))
                    .col(metric(StoreStatsDaily::Checkouts))
                    .col(metric(StoreStatsDaily::Revenue))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_store_stats_daily_day_store")
                    .table(StoreStatsDaily::Table)
                    .col(StoreStatsDaily::Day)
                    .col(StoreStatsDaily::StoreId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_store_stats_daily_store_day")
                    .table(StoreStatsDaily::Table)
                    .col(StoreStatsDaily::StoreId)
                    .col(StoreStatsDaily::Day)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StoreStatsDaily::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductStatsDaily::Table).to_owned())
            .await
    }
}

fn metric<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .big_integer()
        .not_null()
        .default(0)
        .to_owned()
}

#[derive(DeriveIden)]
enum ProductStatsDaily {
    #[sea_orm(iden = "product_stats_daily")]
    Table,
    Id,
    Day,
    ProductId,
    StoreId,
    Views,
    Purchases,
    AddToCarts,
    Checkouts,
    Revenue,
}

#[derive(DeriveIden)]
enum StoreStatsDaily {
    #[sea_orm(iden = "store_stats_daily")]
    Table,
    Id,
    Day,
    StoreId,
    Views,
    Purchases,
    AddToCarts,
    Checkouts,
    Revenue,
}
