//! 通知日志表迁移（保留 180 天后归档）

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NotificationLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NotificationLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(NotificationLogs::UserId).big_integer().null())
                    .col(
                        ColumnDef::new(NotificationLogs::Channel)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(NotificationLogs::Message).text().not_null())
                    .col(
                        ColumnDef::new(NotificationLogs::CreatedAt)
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
                    .name("idx_notification_logs_created_at")
                    .table(NotificationLogs::Table)
                    .col(NotificationLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(NotificationLogsArchive::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NotificationLogsArchive::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(NotificationLogsArchive::UserId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(NotificationLogsArchive::Channel)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationLogsArchive::Message)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationLogsArchive::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationLogsArchive::ArchivedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NotificationLogsArchive::Table).to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_notification_logs_created_at")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(NotificationLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum NotificationLogs {
    #[sea_orm(iden = "notification_logs")]
    Table,
    Id,
    UserId,
    Channel,
    Message,
    CreatedAt,
}

#[derive(DeriveIden)]
enum NotificationLogsArchive {
    #[sea_orm(iden = "notification_logs_archive")]
    Table,
    Id,
    UserId,
    Channel,
    Message,
    CreatedAt,
    ArchivedAt,
}
