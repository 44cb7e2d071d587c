//! Create `cdn_usage_statistic` table: per-day, per-category counters.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UsageStatistic::Table)
                    .if_not_exists()
                    .col(uuid(UsageStatistic::Id).primary_key())
                    .col(date(UsageStatistic::Date).not_null())
                    .col(uuid(UsageStatistic::CategoryId).not_null())
                    .col(big_integer(UsageStatistic::FileCount).not_null())
                    .col(big_integer(UsageStatistic::StorageUsedBytes).not_null())
                    .col(big_integer(UsageStatistic::UploadCount).not_null())
                    .col(big_integer(UsageStatistic::DownloadCount).not_null())
                    .col(big_integer(UsageStatistic::DeleteCount).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_usage_statistic_category")
                            .from(UsageStatistic::Table, UsageStatistic::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(UsageStatistic::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum UsageStatistic {
    #[sea_orm(iden = "cdn_usage_statistic")]
    Table,
    Id,
    Date,
    CategoryId,
    FileCount,
    StorageUsedBytes,
    UploadCount,
    DownloadCount,
    DeleteCount,
}

#[derive(DeriveIden)]
enum Category {
    #[sea_orm(iden = "cdn_category")]
    Table,
    Id,
}
