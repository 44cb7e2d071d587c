use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Folder: path is unique within its category
        manager
            .create_index(
                Index::create()
                    .name("uniq_folder_category_path")
                    .table(Folder::Table)
                    .col(Folder::CategoryId)
                    .col(Folder::Path)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // FileMetadata: lookups by url and listing by category
        manager
            .create_index(
                Index::create()
                    .name("idx_file_metadata_url")
                    .table(FileMetadata::Table)
                    .col(FileMetadata::Url)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_file_metadata_category")
                    .table(FileMetadata::Table)
                    .col(FileMetadata::CategoryId)
                    .col(FileMetadata::FolderId)
                    .to_owned(),
            )
            .await?;

        // UsageStatistic: one row per (date, category)
        manager
            .create_index(
                Index::create()
                    .name("uniq_usage_statistic_date_category")
                    .table(UsageStatistic::Table)
                    .col(UsageStatistic::Date)
                    .col(UsageStatistic::CategoryId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("uniq_usage_statistic_date_category").table(UsageStatistic::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_file_metadata_category").table(FileMetadata::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_file_metadata_url").table(FileMetadata::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_folder_category_path").table(Folder::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Folder {
    #[sea_orm(iden = "cdn_folder")]
    Table,
    CategoryId,
    Path,
}

#[derive(DeriveIden)]
enum FileMetadata {
    #[sea_orm(iden = "cdn_file_metadata")]
    Table,
    Url,
    CategoryId,
    FolderId,
}

#[derive(DeriveIden)]
enum UsageStatistic {
    #[sea_orm(iden = "cdn_usage_statistic")]
    Table,
    Date,
    CategoryId,
}
