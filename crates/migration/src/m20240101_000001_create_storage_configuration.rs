//! Create `cdn_storage_configuration` table.
//!
//! Holds the persisted storage settings; exactly one row is expected to be active.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StorageConfiguration::Table)
                    .if_not_exists()
                    .col(uuid(StorageConfiguration::Id).primary_key())
                    .col(string_len(StorageConfiguration::BaseUrl, 512).not_null())
                    .col(string_len(StorageConfiguration::StoragePath, 1024).not_null())
                    .col(string_len(StorageConfiguration::ApiKey, 256).not_null())
                    .col(big_integer(StorageConfiguration::MaxFileSizeMb).not_null())
                    .col(string_len(StorageConfiguration::AllowedFileTypes, 1024).not_null())
                    .col(boolean(StorageConfiguration::EnforceAuthentication).not_null())
                    .col(boolean(StorageConfiguration::AllowDirectAccess).not_null())
                    .col(boolean(StorageConfiguration::EnableCaching).not_null())
                    .col(boolean(StorageConfiguration::IsActive).not_null())
                    .col(timestamp_with_time_zone(StorageConfiguration::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(StorageConfiguration::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(StorageConfiguration::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum StorageConfiguration {
    #[sea_orm(iden = "cdn_storage_configuration")]
    Table,
    Id,
    BaseUrl,
    StoragePath,
    ApiKey,
    MaxFileSizeMb,
    AllowedFileTypes,
    EnforceAuthentication,
    AllowDirectAccess,
    EnableCaching,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
