//! Create `cdn_category` table.
//!
//! Top-level storage namespaces; `name` is the lowercase canonical key.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Category::Table)
                    .if_not_exists()
                    .col(uuid(Category::Id).primary_key())
                    .col(string_len(Category::Name, 128).unique_key().not_null())
                    .col(string_len(Category::DisplayName, 256).not_null())
                    .col(string_len(Category::AllowedFileTypes, 1024).not_null())
                    .col(boolean(Category::IsActive).not_null())
                    .col(timestamp_with_time_zone(Category::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Category::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Category {
    #[sea_orm(iden = "cdn_category")]
    Table,
    Id,
    Name,
    DisplayName,
    AllowedFileTypes,
    IsActive,
    CreatedAt,
}
