//! Create `cdn_file_metadata` table.
//!
//! One row per uploaded file; `url` is the durable external identifier and
//! `is_deleted` carries the soft-delete flag.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FileMetadata::Table)
                    .if_not_exists()
                    .col(uuid(FileMetadata::Id).primary_key())
                    .col(string_len(FileMetadata::FilePath, 2048).not_null())
                    .col(string_len(FileMetadata::FileName, 512).not_null())
                    .col(string_len(FileMetadata::ContentType, 256).not_null())
                    .col(big_integer(FileMetadata::FileSize).not_null())
                    .col(uuid(FileMetadata::CategoryId).not_null())
                    .col(ColumnDef::new(FileMetadata::FolderId).uuid().null())
                    .col(string_len(FileMetadata::Url, 2048).not_null())
                    .col(timestamp_with_time_zone(FileMetadata::UploadDate).not_null())
                    .col(string_len(FileMetadata::UploadedBy, 256).not_null())
                    .col(boolean(FileMetadata::IsDeleted).not_null())
                    .col(big_integer(FileMetadata::AccessCount).not_null())
                    .col(
                        ColumnDef::new(FileMetadata::LastAccessDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_file_metadata_category")
                            .from(FileMetadata::Table, FileMetadata::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_file_metadata_folder")
                            .from(FileMetadata::Table, FileMetadata::FolderId)
                            .to(Folder::Table, Folder::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(FileMetadata::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum FileMetadata {
    #[sea_orm(iden = "cdn_file_metadata")]
    Table,
    Id,
    FilePath,
    FileName,
    ContentType,
    FileSize,
    CategoryId,
    FolderId,
    Url,
    UploadDate,
    UploadedBy,
    IsDeleted,
    AccessCount,
    LastAccessDate,
}

#[derive(DeriveIden)]
enum Category {
    #[sea_orm(iden = "cdn_category")]
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Folder {
    #[sea_orm(iden = "cdn_folder")]
    Table,
    Id,
}
