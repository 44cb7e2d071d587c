//! Create `cdn_folder` table with FKs to `cdn_category` and to itself (parent).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Folder::Table)
                    .if_not_exists()
                    .col(uuid(Folder::Id).primary_key())
                    .col(string_len(Folder::Name, 256).not_null())
                    .col(string_len(Folder::Path, 1024).not_null())
                    .col(ColumnDef::new(Folder::ParentId).uuid().null())
                    .col(uuid(Folder::CategoryId).not_null())
                    .col(boolean(Folder::IsActive).not_null())
                    .col(timestamp_with_time_zone(Folder::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_folder_category")
                            .from(Folder::Table, Folder::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_folder_parent")
                            .from(Folder::Table, Folder::ParentId)
                            .to(Folder::Table, Folder::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Folder::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Folder {
    #[sea_orm(iden = "cdn_folder")]
    Table,
    Id,
    Name,
    Path,
    ParentId,
    CategoryId,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Category {
    #[sea_orm(iden = "cdn_category")]
    Table,
    Id,
}
