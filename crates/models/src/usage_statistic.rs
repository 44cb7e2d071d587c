use sea_orm::{entity::prelude::*, sea_query::{Expr, OnConflict}, Set, DatabaseConnection};
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::category;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cdn_usage_statistic")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub date: Date,
    pub category_id: Uuid,
    pub file_count: i64,
    pub storage_used_bytes: i64,
    pub upload_count: i64,
    pub download_count: i64,
    pub delete_count: i64,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Category }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self { Relation::Category => Entity::belongs_to(category::Entity).from(Column::CategoryId).to(category::Column::Id).into() }
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Counter deltas applied to one (date, category) row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Delta {
    pub file_count: i64,
    pub storage_used_bytes: i64,
    pub upload_count: i64,
    pub download_count: i64,
    pub delete_count: i64,
}

/// Add `delta` to the row for `(date, category_id)`, seeding it when absent.
///
/// A single `INSERT .. ON CONFLICT DO UPDATE` so concurrent callers never lose an increment.
pub async fn record(db: &DatabaseConnection, date: Date, category_id: Uuid, delta: Delta) -> Result<Model, errors::ModelError> {
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        date: Set(date),
        category_id: Set(category_id),
        file_count: Set(delta.file_count),
        storage_used_bytes: Set(delta.storage_used_bytes),
        upload_count: Set(delta.upload_count),
        download_count: Set(delta.download_count),
        delete_count: Set(delta.delete_count),
    };
    let add = |col: Column, by: i64| Expr::col((Entity, col)).add(by);
    Entity::insert(am)
        .on_conflict(
            OnConflict::columns([Column::Date, Column::CategoryId])
                .value(Column::FileCount, add(Column::FileCount, delta.file_count))
                .value(Column::StorageUsedBytes, add(Column::StorageUsedBytes, delta.storage_used_bytes))
                .value(Column::UploadCount, add(Column::UploadCount, delta.upload_count))
                .value(Column::DownloadCount, add(Column::DownloadCount, delta.download_count))
                .value(Column::DeleteCount, add(Column::DeleteCount, delta.delete_count))
                .to_owned(),
        )
        .exec_with_returning(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}
