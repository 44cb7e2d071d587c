use sea_orm::{entity::prelude::*, Set, DatabaseConnection, QueryOrder};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::{category, folder};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cdn_file_metadata")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub file_path: String,
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
    pub category_id: Uuid,
    pub folder_id: Option<Uuid>,
    pub url: String,
    pub upload_date: DateTimeWithTimeZone,
    pub uploaded_by: String,
    pub is_deleted: bool,
    pub access_count: i64,
    pub last_access_date: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Category, Folder }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Category => Entity::belongs_to(category::Entity).from(Column::CategoryId).to(category::Column::Id).into(),
            Relation::Folder => Entity::belongs_to(folder::Entity).from(Column::FolderId).to(folder::Column::Id).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug)]
pub struct NewFileMetadata {
    pub file_path: String,
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
    pub category_id: Uuid,
    pub folder_id: Option<Uuid>,
    pub url: String,
    pub uploaded_by: String,
}

pub async fn create(db: &DatabaseConnection, input: NewFileMetadata) -> Result<Model, errors::ModelError> {
    if input.url.trim().is_empty() { return Err(errors::ModelError::Validation("url required".into())); }
    if input.file_size < 0 { return Err(errors::ModelError::Validation("file_size must be >= 0".into())); }
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        file_path: Set(input.file_path),
        file_name: Set(input.file_name),
        content_type: Set(input.content_type),
        file_size: Set(input.file_size),
        category_id: Set(input.category_id),
        folder_id: Set(input.folder_id),
        url: Set(input.url),
        upload_date: Set(Utc::now().into()),
        uploaded_by: Set(input.uploaded_by),
        is_deleted: Set(false),
        access_count: Set(0),
        last_access_date: Set(None),
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

/// Exact url match among live (not soft-deleted) rows, newest first.
pub async fn find_by_url(db: &DatabaseConnection, url: &str) -> Result<Option<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::Url.eq(url.to_string()))
        .filter(Column::IsDeleted.eq(false))
        .order_by_desc(Column::UploadDate)
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

/// Url ending with `suffix`, newest first. Used when the base URL drifted between environments.
pub async fn find_by_url_suffix(db: &DatabaseConnection, suffix: &str) -> Result<Option<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::Url.ends_with(suffix))
        .filter(Column::IsDeleted.eq(false))
        .order_by_desc(Column::UploadDate)
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}
