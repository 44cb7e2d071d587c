use sea_orm::{entity::prelude::*, Set, DatabaseConnection, QueryOrder};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::category;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cdn_folder")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    /// Slash-joined path from the category root, e.g. `2024/january`.
    pub path: String,
    pub parent_id: Option<Uuid>,
    pub category_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Category, Parent }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Category => Entity::belongs_to(category::Entity).from(Column::CategoryId).to(category::Column::Id).into(),
            Relation::Parent => Entity::belongs_to(Entity).from(Column::ParentId).to(Column::Id).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn create(db: &DatabaseConnection, category_id: Uuid, parent_id: Option<Uuid>, name: &str, path: &str) -> Result<Model, errors::ModelError> {
    if name.trim().is_empty() { return Err(errors::ModelError::Validation("folder name required".into())); }
    if !path.ends_with(name) { return Err(errors::ModelError::Validation("folder path must end with its name".into())); }
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        path: Set(path.to_string()),
        parent_id: Set(parent_id),
        category_id: Set(category_id),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn find_by_path(db: &DatabaseConnection, category_id: Uuid, path: &str) -> Result<Option<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::CategoryId.eq(category_id))
        .filter(Column::Path.eq(path.to_string()))
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn list_by_category(db: &DatabaseConnection, category_id: Uuid) -> Result<Vec<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::CategoryId.eq(category_id))
        .filter(Column::IsActive.eq(true))
        .order_by_asc(Column::Path)
        .all(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}
