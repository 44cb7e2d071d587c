use sea_orm::{entity::prelude::*, Set, DatabaseConnection, QueryOrder};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cdn_category")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub display_name: String,
    pub allowed_file_types: String,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation { fn def(&self) -> RelationDef { panic!("no relations") } }

impl ActiveModelBehavior for ActiveModel {}

/// Canonical category key: trimmed and lowercased.
pub fn canonical_name(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn validate_name(name: &str) -> Result<(), errors::ModelError> {
    let n = canonical_name(name);
    if n.is_empty() { return Err(errors::ModelError::Validation("category name required".into())); }
    if n.contains('/') || n.contains('\\') || n == "." || n == ".." {
        return Err(errors::ModelError::Validation("category name must be a single path segment".into()));
    }
    Ok(())
}

pub async fn create(db: &DatabaseConnection, name: &str, display_name: &str, allowed_file_types: &str) -> Result<Model, errors::ModelError> {
    validate_name(name)?;
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(canonical_name(name)),
        display_name: Set(display_name.to_string()),
        allowed_file_types: Set(allowed_file_types.to_string()),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn find_by_name(db: &DatabaseConnection, name: &str) -> Result<Option<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::Name.eq(canonical_name(name)))
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn list_active(db: &DatabaseConnection) -> Result<Vec<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::IsActive.eq(true))
        .order_by_asc(Column::Name)
        .all(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}
