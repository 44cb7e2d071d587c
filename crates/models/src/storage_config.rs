use sea_orm::{entity::prelude::*, sea_query::Expr, Set, DatabaseConnection, QueryOrder};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cdn_storage_configuration")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub base_url: String,
    pub storage_path: String,
    pub api_key: String,
    pub max_file_size_mb: i64,
    pub allowed_file_types: String,
    pub enforce_authentication: bool,
    pub allow_direct_access: bool,
    pub enable_caching: bool,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation { fn def(&self) -> RelationDef { panic!("no relations") } }

impl ActiveModelBehavior for ActiveModel {}

/// Input for a new configuration row.
#[derive(Clone, Debug)]
pub struct NewStorageConfig {
    pub base_url: String,
    pub storage_path: String,
    pub api_key: String,
    pub max_file_size_mb: i64,
    pub allowed_file_types: String,
    pub enforce_authentication: bool,
    pub allow_direct_access: bool,
    pub enable_caching: bool,
}

pub fn validate(input: &NewStorageConfig) -> Result<(), errors::ModelError> {
    if !input.base_url.starts_with("http") && !input.base_url.starts_with('/') {
        return Err(errors::ModelError::Validation("invalid base_url".into()));
    }
    if input.storage_path.trim().is_empty() {
        return Err(errors::ModelError::Validation("storage_path required".into()));
    }
    if input.max_file_size_mb <= 0 {
        return Err(errors::ModelError::Validation("max_file_size_mb must be > 0".into()));
    }
    Ok(())
}

/// Insert a configuration row and make it the only active one.
pub async fn activate(db: &DatabaseConnection, input: NewStorageConfig) -> Result<Model, errors::ModelError> {
    validate(&input)?;
    Entity::update_many()
        .col_expr(Column::IsActive, Expr::value(false))
        .filter(Column::IsActive.eq(true))
        .exec(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        base_url: Set(input.base_url.trim_end_matches('/').to_string()),
        storage_path: Set(input.storage_path),
        api_key: Set(input.api_key),
        max_file_size_mb: Set(input.max_file_size_mb),
        allowed_file_types: Set(input.allowed_file_types),
        enforce_authentication: Set(input.enforce_authentication),
        allow_direct_access: Set(input.allow_direct_access),
        enable_caching: Set(input.enable_caching),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

/// Most recently updated active row, if any.
pub async fn find_active(db: &DatabaseConnection) -> Result<Option<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::IsActive.eq(true))
        .order_by_desc(Column::UpdatedAt)
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> NewStorageConfig {
        NewStorageConfig {
            base_url: "https://cdn.example.com".into(),
            storage_path: "/srv/cdn".into(),
            api_key: "k".into(),
            max_file_size_mb: 50,
            allowed_file_types: ".pdf".into(),
            enforce_authentication: false,
            allow_direct_access: true,
            enable_caching: true,
        }
    }

    #[test]
    fn validation_rules() {
        assert!(validate(&input()).is_ok());
        assert!(validate(&NewStorageConfig { base_url: "ftp://x".into(), ..input() }).is_err());
        assert!(validate(&NewStorageConfig { storage_path: " ".into(), ..input() }).is_err());
        assert!(validate(&NewStorageConfig { max_file_size_mb: 0, ..input() }).is_err());
    }
}
