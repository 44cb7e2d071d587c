use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use models::{category, file_metadata, folder, storage_config, usage_statistic};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, ActiveModelTrait};
use uuid::Uuid;

use crate::cdn::domain::{Category, FileMetadata, FileQuery, Folder, FolderFilter, NewFileMetadata, StorageConfiguration, UsageDelta};
use crate::cdn::errors::CdnError;
use crate::cdn::repository::CdnRepository;

/// SeaORM-backed implementation of CdnRepository
#[derive(Clone)]
pub struct SeaOrmCdnRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmCdnRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

fn to_config(m: storage_config::Model) -> StorageConfiguration {
    StorageConfiguration {
        base_url: m.base_url,
        storage_path: m.storage_path,
        api_key: m.api_key,
        max_file_size_mb: m.max_file_size_mb.max(0) as u64,
        allowed_file_types: m.allowed_file_types,
        enforce_authentication: m.enforce_authentication,
        allow_direct_access: m.allow_direct_access,
        enable_caching: m.enable_caching,
        is_active: m.is_active,
    }
}

fn to_category(m: category::Model) -> Category {
    Category { id: m.id, name: m.name, display_name: m.display_name, allowed_file_types: m.allowed_file_types, is_active: m.is_active }
}

fn to_folder(m: folder::Model) -> Folder {
    Folder { id: m.id, name: m.name, path: m.path, parent_id: m.parent_id, category_id: m.category_id, is_active: m.is_active }
}

fn to_file(m: file_metadata::Model) -> FileMetadata {
    FileMetadata {
        id: m.id,
        file_path: m.file_path,
        file_name: m.file_name,
        content_type: m.content_type,
        file_size: m.file_size.max(0) as u64,
        category_id: m.category_id,
        folder_id: m.folder_id,
        url: m.url,
        upload_date: m.upload_date.with_timezone(&Utc),
        uploaded_by: m.uploaded_by,
        is_deleted: m.is_deleted,
        access_count: m.access_count.max(0) as u64,
        last_access_date: m.last_access_date.map(|d| d.with_timezone(&Utc)),
    }
}

/// Postgres escapes LIKE wildcards with a backslash by default.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[async_trait]
impl CdnRepository for SeaOrmCdnRepository {
    async fn load_active_config(&self) -> Result<Option<StorageConfiguration>, CdnError> {
        Ok(storage_config::find_active(&self.db).await?.map(to_config))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, CdnError> {
        Ok(category::list_active(&self.db).await?.into_iter().map(to_category).collect())
    }

    async fn find_category(&self, name: &str) -> Result<Option<Category>, CdnError> {
        Ok(category::find_by_name(&self.db, name).await?.filter(|c| c.is_active).map(to_category))
    }

    async fn create_category(&self, name: &str, display_name: &str, allowed_file_types: &str) -> Result<Category, CdnError> {
        if category::find_by_name(&self.db, name).await?.is_some() {
            return Err(CdnError::Conflict(format!("category '{}' exists", category::canonical_name(name))));
        }
        Ok(to_category(category::create(&self.db, name, display_name, allowed_file_types).await?))
    }

    async fn list_folders(&self, category_id: Uuid) -> Result<Vec<Folder>, CdnError> {
        Ok(folder::list_by_category(&self.db, category_id).await?.into_iter().map(to_folder).collect())
    }

    async fn find_folder(&self, category_id: Uuid, path: &str) -> Result<Option<Folder>, CdnError> {
        Ok(folder::find_by_path(&self.db, category_id, path).await?.map(to_folder))
    }

    async fn create_folder(&self, category_id: Uuid, parent_id: Option<Uuid>, name: &str, path: &str) -> Result<Folder, CdnError> {
        if folder::find_by_path(&self.db, category_id, path).await?.is_some() {
            return Err(CdnError::Conflict(format!("folder '{path}' exists")));
        }
        Ok(to_folder(folder::create(&self.db, category_id, parent_id, name, path).await?))
    }

    async fn create_file(&self, file: NewFileMetadata) -> Result<FileMetadata, CdnError> {
        let input = file_metadata::NewFileMetadata {
            file_path: file.file_path,
            file_name: file.file_name,
            content_type: file.content_type,
            file_size: i64::try_from(file.file_size).map_err(|_| CdnError::Validation("file too large".into()))?,
            category_id: file.category_id,
            folder_id: file.folder_id,
            url: file.url,
            uploaded_by: file.uploaded_by,
        };
        Ok(to_file(file_metadata::create(&self.db, input).await?))
    }

    async fn find_file_by_url(&self, url: &str) -> Result<Option<FileMetadata>, CdnError> {
        Ok(file_metadata::find_by_url(&self.db, url).await?.map(to_file))
    }

    async fn find_file_by_url_suffix(&self, suffix: &str) -> Result<Option<FileMetadata>, CdnError> {
        Ok(file_metadata::find_by_url_suffix(&self.db, suffix).await?.map(to_file))
    }

    async fn update_file(&self, file: &FileMetadata) -> Result<(), CdnError> {
        let found = file_metadata::Entity::find_by_id(file.id)
            .one(&self.db)
            .await
            .map_err(CdnError::store)?
            .ok_or_else(|| CdnError::NotFound(format!("file metadata {}", file.id)))?;
        let mut am: file_metadata::ActiveModel = found.into();
        am.file_path = Set(file.file_path.clone());
        am.file_name = Set(file.file_name.clone());
        am.url = Set(file.url.clone());
        am.is_deleted = Set(file.is_deleted);
        am.access_count = Set(file.access_count.min(i64::MAX as u64) as i64);
        am.last_access_date = Set(file.last_access_date.map(Into::into));
        am.update(&self.db).await.map_err(CdnError::store)?;
        Ok(())
    }

    async fn list_files(&self, query: &FileQuery) -> Result<Vec<FileMetadata>, CdnError> {
        let mut select = file_metadata::Entity::find()
            .filter(file_metadata::Column::CategoryId.eq(query.category_id))
            .filter(file_metadata::Column::IsDeleted.eq(false));
        select = match query.folder {
            FolderFilter::Any => select,
            FolderFilter::Root => select.filter(file_metadata::Column::FolderId.is_null()),
            FolderFilter::Folder(id) => select.filter(file_metadata::Column::FolderId.eq(id)),
        };
        if let Some(term) = &query.search {
            let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
            select = select.filter(Expr::expr(Func::lower(Expr::col(file_metadata::Column::FileName))).like(pattern));
        }
        let rows = select
            .order_by_desc(file_metadata::Column::UploadDate)
            .all(&self.db)
            .await
            .map_err(CdnError::store)?;
        Ok(rows.into_iter().map(to_file).collect())
    }

    async fn add_usage(&self, date: NaiveDate, category_id: Uuid, delta: UsageDelta) -> Result<(), CdnError> {
        let delta = usage_statistic::Delta {
            file_count: delta.file_count,
            storage_used_bytes: delta.storage_used_bytes,
            upload_count: delta.upload_count,
            download_count: delta.download_count,
            delete_count: delta.delete_count,
        };
        usage_statistic::record(&self.db, date, category_id, delta).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdn::{CdnService, UploadRequest};
    use crate::test_support::get_db;
    use std::sync::Arc;

    fn unique(prefix: &str) -> String {
        format!("{prefix}-{}", &Uuid::new_v4().simple().to_string()[..8])
    }

    #[tokio::test]
    async fn folders_files_and_usage_roundtrip() -> anyhow::Result<()> {
        let Some(db) = get_db().await else { return Ok(()) };
        let repo = SeaOrmCdnRepository::new(db);

        let cat = repo.create_category(&unique("cat"), "Test", ".pdf").await?;
        assert!(matches!(repo.create_category(&cat.name, "Again", "").await, Err(CdnError::Conflict(_))));

        let year = repo.create_folder(cat.id, None, "2024", "2024").await?;
        let month = repo.create_folder(cat.id, Some(year.id), "january", "2024/january").await?;
        let listed: Vec<String> = repo.list_folders(cat.id).await?.into_iter().map(|f| f.path).collect();
        assert_eq!(listed, vec!["2024", "2024/january"]);

        let url = format!("https://cdn.example.com/{}/2024/january/{}.pdf", cat.name, unique("f"));
        let mut row = repo
            .create_file(NewFileMetadata {
                file_path: "/srv/x.pdf".into(),
                file_name: "x.pdf".into(),
                content_type: "application/pdf".into(),
                file_size: 42,
                category_id: cat.id,
                folder_id: Some(month.id),
                url: url.clone(),
                uploaded_by: "tester".into(),
            })
            .await?;
        assert_eq!(repo.find_file_by_url(&url).await?.map(|f| f.id), Some(row.id));

        let root_only = FileQuery { category_id: cat.id, folder: FolderFilter::Root, search: None };
        assert!(repo.list_files(&root_only).await?.is_empty());
        let in_month = FileQuery { category_id: cat.id, folder: FolderFilter::Folder(month.id), search: Some("x".into()) };
        assert_eq!(repo.list_files(&in_month).await?.len(), 1);
        let shouting = FileQuery { search: Some("X.PDF".into()), ..in_month.clone() };
        assert_eq!(repo.list_files(&shouting).await?.len(), 1, "search must ignore case");
        let wildcard = FileQuery { search: Some("%".into()), ..in_month.clone() };
        assert!(repo.list_files(&wildcard).await?.is_empty());

        row.is_deleted = true;
        repo.update_file(&row).await?;
        assert!(repo.find_file_by_url(&url).await?.is_none());

        let today = Utc::now().date_naive();
        repo.add_usage(today, cat.id, UsageDelta::upload(42)).await?;
        repo.add_usage(today, cat.id, UsageDelta::delete(42)).await?;
        Ok(())
    }

    #[tokio::test]
    async fn service_over_postgres_upload_and_delete() -> anyhow::Result<()> {
        let Some(db) = get_db().await else { return Ok(()) };
        let root = std::env::temp_dir().join(format!("cdn_pg_{}", Uuid::new_v4()));
        let settings = configs::CdnSettings {
            base_url: "https://cdn.example.com".into(),
            storage_path: root.display().to_string(),
            ..Default::default()
        };
        let svc = CdnService::new(Arc::new(SeaOrmCdnRepository::new(db)), settings);

        let url = svc.upload_bytes(b"pg", UploadRequest::new("pg.pdf").folder(unique("batch"))).await?;
        assert!(svc.list_files("documents", None, Some("pg_")).await?.iter().any(|f| f.url == url));
        assert!(svc.delete(&url).await?);
        assert!(!svc.list_files("documents", None, None).await?.iter().any(|f| f.url == url));

        let _ = tokio::fs::remove_dir_all(&root).await;
        Ok(())
    }
}
