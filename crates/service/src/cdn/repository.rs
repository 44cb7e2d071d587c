use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use super::domain::{Category, FileMetadata, FileQuery, Folder, NewFileMetadata, StorageConfiguration, UsageDelta};
use super::errors::CdnError;

/// Persistence seam for configuration, categories, folders, file metadata and usage.
///
/// Lookups only ever return live rows: inactive categories/folders and
/// soft-deleted files are invisible.
#[async_trait]
pub trait CdnRepository: Send + Sync {
    async fn load_active_config(&self) -> Result<Option<StorageConfiguration>, CdnError>;

    async fn list_categories(&self) -> Result<Vec<Category>, CdnError>;
    async fn find_category(&self, name: &str) -> Result<Option<Category>, CdnError>;
    async fn create_category(&self, name: &str, display_name: &str, allowed_file_types: &str) -> Result<Category, CdnError>;

    /// Ordered by path, so parents precede children.
    async fn list_folders(&self, category_id: Uuid) -> Result<Vec<Folder>, CdnError>;
    async fn find_folder(&self, category_id: Uuid, path: &str) -> Result<Option<Folder>, CdnError>;
    async fn create_folder(&self, category_id: Uuid, parent_id: Option<Uuid>, name: &str, path: &str) -> Result<Folder, CdnError>;

    async fn create_file(&self, file: NewFileMetadata) -> Result<FileMetadata, CdnError>;
    async fn find_file_by_url(&self, url: &str) -> Result<Option<FileMetadata>, CdnError>;
    async fn find_file_by_url_suffix(&self, suffix: &str) -> Result<Option<FileMetadata>, CdnError>;
    async fn update_file(&self, file: &FileMetadata) -> Result<(), CdnError>;
    /// Newest first.
    async fn list_files(&self, query: &FileQuery) -> Result<Vec<FileMetadata>, CdnError>;

    /// Add `delta` to the `(date, category)` row, creating it when absent.
    async fn add_usage(&self, date: NaiveDate, category_id: Uuid, delta: UsageDelta) -> Result<(), CdnError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use crate::cdn::domain::{FolderFilter, UsageStatistic};
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::{Mutex, MutexGuard};

    #[derive(Default)]
    struct State {
        config: Option<StorageConfiguration>,
        categories: Vec<Category>,
        folders: Vec<Folder>,
        files: Vec<FileMetadata>,
        usage: HashMap<(NaiveDate, Uuid), UsageStatistic>,
    }

    #[derive(Default)]
    pub struct MockCdnRepository {
        state: Mutex<State>,
        unavailable: AtomicBool,
        config_loads: AtomicU32,
    }

    impl MockCdnRepository {
        pub fn new() -> Self { Self::default() }

        pub fn set_active_config(&self, config: Option<StorageConfiguration>) {
            self.state().config = config;
        }

        /// While set, every call fails with a store error.
        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        pub fn config_load_count(&self) -> u32 {
            self.config_loads.load(Ordering::SeqCst)
        }

        pub fn usage(&self, date: NaiveDate, category_id: Uuid) -> Option<UsageStatistic> {
            self.state().usage.get(&(date, category_id)).cloned()
        }

        /// Every file row, soft-deleted ones included.
        pub fn files(&self) -> Vec<FileMetadata> { self.state().files.clone() }

        pub fn folders(&self) -> Vec<Folder> { self.state().folders.clone() }

        pub fn categories(&self) -> Vec<Category> { self.state().categories.clone() }

        fn state(&self) -> MutexGuard<'_, State> {
            self.state.lock().unwrap_or_else(|p| p.into_inner())
        }

        fn check(&self) -> Result<(), CdnError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(CdnError::Store("metadata store unavailable".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CdnRepository for MockCdnRepository {
        async fn load_active_config(&self) -> Result<Option<StorageConfiguration>, CdnError> {
            self.config_loads.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            Ok(self.state().config.clone().filter(|c| c.is_active))
        }

        async fn list_categories(&self) -> Result<Vec<Category>, CdnError> {
            self.check()?;
            let mut cats: Vec<Category> = self.state().categories.iter().filter(|c| c.is_active).cloned().collect();
            cats.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(cats)
        }

        async fn find_category(&self, name: &str) -> Result<Option<Category>, CdnError> {
            self.check()?;
            let key = name.trim().to_lowercase();
            Ok(self.state().categories.iter().find(|c| c.name == key).cloned())
        }

        async fn create_category(&self, name: &str, display_name: &str, allowed_file_types: &str) -> Result<Category, CdnError> {
            self.check()?;
            let key = name.trim().to_lowercase();
            if key.is_empty() {
                return Err(CdnError::Validation("category name required".into()));
            }
            let mut state = self.state();
            if state.categories.iter().any(|c| c.name == key) {
                return Err(CdnError::Conflict(format!("category '{key}' exists")));
            }
            let cat = Category {
                id: Uuid::new_v4(),
                name: key,
                display_name: display_name.to_string(),
                allowed_file_types: allowed_file_types.to_string(),
                is_active: true,
            };
            state.categories.push(cat.clone());
            Ok(cat)
        }

        async fn list_folders(&self, category_id: Uuid) -> Result<Vec<Folder>, CdnError> {
            self.check()?;
            let mut folders: Vec<Folder> = self
                .state()
                .folders
                .iter()
                .filter(|f| f.category_id == category_id && f.is_active)
                .cloned()
                .collect();
            folders.sort_by(|a, b| a.path.cmp(&b.path));
            Ok(folders)
        }

        async fn find_folder(&self, category_id: Uuid, path: &str) -> Result<Option<Folder>, CdnError> {
            self.check()?;
            Ok(self.state().folders.iter().find(|f| f.category_id == category_id && f.path == path).cloned())
        }

        async fn create_folder(&self, category_id: Uuid, parent_id: Option<Uuid>, name: &str, path: &str) -> Result<Folder, CdnError> {
            self.check()?;
            let mut state = self.state();
            if state.folders.iter().any(|f| f.category_id == category_id && f.path == path) {
                return Err(CdnError::Conflict(format!("folder '{path}' exists")));
            }
            let folder = Folder {
                id: Uuid::new_v4(),
                name: name.to_string(),
                path: path.to_string(),
                parent_id,
                category_id,
                is_active: true,
            };
            state.folders.push(folder.clone());
            Ok(folder)
        }

        async fn create_file(&self, file: NewFileMetadata) -> Result<FileMetadata, CdnError> {
            self.check()?;
            let row = FileMetadata {
                id: Uuid::new_v4(),
                file_path: file.file_path,
                file_name: file.file_name,
                content_type: file.content_type,
                file_size: file.file_size,
                category_id: file.category_id,
                folder_id: file.folder_id,
                url: file.url,
                upload_date: Utc::now(),
                uploaded_by: file.uploaded_by,
                is_deleted: false,
                access_count: 0,
                last_access_date: None,
            };
            self.state().files.push(row.clone());
            Ok(row)
        }

        async fn find_file_by_url(&self, url: &str) -> Result<Option<FileMetadata>, CdnError> {
            self.check()?;
            Ok(self.state().files.iter().rev().find(|f| !f.is_deleted && f.url == url).cloned())
        }

        async fn find_file_by_url_suffix(&self, suffix: &str) -> Result<Option<FileMetadata>, CdnError> {
            self.check()?;
            Ok(self.state().files.iter().rev().find(|f| !f.is_deleted && f.url.ends_with(suffix)).cloned())
        }

        async fn update_file(&self, file: &FileMetadata) -> Result<(), CdnError> {
            self.check()?;
            let mut state = self.state();
            match state.files.iter_mut().find(|f| f.id == file.id) {
                Some(row) => {
                    *row = file.clone();
                    Ok(())
                }
                None => Err(CdnError::NotFound(format!("file metadata {}", file.id))),
            }
        }

        async fn list_files(&self, query: &FileQuery) -> Result<Vec<FileMetadata>, CdnError> {
            self.check()?;
            let needle = query.search.as_deref().map(str::to_lowercase);
            let mut files: Vec<FileMetadata> = self
                .state()
                .files
                .iter()
                .filter(|f| !f.is_deleted && f.category_id == query.category_id)
                .filter(|f| match query.folder {
                    FolderFilter::Any => true,
                    FolderFilter::Root => f.folder_id.is_none(),
                    FolderFilter::Folder(id) => f.folder_id == Some(id),
                })
                .filter(|f| needle.as_deref().map_or(true, |n| f.file_name.to_lowercase().contains(n)))
                .cloned()
                .collect();
            files.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
            Ok(files)
        }

        async fn add_usage(&self, date: NaiveDate, category_id: Uuid, delta: UsageDelta) -> Result<(), CdnError> {
            self.check()?;
            self.state()
                .usage
                .entry((date, category_id))
                .or_insert_with(|| UsageStatistic::seeded(date, category_id))
                .apply(delta);
            Ok(())
        }
    }
}
