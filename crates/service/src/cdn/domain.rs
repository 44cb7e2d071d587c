//! Business view of the CDN records, independent of the persistence layer.

use chrono::{DateTime, NaiveDate, Utc};
use configs::CdnSettings;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Storage settings the engine runs on. Replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfiguration {
    pub base_url: String,
    pub storage_path: String,
    pub api_key: String,
    pub max_file_size_mb: u64,
    pub allowed_file_types: String,
    pub enforce_authentication: bool,
    pub allow_direct_access: bool,
    pub enable_caching: bool,
    pub is_active: bool,
}

impl StorageConfiguration {
    /// Process-constant fallback used until (and whenever) the persisted row is unavailable.
    pub fn bootstrap(settings: &CdnSettings) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            storage_path: settings.storage_path.clone(),
            api_key: settings.api_key.clone(),
            max_file_size_mb: settings.max_file_size_mb,
            allowed_file_types: settings.allowed_file_types.clone(),
            enforce_authentication: settings.enforce_authentication,
            allow_direct_access: settings.allow_direct_access,
            enable_caching: settings.enable_caching,
            is_active: true,
        }
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub allowed_file_types: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: Uuid,
    pub name: String,
    pub path: String,
    pub parent_id: Option<Uuid>,
    pub category_id: Uuid,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub id: Uuid,
    pub file_path: String,
    pub file_name: String,
    pub content_type: String,
    pub file_size: u64,
    pub category_id: Uuid,
    pub folder_id: Option<Uuid>,
    pub url: String,
    pub upload_date: DateTime<Utc>,
    pub uploaded_by: String,
    pub is_deleted: bool,
    pub access_count: u64,
    pub last_access_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewFileMetadata {
    pub file_path: String,
    pub file_name: String,
    pub content_type: String,
    pub file_size: u64,
    pub category_id: Uuid,
    pub folder_id: Option<Uuid>,
    pub url: String,
    pub uploaded_by: String,
}

/// Folder restriction for file listings.
///
/// `Root` only matches files stored directly under the category (no folder),
/// `Any` matches every folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderFilter {
    Any,
    Root,
    Folder(Uuid),
}

#[derive(Debug, Clone)]
pub struct FileQuery {
    pub category_id: Uuid,
    pub folder: FolderFilter,
    pub search: Option<String>,
}

/// Counter deltas for one (day, category) usage row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageDelta {
    pub file_count: i64,
    pub storage_used_bytes: i64,
    pub upload_count: i64,
    pub download_count: i64,
    pub delete_count: i64,
}

impl UsageDelta {
    pub fn upload(bytes: u64) -> Self {
        Self { file_count: 1, storage_used_bytes: bytes as i64, upload_count: 1, ..Self::default() }
    }

    pub fn delete(bytes: u64) -> Self {
        Self { file_count: -1, storage_used_bytes: -(bytes as i64), delete_count: 1, ..Self::default() }
    }

    pub fn download() -> Self {
        Self { download_count: 1, ..Self::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStatistic {
    pub date: NaiveDate,
    pub category_id: Uuid,
    pub file_count: i64,
    pub storage_used_bytes: i64,
    pub upload_count: i64,
    pub download_count: i64,
    pub delete_count: i64,
}

impl UsageStatistic {
    pub fn seeded(date: NaiveDate, category_id: Uuid) -> Self {
        Self { date, category_id, file_count: 0, storage_used_bytes: 0, upload_count: 0, download_count: 0, delete_count: 0 }
    }

    pub fn apply(&mut self, delta: UsageDelta) {
        self.file_count += delta.file_count;
        self.storage_used_bytes += delta.storage_used_bytes;
        self.upload_count += delta.upload_count;
        self.download_count += delta.download_count;
        self.delete_count += delta.delete_count;
    }
}

/// Parse a comma list such as `".pdf, PNG,*"` into lowercase dotted extensions.
pub fn parse_file_types(list: &str) -> Vec<String> {
    list.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .map(|t| if t == "*" || t.starts_with('.') { t } else { format!(".{t}") })
        .collect()
}

/// An empty list or a `*` entry allows every extension.
pub fn allows_extension(list: &str, extension: &str) -> bool {
    let types = parse_file_types(list);
    if types.is_empty() || types.iter().any(|t| t == "*") {
        return true;
    }
    let ext = extension.to_lowercase();
    types.iter().any(|t| *t == ext)
}
