use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Duration;
use configs::CdnSettings;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::cache::ResolutionCache;
use super::clock::{Clock, SystemClock};
use super::config_manager::{ConfigManager, DEFAULT_CATEGORY};
use super::domain::{Category, Folder, StorageConfiguration};
use super::errors::CdnError;
use super::executor::FileOperationExecutor;
use super::fs::{LocalFs, StorageFs};
use super::naming::clean_folder_path;
use super::repository::CdnRepository;
use super::resolver::{self, PathResolver, ResolvedPath};
use super::retry::RetryPolicy;

/// CDN storage engine. Construct once per process and share behind an `Arc`.
pub struct CdnService<R: CdnRepository> {
    pub(super) repo: Arc<R>,
    pub(super) fs: Arc<dyn StorageFs>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) settings: CdnSettings,
    pub(super) config: ConfigManager<R>,
    pub(super) cache: ResolutionCache,
    pub(super) executor: FileOperationExecutor,
    resolutions: AtomicU64,
}

impl<R: CdnRepository> CdnService<R> {
    /// Local filesystem and wall clock.
    pub fn new(repo: Arc<R>, settings: CdnSettings) -> Self {
        Self::with_parts(repo, Arc::new(LocalFs), Arc::new(SystemClock), settings)
    }

    pub fn with_parts(repo: Arc<R>, fs: Arc<dyn StorageFs>, clock: Arc<dyn Clock>, settings: CdnSettings) -> Self {
        let config = ConfigManager::new(repo.clone(), fs.clone(), clock.clone(), &settings);
        let cache = ResolutionCache::new(Duration::seconds(settings.resolution_cache_secs as i64));
        let executor = FileOperationExecutor::new(RetryPolicy::from_settings(&settings.retry));
        Self { repo, fs, clock, settings, config, cache, executor, resolutions: AtomicU64::new(0) }
    }

    pub fn config(&self) -> &ConfigManager<R> {
        &self.config
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Full (uncached) path resolutions performed so far.
    pub fn resolution_count(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    pub async fn list_categories(&self) -> Vec<Category> {
        self.config.get_categories().await.as_ref().clone()
    }

    /// Canonical category name, or the default category when missing or unknown.
    pub async fn resolve_category(&self, name: Option<&str>) -> String {
        let key = match name.map(|n| n.trim().to_lowercase()).filter(|n| !n.is_empty()) {
            Some(k) => k,
            None => return DEFAULT_CATEGORY.to_string(),
        };
        if self.config.category_names().await.contains(&key) {
            key
        } else {
            debug!(category = %key, "unknown category; using default");
            DEFAULT_CATEGORY.to_string()
        }
    }

    pub async fn get_category_id(&self, name: &str) -> Result<Option<Uuid>, CdnError> {
        let key = name.trim().to_lowercase();
        if let Some(c) = self.config.get_categories().await.iter().find(|c| c.name == key) {
            return Ok(Some(c.id));
        }
        Ok(self.repo.find_category(&key).await?.map(|c| c.id))
    }

    /// Persisted category row for `name`, created lazily when missing.
    pub(super) async fn ensure_category(&self, name: &str) -> Result<Category, CdnError> {
        if let Some(c) = self.repo.find_category(name).await? {
            return Ok(c);
        }
        let created = match self.repo.create_category(name, &display_name(name), "").await {
            Ok(c) => c,
            Err(CdnError::Conflict(_)) => self
                .repo
                .find_category(name)
                .await?
                .ok_or_else(|| CdnError::NotFound(format!("category {name}")))?,
            Err(e) => return Err(e),
        };
        info!(category = %created.name, "category_created");
        self.config.invalidate_categories();
        Ok(created)
    }

    /// Folders of a category ordered by path; empty for unknown categories.
    pub async fn list_folders(&self, category: &str) -> Result<Vec<Folder>, CdnError> {
        match self.get_category_id(category).await? {
            Some(id) => self.repo.list_folders(id).await,
            None => Ok(Vec::new()),
        }
    }

    /// Walk `folder_path` one segment at a time, reusing or creating a row per prefix.
    /// Returns the deepest folder, or `None` for the category root.
    #[instrument(skip(self))]
    pub async fn get_or_create_folder(&self, category: &str, folder_path: &str) -> Result<Option<Folder>, CdnError> {
        let path = clean_folder_path(folder_path);
        if path.is_empty() {
            return Ok(None);
        }
        let category = self.ensure_category(&self.resolve_category(Some(category)).await).await?;

        let mut parent: Option<Folder> = None;
        let mut current = String::new();
        for segment in path.split('/') {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);

            let folder = match self.repo.find_folder(category.id, &current).await? {
                Some(f) => f,
                None => match self.repo.create_folder(category.id, parent.as_ref().map(|p| p.id), segment, &current).await {
                    Ok(f) => {
                        debug!(category = %category.name, path = %current, "folder_created");
                        f
                    }
                    // lost a race with a concurrent upload
                    Err(CdnError::Conflict(_)) => self
                        .repo
                        .find_folder(category.id, &current)
                        .await?
                        .ok_or_else(|| CdnError::NotFound(format!("folder {current}")))?,
                    Err(e) => return Err(e),
                },
            };
            parent = Some(folder);
        }
        Ok(parent)
    }

    /// Resolve against the primary storage root, without the cache.
    pub async fn resolve(&self, url: &str) -> Result<ResolvedPath, CdnError> {
        let config = self.config.get_config().await;
        self.resolve_with(&config, url).await
    }

    /// Physical path for a logical URL, cache-accelerated.
    ///
    /// In dev mode a file missing under the storage root is looked up under the
    /// local fallback root.
    pub async fn get_physical_path(&self, url: &str) -> Result<PathBuf, CdnError> {
        let config = self.config.get_config().await;
        let now = self.clock.now();
        if config.enable_caching {
            if let Some(hit) = self.cache.get(url, now) {
                return Ok(hit);
            }
        }

        self.resolutions.fetch_add(1, Ordering::Relaxed);
        let resolved = self.resolve_with(&config, url).await?;
        let physical = self.effective_path(&resolved).await;
        if config.enable_caching {
            self.cache.put(url, physical.clone(), now);
        }
        Ok(physical)
    }

    pub async fn build_url(&self, category: &str, file_name: &str, folder_path: Option<&str>) -> String {
        let config = self.config.get_config().await;
        resolver::build_url(&config.base_url, category, file_name, folder_path)
    }

    /// Configured API key, else the bootstrap one.
    pub async fn get_api_key(&self) -> String {
        let config = self.config.get_config().await;
        if config.api_key.is_empty() {
            self.config.bootstrap().api_key.clone()
        } else {
            config.api_key.clone()
        }
    }

    async fn resolve_with(&self, config: &StorageConfiguration, url: &str) -> Result<ResolvedPath, CdnError> {
        let names = self.config.category_names().await;
        let prefixes: &[String] = if self.settings.dev_mode { &self.settings.local_url_prefixes } else { &[] };
        PathResolver::new(&config.base_url, Path::new(&config.storage_path), &names, prefixes).resolve(url)
    }

    async fn effective_path(&self, resolved: &ResolvedPath) -> PathBuf {
        if self.settings.dev_mode && !self.fs.exists(&resolved.physical).await {
            let fallback = resolver::physical_path(Path::new(&self.settings.local_fallback_root), &resolved.relative);
            if self.fs.exists(&fallback).await {
                debug!(path = %fallback.display(), "using local fallback root");
                return fallback;
            }
        }
        resolved.physical.clone()
    }
}

/// Run a bookkeeping step whose failure must not fail the primary operation.
pub(super) async fn best_effort<T>(step: &str, fut: impl Future<Output = Result<T, CdnError>>) -> Option<T> {
    match fut.await {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(step, error = %e, "bookkeeping failed; continuing");
            None
        }
    }
}

fn display_name(name: &str) -> String {
    name.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdn::test_support::test_cdn;

    #[test]
    fn display_names() {
        assert_eq!(display_name("test-uploads"), "Test Uploads");
        assert_eq!(display_name("documents"), "Documents");
    }

    #[tokio::test]
    async fn unknown_categories_fall_back_to_documents() {
        let t = test_cdn();
        assert_eq!(t.service.resolve_category(None).await, "documents");
        assert_eq!(t.service.resolve_category(Some("  ")).await, "documents");
        assert_eq!(t.service.resolve_category(Some("Images")).await, "images");
        assert_eq!(t.service.resolve_category(Some("reports")).await, "reports");
        assert_eq!(t.service.resolve_category(Some("secret-stash")).await, "documents");
    }

    #[tokio::test]
    async fn folder_chain_is_created_once() -> anyhow::Result<()> {
        let t = test_cdn();
        let leaf = t.service.get_or_create_folder("documents", "2024/january").await?.expect("folder");
        assert_eq!(leaf.path, "2024/january");

        let folders = t.repo.folders();
        assert_eq!(folders.len(), 2);
        let year = folders.iter().find(|f| f.path == "2024").expect("year row");
        assert_eq!(year.parent_id, None);
        assert_eq!(leaf.parent_id, Some(year.id));

        let documents = t.service.get_category_id("documents").await?.expect("documents id");
        assert!(folders.iter().all(|f| f.category_id == documents));

        // reuse on second walk, including through unclean input
        t.service.get_or_create_folder("documents", "/2024//january/../").await?;
        assert_eq!(t.repo.folders().len(), 2);
        let listed: Vec<String> = t.service.list_folders("documents").await?.into_iter().map(|f| f.path).collect();
        assert_eq!(listed, vec!["2024", "2024/january"]);

        assert!(t.service.get_or_create_folder("documents", "").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn lazily_creates_standard_category_rows() -> anyhow::Result<()> {
        let t = test_cdn();
        assert!(t.service.get_category_id("reports").await?.is_none());
        t.service.get_or_create_folder("reports", "q1").await?;
        assert!(t.service.get_category_id("reports").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn physical_path_is_cached_until_ttl_or_invalidate() -> anyhow::Result<()> {
        let t = test_cdn();
        let url = "https://cdn.example.com/documents/a.pdf";

        let first = t.service.get_physical_path(url).await?;
        assert_eq!(first, t.root.join("documents").join("a.pdf"));
        assert_eq!(t.service.resolution_count(), 1);

        t.service.get_physical_path(url).await?;
        assert_eq!(t.service.resolution_count(), 1, "second lookup must hit the cache");

        t.clock.advance(Duration::minutes(16));
        t.service.get_physical_path(url).await?;
        assert_eq!(t.service.resolution_count(), 2);

        assert!(t.service.cache().invalidate(url));
        t.service.get_physical_path(url).await?;
        assert_eq!(t.service.resolution_count(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn caching_can_be_disabled() -> anyhow::Result<()> {
        let t = crate::cdn::test_support::test_cdn_with(|s| s.enable_caching = false);
        let url = "https://cdn.example.com/documents/a.pdf";
        t.service.get_physical_path(url).await?;
        t.service.get_physical_path(url).await?;
        assert_eq!(t.service.resolution_count(), 2);
        assert!(t.service.cache().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn dev_mode_uses_fallback_root_for_missing_files() -> anyhow::Result<()> {
        let fallback = std::env::temp_dir().join(format!("cdn_fallback_{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(fallback.join("images")).await?;
        tokio::fs::write(fallback.join("images").join("logo.png"), b"png").await?;

        let fb = fallback.display().to_string();
        let t = crate::cdn::test_support::test_cdn_with(move |s| {
            s.dev_mode = true;
            s.local_fallback_root = fb;
        });
        let path = t.service.get_physical_path("/cdn/images/logo.png").await?;
        assert_eq!(path, fallback.join("images").join("logo.png"));

        // present under the primary root wins
        let primary = t.service.get_physical_path("/cdn/images/other.png").await?;
        assert_eq!(primary, t.root.join("images").join("other.png"));

        let _ = tokio::fs::remove_dir_all(&fallback).await;
        Ok(())
    }

    #[tokio::test]
    async fn api_key_prefers_stored_configuration() {
        let t = crate::cdn::test_support::test_cdn_with(|s| s.api_key = "bootstrap-key".into());
        assert_eq!(t.service.get_api_key().await, "bootstrap-key");

        let stored = StorageConfiguration { api_key: "stored-key".into(), ..t.service.config().bootstrap().clone() };
        t.repo.set_active_config(Some(stored));
        t.clock.advance(Duration::minutes(6));
        assert_eq!(t.service.get_api_key().await, "stored-key");
    }
}
