//! Storage configuration and category snapshots with TTL refresh.
//!
//! The manager never leaves the engine without a usable configuration: until the
//! first successful load, and whenever the store has no active row, the bootstrap
//! configuration from `CdnSettings` is authoritative. A failed refresh keeps the
//! previous snapshot.

use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{DateTime, Duration, Utc};
use configs::CdnSettings;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::clock::Clock;
use super::domain::{Category, StorageConfiguration};
use super::fs::StorageFs;
use super::repository::CdnRepository;

pub const DEFAULT_CATEGORY: &str = "documents";

/// Names always recognised by path resolution, persisted or not.
pub const STANDARD_CATEGORIES: &[&str] = &["documents", "images", "videos", "reports", "test-uploads"];

/// Seeded when the store has no categories at all. Empty file-type lists inherit the configuration's.
const SEED_CATEGORIES: &[(&str, &str)] = &[("documents", "Documents"), ("images", "Images"), ("test-uploads", "Test Uploads")];

struct ConfigSnapshot {
    config: Arc<StorageConfiguration>,
    refreshed_at: Option<DateTime<Utc>>,
}

struct CategorySnapshot {
    categories: Arc<Vec<Category>>,
    loaded_at: DateTime<Utc>,
}

pub struct ConfigManager<R> {
    repo: Arc<R>,
    fs: Arc<dyn StorageFs>,
    clock: Arc<dyn Clock>,
    bootstrap: Arc<StorageConfiguration>,
    refresh_interval: Duration,
    category_ttl: Duration,
    config: ArcSwap<ConfigSnapshot>,
    categories: ArcSwapOption<CategorySnapshot>,
}

impl<R: CdnRepository> ConfigManager<R> {
    pub fn new(repo: Arc<R>, fs: Arc<dyn StorageFs>, clock: Arc<dyn Clock>, settings: &CdnSettings) -> Self {
        let bootstrap = Arc::new(StorageConfiguration::bootstrap(settings));
        Self {
            repo,
            fs,
            clock,
            refresh_interval: Duration::seconds(settings.config_refresh_secs as i64),
            category_ttl: Duration::seconds(settings.category_cache_secs as i64),
            config: ArcSwap::from_pointee(ConfigSnapshot { config: bootstrap.clone(), refreshed_at: None }),
            categories: ArcSwapOption::empty(),
            bootstrap,
        }
    }

    pub fn bootstrap(&self) -> &StorageConfiguration {
        &self.bootstrap
    }

    /// Current configuration, reloaded when none was loaded yet or the refresh interval elapsed.
    pub async fn get_config(&self) -> Arc<StorageConfiguration> {
        let now = self.clock.now();
        let current = self.config.load_full();
        let due = current.refreshed_at.map_or(true, |at| now > at + self.refresh_interval);
        if !due {
            return current.config.clone();
        }

        match self.repo.load_active_config().await {
            Ok(Some(loaded)) => {
                info!(base_url = %loaded.base_url, storage_path = %loaded.storage_path, "storage configuration refreshed");
                let config = Arc::new(loaded);
                self.config.store(Arc::new(ConfigSnapshot { config: config.clone(), refreshed_at: Some(now) }));
                self.ensure_directories(&config).await;
                config
            }
            Ok(None) => {
                warn!("no active storage configuration; using bootstrap defaults");
                let config = self.bootstrap.clone();
                self.config.store(Arc::new(ConfigSnapshot { config: config.clone(), refreshed_at: Some(now) }));
                self.ensure_directories(&config).await;
                config
            }
            Err(e) => {
                // keep serving the previous snapshot until the next interval
                error!(error = %e, "storage configuration refresh failed; keeping previous configuration");
                let config = current.config.clone();
                self.config.store(Arc::new(ConfigSnapshot { config: config.clone(), refreshed_at: Some(now) }));
                config
            }
        }
    }

    /// Active categories, cached for the category TTL. Never empty.
    pub async fn get_categories(&self) -> Arc<Vec<Category>> {
        let now = self.clock.now();
        let previous = self.categories.load_full();
        if let Some(snap) = previous.as_ref() {
            if now < snap.loaded_at + self.category_ttl {
                return snap.categories.clone();
            }
        }

        let categories = match self.repo.list_categories().await {
            Ok(found) if !found.is_empty() => {
                debug!(count = found.len(), "categories loaded");
                Arc::new(found)
            }
            Ok(_) => Arc::new(self.seed_defaults().await),
            Err(e) => {
                warn!(error = %e, "category load failed");
                match previous {
                    Some(snap) => snap.categories.clone(),
                    None => Arc::new(SEED_CATEGORIES.iter().map(|(n, d)| transient_category(n, d)).collect()),
                }
            }
        };
        self.categories.store(Some(Arc::new(CategorySnapshot { categories: categories.clone(), loaded_at: now })));
        categories
    }

    pub fn invalidate_categories(&self) {
        self.categories.store(None);
    }

    /// Persisted category names plus the standard ones, lowercase, deduplicated.
    pub async fn category_names(&self) -> Vec<String> {
        let mut names: Vec<String> = STANDARD_CATEGORIES.iter().map(|s| s.to_string()).collect();
        for c in self.get_categories().await.iter() {
            if !names.contains(&c.name) {
                names.push(c.name.clone());
            }
        }
        names
    }

    /// Create the storage root and one directory per category. Idempotent; failures are logged.
    pub async fn ensure_category_directories(&self) {
        let config = self.get_config().await;
        self.ensure_directories(&config).await;
    }

    async fn ensure_directories(&self, config: &StorageConfiguration) {
        let root = PathBuf::from(&config.storage_path);
        if let Err(e) = self.fs.create_dir_all(&root).await {
            warn!(path = %root.display(), error = %e, "cannot create storage root");
            return;
        }
        for category in self.get_categories().await.iter() {
            let dir = root.join(&category.name);
            if let Err(e) = self.fs.create_dir_all(&dir).await {
                warn!(path = %dir.display(), error = %e, "cannot create category directory");
            }
        }
    }

    async fn seed_defaults(&self) -> Vec<Category> {
        let mut seeded = Vec::with_capacity(SEED_CATEGORIES.len());
        for (name, display) in SEED_CATEGORIES {
            match self.repo.create_category(name, display, "").await {
                Ok(c) => seeded.push(c),
                Err(e) => {
                    warn!(category = %name, error = %e, "cannot persist default category");
                    match self.repo.find_category(name).await {
                        Ok(Some(c)) => seeded.push(c),
                        _ => seeded.push(transient_category(name, display)),
                    }
                }
            }
        }
        info!(count = seeded.len(), "seeded default categories");
        seeded
    }
}

fn transient_category(name: &str, display: &str) -> Category {
    Category {
        id: Uuid::new_v4(),
        name: name.to_string(),
        display_name: display.to_string(),
        allowed_file_types: String::new(),
        is_active: true,
    }
}
