//! CDN storage settings.
//!
//! These values double as the bootstrap storage configuration: whenever the
//! persisted configuration row is missing or cannot be loaded, the engine runs
//! on what is declared here (or on the defaults below).

use anyhow::{anyhow, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CdnSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    #[serde(default = "default_allowed_file_types")]
    pub allowed_file_types: String,
    #[serde(default)]
    pub enforce_authentication: bool,
    #[serde(default = "default_true")]
    pub allow_direct_access: bool,
    #[serde(default = "default_true")]
    pub enable_caching: bool,
    /// Local/dev mode: `/cdn/...` URLs are accepted and files missing from the
    /// storage root are looked up under `local_fallback_root`.
    #[serde(default)]
    pub dev_mode: bool,
    #[serde(default = "default_local_fallback_root")]
    pub local_fallback_root: String,
    #[serde(default = "default_local_url_prefixes")]
    pub local_url_prefixes: Vec<String>,
    #[serde(default = "default_config_refresh_secs")]
    pub config_refresh_secs: u64,
    #[serde(default = "default_category_cache_secs")]
    pub category_cache_secs: u64,
    #[serde(default = "default_resolution_cache_secs")]
    pub resolution_cache_secs: u64,
    #[serde(default = "default_write_buffer_bytes")]
    pub write_buffer_bytes: usize,
    #[serde(default)]
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_attempts: default_max_attempts(), delay_ms: default_delay_ms() }
    }
}

impl Default for CdnSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            storage_path: default_storage_path(),
            api_key: String::new(),
            max_file_size_mb: default_max_file_size_mb(),
            allowed_file_types: default_allowed_file_types(),
            enforce_authentication: false,
            allow_direct_access: true,
            enable_caching: true,
            dev_mode: false,
            local_fallback_root: default_local_fallback_root(),
            local_url_prefixes: default_local_url_prefixes(),
            config_refresh_secs: default_config_refresh_secs(),
            category_cache_secs: default_category_cache_secs(),
            resolution_cache_secs: default_resolution_cache_secs(),
            write_buffer_bytes: default_write_buffer_bytes(),
            retry: RetrySettings::default(),
        }
    }
}

fn default_base_url() -> String { "http://localhost:5000/cdn".into() }
fn default_storage_path() -> String { "data/cdn".into() }
fn default_max_file_size_mb() -> u64 { 100 }
fn default_allowed_file_types() -> String {
    ".pdf,.doc,.docx,.xls,.xlsx,.csv,.txt,.jpg,.jpeg,.png,.gif,.webp,.zip".into()
}
fn default_true() -> bool { true }
fn default_local_fallback_root() -> String { "wwwroot/cdn".into() }
fn default_local_url_prefixes() -> Vec<String> { vec!["/cdn/".into()] }
fn default_config_refresh_secs() -> u64 { 300 }
fn default_category_cache_secs() -> u64 { 900 }
fn default_resolution_cache_secs() -> u64 { 900 }
fn default_write_buffer_bytes() -> usize { 256 * 1024 }
fn default_max_attempts() -> u32 { 3 }
fn default_delay_ms() -> u64 { 500 }

impl CdnSettings {
    pub fn normalize_and_validate(&mut self) -> Result<()> {
        let trimmed = self.base_url.trim().trim_end_matches('/').to_string();
        if trimmed.is_empty() {
            return Err(anyhow!("cdn.base_url must not be empty"));
        }
        self.base_url = trimmed;
        if self.storage_path.trim().is_empty() {
            self.storage_path = default_storage_path();
        }
        for prefix in &mut self.local_url_prefixes {
            if !prefix.ends_with('/') {
                prefix.push('/');
            }
        }
        self.local_url_prefixes.retain(|p| p != "/");
        if self.retry.max_attempts == 0 {
            return Err(anyhow!("cdn.retry.max_attempts must be >= 1"));
        }
        if self.write_buffer_bytes == 0 {
            self.write_buffer_bytes = default_write_buffer_bytes();
        }
        Ok(())
    }
}
