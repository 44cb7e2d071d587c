use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

pub mod cdn;

pub use cdn::{CdnSettings, RetrySettings};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cdn: CdnSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Like [`AppConfig::load_and_validate`], but a missing config file yields defaults.
    /// The database URL may still come from `DATABASE_URL`.
    pub fn load_or_default() -> Result<Self> {
        let mut cfg = load_default().unwrap_or_default();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.runtime.normalize();
        // 若 TOML 中未提供 URL，则尝试从环境变量填充
        self.database.normalize_from_env();
        self.database.validate()?;
        self.cdn.normalize_and_validate()?;
        Ok(())
    }
}

impl RuntimeConfig {
    fn normalize(&mut self) {
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
    }
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        if self.url.trim().is_empty() {
            if let Ok(url) = std::env::var("DATABASE_URL") {
                self.url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
            return Err(anyhow!("database.url must start with postgresql:// or postgres://"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = load_from_str("").unwrap();
        assert_eq!(cfg.database.max_connections, 10);
        assert_eq!(cfg.cdn.retry.max_attempts, 3);
        assert_eq!(cfg.cdn.retry.delay_ms, 500);
        assert_eq!(cfg.cdn.config_refresh_secs, 300);
    }

    #[test]
    fn rejects_non_postgres_url() {
        let mut db = DatabaseConfig { url: "mysql://localhost/x".into(), ..DatabaseConfig::default() };
        assert!(db.validate().is_err());
        db.url = "postgres://u:p@localhost/cdn".into();
        assert!(db.validate().is_ok());
    }

    #[test]
    fn cdn_section_overrides() {
        let cfg = load_from_str(
            r#"
            [database]
            url = "postgres://localhost/cdn"

            [cdn]
            base_url = "https://files.example.com/"
            storage_path = "/srv/cdn"
            dev_mode = true

            [cdn.retry]
            max_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.cdn.storage_path, "/srv/cdn");
        assert!(cfg.cdn.dev_mode);
        assert_eq!(cfg.cdn.retry.max_attempts, 5);
        assert_eq!(cfg.cdn.retry.delay_ms, 500);

        let mut cfg = cfg;
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.cdn.base_url, "https://files.example.com");
    }
}
