#![cfg(test)]
use sea_orm::DatabaseConnection;
use tokio::sync::OnceCell;
use migration::MigratorTrait;
use models::db::connect_with_config;
use configs::DatabaseConfig;

// Ensure migrations run only once across the entire test process
static MIGRATED: OnceCell<bool> = OnceCell::const_new();

/// Connected and migrated database, or `None` when unavailable or `SKIP_DB_TESTS` is set.
pub async fn get_db() -> Option<DatabaseConnection> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return None;
    }
    let mut cfg = DatabaseConfig::default();
    cfg.normalize_from_env();
    cfg.min_connections = 1;
    cfg.connect_timeout_secs = 5;
    cfg.acquire_timeout_secs = 5;

    let migrated = *MIGRATED
        .get_or_init(|| async {
            // Run migrations exactly once, with a throwaway connection
            match connect_with_config(&cfg).await {
                Ok(db) => migration::Migrator::up(&db, None).await.is_ok(),
                Err(e) => {
                    eprintln!("skip: cannot connect to db: {}", e);
                    false
                }
            }
        })
        .await;
    if !migrated {
        return None;
    }
    connect_with_config(&cfg).await.ok()
}
