//! Environment/runtime helpers
//!
//! Sanity checks to ensure the storage directories exist at startup.

use std::path::Path;
use tracing::warn;

/// Ensure the storage root exists; warn when the dev fallback root is missing.
pub async fn ensure_storage_dirs(storage_root: &Path, fallback_root: Option<&Path>) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(storage_root)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", storage_root.display()))?;
    if let Some(fallback) = fallback_root {
        if tokio::fs::metadata(fallback).await.is_err() {
            warn!(fallback_root = %fallback.display(), "local fallback root not found; dev-mode lookups will miss");
        }
    }
    Ok(())
}
