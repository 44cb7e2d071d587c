//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` to keep binary crates importing
//! `service::runtime::ensure_storage_dirs` without depending directly on `common`.

use configs::CdnSettings;
use std::path::Path;

/// Ensure the storage root exists; warn when the dev fallback root is missing.
pub async fn ensure_storage_dirs(settings: &CdnSettings) -> anyhow::Result<()> {
    let fallback = settings.dev_mode.then(|| Path::new(&settings.local_fallback_root));
    common::env::ensure_storage_dirs(Path::new(&settings.storage_path), fallback).await
}
