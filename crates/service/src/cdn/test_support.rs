//! Fixtures for CDN unit tests: fault-injecting filesystem and a wired service.

use async_trait::async_trait;
use configs::CdnSettings;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncRead;

use super::clock::ManualClock;
use super::fs::{AccessMode, FileReader, LocalFs, StorageFs};
use super::repository::mock::MockCdnRepository;
use super::service::CdnService;

pub(crate) const BASE_URL: &str = "https://cdn.example.com";

/// `LocalFs` with injectable failures and call counters.
pub(crate) struct FlakyFs {
    inner: LocalFs,
    remove_failures: AtomicU32,
    remove_failure_kind: Mutex<io::ErrorKind>,
    deny_write_access: AtomicBool,
    rename_unsupported: AtomicBool,
    squatter: Mutex<Option<Vec<u8>>>,
    pub remove_calls: AtomicU32,
    pub rename_calls: AtomicU32,
    pub copy_calls: AtomicU32,
}

impl FlakyFs {
    pub fn new() -> Self {
        Self {
            inner: LocalFs,
            remove_failures: AtomicU32::new(0),
            remove_failure_kind: Mutex::new(io::ErrorKind::Other),
            deny_write_access: AtomicBool::new(false),
            rename_unsupported: AtomicBool::new(false),
            squatter: Mutex::new(None),
            remove_calls: AtomicU32::new(0),
            rename_calls: AtomicU32::new(0),
            copy_calls: AtomicU32::new(0),
        }
    }

    /// The next `times` removals fail with `kind`.
    pub fn fail_removes(&self, times: u32, kind: io::ErrorKind) {
        *self.remove_failure_kind.lock().unwrap() = kind;
        self.remove_failures.store(times, Ordering::SeqCst);
    }

    pub fn deny_write_access(&self, deny: bool) {
        self.deny_write_access.store(deny, Ordering::SeqCst);
    }

    /// Make `rename` fail like a cross-device move.
    pub fn rename_unsupported(&self, unsupported: bool) {
        self.rename_unsupported.store(unsupported, Ordering::SeqCst);
    }

    /// The next rename finds `contents` already written at its destination.
    pub fn occupy_rename_target(&self, contents: &[u8]) {
        *self.squatter.lock().unwrap() = Some(contents.to_vec());
    }

    pub fn removes(&self) -> u32 {
        self.remove_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageFs for FlakyFs {
    async fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path).await
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.inner.create_dir_all(path).await
    }

    async fn write_stream(
        &self,
        path: &Path,
        reader: &mut (dyn AsyncRead + Unpin + Send),
        buffer_size: usize,
        max_bytes: u64,
    ) -> io::Result<u64> {
        self.inner.write_stream(path, reader, buffer_size, max_bytes).await
    }

    async fn open_read(&self, path: &Path) -> io::Result<FileReader> {
        self.inner.open_read(path).await
    }

    async fn verify_access(&self, path: &Path, mode: AccessMode) -> io::Result<()> {
        if mode == AccessMode::Write && self.deny_write_access.load(Ordering::SeqCst) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        self.inner.verify_access(path, mode).await
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        let pending = self.remove_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.remove_failures.store(pending - 1, Ordering::SeqCst);
            let kind = *self.remove_failure_kind.lock().unwrap();
            return Err(io::Error::new(kind, "simulated lock"));
        }
        self.inner.remove_file(path).await
    }

    async fn clear_readonly(&self, path: &Path) -> io::Result<()> {
        self.inner.clear_readonly(path).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        self.copy_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.copy(from, to).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.rename_calls.fetch_add(1, Ordering::SeqCst);
        let squatter = self.squatter.lock().unwrap().take();
        if let Some(contents) = squatter {
            tokio::fs::write(to, contents).await?;
        }
        if self.rename_unsupported.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "cross-device link"));
        }
        self.inner.rename(from, to).await
    }

    async fn file_len(&self, path: &Path) -> io::Result<u64> {
        self.inner.file_len(path).await
    }
}

pub(crate) fn settings(root: &Path) -> CdnSettings {
    let mut s = CdnSettings {
        base_url: BASE_URL.into(),
        storage_path: root.display().to_string(),
        ..CdnSettings::default()
    };
    s.retry.delay_ms = 1;
    s
}

pub(crate) struct TestCdn {
    pub service: CdnService<MockCdnRepository>,
    pub repo: Arc<MockCdnRepository>,
    pub fs: Arc<FlakyFs>,
    pub clock: Arc<ManualClock>,
    pub root: PathBuf,
}

impl Drop for TestCdn {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

pub(crate) fn test_cdn() -> TestCdn {
    test_cdn_with(|_| {})
}

pub(crate) fn test_cdn_with(adjust: impl FnOnce(&mut CdnSettings)) -> TestCdn {
    let root = std::env::temp_dir().join(format!("cdn_svc_{}", uuid::Uuid::new_v4()));
    let mut s = settings(&root);
    adjust(&mut s);
    let repo = Arc::new(MockCdnRepository::new());
    let fs = Arc::new(FlakyFs::new());
    let clock = Arc::new(ManualClock::default());
    let service = CdnService::with_parts(repo.clone(), fs.clone(), clock.clone(), s);
    TestCdn { service, repo, fs, clock, root }
}
