//! Physical file I/O behind a trait so tests can inject locks and permission failures.

use async_trait::async_trait;
use std::io;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufWriter};

pub type FileReader = Box<dyn AsyncRead + Send + Unpin>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

#[async_trait]
pub trait StorageFs: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    /// Stream `reader` into a new file through a `buffer_size` write buffer.
    ///
    /// Reads at most `max_bytes + 1` bytes so callers can detect oversized input
    /// without consuming an unbounded stream. Returns the bytes written.
    async fn write_stream(
        &self,
        path: &Path,
        reader: &mut (dyn AsyncRead + Unpin + Send),
        buffer_size: usize,
        max_bytes: u64,
    ) -> io::Result<u64>;
    async fn open_read(&self, path: &Path) -> io::Result<FileReader>;
    /// Open with the requested access and close again, surfacing lock and permission problems early.
    async fn verify_access(&self, path: &Path, mode: AccessMode) -> io::Result<()>;
    async fn remove_file(&self, path: &Path) -> io::Result<()>;
    async fn clear_readonly(&self, path: &Path) -> io::Result<()>;
    /// Fails with `AlreadyExists` rather than replacing `to`.
    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;
    /// Fails with `AlreadyExists` rather than replacing `to`.
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    async fn file_len(&self, path: &Path) -> io::Result<u64>;
}

/// Local filesystem via `tokio::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

#[async_trait]
impl StorageFs for LocalFs {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn write_stream(
        &self,
        path: &Path,
        reader: &mut (dyn AsyncRead + Unpin + Send),
        buffer_size: usize,
        max_bytes: u64,
    ) -> io::Result<u64> {
        let file = tokio::fs::OpenOptions::new().write(true).create_new(true).open(path).await?;
        let mut writer = BufWriter::with_capacity(buffer_size, file);
        let mut limited = (&mut *reader).take(max_bytes.saturating_add(1));
        let written = tokio::io::copy(&mut limited, &mut writer).await?;
        writer.flush().await?;
        writer.get_mut().sync_data().await?;
        Ok(written)
    }

    async fn open_read(&self, path: &Path) -> io::Result<FileReader> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Box::new(file))
    }

    async fn verify_access(&self, path: &Path, mode: AccessMode) -> io::Result<()> {
        let file = match mode {
            AccessMode::Read => tokio::fs::File::open(path).await?,
            AccessMode::Write => tokio::fs::OpenOptions::new().write(true).open(path).await?,
        };
        drop(file);
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    async fn clear_readonly(&self, path: &Path) -> io::Result<()> {
        let mut perms = tokio::fs::metadata(path).await?.permissions();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            perms.set_mode(perms.mode() | 0o200);
        }
        #[cfg(not(unix))]
        perms.set_readonly(false);
        tokio::fs::set_permissions(path, perms).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        let mut source = tokio::fs::File::open(from).await?;
        let mut target = tokio::fs::OpenOptions::new().write(true).create_new(true).open(to).await?;
        let copied = match tokio::io::copy(&mut source, &mut target).await {
            Ok(n) => n,
            Err(e) => {
                drop(target);
                let _ = tokio::fs::remove_file(to).await;
                return Err(e);
            }
        };
        target.sync_data().await?;
        Ok(copied)
    }

    /// `rename(2)` replaces an existing target, so link then unlink instead.
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        tokio::fs::hard_link(from, to).await?;
        if let Err(e) = tokio::fs::remove_file(from).await {
            let _ = tokio::fs::remove_file(to).await;
            return Err(e);
        }
        Ok(())
    }

    async fn file_len(&self, path: &Path) -> io::Result<u64> {
        Ok(tokio::fs::metadata(path).await?.len())
    }
}
