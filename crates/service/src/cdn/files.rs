//! Upload / delete / rename / list orchestration on top of the resolver and executor.
//!
//! Physical storage is the source of truth. Folder rows, file metadata and usage
//! counters are bookkeeping: their failures are logged and never undo a
//! successful physical operation.

use std::io;
use std::path::Path;

use tokio::io::AsyncRead;
use tracing::{info, instrument, warn};

use super::domain::{allows_extension, FileMetadata, FileQuery, FolderFilter, NewFileMetadata, UsageDelta};
use super::errors::CdnError;
use super::fs::{AccessMode, FileReader};
use super::naming::{clean_folder_path, file_name_only, sanitize_base_name, split_extension, unique_file_name};
use super::repository::CdnRepository;
use super::resolver::{self, physical_path, split_relative};
use super::service::{best_effort, CdnService};

/// Upload input besides the byte stream.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    /// Guessed from the extension when empty.
    pub content_type: String,
    /// Missing or unknown categories fall back to `documents`.
    pub category: Option<String>,
    pub folder_path: Option<String>,
    pub uploaded_by: String,
}

impl UploadRequest {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: String::new(),
            category: None,
            folder_path: None,
            uploaded_by: "system".into(),
        }
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn folder(mut self, folder_path: impl Into<String>) -> Self {
        self.folder_path = Some(folder_path.into());
        self
    }

    pub fn uploaded_by(mut self, user: impl Into<String>) -> Self {
        self.uploaded_by = user.into();
        self
    }
}

impl<R: CdnRepository> CdnService<R> {
    /// Store `stream` under a collision-proof name and return its logical URL.
    ///
    /// # Examples
    /// ```
    /// use service::cdn::{CdnService, UploadRequest, repository::mock::MockCdnRepository};
    /// use std::sync::Arc;
    /// let root = std::env::temp_dir().join(format!("cdn_doc_{}", uuid::Uuid::new_v4()));
    /// let settings = configs::CdnSettings {
    ///     base_url: "https://cdn.example.com".into(),
    ///     storage_path: root.display().to_string(),
    ///     ..Default::default()
    /// };
    /// let svc = CdnService::new(Arc::new(MockCdnRepository::default()), settings);
    /// let url = tokio_test::block_on(svc.upload_bytes(b"%PDF-1.7", UploadRequest::new("lease.pdf"))).unwrap();
    /// assert!(url.starts_with("https://cdn.example.com/documents/lease_"));
    /// assert!(url.ends_with(".pdf"));
    /// # let _ = std::fs::remove_dir_all(root);
    /// ```
    #[instrument(skip(self, stream, request), fields(file_name = %request.file_name))]
    pub async fn upload<S>(&self, stream: &mut S, request: UploadRequest) -> Result<String, CdnError>
    where
        S: AsyncRead + Unpin + Send,
    {
        let original = file_name_only(&request.file_name);
        if original.is_empty() {
            return Err(CdnError::Validation("file name required".into()));
        }
        let config = self.config.get_config().await;
        let category = self.resolve_category(request.category.as_deref()).await;
        let folder = clean_folder_path(request.folder_path.as_deref().unwrap_or(""));

        let (_, extension) = split_extension(original);
        let categories = self.config.get_categories().await;
        let allowed = categories
            .iter()
            .find(|c| c.name == category)
            .map(|c| c.allowed_file_types.as_str())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&config.allowed_file_types);
        if !allows_extension(allowed, &extension) {
            return Err(CdnError::Validation(format!("file type '{extension}' not allowed for {category}")));
        }

        let now = self.clock.now();
        let unique = unique_file_name(original, now);
        let dir_relative = [category.as_str(), folder.as_str()].iter().filter(|s| !s.is_empty()).copied().collect::<Vec<_>>().join("/");
        let dir = physical_path(Path::new(&config.storage_path), &dir_relative);
        self.fs.create_dir_all(&dir).await.map_err(|e| CdnError::io(format!("create {}", dir.display()), e))?;

        let target = dir.join(&unique);
        let max_bytes = config.max_file_size_bytes();
        let written = match self.fs.write_stream(&target, stream, self.settings.write_buffer_bytes, max_bytes).await {
            Ok(n) => n,
            Err(e) => {
                // a name clash means the file is not ours to clean up
                if e.kind() != io::ErrorKind::AlreadyExists {
                    let _ = self.fs.remove_file(&target).await;
                }
                return Err(match e.kind() {
                    io::ErrorKind::PermissionDenied => CdnError::PermissionDenied { operation: "upload".into(), path: target },
                    _ => CdnError::io(format!("write {}", target.display()), e),
                });
            }
        };
        if written > max_bytes {
            let _ = self.fs.remove_file(&target).await;
            return Err(CdnError::Validation(format!("file exceeds the {} MB limit", config.max_file_size_mb)));
        }

        let url = resolver::build_url(&config.base_url, &category, &unique, Some(&folder));
        let content_type = if request.content_type.trim().is_empty() {
            mime_guess::from_path(&unique).first_or_octet_stream().to_string()
        } else {
            request.content_type.clone()
        };
        self.record_upload(&category, &folder, &unique, &target, written, content_type, &url, &request.uploaded_by).await;

        if config.enable_caching {
            self.cache.put(&url, target, now);
        }
        info!(%url, category = %category, bytes = written, "file_uploaded");
        Ok(url)
    }

    /// [`upload`](Self::upload) over an in-memory buffer, as received from a multipart form.
    pub async fn upload_bytes(&self, bytes: &[u8], request: UploadRequest) -> Result<String, CdnError> {
        let mut reader = bytes;
        self.upload(&mut reader, request).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_upload(
        &self,
        category: &str,
        folder: &str,
        file_name: &str,
        target: &Path,
        size: u64,
        content_type: String,
        url: &str,
        uploaded_by: &str,
    ) {
        let Some(category_row) = best_effort("ensure category", self.ensure_category(category)).await else {
            return;
        };
        let folder_id = if folder.is_empty() {
            None
        } else {
            best_effort("create folder chain", self.get_or_create_folder(category, folder)).await.flatten().map(|f| f.id)
        };
        let metadata = NewFileMetadata {
            file_path: target.display().to_string(),
            file_name: file_name.to_string(),
            content_type,
            file_size: size,
            category_id: category_row.id,
            folder_id,
            url: url.to_string(),
            uploaded_by: uploaded_by.to_string(),
        };
        best_effort("persist file metadata", self.repo.create_file(metadata)).await;
        let today = self.clock.now().date_naive();
        best_effort("record upload usage", self.repo.add_usage(today, category_row.id, UsageDelta::upload(size))).await;
    }

    /// Delete the file behind `url`. `Ok(false)` when there is nothing to delete.
    ///
    /// The metadata row is soft-deleted before the physical delete is attempted, so
    /// the two can diverge when the physical delete fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, url: &str) -> Result<bool, CdnError> {
        let path = self.get_physical_path(url).await?;

        let metadata = best_effort("find file metadata", self.find_metadata(url)).await.flatten();
        if let Some(row) = &metadata {
            let mut row = row.clone();
            row.is_deleted = true;
            best_effort("soft-delete file metadata", self.repo.update_file(&row)).await;
        }

        if !self.fs.exists(&path).await {
            self.cache.invalidate(url);
            info!(%url, "nothing to delete");
            return Ok(false);
        }
        let size = self.fs.file_len(&path).await.unwrap_or(0);

        let outcome = match self.delete_direct(&path).await {
            Err(CdnError::PermissionDenied { .. }) => {
                warn!(path = %path.display(), "direct delete denied; trying alternative delete");
                self.delete_alternative(&path).await
            }
            other => other,
        };
        self.cache.invalidate(url);
        outcome?;

        let category_id = match &metadata {
            Some(row) => Some(row.category_id),
            None => self.category_id_of(url).await,
        };
        if let Some(category_id) = category_id {
            let today = self.clock.now().date_naive();
            best_effort("record delete usage", self.repo.add_usage(today, category_id, UsageDelta::delete(size))).await;
        }
        info!(%url, "file_deleted");
        Ok(true)
    }

    async fn delete_direct(&self, path: &Path) -> Result<(), CdnError> {
        let fs = &self.fs;
        self.executor
            .execute("delete", path, || async move {
                match fs.verify_access(path, AccessMode::Write).await {
                    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
                    other => other?,
                }
                removed(fs.remove_file(path).await)
            })
            .await
    }

    /// Clears the read-only flag before removing.
    async fn delete_alternative(&self, path: &Path) -> Result<(), CdnError> {
        let fs = &self.fs;
        self.executor
            .execute("delete (alternative)", path, || async move {
                match fs.clear_readonly(path).await {
                    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
                    other => other?,
                }
                removed(fs.remove_file(path).await)
            })
            .await
    }

    /// Rename the file behind `url`, keeping its directory and extension.
    ///
    /// `Ok(None)` when the source does not exist; `Conflict` when the destination does.
    #[instrument(skip(self))]
    pub async fn rename(&self, url: &str, new_name: &str) -> Result<Option<String>, CdnError> {
        let source = self.get_physical_path(url).await?;
        if !self.fs.exists(&source).await {
            self.cache.invalidate(url);
            return Ok(None);
        }

        let current = source.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
        let (_, extension) = split_extension(&current);
        let requested = file_name_only(new_name);
        let (stem, requested_ext) = split_extension(requested);
        let base = if !extension.is_empty() && requested_ext == extension { stem } else { requested };
        let new_file = format!("{}{}", sanitize_base_name(base), extension);
        if new_file == current {
            return Ok(Some(url.to_string()));
        }

        let destination = source.with_file_name(&new_file);
        if self.fs.exists(&destination).await {
            return Err(CdnError::Conflict(format!("'{new_file}' already exists")));
        }
        self.move_file(&source, &destination).await?;

        let new_url = replace_last_segment(url, &new_file);
        self.cache.invalidate(url);
        if let Some(mut row) = best_effort("find file metadata", self.find_metadata(url)).await.flatten() {
            row.url = new_url.clone();
            row.file_name = new_file.clone();
            row.file_path = destination.display().to_string();
            best_effort("update file metadata", self.repo.update_file(&row)).await;
        }
        info!(from = %url, to = %new_url, "file_renamed");
        Ok(Some(new_url))
    }

    /// Rename first; copy+delete when the platform refuses the move.
    /// Neither path replaces a destination that appeared after the caller's check.
    async fn move_file(&self, from: &Path, to: &Path) -> Result<(), CdnError> {
        match self.fs.rename(from, to).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                Err(CdnError::PermissionDenied { operation: "rename".into(), path: from.to_path_buf() })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(CdnError::Conflict(format!("'{}' already exists", to.display())))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(CdnError::io(format!("rename {}", from.display()), e))
            }
            Err(e) => {
                warn!(error = %e, "atomic rename failed; falling back to copy+delete");
                self.copy_then_delete(from, to).await
            }
        }
    }

    /// A crash between the copy and the delete leaves both files in place.
    async fn copy_then_delete(&self, from: &Path, to: &Path) -> Result<(), CdnError> {
        let fs = &self.fs;
        self.executor.execute("copy", to, || async move { fs.copy(from, to).await.map(|_| true) }).await?;
        let deleted = self
            .executor
            .execute("delete", from, || async move { removed(fs.remove_file(from).await) })
            .await;
        if deleted.is_err() {
            warn!(path = %to.display(), "source delete failed; removing the copy");
            let _ = fs.remove_file(to).await;
        }
        deleted
    }

    /// Files of a category. `folder_path`: `None` = any folder, `""` = category root only.
    pub async fn list_files(&self, category: &str, folder_path: Option<&str>, search: Option<&str>) -> Result<Vec<FileMetadata>, CdnError> {
        let Some(category_id) = self.get_category_id(category).await? else {
            return Ok(Vec::new());
        };
        let folder = match folder_path.map(clean_folder_path) {
            None => FolderFilter::Any,
            Some(p) if p.is_empty() => FolderFilter::Root,
            Some(p) => match self.repo.find_folder(category_id, &p).await? {
                Some(f) => FolderFilter::Folder(f.id),
                None => return Ok(Vec::new()),
            },
        };
        let search = search.map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        self.repo.list_files(&FileQuery { category_id, folder, search }).await
    }

    /// Open the file behind `url` for reading; `Ok(None)` when it does not exist.
    pub async fn get_file_stream(&self, url: &str) -> Result<Option<FileReader>, CdnError> {
        let path = self.get_physical_path(url).await?;
        let reader = match self.fs.open_read(&path).await {
            Ok(r) => r,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.cache.invalidate(url);
                return Ok(None);
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(CdnError::PermissionDenied { operation: "read".into(), path });
            }
            Err(e) => return Err(CdnError::io(format!("open {}", path.display()), e)),
        };
        self.record_access(url).await;
        Ok(Some(reader))
    }

    async fn record_access(&self, url: &str) {
        let Some(mut row) = best_effort("find file metadata", self.find_metadata(url)).await.flatten() else {
            return;
        };
        let now = self.clock.now();
        row.access_count += 1;
        row.last_access_date = Some(now);
        best_effort("record access", self.repo.update_file(&row)).await;
        best_effort("record download usage", self.repo.add_usage(now.date_naive(), row.category_id, UsageDelta::download())).await;
    }

    /// Exact URL match, then a suffix match on the full relative path.
    ///
    /// Never matches on the file name alone: the same name can live under
    /// another category or folder.
    async fn find_metadata(&self, url: &str) -> Result<Option<FileMetadata>, CdnError> {
        if let Some(row) = self.repo.find_file_by_url(url).await? {
            return Ok(Some(row));
        }
        if let Ok(resolved) = self.resolve(url).await {
            if let Some(row) = self.repo.find_file_by_url_suffix(&format!("/{}", resolved.relative)).await? {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    async fn category_id_of(&self, url: &str) -> Option<uuid::Uuid> {
        let resolved = self.resolve(url).await.ok()?;
        let (category, _, _) = split_relative(&resolved.relative);
        self.get_category_id(&category).await.ok().flatten()
    }
}

/// Treat an already-missing file as removed.
fn removed(result: io::Result<()>) -> io::Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e),
    }
}

fn replace_last_segment(url: &str, name: &str) -> String {
    match url.rfind('/') {
        Some(idx) => format!("{}/{}", &url[..idx], name),
        None => name.to_string(),
    }
}
