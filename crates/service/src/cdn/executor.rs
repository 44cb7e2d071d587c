//! Bounded retries around a single physical file operation.

use std::future::Future;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

use super::errors::CdnError;
use super::retry::{classify, Failure, RetryPolicy};

#[derive(Debug, Clone, Default)]
pub struct FileOperationExecutor {
    policy: RetryPolicy,
}

impl FileOperationExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op` until it reports `Ok(true)`.
    ///
    /// `Ok(false)` and transient errors consume an attempt; permission denied and
    /// an occupied destination stop immediately. Sleeps only between attempts.
    pub async fn execute<F, Fut>(&self, operation: &str, path: &Path, mut op: F) -> Result<(), CdnError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = io::Result<bool>>,
    {
        let max = self.policy.max_attempts();
        let mut last_error = String::from("operation reported failure");

        for attempt in 1..=max {
            self.policy.wait_before_retry(attempt).await;
            match op().await {
                Ok(true) => {
                    if attempt > 1 {
                        info!(operation, path = %path.display(), attempt, "file operation succeeded after retry");
                    } else {
                        debug!(operation, path = %path.display(), "file operation succeeded");
                    }
                    return Ok(());
                }
                Ok(false) => {
                    warn!(operation, path = %path.display(), attempt, max, "file operation reported failure");
                }
                Err(e) if classify(&e) == Failure::Fatal => {
                    warn!(operation, path = %path.display(), error = %e, "permission denied, not retrying");
                    return Err(CdnError::PermissionDenied { operation: operation.to_string(), path: path.to_path_buf() });
                }
                Err(e) if classify(&e) == Failure::Occupied => {
                    warn!(operation, path = %path.display(), "destination already exists, not retrying");
                    return Err(CdnError::Conflict(format!("{operation}: '{}' already exists", path.display())));
                }
                Err(e) => {
                    warn!(operation, path = %path.display(), attempt, max, error = %e, "file operation failed");
                    last_error = e.to_string();
                }
            }
        }

        Err(CdnError::RetriesExhausted {
            operation: operation.to_string(),
            path: path.to_path_buf(),
            attempts: max,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn executor() -> FileOperationExecutor {
        FileOperationExecutor::new(RetryPolicy::new(3, Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = executor()
            .execute("delete", Path::new("/tmp/x"), || {
                let c = c.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst);
                    if n < 2 { Err(io::Error::new(io::ErrorKind::Other, "locked")) } else { Ok(true) }
                }
            })
            .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_exactly_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = executor()
            .execute("delete", Path::new("/tmp/x"), || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<bool, _>(io::Error::new(io::ErrorKind::Other, "locked"))
                }
            })
            .await;
        match result {
            Err(CdnError::RetriesExhausted { attempts, last_error, .. }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last_error, "locked");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn false_result_counts_as_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = executor()
            .execute("copy", Path::new("/tmp/x"), || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(false)
                }
            })
            .await;
        assert!(matches!(result, Err(CdnError::RetriesExhausted { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permission_denied_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = executor()
            .execute("delete", Path::new("/tmp/x"), || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<bool, _>(io::Error::from(io::ErrorKind::PermissionDenied))
                }
            })
            .await;
        assert!(matches!(result, Err(CdnError::PermissionDenied { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn occupied_destination_is_a_conflict_without_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = executor()
            .execute("copy", Path::new("/tmp/x"), || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<bool, _>(io::Error::from(io::ErrorKind::AlreadyExists))
                }
            })
            .await;
        assert!(matches!(result, Err(CdnError::Conflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
