use configs::cdn::RetrySettings;
use std::io;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Fixed-delay retry budget for physical file operations.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), delay }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(settings.max_attempts, Duration::from_millis(settings.delay_ms))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleep before attempt `attempt` (1-based). The first attempt never waits.
    pub async fn wait_before_retry(&self, attempt: u32) {
        if attempt <= 1 || self.delay.is_zero() {
            return;
        }
        debug!("Retrying in {:?} (attempt {})", self.delay, attempt);
        sleep(self.delay).await;
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

/// How a failed file operation should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Access denied: retrying will not help.
    Fatal,
    /// The destination already exists and must not be replaced.
    Occupied,
    /// Lock, sharing violation or other I/O hiccup.
    Transient,
}

pub fn classify(error: &io::Error) -> Failure {
    match error.kind() {
        io::ErrorKind::PermissionDenied => Failure::Fatal,
        io::ErrorKind::AlreadyExists => Failure::Occupied,
        _ => Failure::Transient,
    }
}
