//! Diagnostic capture on failed operations.
//!
//! Capture is fire-and-forget: a sink never fails the operation that asked
//! for it, it logs and moves on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::driver::PageDriver;
use crate::result::SondeoResult;

/// Receives diagnostic capture requests
#[async_trait]
pub trait DiagnosticSink: Send + Sync {
    /// Capture whatever is useful about the current page for `operation`
    async fn capture(&self, operation: &str, driver: &dyn PageDriver);
}

/// Discards every capture request
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiagnostics;

#[async_trait]
impl DiagnosticSink for NoDiagnostics {
    async fn capture(&self, _operation: &str, _driver: &dyn PageDriver) {}
}

/// Writes a PNG screenshot per capture
#[derive(Debug, Clone)]
pub struct ScreenshotSink {
    dir: PathBuf,
}

impl ScreenshotSink {
    /// Write screenshots into `dir` (created on first capture)
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a capture of `operation` taken at `at` is written to
    #[must_use]
    pub fn path_for(&self, operation: &str, at: DateTime<Utc>) -> PathBuf {
        let name: String = operation
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir
            .join(format!("{name}-{}.png", at.format("%Y%m%d-%H%M%S%3f")))
    }

    async fn write(&self, operation: &str, driver: &dyn PageDriver) -> SondeoResult<PathBuf> {
        let shot = driver.screenshot().await?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(operation, shot.taken_at);
        tokio::fs::write(&path, &shot.data).await?;
        Ok(path)
    }
}

#[async_trait]
impl DiagnosticSink for ScreenshotSink {
    async fn capture(&self, operation: &str, driver: &dyn PageDriver) {
        match self.write(operation, driver).await {
            Ok(path) => info!(operation, path = %path.display(), "screenshot saved"),
            Err(err) => warn!(operation, error = %err, "screenshot capture failed"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, Screenshot};
    use chrono::TimeZone;

    #[test]
    fn test_path_for_is_sanitized_and_stamped() {
        let sink = ScreenshotSink::new("/tmp/shots");
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 14, 5, 7).unwrap();
        let path = sink.path_for("create member/ana", at);
        assert_eq!(
            path,
            PathBuf::from("/tmp/shots/create_member_ana-20260309-140507000.png")
        );
    }

    #[tokio::test]
    async fn test_capture_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ScreenshotSink::new(dir.path().join("shots"));
        let driver = MockDriver::new().with_screenshot(Screenshot::new(vec![0x89, 0x50, 0x4E, 0x47], 1, 1));
        sink.capture("login", &driver).await;
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("shots"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].starts_with("login-"));
    }

    #[tokio::test]
    async fn test_capture_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ScreenshotSink::new(dir.path());
        sink.capture("login", &MockDriver::new()).await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        NoDiagnostics.capture("login", &MockDriver::new()).await;
    }
}
