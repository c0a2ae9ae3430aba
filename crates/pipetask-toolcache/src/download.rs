//! Archive downloads
//!
//! Streams a distribution archive into a fresh scratch directory under the
//! agent temp directory. The directory is removed when the returned
//! [`DownloadedArchive`] is dropped.

use crate::error::{Error, Result};
use futures_util::StreamExt;
use pipetask_core::retry::{ClosurePredicate, RetryExecutor, TracingObserver};
use pipetask_core::types::{NetworkConfig, RetryPolicy};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// A downloaded archive and the scratch directory holding it
#[derive(Debug)]
pub struct DownloadedArchive {
    dir: TempDir,
    path: PathBuf,
    size: u64,
}

impl DownloadedArchive {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scratch directory; extraction output can live next to the archive
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

#[derive(Debug)]
struct AttemptError {
    status: Option<u16>,
    message: String,
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl AttemptError {
    fn io(e: impl fmt::Display) -> Self {
        Self {
            status: None,
            message: e.to_string(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self.status {
            Some(status) => status >= 500 || status == 429,
            None => true,
        }
    }
}

/// HTTP downloader with retry
pub struct Downloader {
    client: reqwest::Client,
    temp_root: PathBuf,
    retry_policy: RetryPolicy,
}

impl Downloader {
    pub fn new(
        temp_root: impl Into<PathBuf>,
        network: &NetworkConfig,
        retry_policy: RetryPolicy,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&network.user_agent)
            .timeout(Duration::from_secs(network.download_timeout_secs))
            .build()
            .map_err(|e| Error::download_failed("<client>", e))?;

        Ok(Self {
            client,
            temp_root: temp_root.into(),
            retry_policy,
        })
    }

    /// Download `url` and save it as `filename` in a new scratch directory
    pub async fn download(&self, url: &str, filename: &str) -> Result<DownloadedArchive> {
        std::fs::create_dir_all(&self.temp_root)?;
        let dir = tempfile::Builder::new()
            .prefix("pipetask-download-")
            .tempdir_in(&self.temp_root)?;
        let path = dir.path().join(sanitize_filename(filename));

        info!("Downloading {}", url);
        let executor = RetryExecutor::new(self.retry_policy.clone())
            .with_predicate(ClosurePredicate::new(AttemptError::is_retryable))
            .with_observer(TracingObserver::new("download"));

        let size = executor
            .execute(|| self.download_once(url, &path))
            .await
            .map_err(|e| Error::download_failed(url, e))?;

        info!("Downloaded {} ({} bytes)", path.display(), size);
        Ok(DownloadedArchive { dir, path, size })
    }

    async fn download_once(
        &self,
        url: &str,
        path: &Path,
    ) -> std::result::Result<u64, AttemptError> {
        let response = self.client.get(url).send().await.map_err(AttemptError::io)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError {
                status: Some(status.as_u16()),
                message: status.canonical_reason().unwrap_or("request failed").to_string(),
            });
        }

        // Truncates any partial file from an earlier attempt
        let mut file = tokio::fs::File::create(path).await.map_err(AttemptError::io)?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(AttemptError::io)?;
            file.write_all(&chunk).await.map_err(AttemptError::io)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(AttemptError::io)?;

        debug!("Wrote {} bytes to {}", written, path.display());
        Ok(written)
    }
}

/// Keep only the final path component so a manifest entry cannot write
/// outside the scratch directory
fn sanitize_filename(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "archive".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename("python-3.10.1-linux-x64.tar.gz"),
            "python-3.10.1-linux-x64.tar.gz"
        );
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename(""), "archive");
    }

    #[test]
    fn test_client_errors_are_not_retried() {
        let not_found = AttemptError {
            status: Some(404),
            message: "Not Found".to_string(),
        };
        assert!(!not_found.is_retryable());
        assert!(AttemptError { status: Some(503), message: String::new() }.is_retryable());
        assert!(AttemptError::io("connection reset").is_retryable());
    }
}
