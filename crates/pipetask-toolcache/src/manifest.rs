//! Remote versions manifest
//!
//! The manifest is a JSON array of releases in the `actions/python-versions`
//! format:
//!
//! ```json
//! [{
//!   "version": "3.10.1",
//!   "stable": true,
//!   "release_url": "https://github.com/actions/python-versions/releases/tag/3.10.1-117932",
//!   "files": [{
//!     "filename": "python-3.10.1-linux-22.04-x64.tar.gz",
//!     "arch": "x64",
//!     "platform": "linux",
//!     "platform_version": "22.04",
//!     "download_url": "https://github.com/.../python-3.10.1-linux-22.04-x64.tar.gz"
//!   }]
//! }]
//! ```

use crate::candidate::{select_best, CandidateLocation, ToolCandidate};
use crate::error::{Error, Result};
use crate::version::{ToolVersion, VersionSpec};
use async_trait::async_trait;
use pipetask_core::host::{HostChannel, IssueType};
use pipetask_core::platform::{Arch, PlatformInfo};
use pipetask_core::retry::{ClosurePredicate, RetryExecutor, TracingObserver};
use pipetask_core::types::{NetworkConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// One release entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRelease {
    pub version: String,
    pub stable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_url: Option<String>,
    #[serde(default)]
    pub files: Vec<ManifestFile>,
}

/// One downloadable archive of a release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub filename: String,
    pub arch: String,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_version: Option<String>,
    pub download_url: String,
}

impl ManifestFile {
    /// Whether this archive was built for `platform`
    ///
    /// Architecture is not checked here. A file pinned to an OS release only
    /// matches that release, unless the host's release is unknown.
    pub fn fits(&self, platform: &PlatformInfo) -> bool {
        if self.platform != platform.os.manifest_token() {
            return false;
        }
        match (&self.platform_version, &platform.os_version) {
            (Some(wanted), Some(actual)) => wanted == actual,
            _ => true,
        }
    }
}

/// Supplier of manifest releases
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Location shown in diagnostics
    fn location(&self) -> String;

    async fn fetch(&self) -> Result<Vec<ManifestRelease>>;
}

/// Manifest fetched over HTTP
pub struct HttpManifestSource {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    retry_policy: RetryPolicy,
    host: Option<Arc<dyn HostChannel>>,
}

/// Failure of a single fetch attempt
#[derive(Debug)]
struct FetchError {
    status: Option<u16>,
    message: String,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl FetchError {
    /// Client errors other than throttling will not change on retry
    fn is_retryable(&self) -> bool {
        match self.status {
            Some(status) => status >= 500 || status == 429,
            None => true,
        }
    }
}

impl HttpManifestSource {
    pub fn new(
        url: impl Into<String>,
        network: &NetworkConfig,
        retry_policy: RetryPolicy,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&network.user_agent)
            .timeout(Duration::from_secs(network.http_timeout_secs))
            .build()
            .map_err(|e| Error::manifest_unavailable("<client>", e))?;

        Ok(Self {
            client,
            url: url.into(),
            token: None,
            retry_policy,
            host: None,
        })
    }

    /// Authenticate requests with a GitHub token; blank tokens are ignored
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Report an unauthenticated fetch to the host as a warning
    pub fn with_host(mut self, host: Arc<dyn HostChannel>) -> Self {
        self.host = Some(host);
        self
    }

    async fn fetch_once(&self) -> std::result::Result<Vec<ManifestRelease>, FetchError> {
        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("token {}", token));
        }

        let response = request.send().await.map_err(|e| FetchError {
            status: None,
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError {
                status: Some(status.as_u16()),
                message: status.canonical_reason().unwrap_or("request failed").to_string(),
            });
        }

        let body = response.bytes().await.map_err(|e| FetchError {
            status: None,
            message: e.to_string(),
        })?;

        serde_json::from_slice(&body).map_err(|e| FetchError {
            status: Some(status.as_u16()),
            message: format!("malformed manifest: {}", e),
        })
    }
}

#[async_trait]
impl ManifestSource for HttpManifestSource {
    fn location(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Vec<ManifestRelease>> {
        if self.token.is_none() {
            let message = "No GitHub token was provided. Requests to the versions manifest are \
                           unauthenticated and may be rate limited.";
            warn!("{}", message);
            if let Some(host) = &self.host {
                host.issue(IssueType::Warning, message);
            }
        }

        debug!("Fetching versions manifest from {}", self.url);
        let executor = RetryExecutor::new(self.retry_policy.clone())
            .with_predicate(ClosurePredicate::new(FetchError::is_retryable))
            .with_observer(TracingObserver::new("manifest"));

        executor
            .execute(|| self.fetch_once())
            .await
            .map_err(|e| Error::manifest_unavailable(&self.url, e))
    }
}

/// Finds downloadable builds of one tool in a versions manifest
pub struct RemoteResolver {
    source: Arc<dyn ManifestSource>,
}

impl RemoteResolver {
    pub fn new(source: Arc<dyn ManifestSource>) -> Self {
        Self { source }
    }

    pub fn location(&self) -> String {
        self.source.location()
    }

    /// Every build in the manifest for the host OS, across architectures
    ///
    /// Entries whose version or architecture cannot be parsed are skipped.
    /// When several files of a release fit the host for the same
    /// architecture, the first listed is kept.
    pub async fn candidates(&self, platform: &PlatformInfo) -> Result<Vec<ToolCandidate>> {
        let releases = self.source.fetch().await?;
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for release in releases {
            let Some(version) = ToolVersion::parse(&release.version) else {
                debug!("Skipping manifest entry with version '{}'", release.version);
                continue;
            };
            for file in release.files.iter().filter(|f| f.fits(platform)) {
                let Some(arch) = Arch::from_identifier(&file.arch) else {
                    continue;
                };
                if !seen.insert((version.as_str().to_string(), arch)) {
                    continue;
                }
                candidates.push(ToolCandidate {
                    version: version.clone(),
                    arch,
                    location: CandidateLocation::Remote {
                        download_url: file.download_url.clone(),
                        filename: file.filename.clone(),
                    },
                    stable: release.stable,
                });
            }
        }

        debug!(
            "Versions manifest lists {} builds for {}",
            candidates.len(),
            platform.os
        );
        Ok(candidates)
    }

    /// Best downloadable build satisfying `spec` for the host architecture
    pub async fn find_remote(
        &self,
        spec: &VersionSpec,
        platform: &PlatformInfo,
        allow_unstable: bool,
    ) -> Result<Option<ToolCandidate>> {
        let candidates = self.candidates(platform).await?;
        Ok(select_best(&candidates, spec, platform.arch, allow_unstable))
    }
}
