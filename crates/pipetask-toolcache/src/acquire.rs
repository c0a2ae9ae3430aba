//! Acquisition pipeline
//!
//! Local tool cache first, then the remote manifest. A remote build is
//! downloaded, extracted, set up and registered in the cache before it is
//! returned. Concurrent acquisitions of the same build within one process
//! share a single download.

use crate::cache::ToolCache;
use crate::candidate::{select_best, CandidateLocation, ToolCandidate};
use crate::download::Downloader;
use crate::error::{Error, Result};
use crate::extract::extract_archive_async;
use crate::manifest::RemoteResolver;
use crate::publish::ResolvedInstallation;
use crate::setup::run_setup_script;
use crate::version::VersionSpec;
use pipetask_core::platform::{InstallLayout, PlatformInfo};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_SETUP_TIMEOUT: Duration = Duration::from_secs(600);

/// What to acquire
#[derive(Debug, Clone)]
pub struct AcquisitionRequest<'a> {
    /// Tool cache name, e.g. `Python`
    pub tool: &'a str,
    pub spec: &'a VersionSpec,
    /// Target platform; `platform.arch` is the requested architecture
    pub platform: &'a PlatformInfo,
    pub layout: InstallLayout,
    pub allow_unstable: bool,
    /// Only consult the local tool cache
    pub disable_remote: bool,
}

struct RemoteAcquisition {
    resolver: RemoteResolver,
    downloader: Downloader,
}

/// Resolves a request to an installation, downloading it if needed
pub struct AcquisitionPipeline {
    cache: ToolCache,
    remote: Option<RemoteAcquisition>,
    setup_timeout: Duration,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl AcquisitionPipeline {
    /// Pipeline that only looks in `cache`
    pub fn new(cache: ToolCache) -> Self {
        Self {
            cache,
            remote: None,
            setup_timeout: DEFAULT_SETUP_TIMEOUT,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Enable manifest fallback
    pub fn with_remote(mut self, resolver: RemoteResolver, downloader: Downloader) -> Self {
        self.remote = Some(RemoteAcquisition {
            resolver,
            downloader,
        });
        self
    }

    pub fn with_setup_timeout(mut self, timeout: Duration) -> Self {
        self.setup_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &ToolCache {
        &self.cache
    }

    pub async fn acquire(&self, request: &AcquisitionRequest<'_>) -> Result<ResolvedInstallation> {
        let arch = request.platform.arch;

        if let Some(found) =
            self.cache
                .find_local(request.tool, request.spec, arch, request.allow_unstable)?
        {
            info!(
                "Using {} {} ({}) from the tool cache",
                request.tool, found.version, found.arch
            );
            return self.resolve_installed(request, found, false);
        }

        let attempted_local: Vec<_> = self
            .cache
            .list_all(request.tool)?
            .iter()
            .map(ToolCandidate::to_attempted)
            .collect();

        let remote = match &self.remote {
            Some(remote) if !request.disable_remote => remote,
            _ => {
                return Err(Error::VersionResolutionFailed {
                    spec: request.spec.to_string(),
                    platform: request.platform.clone(),
                    attempted_local,
                    attempted_remote: None,
                });
            }
        };

        info!(
            "{} {} not found in the tool cache, checking {}",
            request.tool,
            request.spec,
            remote.resolver.location()
        );
        let candidates = remote.resolver.candidates(request.platform).await?;
        let Some(best) = select_best(&candidates, request.spec, arch, request.allow_unstable) else {
            return Err(Error::VersionResolutionFailed {
                spec: request.spec.to_string(),
                platform: request.platform.clone(),
                attempted_local,
                attempted_remote: Some(
                    candidates
                        .iter()
                        .map(ToolCandidate::to_attempted)
                        .collect(),
                ),
            });
        };

        let key = format!("{}/{}/{}", request.tool, best.version, best.arch);
        let gate = self.gate(&key);
        let result = {
            let _guard = gate.lock().await;

            // Another acquisition may have finished while we waited
            if self.cache.is_installed(request.tool, &best.version, best.arch) {
                debug!("{} was installed while waiting", key);
                let root = self.cache.install_dir(request.tool, &best.version, best.arch);
                let installed = ToolCandidate::installed(best.version, best.arch, root);
                self.resolve_installed(request, installed, false)
            } else {
                self.install(remote, request, best).await
            }
        };
        self.release(&key, gate);
        result
    }

    fn gate(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drop the gate for `key` once no other acquisition holds it
    fn release(&self, key: &str, gate: Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        drop(gate);
        if in_flight
            .get(key)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            in_flight.remove(key);
        }
    }

    async fn install(
        &self,
        remote: &RemoteAcquisition,
        request: &AcquisitionRequest<'_>,
        candidate: ToolCandidate,
    ) -> Result<ResolvedInstallation> {
        let CandidateLocation::Remote {
            download_url,
            filename,
        } = &candidate.location
        else {
            return Err(Error::download_failed(
                candidate.version.as_str(),
                "candidate has no download location",
            ));
        };

        info!(
            "Acquiring {} {} ({}) from {}",
            request.tool, candidate.version, candidate.arch, download_url
        );
        let archive = remote.downloader.download(download_url, filename).await?;
        let extracted = extract_archive_async(
            archive.path().to_path_buf(),
            archive.dir().join("extracted"),
        )
        .await?;

        run_setup_script(
            &extracted,
            request.platform.os,
            self.cache.root(),
            self.setup_timeout,
        )
        .await?;

        let root = if self
            .cache
            .is_installed(request.tool, &candidate.version, candidate.arch)
        {
            debug!("Setup script registered the installation itself");
            self.cache
                .install_dir(request.tool, &candidate.version, candidate.arch)
        } else {
            self.register(request.tool, &candidate, extracted).await?
        };

        let installed = ToolCandidate::installed(candidate.version, candidate.arch, root);
        self.resolve_installed(request, installed, true)
    }

    async fn register(
        &self,
        tool: &str,
        candidate: &ToolCandidate,
        source: PathBuf,
    ) -> Result<PathBuf> {
        let cache = self.cache.clone();
        let tool = tool.to_string();
        let version = candidate.version.clone();
        let arch = candidate.arch;
        tokio::task::spawn_blocking(move || cache.register(&tool, &version, arch, &source))
            .await
            .map_err(|e| Error::cache(self.cache.root().display(), e))?
    }

    fn resolve_installed(
        &self,
        request: &AcquisitionRequest<'_>,
        candidate: ToolCandidate,
        downloaded: bool,
    ) -> Result<ResolvedInstallation> {
        let root = match &candidate.location {
            CandidateLocation::Installed(root) => root.clone(),
            CandidateLocation::Remote { .. } => {
                self.cache
                    .install_dir(request.tool, &candidate.version, candidate.arch)
            }
        };
        let mut installation = ResolvedInstallation::resolve(
            candidate.version,
            candidate.arch,
            root,
            request.layout,
            request.platform,
        );
        installation.downloaded = downloaded;
        Ok(installation)
    }
}
