//! The use-python-version task
//!
//! Resolves a Python interpreter for the requested spec and architecture,
//! then publishes `pythonLocation` and `PATH` entries for later steps.
//! CPython may be downloaded from the versions manifest; PyPy (`pypy2`,
//! `pypy3`, `pypy3.9`...) is only ever taken from the tool cache.

use crate::acquire::{AcquisitionPipeline, AcquisitionRequest};
use crate::cache::ToolCache;
use crate::download::Downloader;
use crate::error::{Error, Result};
use crate::manifest::{HttpManifestSource, ManifestSource, RemoteResolver};
use crate::publish::{EnvironmentPublisher, ResolvedInstallation};
use crate::version::VersionSpec;
use pipetask_core::config::AgentEnvironment;
use pipetask_core::host::{HostChannel, IssueType};
use pipetask_core::platform::{Arch, InstallLayout, PlatformInfo};
use pipetask_core::types::RuntimeConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub const CPYTHON_TOOL: &str = "Python";
pub const PYPY_TOOL: &str = "PyPy";
pub const LOCATION_VARIABLE: &str = "pythonLocation";

const HOSTED_AGENT_HINT: &str = "If this is a Microsoft-hosted agent, check that this \
     image supports side-by-side versions of Python at https://aka.ms/hosted-agent-software.";
const SELF_HOSTED_AGENT_HINT: &str = "If this is a self-hosted agent, see how to configure \
     side-by-side Python versions at https://go.microsoft.com/fwlink/?linkid=871498.";

/// Task inputs
#[derive(Debug, Clone)]
pub struct PythonVersionInputs {
    pub version_spec: String,
    pub architecture: Arch,
    pub add_to_path: bool,
    pub allow_unstable: bool,
    pub disable_download_from_registry: bool,
    pub github_token: Option<String>,
}

/// Which interpreter a spec asks for
#[derive(Debug, Clone)]
pub struct InterpreterRequest {
    pub tool: &'static str,
    pub layout: InstallLayout,
    pub spec: VersionSpec,
}

impl InterpreterRequest {
    /// Split a `pypy` prefix off the spec. A bare `pypy` accepts any PyPy.
    pub fn parse(version_spec: &str) -> Result<Self> {
        let trimmed = version_spec.trim();
        let is_pypy = trimmed
            .get(..4)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("pypy"));

        if is_pypy {
            let remainder = trimmed[4..].trim();
            let spec = if remainder.is_empty() { "*" } else { remainder };
            Ok(Self {
                tool: PYPY_TOOL,
                layout: InstallLayout::PyPy,
                spec: VersionSpec::parse(spec)?,
            })
        } else {
            Ok(Self {
                tool: CPYTHON_TOOL,
                layout: InstallLayout::CPython,
                spec: VersionSpec::parse(trimmed)?,
            })
        }
    }
}

/// Runs the task against an agent environment
pub struct UsePythonVersion {
    agent: AgentEnvironment,
    config: RuntimeConfig,
    platform: PlatformInfo,
    host: Arc<dyn HostChannel>,
    manifest_source: Option<Arc<dyn ManifestSource>>,
}

impl UsePythonVersion {
    pub fn new(
        agent: AgentEnvironment,
        config: RuntimeConfig,
        platform: PlatformInfo,
        host: Arc<dyn HostChannel>,
    ) -> Self {
        Self {
            agent,
            config,
            platform,
            host,
            manifest_source: None,
        }
    }

    /// Replace the HTTP manifest source
    pub fn with_manifest_source(mut self, source: Arc<dyn ManifestSource>) -> Self {
        self.manifest_source = Some(source);
        self
    }

    pub async fn run(&self, inputs: &PythonVersionInputs) -> Result<ResolvedInstallation> {
        let interpreter = InterpreterRequest::parse(&inputs.version_spec)?;
        let platform = self.platform.with_arch(inputs.architecture);
        debug!(
            "Resolving {} {} for {}",
            interpreter.tool, interpreter.spec, platform
        );

        let remote_allowed =
            interpreter.layout == InstallLayout::CPython && !inputs.disable_download_from_registry;
        let pipeline = self.pipeline(inputs, remote_allowed)?;

        let request = AcquisitionRequest {
            tool: interpreter.tool,
            spec: &interpreter.spec,
            platform: &platform,
            layout: interpreter.layout,
            allow_unstable: inputs.allow_unstable,
            disable_remote: !remote_allowed,
        };

        let installation = match pipeline.acquire(&request).await {
            Ok(installation) => installation,
            Err(e) => {
                if matches!(e, Error::VersionResolutionFailed { .. }) {
                    self.host.issue(IssueType::Error, &failure_message(&e));
                }
                return Err(e);
            }
        };

        info!(
            "Using {} {} ({}) at {}",
            interpreter.tool,
            installation.version,
            installation.arch,
            installation.root.display()
        );
        EnvironmentPublisher::new(self.host.clone(), LOCATION_VARIABLE)
            .with_add_to_path(inputs.add_to_path)
            .publish(&installation);
        Ok(installation)
    }

    fn pipeline(
        &self,
        inputs: &PythonVersionInputs,
        remote_allowed: bool,
    ) -> Result<AcquisitionPipeline> {
        let cache = ToolCache::new(&self.agent.tool_cache_dir);
        let pipeline = AcquisitionPipeline::new(cache)
            .with_setup_timeout(Duration::from_secs(self.config.python.setup_timeout_secs));
        if !remote_allowed {
            return Ok(pipeline);
        }

        let source: Arc<dyn ManifestSource> = match &self.manifest_source {
            Some(source) => source.clone(),
            None => Arc::new(
                HttpManifestSource::new(
                    &self.config.python.manifest_url,
                    &self.config.network,
                    self.config.retry_policies.for_operation("manifest"),
                )?
                .with_token(inputs.github_token.clone())
                .with_host(self.host.clone()),
            ),
        };
        let downloader = Downloader::new(
            &self.agent.temp_dir,
            &self.config.network,
            self.config.retry_policies.for_operation("download"),
        )?;
        Ok(pipeline.with_remote(RemoteResolver::new(source), downloader))
    }
}

/// Error text for the host, with agent setup hints after resolution failures
pub fn failure_message(error: &Error) -> String {
    match error {
        Error::VersionResolutionFailed { .. } => {
            format!("{}\n{}\n{}", error, HOSTED_AGENT_HINT, SELF_HOSTED_AGENT_HINT)
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::MockManifestSource;
    use crate::version::ToolVersion;
    use pipetask_core::host::RecordingChannel;
    use pipetask_core::platform::Os;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn agent(root: &Path) -> AgentEnvironment {
        AgentEnvironment {
            tool_cache_dir: root.join("tools"),
            temp_dir: root.join("temp"),
            default_working_dir: root.to_path_buf(),
            debug: false,
        }
    }

    fn install(agent: &AgentEnvironment, tool: &str, version: &str, arch: Arch) {
        let source = TempDir::new().unwrap();
        fs::create_dir_all(source.path().join("bin")).unwrap();
        ToolCache::new(&agent.tool_cache_dir)
            .register(tool, &ToolVersion::parse(version).unwrap(), arch, source.path())
            .unwrap();
    }

    fn inputs(spec: &str, arch: Arch) -> PythonVersionInputs {
        PythonVersionInputs {
            version_spec: spec.to_string(),
            architecture: arch,
            add_to_path: true,
            allow_unstable: false,
            disable_download_from_registry: false,
            github_token: None,
        }
    }

    fn silent_manifest() -> Arc<dyn ManifestSource> {
        let mut source = MockManifestSource::new();
        source.expect_fetch().returning(|| Ok(Vec::new()));
        source
            .expect_location()
            .returning(|| "mock://manifest".to_string());
        Arc::new(source)
    }

    #[test]
    fn test_interpreter_request() {
        let cpython = InterpreterRequest::parse("3.10").unwrap();
        assert_eq!(cpython.tool, CPYTHON_TOOL);
        assert_eq!(cpython.layout, InstallLayout::CPython);

        let pypy = InterpreterRequest::parse("pypy3").unwrap();
        assert_eq!(pypy.tool, PYPY_TOOL);
        assert!(pypy.spec.matches(&ToolVersion::parse("3.5.2").unwrap(), false));
        assert!(!pypy.spec.matches(&ToolVersion::parse("2.7.9").unwrap(), false));

        let any = InterpreterRequest::parse("PyPy").unwrap();
        assert!(any.spec.matches(&ToolVersion::parse("2.7.9").unwrap(), false));
    }

    #[tokio::test]
    async fn test_selects_requested_architecture() {
        let temp = TempDir::new().unwrap();
        let agent = agent(temp.path());
        install(&agent, CPYTHON_TOOL, "3.10.1", Arch::X64);
        install(&agent, CPYTHON_TOOL, "3.10.1", Arch::X86);

        let host = Arc::new(RecordingChannel::new());
        let task = UsePythonVersion::new(
            agent.clone(),
            RuntimeConfig::default(),
            PlatformInfo::new(Os::Linux, Arch::X64),
            host.clone(),
        )
        .with_manifest_source(silent_manifest());

        let installation = task.run(&inputs("3.10", Arch::X86)).await.unwrap();
        let expected = agent
            .tool_cache_dir
            .join(CPYTHON_TOOL)
            .join("3.10.1")
            .join("x86");
        assert_eq!(installation.root, expected);

        let variables = host.commands_named("task.setvariable");
        assert_eq!(variables[0].property("variable"), Some(LOCATION_VARIABLE));
        assert_eq!(variables[0].data(), expected.display().to_string());
    }

    #[tokio::test]
    async fn test_pypy_never_consults_manifest() {
        let temp = TempDir::new().unwrap();
        let agent = agent(temp.path());
        install(&agent, PYPY_TOOL, "3.5.2", Arch::X64);

        let mut source = MockManifestSource::new();
        source.expect_fetch().never();
        source.expect_location().returning(|| "mock://manifest".to_string());

        let host = Arc::new(RecordingChannel::new());
        let task = UsePythonVersion::new(
            agent.clone(),
            RuntimeConfig::default(),
            PlatformInfo::new(Os::Linux, Arch::X64),
            host.clone(),
        )
        .with_manifest_source(Arc::new(source));

        let installation = task.run(&inputs("pypy3", Arch::X64)).await.unwrap();
        let root = agent.tool_cache_dir.join(PYPY_TOOL).join("3.5.2").join("x64");
        assert_eq!(installation.location, root.join("bin"));

        let missing = task.run(&inputs("pypy2", Arch::X64)).await.unwrap_err();
        match missing {
            Error::VersionResolutionFailed { attempted_remote, .. } => {
                assert!(attempted_remote.is_none())
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_failure_emits_error_issue_with_hints() {
        let temp = TempDir::new().unwrap();
        let agent = agent(temp.path());
        install(&agent, CPYTHON_TOOL, "2.6.0", Arch::X64);
        install(&agent, CPYTHON_TOOL, "2.7.13", Arch::X86);

        let host = Arc::new(RecordingChannel::new());
        let task = UsePythonVersion::new(
            agent,
            RuntimeConfig::default(),
            PlatformInfo::new(Os::Linux, Arch::X64),
            host.clone(),
        )
        .with_manifest_source(silent_manifest());

        let err = task.run(&inputs("3.x", Arch::X64)).await.unwrap_err();
        assert!(matches!(err, Error::VersionResolutionFailed { .. }));

        let issues = host.commands_named("task.issue");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].property("type"), Some("error"));
        let text = issues[0].data();
        assert!(text.contains("2.6.0 (x64)"));
        assert!(text.contains("2.7.13 (x86)"));
        assert!(text.contains("Microsoft-hosted agent"));
        assert!(text.contains("self-hosted agent"));
        assert!(host.commands_named("task.prependpath").is_empty());
    }

    #[tokio::test]
    async fn test_add_to_path_false() {
        let temp = TempDir::new().unwrap();
        let agent = agent(temp.path());
        install(&agent, CPYTHON_TOOL, "3.12.0", Arch::X64);

        let host = Arc::new(RecordingChannel::new());
        let task = UsePythonVersion::new(
            agent,
            RuntimeConfig::default(),
            PlatformInfo::new(Os::Linux, Arch::X64),
            host.clone(),
        );

        let mut request = inputs("3.12", Arch::X64);
        request.add_to_path = false;
        request.disable_download_from_registry = true;
        task.run(&request).await.unwrap();

        assert_eq!(host.commands_named("task.setvariable").len(), 1);
        assert!(host.commands_named("task.prependpath").is_empty());
    }
}
