//! CLI command implementations
//!
//! Each command returns `Ok(true)` when the task succeeded, `Ok(false)` when
//! it failed and has already reported completion to the host, and `Err` for
//! failures the caller still has to report.

pub mod maven;
pub mod test_invoker;
pub mod use_python_version;

use anyhow::{Context, Result};
use camino::Utf8Path;
use pipetask_core::config::{AgentEnvironment, HierarchicalConfigLoader};
use pipetask_core::platform::{self, PlatformInfo};
use pipetask_core::types::RuntimeConfig;
use tracing::debug;

/// Configuration and agent state shared by every task
pub struct TaskContext {
    pub config: RuntimeConfig,
    pub agent: AgentEnvironment,
    pub platform: PlatformInfo,
}

impl TaskContext {
    pub fn load(config_dir: Option<&Utf8Path>) -> Result<Self> {
        let loader = match config_dir {
            Some(dir) => HierarchicalConfigLoader::with_dir(dir.to_path_buf()),
            None => HierarchicalConfigLoader::new()
                .context("Failed to locate pipetask config directory")?,
        };
        let config = loader
            .load_runtime_config()
            .with_context(|| {
                format!("Failed to load runtime config from {}", loader.config_dir())
            })?;

        let agent =
            AgentEnvironment::from_env(&config).context("Failed to read agent environment")?;
        let platform = platform::detect().context("Failed to detect host platform")?;
        debug!("Platform: {}", platform);
        debug!("Tool cache: {}", agent.tool_cache_dir.display());

        Ok(Self {
            config,
            agent,
            platform,
        })
    }
}
