//! Agent environment discovery
//!
//! The pipeline agent exports its well-known directories to every task as
//! environment variables. Tasks read them once at startup.

use crate::error::Result;
use crate::types::RuntimeConfig;
use std::env;
use std::path::PathBuf;

/// Directories and flags the agent provides to a running task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentEnvironment {
    /// Root of the shared tool cache
    pub tool_cache_dir: PathBuf,
    /// Scratch space for downloads and extraction
    pub temp_dir: PathBuf,
    /// Working directory of the pipeline run
    pub default_working_dir: PathBuf,
    /// `SYSTEM_DEBUG` was set for this run
    pub debug: bool,
}

impl AgentEnvironment {
    /// Read the agent environment, falling back to runtime config and
    /// `~/.pipetask/toolcache` when the agent variables are absent.
    pub fn from_env(config: &RuntimeConfig) -> Result<Self> {
        let tool_cache_dir = non_empty_var("AGENT_TOOLSDIRECTORY")
            .map(PathBuf::from)
            .or_else(|| config.tool_cache.dir.as_ref().map(PathBuf::from))
            .or_else(|| dirs::home_dir().map(|d| d.join(".pipetask").join("toolcache")))
            .unwrap_or_else(|| env::temp_dir().join("pipetask-toolcache"));

        let temp_dir = non_empty_var("AGENT_TEMPDIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        let default_working_dir = match non_empty_var("SYSTEM_DEFAULTWORKINGDIRECTORY") {
            Some(dir) => PathBuf::from(dir),
            None => env::current_dir()?,
        };

        let debug = non_empty_var("SYSTEM_DEBUG")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            tool_cache_dir,
            temp_dir,
            default_working_dir,
            debug,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        for name in [
            "AGENT_TOOLSDIRECTORY",
            "AGENT_TEMPDIRECTORY",
            "SYSTEM_DEFAULTWORKINGDIRECTORY",
            "SYSTEM_DEBUG",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn test_agent_variables_win() {
        clear();
        env::set_var("AGENT_TOOLSDIRECTORY", "/agent/_work/_tool");
        env::set_var("AGENT_TEMPDIRECTORY", "/agent/_work/_temp");
        env::set_var("SYSTEM_DEFAULTWORKINGDIRECTORY", "/agent/_work/1/s");
        env::set_var("SYSTEM_DEBUG", "True");

        let mut config = RuntimeConfig::default();
        config.tool_cache.dir = Some("/ignored".to_string());
        let agent = AgentEnvironment::from_env(&config).unwrap();
        clear();

        assert_eq!(agent.tool_cache_dir, PathBuf::from("/agent/_work/_tool"));
        assert_eq!(agent.temp_dir, PathBuf::from("/agent/_work/_temp"));
        assert_eq!(agent.default_working_dir, PathBuf::from("/agent/_work/1/s"));
        assert!(agent.debug);
    }

    #[test]
    #[serial]
    fn test_config_cache_dir_fallback() {
        clear();
        let mut config = RuntimeConfig::default();
        config.tool_cache.dir = Some("/opt/cache".to_string());

        let agent = AgentEnvironment::from_env(&config).unwrap();
        assert_eq!(agent.tool_cache_dir, PathBuf::from("/opt/cache"));
        assert!(!agent.debug);
    }
}
