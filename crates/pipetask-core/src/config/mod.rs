//! Configuration loading
//!
//! Runtime configuration is resolved from embedded defaults, the user's
//! `~/.pipetask/runtime.yaml` and `PIPETASK_*` environment variables. The
//! agent environment (tool cache, temp directory, working directory) comes
//! from the variables the pipeline agent exports to every task.

mod agent;
mod hierarchical_loader;

pub use agent::AgentEnvironment;
pub use hierarchical_loader::HierarchicalConfigLoader;
