//! Python version selection command

use super::TaskContext;
use crate::cli::UsePythonVersionArgs;
use anyhow::{Context, Result};
use camino::Utf8Path;
use pipetask_core::host::HostChannel;
use pipetask_toolcache::python::{PythonVersionInputs, UsePythonVersion};
use std::sync::Arc;
use tracing::info;

pub async fn run(
    args: UsePythonVersionArgs,
    config_dir: Option<&Utf8Path>,
    host: Arc<dyn HostChannel>,
) -> Result<bool> {
    let mut context = TaskContext::load(config_dir)?;
    if let Some(url) = &args.manifest_url {
        context.config.python.manifest_url = url.clone();
    }

    let inputs = inputs_from_args(&args);
    let task = UsePythonVersion::new(context.agent, context.config, context.platform, host);
    let installation = task
        .run(&inputs)
        .await
        .with_context(|| format!("Failed to select Python '{}'", inputs.version_spec))?;

    info!(
        "Python {} ({}) ready at {}{}",
        installation.version,
        installation.arch,
        installation.location.display(),
        if installation.downloaded { ", downloaded" } else { "" }
    );
    Ok(true)
}

fn inputs_from_args(args: &UsePythonVersionArgs) -> PythonVersionInputs {
    PythonVersionInputs {
        version_spec: args.version_spec.clone(),
        architecture: args.architecture,
        add_to_path: args.add_to_path,
        allow_unstable: args.allow_unstable,
        disable_download_from_registry: args.disable_download_from_registry,
        github_token: args.github_token.clone().filter(|t| !t.trim().is_empty()),
    }
}
