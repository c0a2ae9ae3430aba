//! Automated test invocation command

use super::TaskContext;
use crate::cli::TestInvokerArgs;
use anyhow::{Context, Result};
use camino::Utf8Path;
use pipetask_build::TestInvoker;
use pipetask_core::host::{HostChannel, TaskResult};
use std::sync::Arc;

pub async fn run(
    args: TestInvokerArgs,
    config_dir: Option<&Utf8Path>,
    host: Arc<dyn HostChannel>,
) -> Result<bool> {
    let context = TaskContext::load(config_dir)?;
    let tests: Vec<String> = args
        .tests
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let invoker = TestInvoker::new(&context.agent.default_working_dir, host.clone());
    let status = invoker
        .invoke(&args.test_language_input, &tests)
        .await
        .context("Failed to run automated tests")?;

    if status == 0 {
        host.complete(TaskResult::Succeeded, "Tests executed successfully.");
        Ok(true)
    } else {
        host.complete(
            TaskResult::Failed,
            &format!("Test execution failed with exit code {}.", status),
        );
        Ok(false)
    }
}
