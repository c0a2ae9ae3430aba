//! Maven build command

use super::TaskContext;
use crate::cli::{MavenArgs, MavenVersionSelection, SonarPluginChoice};
use anyhow::{bail, Result};
use camino::Utf8Path;
use pipetask_build::maven::{MavenSelection, SonarPlugin, SpotbugsOptions};
use pipetask_build::{MavenInputs, MavenTask};
use pipetask_core::host::HostChannel;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

pub async fn run(
    args: MavenArgs,
    config_dir: Option<&Utf8Path>,
    host: Arc<dyn HostChannel>,
) -> Result<bool> {
    let context = TaskContext::load(config_dir)?;
    let working_dir = context.agent.default_working_dir.clone();
    let inputs = inputs_from_args(args, &working_dir)?;

    let task = MavenTask::new(inputs, &working_dir, context.platform.os, host);
    match task.run().await {
        Ok(outcome) => {
            info!(
                "Maven exited with {} ({} result files published)",
                outcome.exit_code, outcome.published_results
            );
            Ok(outcome.succeeded)
        }
        Err(e) => {
            // Completion was already reported by the task
            error!("{}", e);
            Ok(false)
        }
    }
}

fn inputs_from_args(args: MavenArgs, working_dir: &Path) -> Result<MavenInputs> {
    let selection = match args.maven_version_selection {
        MavenVersionSelection::Default => MavenSelection::Default,
        MavenVersionSelection::Path => {
            let Some(home) = args.maven_path else {
                bail!("--maven-path is required when the Maven version selection is Path");
            };
            MavenSelection::Path {
                home,
                set_m2_home: args.maven_set_m2_home,
            }
        }
    };

    let goals: Vec<String> = args.goals.split_whitespace().map(str::to_string).collect();
    if goals.is_empty() {
        bail!("At least one Maven goal is required");
    }

    let sonar = args.sq_analysis_enabled.then(|| match args.sq_maven_plugin_version_choice {
        SonarPluginChoice::Latest => SonarPlugin::Latest,
        SonarPluginChoice::Pom => SonarPlugin::Pom,
    });
    let spotbugs = args.spot_bugs_analysis_enabled.then(|| SpotbugsOptions {
        goal: args.spot_bugs_goal,
        fail_when_bugs_found: args.spot_bugs_fail_when_bugs_found,
    });

    Ok(MavenInputs {
        pom_file: working_dir.join(args.maven_pom_file),
        goals,
        options: args.options,
        maven_opts: args.maven_opts,
        selection,
        java_home: args.jdk_user_input_path,
        publish_junit_results: args.publish_junit_results,
        test_results_files: args.test_results_files,
        test_run_title: args.test_run_title,
        sonar,
        spotbugs,
    })
}
