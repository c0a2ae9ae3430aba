//! Maven task
//!
//! Locates Maven, checks it runs, then builds the POM with stdout classified
//! line by line into host diagnostics. JUnit results are published whether
//! or not the build succeeded.

use crate::classifier::BuildOutputClassifier;
use crate::error::{Error, Result};
use crate::junit;
use crate::process::{run_passthrough, run_streaming};
use pipetask_core::host::{search_path, HostChannel, TaskResult};
use pipetask_core::platform::Os;
use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

const SONAR_LATEST_GOAL: &str = "org.sonarsource.scanner.maven:sonar-maven-plugin:RELEASE:sonar";
const SONAR_POM_GOAL: &str = "sonar:sonar";

/// Where to find Maven
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MavenSelection {
    /// `M2_HOME`, then `PATH`
    Default,
    /// An explicit Maven home
    Path { home: PathBuf, set_m2_home: bool },
}

/// Which sonar plugin version to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SonarPlugin {
    Latest,
    Pom,
}

impl SonarPlugin {
    pub fn goal(self) -> &'static str {
        match self {
            Self::Latest => SONAR_LATEST_GOAL,
            Self::Pom => SONAR_POM_GOAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotbugsOptions {
    /// Goal run as `spotbugs:<goal>`
    pub goal: String,
    pub fail_when_bugs_found: bool,
}

/// Task inputs
#[derive(Debug, Clone)]
pub struct MavenInputs {
    pub pom_file: PathBuf,
    pub goals: Vec<String>,
    /// Extra command line, split with shell quoting rules
    pub options: Option<String>,
    /// Exported to Maven as `MAVEN_OPTS`
    pub maven_opts: Option<String>,
    pub selection: MavenSelection,
    /// Published as `JAVA_HOME` when set
    pub java_home: Option<PathBuf>,
    pub publish_junit_results: bool,
    pub test_results_files: String,
    pub test_run_title: Option<String>,
    pub sonar: Option<SonarPlugin>,
    pub spotbugs: Option<SpotbugsOptions>,
}

impl Default for MavenInputs {
    fn default() -> Self {
        Self {
            pom_file: PathBuf::from("pom.xml"),
            goals: vec!["package".to_string()],
            options: None,
            maven_opts: None,
            selection: MavenSelection::Default,
            java_home: None,
            publish_junit_results: true,
            test_results_files: "**/surefire-reports/TEST-*.xml".to_string(),
            test_run_title: None,
            sonar: None,
            spotbugs: None,
        }
    }
}

/// Result of a Maven task run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MavenOutcome {
    pub exit_code: i32,
    pub succeeded: bool,
    pub published_results: usize,
}

/// Locate the `mvn` launcher for `selection`
///
/// `search_path` replaces the process `PATH` for the lookup when given.
/// On Windows `.cmd` (Maven 3) or `.bat` (Maven 2) is appended when such a
/// file exists next to the bare name.
pub fn resolve_maven_executable(
    selection: &MavenSelection,
    os: Os,
    search_path: Option<&OsStr>,
) -> Result<PathBuf> {
    let exec = match selection {
        MavenSelection::Path { home, .. } => {
            debug!("Using Maven path from user input");
            home.join("bin").join("mvn")
        }
        MavenSelection::Default => match env::var_os("M2_HOME").filter(|v| !v.is_empty()) {
            Some(home) => {
                debug!("Using M2_HOME for Maven path: {}", Path::new(&home).display());
                Path::new(&home).join("bin").join("mvn")
            }
            None => {
                debug!("M2_HOME is not set, looking for Maven on PATH");
                let found = match search_path {
                    Some(paths) => which::which_in("mvn", Some(paths), "."),
                    None => which::which("mvn"),
                };
                found.map_err(|e| Error::MavenNotFound(e.to_string()))?
            }
        },
    };

    let exec = if os.is_windows() { with_windows_launcher(exec) } else { exec };
    if !exec.exists() {
        return Err(Error::MavenNotFound(exec.display().to_string()));
    }
    debug!("Maven executable: {}", exec.display());
    Ok(exec)
}

fn with_windows_launcher(exec: PathBuf) -> PathBuf {
    let lower = exec.to_string_lossy().to_ascii_lowercase();
    if lower.ends_with(".cmd") || lower.ends_with(".bat") {
        return exec;
    }
    for suffix in [".cmd", ".bat"] {
        let mut candidate = exec.clone().into_os_string();
        candidate.push(suffix);
        let candidate = PathBuf::from(candidate);
        if candidate.exists() {
            return candidate;
        }
    }
    exec
}

/// Arguments for the main Maven run, after `mvn`
pub fn build_arguments(inputs: &MavenInputs) -> Result<Vec<String>> {
    let mut args = vec!["-f".to_string(), inputs.pom_file.display().to_string()];

    if let Some(options) = inputs.options.as_deref().filter(|o| !o.trim().is_empty()) {
        let split =
            shlex::split(options).ok_or_else(|| Error::InvalidOptions(options.to_string()))?;
        args.extend(split);
    }
    args.extend(inputs.goals.iter().cloned());

    if let Some(sonar) = inputs.sonar {
        args.push(sonar.goal().to_string());
    }
    if let Some(spotbugs) = &inputs.spotbugs {
        args.push(format!("spotbugs:{}", spotbugs.goal));
    }
    Ok(args)
}

/// Runs Maven for one task invocation
pub struct MavenTask {
    inputs: MavenInputs,
    working_dir: PathBuf,
    os: Os,
    host: Arc<dyn HostChannel>,
}

impl MavenTask {
    pub fn new(
        inputs: MavenInputs,
        working_dir: impl Into<PathBuf>,
        os: Os,
        host: Arc<dyn HostChannel>,
    ) -> Self {
        Self {
            inputs,
            working_dir: working_dir.into(),
            os,
            host,
        }
    }

    /// Run the task and report completion to the host
    ///
    /// A missing or broken Maven is an error; a failing build is a
    /// successful run with `succeeded == false`.
    pub async fn run(&self) -> Result<MavenOutcome> {
        let (mvn, args) = match self.prepare().await {
            Ok(prepared) => prepared,
            Err(e) => {
                error!("{}", e);
                self.host.complete(TaskResult::Failed, "Build failed.");
                return Err(e);
            }
        };

        let exit_code = match self.build(&mvn, &args).await {
            Ok(code) => code,
            Err(e) => {
                error!("{}", e);
                -1
            }
        };
        let succeeded = exit_code == 0;

        let published_results = if self.inputs.publish_junit_results {
            match junit::publish_results(
                self.host.as_ref(),
                &self.inputs.test_results_files,
                &self.working_dir,
                self.inputs.test_run_title.as_deref(),
            ) {
                Ok(count) => count,
                Err(e) => {
                    warn!("Could not publish test results: {}", e);
                    0
                }
            }
        } else {
            0
        };

        if succeeded {
            self.host.complete(TaskResult::Succeeded, "Build Succeeded.");
        } else {
            self.host.complete(TaskResult::Failed, "Build failed.");
        }

        Ok(MavenOutcome {
            exit_code,
            succeeded,
            published_results,
        })
    }

    /// Resolve Maven, publish environment, check `mvn -version` and build
    /// the argument list
    async fn prepare(&self) -> Result<(PathBuf, Vec<String>)> {
        let args = build_arguments(&self.inputs)?;
        let path = search_path(self.host.as_ref());
        let mvn = resolve_maven_executable(&self.inputs.selection, self.os, path.as_deref())?;

        if let MavenSelection::Path {
            home,
            set_m2_home: true,
        } = &self.inputs.selection
        {
            self.host.set_variable("M2_HOME", &home.display().to_string());
        }
        if let Some(java_home) = &self.inputs.java_home {
            self.host.set_variable("JAVA_HOME", &java_home.display().to_string());
        }

        let mut version = self.command(&mvn);
        version.arg("-version");
        match run_passthrough(&mut version, "mvn", &self.host).await {
            Ok(0) => Ok((mvn, args)),
            Ok(code) => {
                debug!("mvn -version exited with {}", code);
                Err(Error::MavenNotInstalled)
            }
            Err(e) => {
                debug!("mvn -version failed: {}", e);
                Err(Error::MavenNotInstalled)
            }
        }
    }

    async fn build(&self, mvn: &Path, args: &[String]) -> Result<i32> {
        info!("Running Maven: {} {}", mvn.display(), args.join(" "));
        let mut command = self.command(mvn);
        command.args(args);

        let fail_on_bugs = self
            .inputs
            .spotbugs
            .as_ref()
            .is_some_and(|s| s.fail_when_bugs_found);
        let mut classifier = BuildOutputClassifier::new(self.os).with_fail_on_bugs(fail_on_bugs);
        let host = self.host.clone();

        run_streaming(&mut command, "mvn", &self.host, |line| {
            host.write_line(line);
            for event in classifier.classify_line(line) {
                if let Some(issue) = event.to_host_command() {
                    host.emit(issue);
                }
            }
        })
        .await
    }

    fn command(&self, mvn: &Path) -> Command {
        let mut command = Command::new(mvn);
        command.current_dir(&self.working_dir);
        if let Some(opts) = self.inputs.maven_opts.as_deref().filter(|o| !o.is_empty()) {
            debug!("MAVEN_OPTS is now set to {}", opts);
            command.env("MAVEN_OPTS", opts);
        }
        if let Some(java_home) = &self.inputs.java_home {
            command.env("JAVA_HOME", java_home);
        }
        if let Some(path) = search_path(self.host.as_ref()) {
            command.env("PATH", path);
        }
        command
    }
}
