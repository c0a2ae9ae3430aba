//! Automated test invocation
//!
//! Runs a list of tests with each selected framework in turn. The combined
//! status is the first non-zero exit code, or 0 when every run passed.

use crate::error::Result;
use crate::process::run_passthrough;
use pipetask_core::host::{search_path, HostChannel};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestLanguage {
    JavaMaven,
    JavaGradle,
    Python,
}

impl FromStr for TestLanguage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "Java-Maven" => Ok(Self::JavaMaven),
            "Java-Gradle" => Ok(Self::JavaGradle),
            "Python" => Ok(Self::Python),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for TestLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JavaMaven => write!(f, "Java-Maven"),
            Self::JavaGradle => write!(f, "Java-Gradle"),
            Self::Python => write!(f, "Python"),
        }
    }
}

/// Runs tests with Maven, Gradle or pytest
pub struct TestInvoker {
    working_dir: PathBuf,
    host: Arc<dyn HostChannel>,
    maven: PathBuf,
    gradle: PathBuf,
    python: PathBuf,
}

impl TestInvoker {
    pub fn new(working_dir: impl Into<PathBuf>, host: Arc<dyn HostChannel>) -> Self {
        Self {
            working_dir: working_dir.into(),
            host,
            maven: PathBuf::from("mvn"),
            gradle: PathBuf::from("gradle"),
            python: PathBuf::from("python"),
        }
    }

    /// Override the program used for `language`
    pub fn with_program(mut self, language: TestLanguage, program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        match language {
            TestLanguage::JavaMaven => self.maven = program,
            TestLanguage::JavaGradle => self.gradle = program,
            TestLanguage::Python => self.python = program,
        }
        self
    }

    /// Program and arguments that run `tests` with `language`
    pub fn command_line(
        &self,
        language: TestLanguage,
        tests: &[String],
    ) -> (PathBuf, Vec<String>) {
        match language {
            TestLanguage::JavaMaven => (
                self.maven.clone(),
                vec!["test".to_string(), format!("-Dtest={}", tests.join(","))],
            ),
            TestLanguage::JavaGradle => {
                let mut args = vec!["test".to_string()];
                for test in tests {
                    args.push("--tests".to_string());
                    args.push(test.clone());
                }
                (self.gradle.clone(), args)
            }
            TestLanguage::Python => {
                let mut args = vec!["-m".to_string(), "pytest".to_string()];
                args.extend(tests.iter().cloned());
                (self.python.clone(), args)
            }
        }
    }

    /// Run `tests` with every language in `languages`
    ///
    /// Unknown languages are logged and skipped. A framework that cannot be
    /// started counts as exit code 1.
    pub async fn invoke(&self, languages: &[String], tests: &[String]) -> Result<i32> {
        let mut status = 0;

        for name in languages {
            let language = match name.parse::<TestLanguage>() {
                Ok(language) => language,
                Err(unknown) => {
                    warn!("Invalid test language input selected: '{}'", unknown);
                    continue;
                }
            };

            let (program, args) = self.command_line(language, tests);
            info!(
                "Running {} tests: {} {}",
                language,
                program.display(),
                args.join(" ")
            );

            let mut command = Command::new(&program);
            command.args(&args).current_dir(&self.working_dir);
            if let Some(path) = search_path(self.host.as_ref()) {
                command.env("PATH", path);
            }
            let name = program.display().to_string();
            let code = match run_passthrough(&mut command, &name, &self.host).await {
                Ok(code) => code,
                Err(e) => {
                    warn!("{}", e);
                    1
                }
            };

            if status == 0 {
                status = code;
            }
        }
        Ok(status)
    }
}
