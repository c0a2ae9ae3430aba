//! Maven build output classification
//!
//! Consumes Maven stdout one line at a time, in order, and turns the lines
//! that carry diagnostics into [`DiagnosticEvent`]s. The classifier tracks
//! which plugin is running from `<<< plugin:goal` markers so that SpotBugs
//! summary lines can be recognised. Anything else is build chatter and is
//! dropped; classification never fails.

use pipetask_core::host::{HostCommand, IssueType};
use pipetask_core::platform::Os;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Plugin whose INFO summaries are turned into issues
pub const SPOTBUGS_PLUGIN: &str = "spotbugs-maven-plugin";

const PLUGIN_MARKER: &str = "<<<";

static SPOTBUGS_ERRORS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Error size is \d+").expect("spotbugs errors regex is valid"));

static SPOTBUGS_BUGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Total bugs: \d+").expect("spotbugs bugs regex is valid"));

// Leading slash before the drive letter: /C:/a/1/s/File.java:[12,8] message
static WINDOWS_DIAGNOSTIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/([^:]+:[^:]+):\[([\d]+),([\d]+)\](.*)")
        .expect("windows diagnostic regex is valid")
});

// /home/agent/_work/4/s/File.java:[12,8] message
static POSIX_DIAGNOSTIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([a-zA-Z0-9_ \-/.]+):\[([0-9]+),([0-9]+)\](.*)")
        .expect("posix diagnostic regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    fn issue_type(self) -> Option<IssueType> {
        match self {
            Self::Warning => Some(IssueType::Warning),
            Self::Error => Some(IssueType::Error),
            Self::Info => None,
        }
    }
}

/// One diagnostic extracted from build output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub severity: Severity,
    /// Plugin running when the line was seen, if any
    pub plugin: Option<String>,
    pub file_path: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    /// Text reported to the host: the full matched diagnostic for compiler
    /// lines, a summary sentence for plugin findings
    pub message: String,
}

impl DiagnosticEvent {
    /// Host issue for this event; `None` for informational events
    pub fn to_host_command(&self) -> Option<HostCommand> {
        let issue_type = self.severity.issue_type()?;
        match (&self.file_path, self.line, self.column) {
            (Some(path), Some(line), Some(column)) => Some(HostCommand::located_issue(
                issue_type,
                path,
                line,
                column,
                &self.message,
            )),
            _ => Some(HostCommand::issue(issue_type, &self.message)),
        }
    }
}

/// Line classifier for one Maven invocation
#[derive(Debug, Clone)]
pub struct BuildOutputClassifier {
    current_plugin: String,
    fail_on_bugs: bool,
    os: Os,
}

impl BuildOutputClassifier {
    /// `os` selects the compiler diagnostic path format
    pub fn new(os: Os) -> Self {
        Self {
            current_plugin: String::new(),
            fail_on_bugs: false,
            os,
        }
    }

    /// Report SpotBugs findings as errors instead of warnings
    pub fn with_fail_on_bugs(mut self, fail_on_bugs: bool) -> Self {
        self.fail_on_bugs = fail_on_bugs;
        self
    }

    pub fn current_plugin(&self) -> &str {
        &self.current_plugin
    }

    /// Forget the plugin context before classifying a new stream
    pub fn reset(&mut self) {
        self.current_plugin.clear();
    }

    pub fn classify_line(&mut self, line: &str) -> Vec<DiagnosticEvent> {
        let input = line.trim();

        if input.starts_with(PLUGIN_MARKER) {
            self.switch_plugin(input);
            return Vec::new();
        }

        let Some(rest) = input.strip_prefix('[') else {
            return Vec::new();
        };
        let Some(close) = rest.find(']') else {
            return Vec::new();
        };
        let severity = &rest[..close];
        let remainder = &rest[close + 1..];

        match severity {
            "INFO" => {
                let info = remainder.trim();
                if info.starts_with(PLUGIN_MARKER) {
                    self.switch_plugin(info);
                }
                if self.current_plugin == SPOTBUGS_PLUGIN {
                    self.spotbugs_summary(info).into_iter().collect()
                } else {
                    Vec::new()
                }
            }
            "ERROR" => self.compiler_diagnostics(Severity::Error, remainder),
            "WARNING" => self.compiler_diagnostics(Severity::Warning, remainder),
            _ => Vec::new(),
        }
    }

    /// `<<< plugin:version:goal ...` names the plugin up to the first colon.
    /// A marker without a colon clears the context.
    fn switch_plugin(&mut self, marked: &str) {
        let data = marked.get(PLUGIN_MARKER.len() + 1..).unwrap_or("");
        self.current_plugin = match data.find(':') {
            Some(colon) => data[..colon].to_string(),
            None => String::new(),
        };
        debug!("Current plugin = {}", self.current_plugin);
    }

    fn spotbugs_summary(&self, info: &str) -> Option<DiagnosticEvent> {
        let (severity, noun) = if SPOTBUGS_ERRORS_RE.is_match(info) {
            (Severity::Error, "errors")
        } else if SPOTBUGS_BUGS_RE.is_match(info) {
            let severity = if self.fail_on_bugs {
                Severity::Error
            } else {
                Severity::Warning
            };
            (severity, "bugs")
        } else {
            return None;
        };

        let count: u64 = info.split(' ').next_back()?.parse().ok()?;
        if count == 0 {
            return None;
        }

        Some(DiagnosticEvent {
            severity,
            plugin: Some(self.current_plugin.clone()),
            file_path: None,
            line: None,
            column: None,
            message: format!("Found {} {} by SpotBugs plugin", count, noun),
        })
    }

    fn compiler_diagnostics(&self, severity: Severity, data: &str) -> Vec<DiagnosticEvent> {
        let pattern = if self.os.is_windows() {
            &*WINDOWS_DIAGNOSTIC_RE
        } else {
            &*POSIX_DIAGNOSTIC_RE
        };

        let plugin = (!self.current_plugin.is_empty()).then(|| self.current_plugin.clone());
        pattern
            .captures_iter(data)
            .filter_map(|caps| {
                let full = caps.get(0)?.as_str();
                let path = caps.get(1)?.as_str().trim();
                let line = caps.get(2)?.as_str().parse().ok()?;
                let column = caps.get(3)?.as_str().parse().ok()?;
                debug!("Diagnostic {}:{}:{} {}", path, line, column, full);
                Some(DiagnosticEvent {
                    severity,
                    plugin: plugin.clone(),
                    file_path: Some(path.to_string()),
                    line: Some(line),
                    column: Some(column),
                    message: full.trim().to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_all(
        classifier: &mut BuildOutputClassifier,
        lines: &[&str],
    ) -> Vec<DiagnosticEvent> {
        lines
            .iter()
            .flat_map(|line| classifier.classify_line(line))
            .collect()
    }

    #[test]
    fn test_spotbugs_total_bugs_is_warning() {
        let mut classifier = BuildOutputClassifier::new(Os::Linux);
        let events = classify_all(
            &mut classifier,
            &[
                "<<< spotbugs-maven-plugin:4.7.3.0:check (default-cli) < :spotbugs @ app <<<",
                "[INFO] Total bugs: 3",
            ],
        );

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, Severity::Warning);
        assert_eq!(events[0].message, "Found 3 bugs by SpotBugs plugin");
        assert_eq!(events[0].plugin.as_deref(), Some(SPOTBUGS_PLUGIN));
    }

    #[test]
    fn test_spotbugs_fail_on_bugs_is_error() {
        let mut classifier = BuildOutputClassifier::new(Os::Linux).with_fail_on_bugs(true);
        let events = classify_all(
            &mut classifier,
            &["[INFO] <<< spotbugs-maven-plugin:4.7.3.0:check", "[INFO] Total bugs: 2"],
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, Severity::Error);
    }

    #[test]
    fn test_spotbugs_error_size() {
        let mut classifier = BuildOutputClassifier::new(Os::Linux);
        let events = classify_all(
            &mut classifier,
            &[
                "<<< spotbugs-maven-plugin:4.7.3.0:check",
                "[INFO] Error size is 0",
                "[INFO] Error size is 4",
            ],
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, Severity::Error);
        assert_eq!(events[0].message, "Found 4 errors by SpotBugs plugin");
    }

    #[test]
    fn test_summaries_ignored_outside_spotbugs() {
        let mut classifier = BuildOutputClassifier::new(Os::Linux);
        let events = classify_all(
            &mut classifier,
            &[
                "<<< maven-compiler-plugin:3.11.0:compile",
                "[INFO] Total bugs: 3",
            ],
        );
        assert!(events.is_empty());
        assert_eq!(classifier.current_plugin(), "maven-compiler-plugin");
    }

    #[test]
    fn test_posix_compiler_error() {
        let mut classifier = BuildOutputClassifier::new(Os::Linux);
        let events = classifier.classify_line("[ERROR] /a/b/File.java:[10,5] unexpected token");

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.severity, Severity::Error);
        assert_eq!(event.file_path.as_deref(), Some("/a/b/File.java"));
        assert_eq!(event.line, Some(10));
        assert_eq!(event.column, Some(5));
        assert!(event.message.ends_with("unexpected token"));
    }

    #[test]
    fn test_windows_compiler_warning() {
        let mut classifier = BuildOutputClassifier::new(Os::Windows);
        let events = classifier
            .classify_line("[WARNING] /C:/a/1/s/src/main/java/App.java:[42,17] deprecated API");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, Severity::Warning);
        assert_eq!(events[0].file_path.as_deref(), Some("C:/a/1/s/src/main/java/App.java"));
        assert_eq!(events[0].line, Some(42));
        assert_eq!(events[0].column, Some(17));
    }

    #[test]
    fn test_chatter_is_dropped() {
        let mut classifier = BuildOutputClassifier::new(Os::Linux);
        let events = classify_all(
            &mut classifier,
            &[
                "Downloading from central: https://repo.maven.apache.org/...",
                "[INFO] BUILD SUCCESS",
                "[ERROR] Failed to execute goal on project app",
                "[DEBUG] /a/b/File.java:[1,1] not a diagnostic severity",
                "[ERROR",
                "",
            ],
        );
        assert!(events.is_empty());
    }

    #[test]
    fn test_reset_clears_plugin() {
        let mut classifier = BuildOutputClassifier::new(Os::Linux);
        classifier.classify_line("<<< spotbugs-maven-plugin:4.7.3.0:check");
        classifier.reset();
        assert!(classifier.classify_line("[INFO] Total bugs: 3").is_empty());
    }

    #[test]
    fn test_host_commands() {
        let mut classifier = BuildOutputClassifier::new(Os::Linux);
        let events = classifier.classify_line("[ERROR] /src/App.java:[3,9] cannot find symbol");
        let command = events[0].to_host_command().unwrap();
        assert_eq!(command.command(), "task.issue");
        assert_eq!(command.property("type"), Some("error"));
        assert_eq!(command.property("sourcepath"), Some("/src/App.java"));
        assert_eq!(command.property("linenumber"), Some("3"));
        assert_eq!(command.property("columnnumber"), Some("9"));

        let info = DiagnosticEvent {
            severity: Severity::Info,
            plugin: None,
            file_path: None,
            line: None,
            column: None,
            message: String::new(),
        };
        assert!(info.to_host_command().is_none());
    }
}
