//! Host command channel
//!
//! Tasks talk back to the pipeline agent by writing logging commands to
//! stdout in the form `##vso[area.event key=value;...]data`. The agent parses
//! these to set variables, extend `PATH` for later steps, attach issues to the
//! run summary and record the task result.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const PREFIX: &str = "##vso[";

/// Severity of an issue attached to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueType {
    Error,
    Warning,
}

impl IssueType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// Final outcome reported for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskResult {
    Succeeded,
    SucceededWithIssues,
    Failed,
}

impl TaskResult {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "Succeeded",
            Self::SucceededWithIssues => "SucceededWithIssues",
            Self::Failed => "Failed",
        }
    }
}

/// One logging command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCommand {
    command: String,
    properties: Vec<(String, String)>,
    data: String,
}

impl HostCommand {
    /// A command such as `task.setvariable` carrying `data`
    pub fn new(command: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            properties: Vec::new(),
            data: data.into(),
        }
    }

    /// Append a property; properties keep insertion order
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    pub fn set_variable(name: &str, value: &str) -> Self {
        Self::new("task.setvariable", value)
            .with_property("variable", name)
            .with_property("isOutput", "false")
            .with_property("issecret", "false")
    }

    pub fn prepend_path(path: &Path) -> Self {
        Self::new("task.prependpath", path.display().to_string())
    }

    pub fn issue(issue_type: IssueType, message: impl Into<String>) -> Self {
        Self::new("task.issue", message).with_property("type", issue_type.as_str())
    }

    /// Issue anchored to a source location
    pub fn located_issue(
        issue_type: IssueType,
        source_path: &str,
        line: u32,
        column: u32,
        message: impl Into<String>,
    ) -> Self {
        Self::issue(issue_type, message)
            .with_property("sourcepath", source_path)
            .with_property("linenumber", line.to_string())
            .with_property("columnnumber", column.to_string())
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::new("task.debug", message)
    }

    pub fn complete(result: TaskResult, message: impl Into<String>) -> Self {
        Self::new("task.complete", message).with_property("result", result.as_str())
    }

    /// `area.event` name
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn data(&self) -> &str {
        &self.data
    }
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PREFIX, self.command)?;
        if !self.properties.is_empty() {
            f.write_str(" ")?;
            for (key, value) in &self.properties {
                write!(f, "{}={};", key, escape_property(value))?;
            }
        }
        write!(f, "]{}", escape_data(&self.data))
    }
}

fn escape_data(value: &str) -> String {
    value
        .replace('%', "%AZP25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_property(value: &str) -> String {
    escape_data(value).replace(']', "%5D").replace(';', "%3B")
}

/// Destination for host commands and passthrough output
pub trait HostChannel: Send + Sync {
    /// Deliver one command to the host
    fn emit(&self, command: HostCommand);

    /// Pass a raw output line through to the host log
    fn write_line(&self, line: &str);

    fn set_variable(&self, name: &str, value: &str) {
        self.emit(HostCommand::set_variable(name, value));
    }

    fn prepend_path(&self, path: &Path) {
        self.emit(HostCommand::prepend_path(path));
    }

    fn issue(&self, issue_type: IssueType, message: &str) {
        self.emit(HostCommand::issue(issue_type, message));
    }

    fn debug(&self, message: &str) {
        self.emit(HostCommand::debug(message));
    }

    fn complete(&self, result: TaskResult, message: &str) {
        self.emit(HostCommand::complete(result, message));
    }

    /// Directories prepended to `PATH` so far in this task, most recent first
    fn prepended_paths(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// `PATH` for subprocesses started later in the task: the prepended
/// directories ahead of the inherited `PATH`. `None` when nothing was
/// prepended.
pub fn search_path(host: &dyn HostChannel) -> Option<OsString> {
    let mut entries = host.prepended_paths();
    if entries.is_empty() {
        return None;
    }
    if let Some(current) = env::var_os("PATH") {
        let inherited: Vec<PathBuf> = env::split_paths(&current)
            .filter(|p| !entries.contains(p))
            .collect();
        entries.extend(inherited);
    }
    match env::join_paths(entries) {
        Ok(joined) => Some(joined),
        Err(e) => {
            tracing::warn!("Could not build PATH for subprocesses: {}", e);
            None
        }
    }
}

fn push_front_unique(paths: &mut Vec<PathBuf>, dir: PathBuf) {
    paths.retain(|p| *p != dir);
    paths.insert(0, dir);
}

/// Writes commands to the process stdout, where the agent reads them
///
/// `task.prependpath` directories are also remembered so that tools spawned
/// later in the same task can be given them through [`search_path`].
#[derive(Debug, Default)]
pub struct StdoutChannel {
    lock: Mutex<()>,
    prepended: Mutex<Vec<PathBuf>>,
}

impl StdoutChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self, text: &str) {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", text) {
            tracing::warn!("Failed to write to stdout: {}", e);
        }
    }
}

impl HostChannel for StdoutChannel {
    fn emit(&self, command: HostCommand) {
        if command.command() == "task.prependpath" {
            let mut prepended = self.prepended.lock().unwrap_or_else(|e| e.into_inner());
            push_front_unique(&mut prepended, PathBuf::from(command.data()));
        }
        self.write(&command.to_string());
    }

    fn write_line(&self, line: &str) {
        self.write(line);
    }

    fn prepended_paths(&self) -> Vec<PathBuf> {
        self.prepended
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Captures commands in memory
#[derive(Debug, Default)]
pub struct RecordingChannel {
    commands: Mutex<Vec<HostCommand>>,
    lines: Mutex<Vec<String>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command emitted so far, in order
    pub fn commands(&self) -> Vec<HostCommand> {
        self.commands
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Commands with the given `area.event` name
    pub fn commands_named(&self, command: &str) -> Vec<HostCommand> {
        self.commands()
            .into_iter()
            .filter(|c| c.command() == command)
            .collect()
    }

    /// Raw passthrough lines
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Commands rendered as the agent would see them
    pub fn rendered(&self) -> Vec<String> {
        self.commands().iter().map(ToString::to_string).collect()
    }
}

impl HostChannel for RecordingChannel {
    fn emit(&self, command: HostCommand) {
        self.commands
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(command);
    }

    fn write_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(line.to_string());
    }

    fn prepended_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for command in self.commands_named("task.prependpath") {
            push_front_unique(&mut paths, PathBuf::from(command.data()));
        }
        paths
    }
}
