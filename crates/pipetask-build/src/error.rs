//! Error types for pipetask-build

use thiserror::Error;

/// Result type alias using pipetask-build's Error type
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// No Maven executable could be located
    #[error("Maven executable not found: {0}")]
    MavenNotFound(String),

    /// `mvn -version` failed to run or exited non-zero
    #[error("Maven is not installed on the agent")]
    MavenNotInstalled,

    /// The options input could not be split into arguments
    #[error("Invalid Maven options: {0}")]
    InvalidOptions(String),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid test results pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error(transparent)]
    Core(#[from] pipetask_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }
}
