//! Build tool tasks
//!
//! Runs Maven with its output classified into host diagnostics, publishes
//! JUnit results and invokes test frameworks for a list of tests.

pub mod classifier;
pub mod error;
pub mod invoker;
pub mod junit;
pub mod maven;
pub mod process;

pub use classifier::{BuildOutputClassifier, DiagnosticEvent, Severity};
pub use error::{Error, Result};
pub use invoker::{TestInvoker, TestLanguage};
pub use maven::{MavenInputs, MavenOutcome, MavenTask};
