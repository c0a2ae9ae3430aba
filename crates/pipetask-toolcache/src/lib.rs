//! Tool version resolution and acquisition
//!
//! Given a version constraint and a target architecture, finds the best
//! matching installation in the agent's tool cache, falls back to a remote
//! versions manifest (download, extract, run the bundled setup script,
//! register in the cache) and publishes the resulting paths to the host.

pub mod acquire;
pub mod cache;
pub mod candidate;
pub mod download;
pub mod error;
pub mod extract;
pub mod manifest;
pub mod publish;
pub mod python;
pub mod setup;
pub mod version;

pub use acquire::{AcquisitionPipeline, AcquisitionRequest};
pub use cache::ToolCache;
pub use candidate::{select_best, CandidateLocation, ToolCandidate};
pub use error::{AttemptedVersion, Error, Result};
pub use publish::{EnvironmentPublisher, ResolvedInstallation};
pub use version::{ToolVersion, VersionSpec};
