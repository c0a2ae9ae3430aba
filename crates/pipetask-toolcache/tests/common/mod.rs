//! Common test infrastructure for pipetask-toolcache tests
//!
//! # Modules
//!
//! - `constants`: Versions, file names and archive content
//! - `builders`: Fluent builders for manifest releases
//! - `fixtures`: Archive and tool cache fixtures on disk
//! - `mock_server`: Wiremock setup helpers for manifest and archive endpoints

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod builders;
pub mod constants;
pub mod fixtures;
pub mod mock_server;

pub use builders::*;
pub use constants::*;
pub use fixtures::*;
pub use mock_server::*;
