//! Common test infrastructure for pipetask-build tests
//!
//! # Modules
//!
//! - `constants`: Canned Maven output lines
//! - `fixtures`: Fake Maven installations and test programs on disk

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod constants;
pub mod fixtures;

pub use constants::*;
pub use fixtures::*;
