//! Core library for pipetask
//!
//! Shared building blocks for the pipeline task crates: the error taxonomy,
//! hierarchical runtime configuration, agent environment discovery, platform
//! normalization, the policy-based retry engine and the host command channel.

pub mod config;
pub mod error;
pub mod host;
pub mod lines;
pub mod platform;
pub mod retry;
pub mod types;

pub use error::{Error, Result};
