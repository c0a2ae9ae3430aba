//! On-disk fixtures: distribution archives and tool cache entries

use flate2::write::GzEncoder;
use flate2::Compression;
use pipetask_core::platform::Arch;
use pipetask_core::types::{NetworkConfig, RetryPolicy, RetryStrategy};
use pipetask_toolcache::{ToolCache, ToolVersion};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::constants::*;

/// Gzipped tarball of a minimal distribution with a `setup.sh`
pub fn distribution_tar_gz() -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, content, mode) in [
        ("setup.sh", SETUP_SCRIPT, 0o755),
        ("bin/python3", FAKE_INTERPRETER, 0o755),
        ("lib/README", b"stdlib".as_slice(), 0o644),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(mode);
        header.set_cksum();
        builder.append_data(&mut header, name, content).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Register an empty installation in `cache`
pub fn install(cache: &ToolCache, version: &str, arch: Arch) -> PathBuf {
    let source = TempDir::new().unwrap();
    fs::create_dir_all(source.path().join("bin")).unwrap();
    cache
        .register(PYTHON_TOOL, &ToolVersion::parse(version).unwrap(), arch, source.path())
        .unwrap()
}

/// Retry policy with millisecond delays
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        strategy: RetryStrategy::FixedDelay,
        backoff_multiplier: 1.0,
        initial_delay_ms: 10,
        max_delay_ms: 10,
    }
}

pub fn network() -> NetworkConfig {
    NetworkConfig::default()
}

pub fn tool_cache(root: &Path) -> ToolCache {
    ToolCache::new(root.join("tools"))
}
