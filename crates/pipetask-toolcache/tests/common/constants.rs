//! Shared constants for test infrastructure

pub const PYTHON_TOOL: &str = "Python";

pub const VERSION_3_10_1: &str = "3.10.1";
pub const VERSION_3_11_4: &str = "3.11.4";
pub const VERSION_3_13_RC: &str = "3.13.0-rc.1";

pub const MANIFEST_PATH: &str = "/versions-manifest.json";
pub const GITHUB_TOKEN: &str = "ghp_test_token";

pub const SETUP_SCRIPT: &[u8] = b"#!/bin/bash\necho setting up\ntouch .setup-ran\n";
pub const FAKE_INTERPRETER: &[u8] = b"#!/bin/sh\necho Python\n";

/// Archive path for a release file served by the mock server
pub fn archive_path(version: &str, arch: &str) -> String {
    format!("/python-{}-linux-{}.tar.gz", version, arch)
}
