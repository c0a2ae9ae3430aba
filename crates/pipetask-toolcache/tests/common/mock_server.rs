//! Mock server helpers for manifest and archive endpoints

use pipetask_toolcache::manifest::ManifestRelease;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::constants::*;
use super::fixtures::distribution_tar_gz;

/// Serve `releases` as the versions manifest
pub async fn mock_manifest(server: &MockServer, releases: &[ManifestRelease]) {
    Mock::given(method("GET"))
        .and(path(MANIFEST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(releases))
        .mount(server)
        .await;
}

/// Serve the standard distribution tarball, expecting exactly `times` requests
pub async fn mock_archive(server: &MockServer, version: &str, arch: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(archive_path(version, arch)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(distribution_tar_gz()))
        .expect(times)
        .mount(server)
        .await;
}

/// Answer `route` with a bare status, expecting exactly `times` requests
pub async fn mock_status(server: &MockServer, route: &str, status: u16, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .expect(times)
        .mount(server)
        .await;
}

/// Fail `fail_count` times with 503, then serve `body`
pub async fn mock_flaky(server: &MockServer, route: &str, fail_count: u64, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(fail_count)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

pub fn manifest_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), MANIFEST_PATH)
}
