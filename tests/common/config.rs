//! Test configuration helpers

use hn_dl::{Config, Crawler};
use tempfile::TempDir;
use wiremock::MockServer;

/// Config pointing the source at `server` and the destination at `dir`
pub fn config_for(server: &MockServer, dir: &TempDir) -> Config {
    let address = server.address();
    let mut config = Config::default();
    config.source.scheme = "http".to_string();
    config.source.host = format!("{}:{}", address.ip(), address.port());
    config.download.destination_dir = dir.path().to_path_buf();
    config.download.max_concurrent_fetches = 4;
    config
}

/// Crawler plus the temp directory it saves into (keep the dir alive for the test)
pub fn crawler_for(server: &MockServer) -> (Crawler, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let crawler = Crawler::new(config_for(server, &dir)).expect("Failed to create crawler");
    (crawler, dir)
}
