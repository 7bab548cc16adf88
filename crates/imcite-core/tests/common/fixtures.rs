//! Test fixture loading utilities

use std::path::PathBuf;

use imcite_core::{DataBroker, RepoConfig, Repository};
use tempfile::TempDir;

/// Get the path to a fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_fixtures")
        .join(name)
}

/// Load a fixture file as a string
pub fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", name))
}

/// Create an empty repository rooted in a fresh temporary directory
#[allow(dead_code)]
pub fn temp_repository() -> (TempDir, Repository) {
    let dir = TempDir::new().unwrap();
    let config = RepoConfig::new(dir.path().join("paperlib"));
    let repo = Repository::create(&config).unwrap();
    (dir, repo)
}

/// Create a broker over the real filesystem in a temporary directory
#[allow(dead_code)]
pub fn temp_broker() -> (TempDir, DataBroker) {
    let dir = TempDir::new().unwrap();
    let config = RepoConfig::new(dir.path().join("paperlib"));
    let broker = DataBroker::new(&config).unwrap();
    (dir, broker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_path() {
        let path = fixture_path("pagerank.bib");
        assert!(path.ends_with("test_fixtures/pagerank.bib"));
    }
}
