use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SejtoError;

pub const CONFIG_FNAME: &str = "sejto.toml";

/// HTTP cache state persisted between runs next to the dataset file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheState {
    #[serde(default)]
    pub data_checksum: String,
    #[serde(default)]
    pub http_etag: String,
    #[serde(default)]
    pub http_last_modified: String,
}

impl CacheState {
    /// Load cache state from a TOML file. A missing or unreadable file
    /// yields the default state; the next fetch simply skips the
    /// conditional request.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return Self::default(),
        };

        match toml::from_str(&raw) {
            Ok(state) => state,
            Err(err) => {
                warn!(path = %path.display(), %err, "invalid cache state file, ignoring");
                Self::default()
            }
        }
    }

    pub fn store(&self, path: &Path) -> Result<(), SejtoError> {
        let raw = toml::to_string_pretty(self)
            .map_err(|err| SejtoError::Render(err.to_string()))?;
        fs::write(path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file() {
        let state = CacheState::load(Path::new("/nonexistent/sejto.toml"));
        assert_eq!(state, CacheState::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FNAME);
        fs::write(&path, "not [valid toml").unwrap();

        let state = CacheState::load(&path);
        assert_eq!(state, CacheState::default());
    }

    #[test]
    fn test_store_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FNAME);

        let state = CacheState {
            data_checksum: "abc123".to_string(),
            http_etag: "\"etag-value\"".to_string(),
            http_last_modified: "Wed, 06 Nov 2024 10:00:00 GMT".to_string(),
        };
        state.store(&path).unwrap();

        assert_eq!(CacheState::load(&path), state);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FNAME);
        fs::write(&path, "data_checksum = \"abc\"\n").unwrap();

        let state = CacheState::load(&path);
        assert_eq!(state.data_checksum, "abc");
        assert!(state.http_etag.is_empty());
        assert!(state.http_last_modified.is_empty());
    }
}
