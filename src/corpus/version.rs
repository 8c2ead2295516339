use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::Result;

/// Bump when the marker or cached artifact layout changes shape
const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct VersionMarker {
    schema_version: u32,
    corpus_version: String,
    artifact_crc32: u32,
}

/// Persisted corpus version marker.
///
/// One opaque token compared byte-for-byte against the manifest to decide
/// fetch-vs-reuse, plus the CRC32 of the cached artifact body. The schema
/// version is checked once here at load time; a mismatch clears the
/// marker instead of letting stale state leak into the loader.
pub struct VersionStore {
    path: PathBuf,
}

impl VersionStore {
    pub fn new(cache_dir: &Path) -> Self {
        VersionStore {
            path: cache_dir.join("corpus.version.json"),
        }
    }

    /// Current marker, or None when missing, unreadable or from another
    /// schema generation (both of the latter clear the file)
    pub fn current(&self) -> Option<(String, u32)> {
        let data = fs::read(&self.path).ok()?;
        match serde_json::from_slice::<VersionMarker>(&data) {
            Ok(marker) if marker.schema_version == SCHEMA_VERSION => {
                Some((marker.corpus_version, marker.artifact_crc32))
            }
            Ok(marker) => {
                warn!(
                    found = marker.schema_version,
                    expected = SCHEMA_VERSION,
                    "version marker schema mismatch, clearing"
                );
                self.clear();
                None
            }
            Err(err) => {
                warn!(error = %err, "version marker unreadable, clearing");
                self.clear();
                None
            }
        }
    }

    pub fn save(&self, corpus_version: &str, artifact_crc32: u32) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let marker = VersionMarker {
            schema_version: SCHEMA_VERSION,
            corpus_version: corpus_version.to_string(),
            artifact_crc32,
        };
        fs::write(&self.path, serde_json::to_vec(&marker)?)?;
        Ok(())
    }

    pub fn clear(&self) {
        let _ = fs::remove_file(&self.path);
    }
}
