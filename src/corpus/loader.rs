use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{info, warn};

use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{CardRecord, FilterFacets};
use crate::corpus::linker::{self, ProductGrouping};
use crate::corpus::manifest::{CorpusArtifact, CorpusManifest};
use crate::corpus::version::VersionStore;

const MANIFEST_FILE: &str = "card-db-manifest.json";

/// A corpus ready for indexing, tagged with its version token. Cards are
/// shared behind an Arc so cache hits install without copying the corpus.
#[derive(Debug, Clone)]
pub struct LoadedCorpus {
    pub version: String,
    pub cards: std::sync::Arc<Vec<CardRecord>>,
    pub facets: FilterFacets,
}

/// Local copy of the last accepted artifact, recompressed with lz4 for
/// fast reload. Validity is judged by the CRC recorded in the version
/// marker, not by the file alone.
struct ArtifactCache {
    path: PathBuf,
}

impl ArtifactCache {
    fn new(cache_dir: &Path) -> Self {
        ArtifactCache {
            path: cache_dir.join("corpus.cards.lz4"),
        }
    }

    fn read(&self, expected_crc: u32) -> Result<Vec<u8>> {
        let compressed = fs::read(&self.path).map_err(|e| {
            Error::new(ErrorKind::CorpusCorrupt, format!("local artifact: {}", e))
        })?;
        let body = lz4_flex::decompress_size_prepended(&compressed).map_err(|e| {
            Error::new(ErrorKind::CorpusCorrupt, format!("local artifact: {}", e))
        })?;
        if crc32fast::hash(&body) != expected_crc {
            return Err(Error::new(
                ErrorKind::CorpusCorrupt,
                "local artifact checksum mismatch".to_string(),
            ));
        }
        Ok(body)
    }

    fn write(&self, body: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, lz4_flex::compress_prepend_size(body))?;
        Ok(())
    }
}

/// Fetches and validates the corpus artifact.
///
/// The cache-or-fetch decision happens before any parsing: if the
/// persisted version token equals the manifest's current token, the local
/// copy is reused; otherwise the remote artifact is fetched, decoded and
/// persisted together with its token.
pub struct CorpusLoader {
    http: reqwest::Client,
    base_url: String,
    cache: ArtifactCache,
    versions: VersionStore,
}

impl CorpusLoader {
    pub fn new(config: &Config) -> Self {
        CorpusLoader {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache: ArtifactCache::new(&config.cache_dir),
            versions: VersionStore::new(&config.cache_dir),
        }
    }

    pub async fn load(&self) -> Result<LoadedCorpus> {
        let manifest = self.fetch_manifest().await?;

        if let Some((version, crc)) = self.versions.current() {
            if version == manifest.version {
                info!(version = %version, "corpus version unchanged, reusing local artifact");
                let body = self.cache.read(crc)?;
                return decode_corpus(&body);
            }
        }

        self.fetch_artifact(&manifest).await
    }

    /// Authoritative remote fetch, bypassing all local state. The retry
    /// path after a corrupt local copy.
    pub async fn load_fresh(&self) -> Result<LoadedCorpus> {
        self.versions.clear();
        let manifest = self.fetch_manifest().await?;
        self.fetch_artifact(&manifest).await
    }

    async fn fetch_manifest(&self) -> Result<CorpusManifest> {
        let url = format!("{}/{}", self.base_url, MANIFEST_FILE);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::new(
                ErrorKind::CorpusUnavailable,
                format!("manifest fetch failed: HTTP {}", response.status()),
            ));
        }
        let body = response.bytes().await?;
        let manifest: CorpusManifest = serde_json::from_slice(&body)?;
        Ok(manifest)
    }

    async fn fetch_artifact(&self, manifest: &CorpusManifest) -> Result<LoadedCorpus> {
        let url = format!("{}/{}", self.base_url, manifest.file_name);
        info!(version = %manifest.version, cards = manifest.card_count, "fetching corpus artifact");

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::new(
                ErrorKind::CorpusUnavailable,
                format!("artifact fetch failed: HTTP {}", response.status()),
            ));
        }
        let compressed = response.bytes().await?;

        let body = gunzip(&compressed)?;
        let corpus = decode_corpus(&body)?;

        // Accepted: persist body + token so the next load can skip the fetch
        if let Err(err) = self
            .cache
            .write(&body)
            .and_then(|_| self.versions.save(&corpus.version, crc32fast::hash(&body)))
        {
            warn!(error = %err, "failed to persist local artifact copy");
        }

        Ok(corpus)
    }

    /// Fetch one raw per-product card file (`card-data/<prefix>.json`)
    pub async fn fetch_product(&self, prefix: &str) -> Result<ProductGrouping> {
        let url = format!("{}/card-data/{}.json", self.base_url, prefix);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::new(
                ErrorKind::CorpusUnavailable,
                format!("product fetch failed for {}: HTTP {}", prefix, response.status()),
            ));
        }
        let body = response.bytes().await?;
        let grouping: ProductGrouping = serde_json::from_slice(&body)?;
        Ok(grouping)
    }

    /// Fetch, flatten and link a set of products, deriving facets locally
    pub async fn load_products(&self, prefixes: &[String]) -> Result<LoadedCorpus> {
        let mut files = Vec::with_capacity(prefixes.len());
        for prefix in prefixes {
            files.push((prefix.clone(), self.fetch_product(prefix).await?));
        }
        let cards = linker::link_products(&files)?;
        let facets = FilterFacets::derive(&cards);
        Ok(LoadedCorpus {
            version: prefixes.join(","),
            cards: std::sync::Arc::new(cards),
            facets,
        })
    }
}

fn gunzip(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(compressed);
    let mut body = Vec::new();
    decoder
        .read_to_end(&mut body)
        .map_err(|e| Error::new(ErrorKind::CorpusCorrupt, format!("gzip: {}", e)))?;
    Ok(body)
}

fn decode_corpus(body: &[u8]) -> Result<LoadedCorpus> {
    let artifact: CorpusArtifact = serde_json::from_slice(body)?;
    info!(
        version = %artifact.version,
        cards = artifact.cards.len(),
        "corpus decoded"
    );
    Ok(LoadedCorpus {
        version: artifact.version,
        cards: std::sync::Arc::new(artifact.cards),
        facets: artifact.filter_options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn artifact_json() -> Vec<u8> {
        serde_json::json!({
            "version": "vtest0001",
            "filterOptions": {
                "productNames": ["Test Product"],
                "traits": ["Magic"],
                "rarities": ["C", "RR"],
                "costRange": {"min": 0, "max": 3},
                "powerRange": {"min": 1000, "max": 9000}
            },
            "cards": [{
                "id": "TST-001C",
                "baseId": "TST-001",
                "name": "Alice",
                "effect": "",
                "type": "Character",
                "color": "Red",
                "level": "-",
                "cost": 1,
                "power": 5000,
                "rarity": "C",
                "trait": ["Magic"],
                "product_name": "Test Product",
                "cardIdPrefix": "TST",
                "link": []
            }]
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn gzip_roundtrip_decodes_artifact() {
        let json = artifact_json();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json).unwrap();
        let compressed = encoder.finish().unwrap();

        let body = gunzip(&compressed).unwrap();
        let corpus = decode_corpus(&body).unwrap();
        assert_eq!(corpus.version, "vtest0001");
        assert_eq!(corpus.cards.len(), 1);
        assert_eq!(corpus.facets.rarities, vec!["C", "RR"]);
    }

    #[test]
    fn truncated_gzip_is_corpus_corrupt() {
        let json = artifact_json();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json).unwrap();
        let compressed = encoder.finish().unwrap();

        let err = gunzip(&compressed[..compressed.len() / 2]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CorpusCorrupt);
    }

    #[test]
    fn malformed_json_is_corpus_corrupt() {
        let err = decode_corpus(b"{\"version\": ").unwrap_err();
        assert_eq!(err.kind, ErrorKind::CorpusCorrupt);
    }

    #[test]
    fn artifact_cache_detects_checksum_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::new(dir.path());
        let body = artifact_json();

        cache.write(&body).unwrap();
        assert_eq!(cache.read(crc32fast::hash(&body)).unwrap(), body);

        let err = cache.read(crc32fast::hash(&body) ^ 1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CorpusCorrupt);
    }

    #[test]
    fn missing_local_artifact_is_corpus_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::new(dir.path());
        let err = cache.read(0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CorpusCorrupt);
    }
}
