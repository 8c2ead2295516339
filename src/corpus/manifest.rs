use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::{CardRecord, FacetRange, FilterFacets};

/// Facet counts carried by the manifest. Display/sanity only; the
/// authoritative facets come from the artifact body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestFilterSummary {
    #[serde(rename = "productCount")]
    pub product_count: usize,
    #[serde(rename = "traitCount")]
    pub trait_count: usize,
    #[serde(rename = "rarityCount")]
    pub rarity_count: usize,
    #[serde(rename = "costRange")]
    pub cost_range: FacetRange,
    #[serde(rename = "powerRange")]
    pub power_range: FacetRange,
}

/// Corpus manifest, fetched before the artifact to decide cache-or-fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusManifest {
    pub version: String,
    #[serde(default)]
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "fileSize", default)]
    pub file_size: String,
    #[serde(rename = "cardCount")]
    pub card_count: usize,
    #[serde(rename = "filterOptions")]
    pub filter_options: ManifestFilterSummary,
}

/// Decompressed artifact body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusArtifact {
    pub version: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "filterOptions")]
    pub filter_options: FilterFacets,
    pub cards: Vec<CardRecord>,
}
