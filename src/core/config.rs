use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub cache_dir: PathBuf,

    // Query behavior
    pub debounce: Duration,                 // Keyword edit debounce window
    pub result_cap: usize,                  // Max cards returned per query
    pub min_keyword_len: usize,             // Shorter keywords pass the corpus through

    // Index build
    pub fuzzy_distance: u8,                 // Edit distance for Latin fuzzy expansion
    pub fuzzy_min_token_len: usize,         // Tokens shorter than this match exact-only

    // Corpus cache
    pub corpus_cache_entries: usize,        // LRU entries for loaded product sets
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: "http://localhost:8080".to_string(),
            cache_dir: PathBuf::from("./cache"),

            debounce: Duration::from_millis(200),
            result_cap: 1000,                   // Bounds render cost; true total still reported
            min_keyword_len: 2,

            fuzzy_distance: 1,
            fuzzy_min_token_len: 4,
            corpus_cache_entries: 4,
        }
    }
}
