use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{CardLevel, CardRecord, FilterFacets};
use crate::corpus::loader::{CorpusLoader, LoadedCorpus};
use crate::query::spec::{FilterSelection, QuerySpec};
use crate::search::results::{FilteredPage, ResultSet};
use crate::session::corpus_cache::CorpusCache;
use crate::worker::index_worker::{WorkerHandle, WorkerOptions};

struct ActiveCorpus {
    version: String,
    cards: Arc<Vec<CardRecord>>,
    facets: FilterFacets,
    worker: WorkerHandle,
}

/// Session state for the card search engine.
///
/// Owns the corpus, the worker handle and the live filter selection.
/// The worker is torn down and recreated whenever the corpus identity
/// changes; no query is served against a half-initialized index. Every
/// evaluation carries a monotonic sequence number so a slow response for
/// an older selection can never clobber a newer one.
pub struct SearchSession {
    config: Config,
    loader: CorpusLoader,
    corpus_cache: CorpusCache,
    active: Option<ActiveCorpus>,
    selection: FilterSelection,
    results: ResultSet,
    seq: u64,
    keyword_gen: u64,
}

impl SearchSession {
    pub fn new(config: Config) -> Self {
        let loader = CorpusLoader::new(&config);
        let corpus_cache = CorpusCache::new(config.corpus_cache_entries);
        SearchSession {
            config,
            loader,
            corpus_cache,
            active: None,
            selection: FilterSelection::default(),
            results: ResultSet::default(),
            seq: 0,
            keyword_gen: 0,
        }
    }

    /// Load the full prebuilt corpus, retrying once from the remote
    /// source if the local copy turns out corrupt
    pub async fn load_remote(&mut self) -> Result<()> {
        let corpus = match self.loader.load().await {
            Ok(corpus) => corpus,
            Err(err) if err.is_corrupt() => {
                warn!(error = %err, "local corpus corrupt, refetching from remote");
                self.loader.load_fresh().await?
            }
            Err(err) => return Err(err),
        };
        self.install_corpus(corpus).await
    }

    /// Load a set of raw per-product files, via the session corpus cache
    pub async fn load_products(&mut self, prefixes: &[String]) -> Result<()> {
        if prefixes.is_empty() {
            self.teardown();
            return Ok(());
        }

        let key = CorpusCache::key(prefixes);
        let corpus = match self.corpus_cache.get(&key) {
            Some(hit) => {
                debug!(key = %key, "corpus cache hit");
                hit
            }
            None => {
                let loaded = self.loader.load_products(prefixes).await?;
                self.corpus_cache.put(key, loaded.clone());
                loaded
            }
        };
        self.install_corpus(corpus).await
    }

    /// Swap in a loaded corpus: tear down the old worker, spawn and
    /// initialize a new one, reset filters to the new facet bounds and
    /// publish the initial unfiltered result set
    pub async fn install_corpus(&mut self, corpus: LoadedCorpus) -> Result<()> {
        if let Some(active) = &self.active {
            if active.version == corpus.version {
                debug!(version = %corpus.version, "corpus unchanged, keeping worker");
                return Ok(());
            }
        }

        // Old worker is dropped (channel closed, thread joined) before
        // the replacement accepts a single query
        self.active = None;
        self.keyword_gen += 1;

        let worker = WorkerHandle::spawn(WorkerOptions {
            min_keyword_len: self.config.min_keyword_len,
            fuzzy_distance: self.config.fuzzy_distance,
            fuzzy_min_token_len: self.config.fuzzy_min_token_len,
        })?;
        worker.init(corpus.cards.clone()).await?;

        info!(version = %corpus.version, cards = corpus.cards.len(), "corpus installed");
        self.selection = FilterSelection::reset_to(&corpus.facets);
        self.active = Some(ActiveCorpus {
            version: corpus.version,
            cards: corpus.cards,
            facets: corpus.facets,
            worker,
        });
        self.evaluate(true).await
    }

    /// Drop the worker and all per-corpus state
    pub fn teardown(&mut self) {
        self.active = None;
        self.selection = FilterSelection::default();
        self.results = ResultSet::default();
        self.keyword_gen += 1;
    }

    pub fn is_ready(&self) -> bool {
        self.active.is_some()
    }

    pub fn corpus_version(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.version.as_str())
    }

    pub fn facets(&self) -> Option<&FilterFacets> {
        self.active.as_ref().map(|a| &a.facets)
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    /// Keyword edits are debounced: rapid successive calls supersede one
    /// another and only the last value reaches the worker
    pub async fn set_keyword(&mut self, keyword: impl Into<String>) -> Result<()> {
        self.selection.keyword = keyword.into();
        self.keyword_gen += 1;
        let generation = self.keyword_gen;

        if !self.config.debounce.is_zero() {
            tokio::time::sleep(self.config.debounce).await;
        }
        if self.keyword_gen != generation {
            debug!("keyword edit superseded during debounce");
            return Ok(());
        }
        self.evaluate(true).await
    }

    pub async fn set_card_types(&mut self, card_types: Vec<String>) -> Result<()> {
        self.selection.card_types = card_types;
        self.evaluate(false).await
    }

    pub async fn set_colors(&mut self, colors: Vec<String>) -> Result<()> {
        self.selection.colors = colors;
        self.evaluate(false).await
    }

    pub async fn set_product_name(&mut self, product_name: Option<String>) -> Result<()> {
        self.selection.product_name = product_name;
        self.evaluate(false).await
    }

    pub async fn set_traits(&mut self, traits: Vec<String>) -> Result<()> {
        self.selection.traits = traits;
        self.evaluate(false).await
    }

    pub async fn set_levels(&mut self, levels: Vec<CardLevel>) -> Result<()> {
        self.selection.levels = levels;
        self.evaluate(false).await
    }

    pub async fn set_rarities(&mut self, rarities: Vec<String>) -> Result<()> {
        self.selection.rarities = rarities;
        self.evaluate(false).await
    }

    pub async fn set_unique_only(&mut self, unique_only: bool) -> Result<()> {
        self.selection.unique_only = unique_only;
        self.evaluate(false).await
    }

    pub async fn set_cost_range(&mut self, cost_range: (u32, u32)) -> Result<()> {
        self.selection.cost_range = cost_range;
        self.evaluate(false).await
    }

    pub async fn set_power_range(&mut self, power_range: (u32, u32)) -> Result<()> {
        self.selection.power_range = power_range;
        self.evaluate(false).await
    }

    /// Clear every filter back to the facet-derived defaults
    pub async fn reset_filters(&mut self) -> Result<()> {
        let facets = self
            .active
            .as_ref()
            .map(|a| a.facets.clone())
            .ok_or_else(|| Error::new(ErrorKind::IndexNotReady, "no corpus loaded".to_string()))?;
        self.selection = FilterSelection::reset_to(&facets);
        self.keyword_gen += 1;
        self.evaluate(true).await
    }

    /// Run one evaluation of the current selection. A keyword change
    /// recomputes the worker's candidate cache first; attribute-only
    /// changes refine the cached candidates.
    async fn evaluate(&mut self, keyword_changed: bool) -> Result<()> {
        self.seq += 1;
        let seq = self.seq;

        let active = self
            .active
            .as_ref()
            .ok_or_else(|| Error::new(ErrorKind::IndexNotReady, "no corpus loaded".to_string()))?;
        // Malformed selections are rejected before anything is dispatched
        let spec = QuerySpec::build(&self.selection, &active.facets)?;

        if keyword_changed {
            active.worker.search_by_keyword(&spec.keyword).await?;
        }
        let page = active
            .worker
            .filter_by_attributes(spec, self.config.result_cap)
            .await;

        match page {
            Ok(page) => {
                self.apply_results(seq, page);
                Ok(())
            }
            Err(err) => {
                // Previous valid results stay in place on a failed query
                warn!(error = %err, "query evaluation failed");
                Err(err)
            }
        }
    }

    /// Stale responses (an older evaluation finishing after a newer one
    /// started) are discarded instead of overwriting newer results
    fn apply_results(&mut self, seq: u64, page: FilteredPage) {
        if seq != self.seq {
            debug!(seq, current = self.seq, "discarding stale query response");
            return;
        }
        let results = ResultSet::from_page(page);
        if results.truncated {
            warn!(
                total = results.total_matches,
                cap = self.config.result_cap,
                "result set truncated for display"
            );
        }
        self.results = results;
    }

    pub fn card_count(&self) -> usize {
        self.active.as_ref().map_or(0, |a| a.cards.len())
    }
}
