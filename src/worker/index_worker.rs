use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{Receiver, Sender, unbounded};
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::CardRecord;
use crate::index::inverted::SearchIndex;
use crate::query::card_id::is_card_id;
use crate::query::filter::filter_by_attributes;
use crate::query::spec::QuerySpec;
use crate::search::results::FilteredPage;

/// Tuning knobs passed to the worker at spawn time
#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    pub min_keyword_len: usize,
    pub fuzzy_distance: u8,
    pub fuzzy_min_token_len: usize,
}

/// RPC surface of the index worker: exactly init, keyword search, and
/// attribute filtering. Replies travel back over per-request oneshots.
pub enum WorkerRequest {
    Init {
        cards: Arc<Vec<CardRecord>>,
        reply: oneshot::Sender<Result<()>>,
    },
    SearchByKeyword {
        keyword: String,
        reply: oneshot::Sender<Result<usize>>,
    },
    FilterByAttributes {
        spec: QuerySpec,
        limit: usize,
        reply: oneshot::Sender<Result<FilteredPage>>,
    },
}

/// Handle to the index worker thread.
///
/// The worker owns the corpus and index exclusively; the caller only ever
/// sees cloned records. Dropping the handle closes the request channel,
/// which lets the worker drain and exit, then joins it.
pub struct WorkerHandle {
    tx: Option<Sender<WorkerRequest>>,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn spawn(options: WorkerOptions) -> Result<Self> {
        let (tx, rx) = unbounded();
        let join = thread::Builder::new()
            .name("cardex-index".to_string())
            .spawn(move || worker_loop(rx, options))
            .map_err(|e| Error::new(ErrorKind::WorkerGone, format!("spawn: {}", e)))?;

        Ok(WorkerHandle {
            tx: Some(tx),
            join: Some(join),
        })
    }

    fn sender(&self) -> Result<&Sender<WorkerRequest>> {
        self.tx
            .as_ref()
            .ok_or_else(|| Error::new(ErrorKind::WorkerGone, "worker shut down".to_string()))
    }

    pub async fn init(&self, cards: Arc<Vec<CardRecord>>) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.sender()?
            .send(WorkerRequest::Init { cards, reply })
            .map_err(|_| Error::new(ErrorKind::WorkerGone, "worker channel closed".to_string()))?;
        rx.await
            .map_err(|_| Error::new(ErrorKind::WorkerGone, "worker dropped reply".to_string()))?
    }

    pub async fn search_by_keyword(&self, keyword: &str) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.sender()?
            .send(WorkerRequest::SearchByKeyword {
                keyword: keyword.to_string(),
                reply,
            })
            .map_err(|_| Error::new(ErrorKind::WorkerGone, "worker channel closed".to_string()))?;
        rx.await
            .map_err(|_| Error::new(ErrorKind::WorkerGone, "worker dropped reply".to_string()))?
    }

    pub async fn filter_by_attributes(&self, spec: QuerySpec, limit: usize) -> Result<FilteredPage> {
        let (reply, rx) = oneshot::channel();
        self.sender()?
            .send(WorkerRequest::FilterByAttributes { spec, limit, reply })
            .map_err(|_| Error::new(ErrorKind::WorkerGone, "worker channel closed".to_string()))?;
        rx.await
            .map_err(|_| Error::new(ErrorKind::WorkerGone, "worker dropped reply".to_string()))?
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

struct WorkerState {
    options: WorkerOptions,
    cards: Arc<Vec<CardRecord>>,
    index: Option<SearchIndex>,
    /// Ranked ordinals from the last keyword search; None = no keyword
    /// constraint, the whole corpus in order
    keyword_candidates: Option<Vec<u32>>,
}

fn worker_loop(rx: Receiver<WorkerRequest>, options: WorkerOptions) {
    info!("index worker started");
    let mut state = WorkerState {
        options,
        cards: Arc::new(Vec::new()),
        index: None,
        keyword_candidates: None,
    };

    for request in rx {
        match request {
            WorkerRequest::Init { cards, reply } => {
                let _ = reply.send(state.init(cards));
            }
            WorkerRequest::SearchByKeyword { keyword, reply } => {
                let _ = reply.send(state.search_by_keyword(&keyword));
            }
            WorkerRequest::FilterByAttributes { spec, limit, reply } => {
                let _ = reply.send(state.filter_by_attributes(&spec, limit));
            }
        }
    }
    info!("index worker stopped");
}

impl WorkerState {
    fn init(&mut self, cards: Arc<Vec<CardRecord>>) -> Result<()> {
        let index = SearchIndex::build(
            cards.as_slice(),
            self.options.fuzzy_distance,
            self.options.fuzzy_min_token_len,
        )?;
        self.cards = cards;
        self.index = Some(index);
        self.keyword_candidates = None;
        Ok(())
    }

    fn index(&self) -> Result<&SearchIndex> {
        self.index
            .as_ref()
            .ok_or_else(|| Error::new(ErrorKind::IndexNotReady, "init not completed".to_string()))
    }

    fn search_by_keyword(&mut self, keyword: &str) -> Result<usize> {
        let index = self.index()?;
        let keyword = keyword.trim();

        let candidates = if keyword.chars().count() < self.options.min_keyword_len {
            // Degenerate keywords impose no constraint rather than
            // flooding the index or spuriously hiding everything
            None
        } else if is_card_id(keyword) {
            Some(self.scan_identifiers(keyword))
        } else {
            Some(index.search(keyword))
        };

        let count = match &candidates {
            None => self.cards.len(),
            Some(ordinals) => ordinals.len(),
        };
        debug!(keyword = %keyword, candidates = count, "keyword search");
        self.keyword_candidates = candidates;
        Ok(count)
    }

    /// Exact/prefix scan over identifiers; fuzzy matching on structured
    /// ids yields junk so card-id shaped input bypasses the index
    fn scan_identifiers(&self, keyword: &str) -> Vec<u32> {
        let needle = keyword.to_ascii_lowercase();
        self.cards
            .iter()
            .enumerate()
            .filter(|(_, card)| {
                let id = card.id.to_ascii_lowercase();
                id == needle
                    || id.starts_with(&needle)
                    || card.base_id.to_ascii_lowercase() == needle
            })
            .map(|(ordinal, _)| ordinal as u32)
            .collect()
    }

    fn filter_by_attributes(&self, spec: &QuerySpec, limit: usize) -> Result<FilteredPage> {
        self.index()?;

        let filtered = match &self.keyword_candidates {
            None => filter_by_attributes(self.cards.iter(), spec),
            Some(ordinals) => filter_by_attributes(
                ordinals.iter().map(|&o| &self.cards[o as usize]),
                spec,
            ),
        };

        let total_matches = filtered.len();
        let cards: Vec<CardRecord> = filtered.into_iter().take(limit).cloned().collect();
        Ok(FilteredPage {
            cards,
            total_matches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CardLevel, FilterFacets};
    use crate::query::spec::FilterSelection;

    fn card(id: &str, base_id: &str, name: &str) -> CardRecord {
        CardRecord {
            id: id.to_string(),
            base_id: base_id.to_string(),
            name: name.to_string(),
            effect: String::new(),
            card_type: "Character".to_string(),
            color: "Red".to_string(),
            level: CardLevel::Rank(1),
            cost: 1,
            power: 5000,
            rarity: "C".to_string(),
            trait_tags: vec![],
            product_name: "Test Product".to_string(),
            card_id_prefix: "TST".to_string(),
            link: vec![],
        }
    }

    fn options() -> WorkerOptions {
        WorkerOptions {
            min_keyword_len: 2,
            fuzzy_distance: 1,
            fuzzy_min_token_len: 4,
        }
    }

    fn corpus() -> Arc<Vec<CardRecord>> {
        Arc::new(vec![
            card("TST-001C", "TST-001", "Brave Sword"),
            card("TST-002C", "TST-002", "Shield Bearer"),
            card("TST-003C", "TST-003", "Sword Dancer"),
        ])
    }

    fn empty_spec() -> QuerySpec {
        let facets = FilterFacets::derive(corpus().as_slice());
        QuerySpec::build(&FilterSelection::reset_to(&facets), &facets).unwrap()
    }

    #[tokio::test]
    async fn query_before_init_is_index_not_ready() {
        let worker = WorkerHandle::spawn(options()).unwrap();
        let err = worker.search_by_keyword("sword").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndexNotReady);

        let err = worker
            .filter_by_attributes(empty_spec(), 1000)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndexNotReady);
    }

    #[tokio::test]
    async fn keyword_then_filter_narrows() {
        let worker = WorkerHandle::spawn(options()).unwrap();
        worker.init(corpus()).await.unwrap();

        let count = worker.search_by_keyword("sword").await.unwrap();
        assert_eq!(count, 2);

        let page = worker.filter_by_attributes(empty_spec(), 1000).await.unwrap();
        assert_eq!(page.total_matches, 2);
        let ids: Vec<&str> = page.cards.iter().map(|c| c.id.as_str()).collect();
        assert!(ids.contains(&"TST-001C"));
        assert!(ids.contains(&"TST-003C"));
    }

    #[tokio::test]
    async fn short_keyword_passes_corpus_through() {
        let worker = WorkerHandle::spawn(options()).unwrap();
        worker.init(corpus()).await.unwrap();

        let count = worker.search_by_keyword("s").await.unwrap();
        assert_eq!(count, 3);

        let page = worker.filter_by_attributes(empty_spec(), 1000).await.unwrap();
        assert_eq!(page.total_matches, 3);
    }

    #[tokio::test]
    async fn card_id_keyword_short_circuits_to_exact_scan() {
        let worker = WorkerHandle::spawn(options()).unwrap();
        worker.init(corpus()).await.unwrap();

        let count = worker.search_by_keyword("TST-002C").await.unwrap();
        assert_eq!(count, 1);

        let page = worker.filter_by_attributes(empty_spec(), 1000).await.unwrap();
        assert_eq!(page.cards[0].id, "TST-002C");
    }

    #[tokio::test]
    async fn empty_corpus_queries_return_empty() {
        let worker = WorkerHandle::spawn(options()).unwrap();
        worker.init(Arc::new(Vec::new())).await.unwrap();

        let count = worker.search_by_keyword("sword").await.unwrap();
        assert_eq!(count, 0);

        let page = worker.filter_by_attributes(empty_spec(), 1000).await.unwrap();
        assert!(page.cards.is_empty());
        assert_eq!(page.total_matches, 0);
    }

    #[tokio::test]
    async fn reinit_resets_keyword_narrowing() {
        let worker = WorkerHandle::spawn(options()).unwrap();
        worker.init(corpus()).await.unwrap();
        worker.search_by_keyword("sword").await.unwrap();

        worker.init(corpus()).await.unwrap();
        let page = worker.filter_by_attributes(empty_spec(), 1000).await.unwrap();
        assert_eq!(page.total_matches, 3);
    }
}
