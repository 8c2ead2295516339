pub mod core;
pub mod analysis;
pub mod corpus;
pub mod index;
pub mod query;
pub mod search;
pub mod worker;
pub mod session;

/*
┌─────────────────────────────────────────────────────────────────────────┐
│                         CARDEX ARCHITECTURE                             │
└─────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────── SESSION ─────────────────────────────────┐
│                                                                         │
│  struct SearchSession                                                   │
│  • loader: CorpusLoader          // manifest + artifact fetch           │
│  • corpus_cache: CorpusCache     // LRU of loaded product sets          │
│  • active: Option<ActiveCorpus>  // corpus + facets + worker handle     │
│  • selection: FilterSelection    // live user intent                    │
│  • results: ResultSet            // capped list + true total            │
│  • seq: u64                      // stale-response discard              │
│                                                                         │
│  ActiveCorpus ──owns──> WorkerHandle ──channel──> worker thread         │
└─────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────── CORPUS ──────────────────────────────────┐
│                                                                         │
│  CorpusLoader ──fetch──> CorpusManifest ──decides──> cache-or-fetch     │
│       │                                                                 │
│       ├──gunzip+parse──> CorpusArtifact { version, facets, cards }      │
│       └──persists──> VersionStore (marker) + ArtifactCache (lz4 body)   │
│                                                                         │
│  linker::link_products: flatten groupings, scan 「name」 references,     │
│  link bidirectionally at base level, expand to printing ids             │
└─────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────── WORKER THREAD ──────────────────────────────┐
│                                                                         │
│  WorkerRequest: Init | SearchByKeyword | FilterByAttributes             │
│  • owns Arc<Vec<CardRecord>> + SearchIndex exclusively                  │
│  • keyword_candidates: ranked subset reused by attribute-only changes   │
│                                                                         │
│  SearchIndex ──per field──> FieldIndex { fst dict, roaring postings }   │
│       │                                                                 │
│       └──expansion──> exact | prefix | Levenshtein DFA (Latin, len≥4)   │
│                                                                         │
│  CardTokenizer: Latin words lowercased, CJK runs as character bigrams   │
└─────────────────────────────────────────────────────────────────────────┘

Data flow: loader → linker → worker init (index build) → keyword search
→ attribute filter → session results → caller
*/
