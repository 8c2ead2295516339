pub mod corpus_cache;
pub mod session;
