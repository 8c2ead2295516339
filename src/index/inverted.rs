use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use fst::automaton::Str;
use fst::{Automaton, IntoStreamer, Map, MapBuilder, Streamer};
use levenshtein_automata::Distance;
use rayon::prelude::*;
use roaring::RoaringBitmap;
use tracing::info;

use crate::analysis::tokenizer::{CardTokenizer, is_latin_token};
use crate::core::error::Result;
use crate::core::types::CardRecord;
use crate::index::fuzzy::{FuzzyDfa, FuzzyTermMatcher};

/// Match qualities per tier; exact beats prefix beats fuzzy
const QUALITY_EXACT: f32 = 1.0;
const QUALITY_PREFIX: f32 = 0.6;
const QUALITY_FUZZY: f32 = 0.5;

/// Cap on dictionary terms visited per prefix/fuzzy expansion
const EXPANSION_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Name,
    Effect,
    Id,
}

/// Searched fields with their ranking weights (name and effect count
/// double relative to the identifier, matching the upstream search keys)
const FIELD_SPECS: [(SearchField, f32); 3] = [
    (SearchField::Name, 2.0),
    (SearchField::Effect, 2.0),
    (SearchField::Id, 1.0),
];

fn field_text(card: &CardRecord, field: SearchField) -> &str {
    match field {
        SearchField::Name => &card.name,
        SearchField::Effect => &card.effect,
        SearchField::Id => &card.id,
    }
}

/// Inverted index for one card field: fst term dictionary mapping each
/// term to an ordinal into the postings table
pub struct FieldIndex {
    pub field: SearchField,
    pub weight: f32,
    dict: Map<Vec<u8>>,
    postings: Vec<RoaringBitmap>,
}

impl FieldIndex {
    fn build(
        cards: &[CardRecord],
        tokenizer: &CardTokenizer,
        field: SearchField,
        weight: f32,
    ) -> Result<Self> {
        // BTreeMap keeps terms sorted, which is what the fst builder needs
        let mut terms: BTreeMap<String, RoaringBitmap> = BTreeMap::new();
        for (ordinal, card) in cards.iter().enumerate() {
            for token in tokenizer.tokenize(field_text(card, field)) {
                terms.entry(token).or_default().insert(ordinal as u32);
            }
        }

        let mut postings = Vec::with_capacity(terms.len());
        let mut builder = MapBuilder::memory();
        for (term_ordinal, (term, docs)) in terms.into_iter().enumerate() {
            builder.insert(term.as_bytes(), term_ordinal as u64)?;
            postings.push(docs);
        }
        let dict = Map::new(builder.into_inner()?)?;

        Ok(FieldIndex {
            field,
            weight,
            dict,
            postings,
        })
    }

    fn docs_for_term_ordinal(&self, ordinal: u64) -> &RoaringBitmap {
        &self.postings[ordinal as usize]
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }
}

/// Token index over name/effect/id of the whole corpus
pub struct SearchIndex {
    fields: Vec<FieldIndex>,
    doc_count: usize,
    tokenizer: CardTokenizer,
    fuzzy: FuzzyTermMatcher,
    fuzzy_min_token_len: usize,
}

impl SearchIndex {
    pub fn build(cards: &[CardRecord], fuzzy_distance: u8, fuzzy_min_token_len: usize) -> Result<Self> {
        let started = Instant::now();
        let tokenizer = CardTokenizer::default();

        let fields: Vec<FieldIndex> = FIELD_SPECS
            .par_iter()
            .map(|(field, weight)| FieldIndex::build(cards, &tokenizer, *field, *weight))
            .collect::<Result<_>>()?;

        let term_count: usize = fields.iter().map(FieldIndex::term_count).sum();
        info!(
            cards = cards.len(),
            terms = term_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search index built"
        );

        Ok(SearchIndex {
            fields,
            doc_count: cards.len(),
            tokenizer,
            fuzzy: FuzzyTermMatcher::new(fuzzy_distance),
            fuzzy_min_token_len,
        })
    }

    pub fn doc_count(&self) -> usize {
        self.doc_count
    }

    /// Ranked keyword search. Every query token must match (AND across
    /// tokens, best-quality union across fields per token); ties in score
    /// fall back to corpus order so equal queries return equal sequences.
    pub fn search(&self, keyword: &str) -> Vec<u32> {
        let tokens = self.tokenizer.tokenize(keyword);
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut combined: Option<HashMap<u32, f32>> = None;
        for token in &tokens {
            let per_token = self.match_token(token);
            combined = Some(match combined {
                None => per_token,
                Some(prev) => {
                    let mut merged = HashMap::new();
                    for (doc, score) in prev {
                        if let Some(extra) = per_token.get(&doc) {
                            merged.insert(doc, score + extra);
                        }
                    }
                    merged
                }
            });
            if combined.as_ref().is_some_and(|docs| docs.is_empty()) {
                return Vec::new();
            }
        }

        let mut scored: Vec<(u32, f32)> = combined.unwrap_or_default().into_iter().collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.into_iter().map(|(doc, _)| doc).collect()
    }

    /// Per-field best match quality for one token, weighted and summed
    /// across fields
    fn match_token(&self, token: &str) -> HashMap<u32, f32> {
        let latin = is_latin_token(token);
        let fuzzy_eligible = latin && token.chars().count() >= self.fuzzy_min_token_len;
        let mut scores: HashMap<u32, f32> = HashMap::new();

        for field in &self.fields {
            let mut best: HashMap<u32, f32> = HashMap::new();

            if let Some(ordinal) = field.dict.get(token.as_bytes()) {
                for doc in field.docs_for_term_ordinal(ordinal) {
                    best.insert(doc, QUALITY_EXACT);
                }
            }

            // Prefix expansion gives Latin input substring-ish recall
            if latin && token.len() >= 2 {
                let prefix = Str::new(token).starts_with();
                let mut stream = field.dict.search(prefix).into_stream();
                let mut visited = 0;
                while let Some((term, ordinal)) = stream.next() {
                    if term == token.as_bytes() {
                        continue;
                    }
                    for doc in field.docs_for_term_ordinal(ordinal) {
                        merge_quality(&mut best, doc, QUALITY_PREFIX);
                    }
                    visited += 1;
                    if visited >= EXPANSION_LIMIT {
                        break;
                    }
                }
            }

            if fuzzy_eligible {
                let dfa = self.fuzzy.dfa_for(token);
                let mut stream = field.dict.search(FuzzyDfa(&dfa)).into_stream();
                let mut visited = 0;
                while let Some((term, ordinal)) = stream.next() {
                    let quality = match dfa.eval(term) {
                        Distance::Exact(0) => QUALITY_EXACT,
                        Distance::Exact(_) => QUALITY_FUZZY,
                        Distance::AtLeast(_) => continue,
                    };
                    for doc in field.docs_for_term_ordinal(ordinal) {
                        merge_quality(&mut best, doc, quality);
                    }
                    visited += 1;
                    if visited >= EXPANSION_LIMIT {
                        break;
                    }
                }
            }

            for (doc, quality) in best {
                *scores.entry(doc).or_insert(0.0) += field.weight * quality;
            }
        }

        scores
    }
}

fn merge_quality(best: &mut HashMap<u32, f32>, doc: u32, quality: f32) {
    let entry = best.entry(doc).or_insert(0.0);
    if quality > *entry {
        *entry = quality;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CardLevel;

    fn card(id: &str, name: &str, effect: &str) -> CardRecord {
        CardRecord {
            id: id.to_string(),
            base_id: id.to_string(),
            name: name.to_string(),
            effect: effect.to_string(),
            card_type: "Character".to_string(),
            color: "Blue".to_string(),
            level: CardLevel::Rank(1),
            cost: 1,
            power: 5000,
            rarity: "C".to_string(),
            trait_tags: vec![],
            product_name: "Test".to_string(),
            card_id_prefix: "TST".to_string(),
            link: vec![],
        }
    }

    fn index(cards: &[CardRecord]) -> SearchIndex {
        SearchIndex::build(cards, 1, 4).unwrap()
    }

    #[test]
    fn exact_name_match_wins() {
        let cards = vec![
            card("TST-001", "Brave Sword", ""),
            card("TST-002", "Shield Bearer", ""),
        ];
        let idx = index(&cards);
        assert_eq!(idx.search("sword"), vec![0]);
    }

    #[test]
    fn fuzzy_matches_one_edit() {
        let cards = vec![card("TST-001", "Brave Sword", "")];
        let idx = index(&cards);
        assert_eq!(idx.search("swrod"), vec![0]);
    }

    #[test]
    fn cjk_bigrams_match_substrings() {
        let cards = vec![
            card("TST-001", "魔法少女リリ", ""),
            card("TST-002", "剣士", ""),
        ];
        let idx = index(&cards);
        assert_eq!(idx.search("魔法"), vec![0]);
        assert_eq!(idx.search("法少"), vec![0]);
        assert!(idx.search("剣士").contains(&1));
    }

    #[test]
    fn all_tokens_must_match() {
        let cards = vec![
            card("TST-001", "Brave Sword", "Draw a card"),
            card("TST-002", "Brave Shield", "Discard a card"),
        ];
        let idx = index(&cards);
        let hits = idx.search("brave draw");
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn double_field_match_ranks_above_single() {
        let cards = vec![
            card("TST-001", "Healer", "Restore a card"),
            card("TST-002", "Restore", "Restore everything"),
        ];
        let idx = index(&cards);
        // Card 1 matches "restore" in both name and effect, card 0 only in effect
        let hits = idx.search("restore");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0], 1);
    }

    #[test]
    fn equal_scores_fall_back_to_corpus_order() {
        let cards = vec![
            card("TST-001", "Brave Sword", ""),
            card("TST-002", "Brave Sword", ""),
        ];
        let idx = index(&cards);
        assert_eq!(idx.search("brave"), vec![0, 1]);
    }

    #[test]
    fn empty_corpus_returns_empty() {
        let idx = index(&[]);
        assert!(idx.search("anything").is_empty());
    }

    #[test]
    fn same_query_same_order() {
        let cards: Vec<CardRecord> = (0..50)
            .map(|i| card(&format!("TST-{:03}", i), "Brave Sword", "Slash"))
            .collect();
        let idx = index(&cards);
        let first = idx.search("sword");
        let second = idx.search("sword");
        assert_eq!(first, second);
        assert_eq!(first.len(), 50);
    }
}
