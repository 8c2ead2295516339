use std::collections::HashSet;

use crate::core::types::CardRecord;
use crate::query::spec::QuerySpec;

/// Applies the structured attribute predicates to a candidate set.
///
/// Pure selection over references: input order is preserved (keyword
/// rank order when narrowed, corpus order otherwise) and no card is
/// ever mutated. All predicates are conjunctive; the selected sets are
/// OR within themselves except traits, which require every selected
/// trait to be present. Uniqueness dedup runs last, keeping the first
/// printing seen per base id.
pub fn filter_by_attributes<'a, I>(candidates: I, spec: &QuerySpec) -> Vec<&'a CardRecord>
where
    I: IntoIterator<Item = &'a CardRecord>,
{
    let mut results: Vec<&CardRecord> = candidates
        .into_iter()
        .filter(|card| matches_attributes(card, spec))
        .collect();

    if spec.unique_only {
        let mut seen: HashSet<&str> = HashSet::new();
        results = results
            .into_iter()
            .filter(|card| seen.insert(card.base_id.as_str()))
            .collect();
    }

    results
}

fn matches_attributes(card: &CardRecord, spec: &QuerySpec) -> bool {
    if !spec.card_types.is_empty() && !spec.card_types.contains(&card.card_type) {
        return false;
    }
    if !spec.colors.is_empty() && !spec.colors.contains(&card.color) {
        return false;
    }
    if let Some(product) = &spec.product_name {
        if &card.product_name != product {
            return false;
        }
    }
    if !spec.traits.is_empty() && !spec.traits.iter().all(|t| card.trait_tags.contains(t)) {
        return false;
    }
    if !spec.levels.is_empty() && !spec.levels.contains(&card.level.normalized()) {
        return false;
    }
    if !spec.rarities.is_empty() && !spec.rarities.contains(&card.rarity) {
        return false;
    }
    if let Some((lo, hi)) = spec.cost_range {
        if card.cost < lo || card.cost > hi {
            return false;
        }
    }
    if let Some((lo, hi)) = spec.power_range {
        if card.power < lo || card.power > hi {
            return false;
        }
    }
    true
}
