use std::collections::{BTreeMap, BTreeSet, HashMap};

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{CardLevel, CardRecord};

/// One raw per-product card file: base id → base attributes + printings.
/// BTreeMap so flattening never depends on file iteration order.
pub type ProductGrouping = BTreeMap<String, BaseCardEntry>;

#[derive(Debug, Clone, Deserialize)]
pub struct BaseCardEntry {
    pub name: String,
    #[serde(default)]
    pub effect: String,
    #[serde(rename = "type")]
    pub card_type: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub level: CardLevel,
    #[serde(default)]
    pub cost: u32,
    #[serde(default)]
    pub power: u32,
    #[serde(rename = "trait", default)]
    pub trait_tags: Vec<String>,
    #[serde(rename = "product_name", default)]
    pub product_name: String,
    /// Upstream-provided base-id references, if the crawler resolved any
    #[serde(default)]
    pub link: Vec<String>,
    #[serde(rename = "all_cards", default)]
    pub printings: Vec<PrintingEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrintingEntry {
    pub id: String,
    #[serde(default)]
    pub rarity: String,
}

/// Flatten base+printing groupings into individual records. `link` still
/// holds raw base ids at this point; `resolve_links` rewrites it.
pub fn flatten(products: &[(String, ProductGrouping)]) -> Vec<CardRecord> {
    let mut cards = Vec::new();
    for (prefix, grouping) in products {
        for (base_id, entry) in grouping {
            for printing in &entry.printings {
                cards.push(CardRecord {
                    id: printing.id.clone(),
                    base_id: base_id.clone(),
                    name: entry.name.clone(),
                    effect: entry.effect.clone(),
                    card_type: entry.card_type.clone(),
                    color: entry.color.clone(),
                    level: entry.level,
                    cost: entry.cost,
                    power: entry.power,
                    rarity: printing.rarity.clone(),
                    trait_tags: entry.trait_tags.clone(),
                    product_name: entry.product_name.clone(),
                    card_id_prefix: prefix.clone(),
                    link: entry.link.clone(),
                });
            }
        }
    }
    cards
}

/// Resolve in-effect card references into bidirectional link sets.
///
/// Effect text marks references with corner brackets around the literal
/// card name (`「…」`). Every discovered reference links both directions
/// at base-id level; base ids are then expanded to the full printing ids
/// sharing them. Output link vectors are sorted, so the result is
/// independent of corpus iteration order. Self references are dropped.
pub fn resolve_links(cards: &mut [CardRecord]) -> Result<()> {
    if cards.is_empty() {
        return Ok(());
    }

    let mut name_to_bases: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut base_to_indices: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, card) in cards.iter().enumerate() {
        name_to_bases
            .entry(card.name.clone())
            .or_default()
            .insert(card.base_id.clone());
        base_to_indices
            .entry(card.base_id.clone())
            .or_default()
            .push(i);
    }

    // Working set of base-id links per card
    let mut base_links: Vec<BTreeSet<String>> = vec![BTreeSet::new(); cards.len()];

    let add_bidirectional =
        |links: &mut Vec<BTreeSet<String>>, i: usize, source_base: &str| {
            if source_base == cards[i].base_id {
                return;
            }
            links[i].insert(source_base.to_string());
            if let Some(printings) = base_to_indices.get(source_base) {
                for &j in printings {
                    links[j].insert(cards[i].base_id.clone());
                }
            }
        };

    // Seed with upstream-resolved base ids carried by the raw files
    for i in 0..cards.len() {
        for source_base in cards[i].link.clone() {
            add_bidirectional(&mut base_links, i, &source_base);
        }
    }

    // Scan every effect for bracketed references to known names
    let mut names: Vec<&String> = name_to_bases.keys().collect();
    // Longest-first so overlapping names resolve the same way everywhere
    names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    let pattern = format!(
        "「({})」",
        names
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|")
    );
    let matcher = Regex::new(&pattern)
        .map_err(|e| Error::new(ErrorKind::InvalidState, format!("link pattern: {}", e)))?;

    for i in 0..cards.len() {
        if cards[i].effect.is_empty() {
            continue;
        }
        let effect = cards[i].effect.clone();
        for caps in matcher.captures_iter(&effect) {
            let found_name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let Some(source_bases) = name_to_bases.get(found_name) else {
                continue;
            };
            for source_base in source_bases.clone() {
                add_bidirectional(&mut base_links, i, &source_base);
            }
        }
    }

    // Expand base ids to the printing ids sharing them
    let mut base_to_ids: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for card in cards.iter() {
        base_to_ids
            .entry(card.base_id.as_str())
            .or_default()
            .push(card.id.as_str());
    }

    let resolved: Vec<Vec<String>> = base_links
        .iter()
        .enumerate()
        .map(|(i, bases)| {
            let mut ids: BTreeSet<String> = BTreeSet::new();
            for base in bases {
                match base_to_ids.get(base.as_str()) {
                    Some(full) => ids.extend(full.iter().map(|s| s.to_string())),
                    None => debug!(
                        base_id = %base,
                        card = %cards[i].id,
                        "linked base id has no printings, dropping"
                    ),
                }
            }
            ids.into_iter().collect()
        })
        .collect();

    let link_count: usize = resolved.iter().map(Vec::len).sum();
    for (card, link) in cards.iter_mut().zip(resolved) {
        card.link = link;
    }

    debug!(cards = cards.len(), links = link_count, "cross references resolved");
    Ok(())
}

/// Flatten raw product groupings and resolve all cross references
pub fn link_products(products: &[(String, ProductGrouping)]) -> Result<Vec<CardRecord>> {
    let mut cards = flatten(products);
    let known: BTreeSet<&str> = cards.iter().map(|c| c.base_id.as_str()).collect();
    let dangling = cards
        .iter()
        .flat_map(|c| c.link.iter())
        .filter(|base| !known.contains(base.as_str()))
        .count();
    if dangling > 0 {
        warn!(count = dangling, "raw groupings reference unknown base ids");
    }
    drop(known);
    resolve_links(&mut cards)?;
    Ok(cards)
}
