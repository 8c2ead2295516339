use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Card level: a numeric rank or the "-" sentinel for cards without one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CardLevel {
    #[default]
    None,
    Rank(u32),
}

impl CardLevel {
    /// The "-" sentinel collapses to 0 for level filtering
    pub fn normalized(&self) -> u32 {
        match self {
            CardLevel::None => 0,
            CardLevel::Rank(n) => *n,
        }
    }
}

impl Serialize for CardLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CardLevel::None => serializer.serialize_str("-"),
            CardLevel::Rank(n) => serializer.serialize_u32(*n),
        }
    }
}

impl<'de> Deserialize<'de> for CardLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // Wire format carries either a number or a string ("-", "3")
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Ok(CardLevel::Rank(n)),
            Raw::Text(s) if s == "-" || s.is_empty() => Ok(CardLevel::None),
            Raw::Text(s) => s
                .trim()
                .parse::<u32>()
                .map(CardLevel::Rank)
                .map_err(|_| de::Error::custom(format!("invalid card level: {:?}", s))),
        }
    }
}

/// One printed version of a card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardRecord {
    pub id: String,
    #[serde(rename = "baseId")]
    pub base_id: String,
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
    #[serde(default)]
    pub rarity: String,
    #[serde(rename = "trait", default)]
    pub trait_tags: Vec<String>,
    #[serde(rename = "product_name", default)]
    pub product_name: String,
    #[serde(rename = "cardIdPrefix", default)]
    pub card_id_prefix: String,
    #[serde(default)]
    pub link: Vec<String>,
}

/// Observed {min, max} for a numeric facet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetRange {
    pub min: u32,
    pub max: u32,
}

impl FacetRange {
    pub fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn as_tuple(&self) -> (u32, u32) {
        (self.min, self.max)
    }
}

impl Default for FacetRange {
    fn default() -> Self {
        FacetRange { min: 0, max: 0 }
    }
}

/// Corpus-wide filter metadata, derived once per load and never mutated by queries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterFacets {
    #[serde(rename = "productNames")]
    pub product_names: Vec<String>,
    pub traits: Vec<String>,
    pub rarities: Vec<String>,
    #[serde(rename = "costRange")]
    pub cost_range: FacetRange,
    #[serde(rename = "powerRange")]
    pub power_range: FacetRange,
}

impl FilterFacets {
    /// Derive facets from a flattened corpus: distinct products and traits in
    /// first-seen order, rarities sorted, observed cost/power bounds
    pub fn derive(cards: &[CardRecord]) -> Self {
        let mut product_names: Vec<String> = Vec::new();
        let mut traits: Vec<String> = Vec::new();
        let mut rarities: Vec<String> = Vec::new();
        let mut cost_bounds: Option<(u32, u32)> = None;
        let mut power_bounds: Option<(u32, u32)> = None;

        for card in cards {
            if !card.product_name.is_empty() && !product_names.contains(&card.product_name) {
                product_names.push(card.product_name.clone());
            }
            for tag in &card.trait_tags {
                if !traits.contains(tag) {
                    traits.push(tag.clone());
                }
            }
            if !card.rarity.is_empty() && !rarities.contains(&card.rarity) {
                rarities.push(card.rarity.clone());
            }
            cost_bounds = Some(match cost_bounds {
                None => (card.cost, card.cost),
                Some((lo, hi)) => (lo.min(card.cost), hi.max(card.cost)),
            });
            power_bounds = Some(match power_bounds {
                None => (card.power, card.power),
                Some((lo, hi)) => (lo.min(card.power), hi.max(card.power)),
            });
        }

        rarities.sort();
        let (cost_min, cost_max) = cost_bounds.unwrap_or((0, 0));
        let (power_min, power_max) = power_bounds.unwrap_or((0, 0));

        FilterFacets {
            product_names,
            traits,
            rarities,
            cost_range: FacetRange { min: cost_min, max: cost_max },
            power_range: FacetRange { min: power_min, max: power_max },
        }
    }
}
