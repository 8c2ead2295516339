use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{CardLevel, FilterFacets};

/// Mutable user-intent state behind the filter panel
#[derive(Debug, Clone, Default)]
pub struct FilterSelection {
    pub keyword: String,
    pub card_types: Vec<String>,
    pub colors: Vec<String>,
    pub product_name: Option<String>,
    pub traits: Vec<String>,
    pub levels: Vec<CardLevel>,
    pub rarities: Vec<String>,
    pub unique_only: bool,
    pub cost_range: (u32, u32),
    pub power_range: (u32, u32),
}

impl FilterSelection {
    /// Cleared selection with ranges widened to the facet bounds
    pub fn reset_to(facets: &FilterFacets) -> Self {
        FilterSelection {
            cost_range: facets.cost_range.as_tuple(),
            power_range: facets.power_range.as_tuple(),
            ..Default::default()
        }
    }
}

/// Immutable query snapshot. Built fresh for every evaluation; one
/// struct with named fields, never positional arguments.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub keyword: String,
    pub card_types: Vec<String>,
    pub colors: Vec<String>,
    pub product_name: Option<String>,
    pub traits: Vec<String>,
    pub levels: Vec<u32>,
    pub rarities: Vec<String>,
    pub unique_only: bool,
    /// None when the selection sits exactly on the facet bounds: an
    /// untouched slider is no constraint at all
    pub cost_range: Option<(u32, u32)>,
    pub power_range: Option<(u32, u32)>,
}

impl QuerySpec {
    pub fn build(selection: &FilterSelection, facets: &FilterFacets) -> Result<Self> {
        let cost_range = resolve_range("cost", selection.cost_range, facets.cost_range.as_tuple())?;
        let power_range =
            resolve_range("power", selection.power_range, facets.power_range.as_tuple())?;

        Ok(QuerySpec {
            keyword: selection.keyword.clone(),
            card_types: selection.card_types.clone(),
            colors: selection.colors.clone(),
            product_name: selection.product_name.clone(),
            traits: selection.traits.clone(),
            levels: selection.levels.iter().map(CardLevel::normalized).collect(),
            rarities: selection.rarities.clone(),
            unique_only: selection.unique_only,
            cost_range,
            power_range,
        })
    }
}

fn resolve_range(
    what: &str,
    selected: (u32, u32),
    full: (u32, u32),
) -> Result<Option<(u32, u32)>> {
    if selected.0 > selected.1 {
        return Err(Error::new(
            ErrorKind::QueryInvalid,
            format!("inverted {} range: {} > {}", what, selected.0, selected.1),
        ));
    }
    if selected == full {
        return Ok(None);
    }
    Ok(Some(selected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FacetRange;

    fn facets() -> FilterFacets {
        FilterFacets {
            cost_range: FacetRange { min: 0, max: 5 },
            power_range: FacetRange { min: 500, max: 10000 },
            ..Default::default()
        }
    }

    #[test]
    fn untouched_range_resolves_to_none() {
        let facets = facets();
        let selection = FilterSelection::reset_to(&facets);
        let spec = QuerySpec::build(&selection, &facets).unwrap();
        assert!(spec.cost_range.is_none());
        assert!(spec.power_range.is_none());
    }

    #[test]
    fn narrowed_range_is_kept() {
        let facets = facets();
        let mut selection = FilterSelection::reset_to(&facets);
        selection.cost_range = (2, 2);
        let spec = QuerySpec::build(&selection, &facets).unwrap();
        assert_eq!(spec.cost_range, Some((2, 2)));
    }

    #[test]
    fn inverted_range_is_rejected_before_dispatch() {
        let facets = facets();
        let mut selection = FilterSelection::reset_to(&facets);
        selection.power_range = (9000, 500);
        let err = QuerySpec::build(&selection, &facets).unwrap_err();
        assert_eq!(err.kind, ErrorKind::QueryInvalid);
    }

    #[test]
    fn levels_normalize_the_none_sentinel() {
        let facets = facets();
        let mut selection = FilterSelection::reset_to(&facets);
        selection.levels = vec![CardLevel::None, CardLevel::Rank(2)];
        let spec = QuerySpec::build(&selection, &facets).unwrap();
        assert_eq!(spec.levels, vec![0, 2]);
    }
}
