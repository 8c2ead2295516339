use crate::core::types::CardRecord;

/// Page produced by one worker evaluation: display list capped at the
/// session's ceiling, true match count alongside
#[derive(Debug, Clone, Default)]
pub struct FilteredPage {
    pub cards: Vec<CardRecord>,
    pub total_matches: usize,
}

/// Result set exposed to the caller. A truncated set is always
/// distinguishable from an exhausted one: the true total rides along.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub cards: Vec<CardRecord>,
    pub total_matches: usize,
    pub truncated: bool,
}

impl ResultSet {
    pub fn from_page(page: FilteredPage) -> Self {
        let truncated = page.total_matches > page.cards.len();
        ResultSet {
            cards: page.cards,
            total_matches: page.total_matches,
            truncated,
        }
    }

    pub fn actual_result_count(&self) -> usize {
        self.total_matches
    }

    pub fn is_count_over_threshold(&self) -> bool {
        self.truncated
    }
}
