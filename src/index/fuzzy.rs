use fst::Automaton;
use levenshtein_automata::{DFA, Distance, LevenshteinAutomatonBuilder, SINK_STATE};

/// Adapter running a Levenshtein DFA over an fst term dictionary.
///
/// The DFA walks byte-by-byte in lockstep with the dictionary stream, so
/// only terms within the configured edit distance are ever visited.
pub struct FuzzyDfa<'a>(pub &'a DFA);

impl Automaton for FuzzyDfa<'_> {
    type State = u32;

    fn start(&self) -> u32 {
        self.0.initial_state()
    }

    fn is_match(&self, state: &u32) -> bool {
        matches!(self.0.distance(*state), Distance::Exact(_))
    }

    fn can_match(&self, state: &u32) -> bool {
        *state != SINK_STATE
    }

    fn accept(&self, state: &u32, byte: u8) -> u32 {
        self.0.transition(*state, byte)
    }
}

/// Shared builder for per-term fuzzy DFAs; constructing the parametric
/// tables is the expensive part, so it is done once per index
pub struct FuzzyTermMatcher {
    builder: LevenshteinAutomatonBuilder,
    pub max_distance: u8,
}

impl FuzzyTermMatcher {
    pub fn new(max_distance: u8) -> Self {
        FuzzyTermMatcher {
            builder: LevenshteinAutomatonBuilder::new(max_distance, true),
            max_distance,
        }
    }

    pub fn dfa_for(&self, term: &str) -> DFA {
        self.builder.build_dfa(term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dfa_accepts_within_distance() {
        let matcher = FuzzyTermMatcher::new(1);
        let dfa = matcher.dfa_for("sword");

        assert!(matches!(dfa.eval("sword"), Distance::Exact(0)));
        assert!(matches!(dfa.eval("swrd"), Distance::Exact(1)));
        // Transposition counts as a single edit
        assert!(matches!(dfa.eval("swrod"), Distance::Exact(1)));
    }

    #[test]
    fn dfa_rejects_beyond_distance() {
        let matcher = FuzzyTermMatcher::new(1);
        let dfa = matcher.dfa_for("sword");
        assert!(!matches!(dfa.eval("sw"), Distance::Exact(_)));
    }
}
