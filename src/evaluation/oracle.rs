use crate::nlp::shared_token_count;


/// Decides whether a retrieved candidate is relevant to a query.
pub trait RelevanceOracle: Send + Sync {
    fn is_relevant(&self, query: &str, candidate: &str) -> bool;

    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> RelevanceOracle for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn is_relevant(&self, query: &str, candidate: &str) -> bool {
        self(query, candidate)
    }
}


/// Relevant when the texts share at least `min_shared` case-folded,
/// stop-word-free tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenOverlapOracle {
    pub min_shared: usize,
}

impl Default for TokenOverlapOracle {
    fn default() -> Self {
        Self { min_shared: 3 }
    }
}

impl TokenOverlapOracle {
    pub fn new(min_shared: usize) -> Self {
        Self { min_shared }
    }
}

impl RelevanceOracle for TokenOverlapOracle {
    fn is_relevant(&self, query: &str, candidate: &str) -> bool {
        shared_token_count(query, candidate) >= self.min_shared
    }

    fn name(&self) -> &str {
        "token_overlap"
    }
}
