pub mod engine;
pub mod ranking;

pub use engine::RetrievalEngine;
pub use ranking::{RetrievedConcept, compare_ranked, select_top_k};
