pub mod harness;
pub mod metrics;
pub mod oracle;
pub mod sampling;
pub mod tfidf;

pub use harness::{
    AblationResult, AblationRow, AblationVariant, BaselineReport, EvaluationHarness,
    category_cooccurrence,
};
pub use metrics::{EvaluationMetrics, QueryOutcome, RecallPoint, calculate_metrics};
pub use oracle::{RelevanceOracle, TokenOverlapOracle};
pub use sampling::QuerySample;
pub use tfidf::{TFIDF_HIT_THRESHOLD, TfidfBaseline, tfidf_similarity};
