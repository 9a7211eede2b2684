pub mod core;
pub mod embedding;
pub mod evaluation;
pub mod graph;
pub mod nlp;
pub mod pipeline;
pub mod retrieval;


pub use crate::core::config::HskgConfig;
pub use crate::core::error::{HskgError, Result};
pub use embedding::{EmbeddingProvider, EmbeddingProviderFactory, HashingEmbedder, HttpEmbedder};
pub use evaluation::{EvaluationHarness, EvaluationMetrics, TokenOverlapOracle};
pub use graph::{EdgeKind, EdgePolicy, Graph, GraphBuilder, GraphExport, GraphStats};
pub use nlp::{Concept, ConceptId, ConceptUniverse, Normalizer, RawItem, Side};
pub use pipeline::{EvaluationReport, Pipeline, PipelineOutput};
pub use retrieval::{RetrievalEngine, RetrievedConcept};


pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.75;


pub const DEFAULT_GRAPH_BOOST: f64 = 0.1;


pub const DEFAULT_TOP_K: usize = 5;


pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";


pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";


pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;


pub const DEFAULT_CACHE_SIZE: usize = 10_000;
