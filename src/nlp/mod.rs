pub mod models;
pub mod normalizer;
pub mod spans;
pub mod text;
pub mod vocabulary;

pub use models::{
    Category, Concept, ConceptCandidate, ConceptId, ConceptUniverse, Side, SourceCategory,
    SpanKind, TargetCategory,
};
pub use normalizer::{NormalizationReport, NormalizedItem, Normalizer, RawItem};
pub use spans::{ExtractionError, PhraseChunker, Span, SpanExtractor, TokenRunExtractor};
pub use text::{collapse_whitespace, content_tokens, shared_token_count, tokenize};
pub use vocabulary::{Vocabulary, VocabularyConfig, VocabularyEntry, VocabularySet};
