use std::collections::HashSet;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use text_splitter::{Characters, TextSplitter};
use tracing::{debug, info, warn};

use super::models::{ConceptCandidate, ConceptId, ConceptUniverse, Side};
use super::spans::{
    ExtractionError, PhraseChunker, Span, SpanExtractor, TokenRunExtractor, dedup_spans,
};
use super::text::{collapse_whitespace, content_tokens};
use super::vocabulary::VocabularySet;
use crate::core::{HskgConfig, Result};


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    pub text: String,
    pub side: Side,
}

impl RawItem {
    pub fn new(text: impl Into<String>, side: Side) -> Self {
        Self {
            text: text.into(),
            side,
        }
    }
}


#[derive(Debug, Clone, Default)]
pub struct NormalizedItem {
    pub candidates: Vec<ConceptCandidate>,
    pub degraded: bool,
}


#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizationReport {
    #[serde(skip)]
    pub ids: Vec<ConceptId>,
    pub items: usize,
    pub concepts: usize,
    pub categorized: usize,
    pub degraded_items: usize,
}


pub struct Normalizer {
    vocabularies: VocabularySet,
    extractor: Option<Arc<dyn SpanExtractor>>,
    fallback: TokenRunExtractor,
    splitter: TextSplitter<Characters>,
    max_item_chars: usize,
}

impl Normalizer {

    pub fn new(vocabularies: VocabularySet) -> Self {
        Self::with_extractor(vocabularies, Some(Arc::new(PhraseChunker::new())), 2000)
    }


    pub fn with_extractor(
        vocabularies: VocabularySet,
        extractor: Option<Arc<dyn SpanExtractor>>,
        max_item_chars: usize,
    ) -> Self {
        match &extractor {
            Some(e) => info!(
                "Normalizer initialized (extractor={}, max_item_chars={})",
                e.name(),
                max_item_chars
            ),
            None => warn!("Normalizer initialized without span extractor, using token-run heuristic"),
        }

        Self {
            vocabularies,
            extractor,
            fallback: TokenRunExtractor::new(),
            splitter: TextSplitter::new(max_item_chars),
            max_item_chars,
        }
    }


    pub fn from_config(config: &HskgConfig) -> Result<Self> {
        let vocabularies = match &config.vocabulary {
            Some(vocabulary) => VocabularySet::from_config(vocabulary)?,
            None => VocabularySet::default(),
        };
        Ok(Self::with_extractor(
            vocabularies,
            Some(Arc::new(PhraseChunker::new())),
            config.max_item_chars,
        ))
    }

    pub fn vocabularies(&self) -> &VocabularySet {
        &self.vocabularies
    }


    pub fn normalize(&self, text: &str, side: Side) -> Vec<ConceptCandidate> {
        self.normalize_item(0, text, side).candidates
    }


    pub fn normalize_item(&self, item: usize, text: &str, side: Side) -> NormalizedItem {
        let mut result = NormalizedItem::default();
        let mut seen: HashSet<String> = HashSet::new();

        for (offset, chunk) in self.chunks(text) {
            let spans = match &self.extractor {
                Some(extractor) => match extractor
                    .extract(chunk)
                    .and_then(|spans| checked_spans(chunk, spans))
                {
                    Ok(spans) => spans,
                    Err(e) => {
                        warn!(
                            "Span extraction degraded for item {} ({}): {}",
                            item,
                            extractor.name(),
                            e
                        );
                        result.degraded = true;
                        self.fallback.runs(chunk)
                    }
                },
                None => {
                    result.degraded = true;
                    self.fallback.runs(chunk)
                }
            };

            for span in dedup_spans(spans) {
                let display = collapse_whitespace(&chunk[span.start..span.end]);
                if content_tokens(&display).is_empty() {
                    continue;
                }
                let key = display.to_lowercase();
                if !seen.insert(key.clone()) {
                    continue;
                }

                let category = self.vocabularies.classify(&key, side);
                result.candidates.push(ConceptCandidate {
                    text: display,
                    key,
                    side,
                    category,
                    kind: span.kind,
                    item,
                    span: (offset + span.start, offset + span.end),
                });
            }
        }

        debug!(
            "Normalized item {}: {} candidates (degraded={})",
            item,
            result.candidates.len(),
            result.degraded
        );
        result
    }

    /// Normalizes items in parallel; ids are assigned afterwards in item
    /// order so repeated runs produce identical universes.
    pub fn normalize_batch(
        &self,
        items: &[RawItem],
        universe: &mut ConceptUniverse,
    ) -> Result<NormalizationReport> {
        let normalized: Vec<NormalizedItem> = items
            .par_iter()
            .enumerate()
            .map(|(idx, item)| self.normalize_item(idx, &item.text, item.side))
            .collect();

        let mut report = NormalizationReport {
            items: items.len(),
            ..Default::default()
        };

        for item in normalized {
            if item.degraded {
                report.degraded_items += 1;
            }
            for candidate in item.candidates {
                if candidate.category.is_some() {
                    report.categorized += 1;
                }
                report.ids.push(universe.insert(candidate)?);
            }
        }
        report.concepts = report.ids.len();

        info!(
            "Normalized {} items into {} concepts ({} categorized, {} degraded items)",
            report.items, report.concepts, report.categorized, report.degraded_items
        );
        Ok(report)
    }

    fn chunks<'t>(&self, text: &'t str) -> Vec<(usize, &'t str)> {
        if text.chars().count() <= self.max_item_chars {
            vec![(0, text)]
        } else {
            self.splitter.chunk_indices(text).collect()
        }
    }
}

fn checked_spans(chunk: &str, spans: Vec<Span>) -> std::result::Result<Vec<Span>, ExtractionError> {
    match spans.iter().find(|s| chunk.get(s.start..s.end).is_none()) {
        Some(bad) => Err(ExtractionError::Failed(format!(
            "span {}..{} outside chunk of {} bytes or off a char boundary",
            bad.start,
            bad.end,
            chunk.len()
        ))),
        None => Ok(spans),
    }
}
