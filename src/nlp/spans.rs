

use lazy_static::lazy_static;
use std::collections::HashSet;
use thiserror::Error;

use super::models::SpanKind;
use super::text::{Token, tokenize};


#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Span extractor unavailable: {0}")]
    Unavailable(String),

    #[error("Span extraction failed: {0}")]
    Failed(String),
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
}

impl Span {
    pub fn new(start: usize, end: usize, kind: SpanKind) -> Self {
        Self { start, end, kind }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}


/// Pluggable entity/phrase span extraction (NER, chunkers, matchers).
pub trait SpanExtractor: Send + Sync {

    fn extract(&self, text: &str) -> Result<Vec<Span>, ExtractionError>;


    fn name(&self) -> &str;
}

lazy_static! {
    static ref BREAK_WORDS: HashSet<&'static str> = [
        "and", "or", "but", "with", "on", "in", "for", "to", "of", "at", "from", "by",
        "because", "when", "while", "if", "so", "than", "then", "that", "which", "after",
        "before", "into", "via",
    ]
    .into_iter()
    .collect();
}


/// Overlapping spans resolve to the longer one; equal lengths resolve to the
/// earlier start. Output is ordered by start offset.
pub fn dedup_spans(mut spans: Vec<Span>) -> Vec<Span> {
    spans.retain(|s| !s.is_empty());
    spans.sort_by(|a, b| b.len().cmp(&a.len()).then(a.start.cmp(&b.start)));

    let mut kept: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        if !kept.iter().any(|k| k.overlaps(&span)) {
            kept.push(span);
        }
    }

    kept.sort_by_key(|s| s.start);
    kept
}

fn only_whitespace_between(text: &str, left: &Token<'_>, right: &Token<'_>) -> bool {
    text[left.end..right.start].chars().all(char::is_whitespace)
}

fn is_capitalized(token: &Token<'_>) -> bool {
    token.text.chars().next().is_some_and(char::is_uppercase)
}

fn is_sentence_start(text: &str, token: &Token<'_>) -> bool {
    text[..token.start]
        .chars()
        .rev()
        .find(|c| !c.is_whitespace())
        .is_none_or(|c| matches!(c, '.' | '!' | '?' | ':' | ';' | '\n'))
}

fn is_noun_like(token: &Token<'_>) -> bool {
    token.text.chars().count() >= 2
        && token.text.chars().all(|c| c.is_alphabetic() || c == '-' || c == '\'')
        && !token.is_stop_word()
}


/// Regex-token chunker: capitalized runs become entities, clause fragments
/// between punctuation and function words become phrases.
#[derive(Debug, Clone, Default)]
pub struct PhraseChunker;

impl PhraseChunker {
    pub fn new() -> Self {
        Self
    }

    fn entities(&self, text: &str, tokens: &[Token<'_>]) -> Vec<Span> {
        let mut spans = Vec::new();
        let mut run: Vec<&Token<'_>> = Vec::new();

        let flush = |run: &mut Vec<&Token<'_>>, spans: &mut Vec<Span>| {
            let keep = match run.as_slice() {
                [] => false,
                [single] => !is_sentence_start(text, single),
                _ => true,
            };
            if keep {
                spans.push(Span::new(run[0].start, run[run.len() - 1].end, SpanKind::Entity));
            }
            run.clear();
        };

        for token in tokens {
            let continues = run
                .last()
                .is_some_and(|prev| only_whitespace_between(text, prev, token));
            if !continues {
                flush(&mut run, &mut spans);
            }
            if is_capitalized(token) && !token.is_stop_word() {
                run.push(token);
            } else {
                flush(&mut run, &mut spans);
            }
        }
        flush(&mut run, &mut spans);
        spans
    }

    fn phrases(&self, text: &str, tokens: &[Token<'_>]) -> Vec<Span> {
        let mut segments: Vec<Vec<&Token<'_>>> = vec![Vec::new()];

        for token in tokens {
            let broken = segments
                .last()
                .and_then(|s| s.last())
                .is_some_and(|prev| !only_whitespace_between(text, prev, token));
            if broken {
                segments.push(Vec::new());
            }
            if BREAK_WORDS.contains(token.folded().as_str()) {
                segments.push(Vec::new());
                continue;
            }
            if let Some(segment) = segments.last_mut() {
                segment.push(token);
            }
        }

        segments
            .into_iter()
            .filter_map(|segment| {
                let first = segment.iter().position(|t| !t.is_stop_word())?;
                let last = segment.iter().rposition(|t| !t.is_stop_word())?;
                Some(Span::new(segment[first].start, segment[last].end, SpanKind::Phrase))
            })
            .collect()
    }
}

impl SpanExtractor for PhraseChunker {
    fn extract(&self, text: &str) -> Result<Vec<Span>, ExtractionError> {
        let tokens = tokenize(text);
        let mut spans = self.entities(text, &tokens);
        spans.extend(self.phrases(text, &tokens));
        Ok(spans)
    }

    fn name(&self) -> &str {
        "phrase-chunker"
    }
}


/// Fallback heuristic: maximal runs of contiguous noun-like tokens.
#[derive(Debug, Clone, Default)]
pub struct TokenRunExtractor;

impl TokenRunExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn runs(&self, text: &str) -> Vec<Span> {
        let tokens = tokenize(text);
        let mut spans = Vec::new();
        let mut current: Option<(usize, usize)> = None;
        let mut prev: Option<&Token<'_>> = None;

        for token in &tokens {
            let adjacent = prev.is_some_and(|p| only_whitespace_between(text, p, token));
            if is_noun_like(token) {
                current = match current {
                    Some((start, _)) if adjacent => Some((start, token.end)),
                    Some((start, end)) => {
                        spans.push(Span::new(start, end, SpanKind::TokenRun));
                        Some((token.start, token.end))
                    }
                    None => Some((token.start, token.end)),
                };
            } else if let Some((start, end)) = current.take() {
                spans.push(Span::new(start, end, SpanKind::TokenRun));
            }
            prev = Some(token);
        }
        if let Some((start, end)) = current {
            spans.push(Span::new(start, end, SpanKind::TokenRun));
        }
        spans
    }
}

impl SpanExtractor for TokenRunExtractor {
    fn extract(&self, text: &str) -> Result<Vec<Span>, ExtractionError> {
        Ok(self.runs(text))
    }

    fn name(&self) -> &str {
        "token-run"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(text: &'a str, spans: &[Span]) -> Vec<&'a str> {
        spans.iter().map(|s| &text[s.start..s.end]).collect()
    }

    #[test]
    fn test_dedup_longer_wins() {
        let spans = vec![
            Span::new(0, 6, SpanKind::Entity),
            Span::new(0, 16, SpanKind::Phrase),
            Span::new(20, 25, SpanKind::Phrase),
        ];
        let kept = dedup_spans(spans);
        assert_eq!(kept, vec![Span::new(0, 16, SpanKind::Phrase), Span::new(20, 25, SpanKind::Phrase)]);
    }

    #[test]
    fn test_dedup_tie_breaks_on_earliest_start() {
        let spans = vec![Span::new(3, 8, SpanKind::Phrase), Span::new(1, 6, SpanKind::Entity)];
        let kept = dedup_spans(spans);
        assert_eq!(kept, vec![Span::new(1, 6, SpanKind::Entity)]);
    }

    #[test]
    fn test_phrase_chunks_split_on_function_words() {
        let text = "The button is too small on mobile, and the menu hides content";
        let spans = PhraseChunker::new().phrases(text, &tokenize(text));
        assert_eq!(
            texts(text, &spans),
            vec!["button is too small", "mobile", "menu hides content"]
        );
    }

    #[test]
    fn test_entities_skip_sentence_initial_single_word() {
        let text = "Checkout fails in Google Chrome. Safari works";
        let spans = PhraseChunker::new().entities(text, &tokenize(text));
        assert_eq!(texts(text, &spans), vec!["Google Chrome"]);
    }

    #[test]
    fn test_chunker_with_dedup_prefers_long_phrase() {
        let text = "the Dark Mode toggle resets";
        let spans = dedup_spans(PhraseChunker::new().extract(text).unwrap());
        assert_eq!(texts(text, &spans), vec!["Dark Mode toggle resets"]);
    }

    #[test]
    fn test_token_runs() {
        let text = "The search bar is slow, results page 2 loads";
        let spans = TokenRunExtractor::new().runs(text);
        assert_eq!(texts(text, &spans), vec!["search bar", "slow", "results page", "loads"]);
    }
}
