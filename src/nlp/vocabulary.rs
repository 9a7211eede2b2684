use std::str::FromStr;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use super::models::{Category, Side, SourceCategory, TargetCategory};
use super::text::tokenize;
use crate::core::{HskgError, Result};

lazy_static! {
    static ref DEFAULT_SOURCE_KEYWORDS: Vec<(SourceCategory, Vec<&'static str>)> = vec![
        (SourceCategory::Product, vec![
            "product", "app", "application", "website", "site", "page", "feature", "service",
        ]),
        (SourceCategory::Setting, vec![
            "setting", "settings", "preference", "preferences", "option", "options",
            "configuration", "mode", "theme", "notification",
        ]),
        (SourceCategory::State, vec![
            "state", "status", "loading", "error", "crash", "slow", "broken", "freeze", "lag",
        ]),
        (SourceCategory::User, vec![
            "user", "users", "account", "profile", "login", "customer", "password",
        ]),
        (SourceCategory::Interaction, vec![
            "button", "click", "tap", "scroll", "swipe", "menu", "navigation", "form", "search",
        ]),
    ];

    static ref DEFAULT_TARGET_KEYWORDS: Vec<(TargetCategory, Vec<&'static str>)> = vec![
        (TargetCategory::Goal, vec![
            "goal", "objective", "purpose", "aim", "intent", "requirement", "guideline",
        ]),
        (TargetCategory::Fix, vec![
            "fix", "improve", "redesign", "resolve", "update", "change", "simplify", "reduce",
        ]),
        (TargetCategory::Item, vec![
            "item", "element", "component", "icon", "image", "label", "layout", "card",
            "header", "footer", "banner",
        ]),
        (TargetCategory::Interaction, vec![
            "button", "click", "tap", "scroll", "swipe", "menu", "navigation", "form", "input",
            "link",
        ]),
    ];
}


/// Ordered keyword table for one side. Entry order is the tie-break order.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary<C> {
    entries: Vec<(C, Vec<String>)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchRule {
    Exact,
    Token,
    Substring,
}

impl<C: Copy> Vocabulary<C> {
    pub fn new(entries: Vec<(C, Vec<String>)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(category, keywords)| {
                let keywords = keywords
                    .into_iter()
                    .map(|k| super::text::collapse_whitespace(&k).to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                (category, keywords)
            })
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, keywords)| keywords.is_empty())
    }

    pub fn entries(&self) -> &[(C, Vec<String>)] {
        &self.entries
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().flat_map(|(_, k)| k.iter().map(String::as_str))
    }

    /// Precision-first: exact full-text match, then token match, then
    /// keyword-inside-token. First entry satisfying the strongest rule wins.
    pub fn classify(&self, text: &str) -> Option<C> {
        let key = super::text::collapse_whitespace(text).to_lowercase();
        let tokens: Vec<String> = tokenize(&key).iter().map(|t| t.text.to_string()).collect();

        [MatchRule::Exact, MatchRule::Token, MatchRule::Substring]
            .into_iter()
            .find_map(|rule| {
                self.entries.iter().find_map(|(category, keywords)| {
                    keywords
                        .iter()
                        .any(|kw| matches_rule(rule, &key, &tokens, kw))
                        .then_some(*category)
                })
            })
    }
}

fn matches_rule(rule: MatchRule, key: &str, tokens: &[String], keyword: &str) -> bool {
    match rule {
        MatchRule::Exact => key == keyword,
        MatchRule::Token => {
            let kw_tokens: Vec<&str> = keyword.split(' ').collect();
            !kw_tokens.is_empty()
                && tokens
                    .windows(kw_tokens.len())
                    .any(|w| w.iter().zip(&kw_tokens).all(|(t, k)| t == k))
        }
        MatchRule::Substring => tokens.iter().any(|t| t.contains(keyword)),
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub label: String,
    pub keywords: Vec<String>,
}


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocabularyConfig {
    #[serde(default)]
    pub source: Vec<VocabularyEntry>,
    #[serde(default)]
    pub target: Vec<VocabularyEntry>,
}


#[derive(Debug, Clone, PartialEq)]
pub struct VocabularySet {
    pub source: Vocabulary<SourceCategory>,
    pub target: Vocabulary<TargetCategory>,
}

impl VocabularySet {

    pub fn from_config(config: &VocabularyConfig) -> Result<Self> {
        let source = parse_entries::<SourceCategory>(Side::Source, &config.source)?;
        let target = parse_entries::<TargetCategory>(Side::Target, &config.target)?;
        Ok(Self { source, target })
    }


    pub fn classify(&self, text: &str, side: Side) -> Option<Category> {
        match side {
            Side::Source => self.source.classify(text).map(Category::Source),
            Side::Target => self.target.classify(text).map(Category::Target),
        }
    }
}

impl Default for VocabularySet {
    fn default() -> Self {
        Self {
            source: Vocabulary::new(owned_entries(&DEFAULT_SOURCE_KEYWORDS)),
            target: Vocabulary::new(owned_entries(&DEFAULT_TARGET_KEYWORDS)),
        }
    }
}

fn owned_entries<C: Copy>(entries: &[(C, Vec<&'static str>)]) -> Vec<(C, Vec<String>)> {
    entries
        .iter()
        .map(|(c, kws)| (*c, kws.iter().map(|k| k.to_string()).collect()))
        .collect()
}

fn parse_entries<C>(side: Side, entries: &[VocabularyEntry]) -> Result<Vocabulary<C>>
where
    C: FromStr + Copy,
{
    let parsed = entries
        .iter()
        .map(|entry| {
            C::from_str(entry.label.trim())
                .map(|category| (category, entry.keywords.clone()))
                .map_err(|_| {
                    HskgError::config(format!(
                        "unknown {side} category label: {}",
                        entry.label
                    ))
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let vocabulary = Vocabulary::new(parsed);
    if vocabulary.is_empty() {
        return Err(HskgError::config(format!("missing vocabulary for {side} side")));
    }
    Ok(vocabulary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(entries: &[(TargetCategory, Vec<&str>)]) -> Vocabulary<TargetCategory> {
        Vocabulary::new(
            entries
                .iter()
                .map(|(c, k)| (*c, k.iter().map(|s| s.to_string()).collect()))
                .collect(),
        )
    }

    #[test]
    fn test_exact_match_beats_earlier_token_match() {
        let v = vocab(&[
            (TargetCategory::Goal, vec!["icon"]),
            (TargetCategory::Item, vec!["icon set"]),
        ]);
        assert_eq!(v.classify("Icon Set"), Some(TargetCategory::Item));
    }

    #[test]
    fn test_token_match_beats_earlier_substring_match() {
        let v = vocab(&[
            (TargetCategory::Fix, vec!["but"]),
            (TargetCategory::Interaction, vec!["button"]),
        ]);
        assert_eq!(v.classify("primary button"), Some(TargetCategory::Interaction));
    }

    #[test]
    fn test_first_entry_wins_within_rule() {
        let v = vocab(&[
            (TargetCategory::Item, vec!["menu"]),
            (TargetCategory::Interaction, vec!["menu"]),
        ]);
        assert_eq!(v.classify("menu layout"), Some(TargetCategory::Item));
    }

    #[test]
    fn test_substring_fallback() {
        let v = vocab(&[(TargetCategory::Item, vec!["icon"])]);
        assert_eq!(v.classify("iconography"), Some(TargetCategory::Item));
        assert_eq!(v.classify("typography"), None);
    }

    #[test]
    fn test_multi_word_keyword_token_run() {
        let v = vocab(&[(TargetCategory::Goal, vec!["call to action"])]);
        assert_eq!(v.classify("clear call to action placement"), Some(TargetCategory::Goal));
    }

    #[test]
    fn test_default_set_scopes_by_side() {
        let set = VocabularySet::default();
        assert_eq!(
            set.classify("button too small", Side::Source),
            Some(Category::Source(SourceCategory::Interaction))
        );
        assert_eq!(
            set.classify("button size specification", Side::Target),
            Some(Category::Target(TargetCategory::Interaction))
        );
    }

    #[test]
    fn test_from_config_rejects_unknown_label() {
        let config = VocabularyConfig {
            source: vec![VocabularyEntry { label: "layout".into(), keywords: vec!["x".into()] }],
            target: vec![VocabularyEntry { label: "item".into(), keywords: vec!["x".into()] }],
        };
        assert!(matches!(
            VocabularySet::from_config(&config),
            Err(HskgError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_config_rejects_missing_side() {
        let config = VocabularyConfig {
            source: vec![VocabularyEntry { label: "user".into(), keywords: vec!["account".into()] }],
            target: vec![],
        };
        let err = VocabularySet::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("target"));
    }

    #[test]
    fn test_from_config_preserves_order() {
        let config = VocabularyConfig {
            source: vec![
                VocabularyEntry { label: "state".into(), keywords: vec!["slow".into()] },
                VocabularyEntry { label: "product".into(), keywords: vec!["slow".into()] },
            ],
            target: vec![VocabularyEntry { label: "fix".into(), keywords: vec!["Speed Up".into()] }],
        };
        let set = VocabularySet::from_config(&config).unwrap();
        assert_eq!(
            set.classify("slow checkout", Side::Source),
            Some(Category::Source(SourceCategory::State))
        );
        assert_eq!(
            set.classify("speed up", Side::Target),
            Some(Category::Target(TargetCategory::Fix))
        );
    }
}
