use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::core::{HskgError, Result};


#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Side {
    Source,
    Target,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::Source => Self::Target,
            Self::Target => Self::Source,
        }
    }
}


#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    Display, EnumString, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SourceCategory {
    Product,
    Setting,
    State,
    User,
    Interaction,
}


#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    Display, EnumString, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TargetCategory {
    Goal,
    Fix,
    Item,
    Interaction,
}


/// Category scoped to the side it was assigned on. `Source(Interaction)` and
/// `Target(Interaction)` share a label but are different groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "side", content = "label", rename_all = "snake_case")]
pub enum Category {
    Source(SourceCategory),
    Target(TargetCategory),
}

impl Category {
    pub fn side(&self) -> Side {
        match self {
            Self::Source(_) => Side::Source,
            Self::Target(_) => Side::Target,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Source(c) => (*c).into(),
            Self::Target(c) => (*c).into(),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.side(), self.label())
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(pub u32);

impl ConceptId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    Entity,
    Phrase,
    TokenRun,
}


/// A concept before it is admitted to a universe: everything but the id.
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptCandidate {
    pub text: String,
    pub key: String,
    pub side: Side,
    pub category: Option<Category>,
    pub kind: SpanKind,
    pub item: usize,
    pub span: (usize, usize),
}

impl ConceptCandidate {

    pub fn new(text: &str, side: Side, category: Option<Category>) -> Self {
        let text = super::text::collapse_whitespace(text);
        let key = text.to_lowercase();
        let end = text.len();
        Self {
            text,
            key,
            side,
            category,
            kind: SpanKind::Phrase,
            item: 0,
            span: (0, end),
        }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub id: ConceptId,
    pub text: String,
    pub key: String,
    pub side: Side,
    pub category: Option<Category>,
    pub kind: SpanKind,
    pub item: usize,
    pub span: (usize, usize),
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub vector: Option<Vec<f32>>,
}

impl Concept {
    pub fn has_vector(&self) -> bool {
        self.vector.is_some()
    }
}


/// Append-only collection of every concept in a run. Ids are dense and
/// equal to the concept's position.
#[derive(Debug, Default, Clone)]
pub struct ConceptUniverse {
    concepts: Vec<Concept>,
    dimension: Option<usize>,
}

impl ConceptUniverse {
    pub fn new() -> Self {
        Self::default()
    }


    pub fn insert(&mut self, candidate: ConceptCandidate) -> Result<ConceptId> {
        if let Some(category) = candidate.category {
            if category.side() != candidate.side {
                return Err(HskgError::config(format!(
                    "category {} cannot be assigned to a {} concept",
                    category, candidate.side
                )));
            }
        }

        let raw = u32::try_from(self.concepts.len())
            .map_err(|_| HskgError::Validation("concept universe is full".to_string()))?;
        let id = ConceptId(raw);

        self.concepts.push(Concept {
            id,
            text: candidate.text,
            key: candidate.key,
            side: candidate.side,
            category: candidate.category,
            kind: candidate.kind,
            item: candidate.item,
            span: candidate.span,
            vector: None,
        });
        Ok(id)
    }


    pub fn attach_vector(&mut self, id: ConceptId, vector: Vec<f32>) -> Result<()> {
        if let Some(expected) = self.dimension {
            if vector.len() != expected {
                return Err(HskgError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let concept = self
            .concepts
            .get_mut(id.index())
            .ok_or_else(|| HskgError::Validation(format!("unknown concept {id}")))?;

        if concept.vector.is_some() {
            return Err(HskgError::Validation(format!(
                "concept {id} already has a vector"
            )));
        }

        self.dimension.get_or_insert(vector.len());
        concept.vector = Some(vector);
        Ok(())
    }

    pub fn get(&self, id: ConceptId) -> Option<&Concept> {
        self.concepts.get(id.index())
    }

    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    pub fn iter(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.iter()
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn side_ids(&self, side: Side) -> Vec<ConceptId> {
        self.concepts
            .iter()
            .filter(|c| c.side == side)
            .map(|c| c.id)
            .collect()
    }


    pub fn missing_vectors(&self) -> Vec<ConceptId> {
        self.concepts
            .iter()
            .filter(|c| c.vector.is_none())
            .map(|c| c.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels_are_scoped() {
        let a = Category::Source(SourceCategory::Interaction);
        let b = Category::Target(TargetCategory::Interaction);
        assert_eq!(a.label(), b.label());
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "source:interaction");
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("Product".parse::<SourceCategory>().unwrap(), SourceCategory::Product);
        assert_eq!("fix".parse::<TargetCategory>().unwrap(), TargetCategory::Fix);
        assert!("fix".parse::<SourceCategory>().is_err());
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut universe = ConceptUniverse::new();
        let a = universe.insert(ConceptCandidate::new("button", Side::Source, None)).unwrap();
        let b = universe.insert(ConceptCandidate::new("button", Side::Target, None)).unwrap();
        assert_eq!(a, ConceptId(0));
        assert_eq!(b, ConceptId(1));
        assert_eq!(universe.side_ids(Side::Target), vec![b]);
    }

    #[test]
    fn test_wrong_side_category_rejected() {
        let mut universe = ConceptUniverse::new();
        let candidate = ConceptCandidate::new(
            "menu",
            Side::Source,
            Some(Category::Target(TargetCategory::Item)),
        );
        assert!(matches!(universe.insert(candidate), Err(HskgError::Configuration(_))));
        assert!(universe.is_empty());
    }

    #[test]
    fn test_vector_is_immutable_once_set() {
        let mut universe = ConceptUniverse::new();
        let id = universe.insert(ConceptCandidate::new("menu", Side::Source, None)).unwrap();
        universe.attach_vector(id, vec![1.0, 0.0]).unwrap();
        assert!(universe.attach_vector(id, vec![0.0, 1.0]).is_err());
        assert_eq!(universe.get(id).unwrap().vector.as_deref(), Some(&[1.0, 0.0][..]));
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut universe = ConceptUniverse::new();
        let a = universe.insert(ConceptCandidate::new("a", Side::Source, None)).unwrap();
        let b = universe.insert(ConceptCandidate::new("b", Side::Target, None)).unwrap();
        universe.attach_vector(a, vec![1.0, 0.0]).unwrap();
        let err = universe.attach_vector(b, vec![1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, HskgError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn test_candidate_normalizes_text() {
        let candidate = ConceptCandidate::new("  Button   too Small ", Side::Source, None);
        assert_eq!(candidate.text, "Button too Small");
        assert_eq!(candidate.key, "button too small");
    }
}
