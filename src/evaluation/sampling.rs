use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::nlp::ConceptId;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum QuerySample {
    All,
    Seeded { size: usize, seed: u64 },
}

impl QuerySample {
    pub fn from_options(size: Option<usize>, seed: u64) -> Self {
        match size {
            Some(size) => Self::Seeded { size, seed },
            None => Self::All,
        }
    }

    pub fn seed(&self) -> Option<u64> {
        match self {
            Self::All => None,
            Self::Seeded { seed, .. } => Some(*seed),
        }
    }

    /// Returns the sampled ids in ascending id order.
    pub fn select(&self, candidates: &[ConceptId]) -> Vec<ConceptId> {
        let mut selected = match self {
            Self::All => candidates.to_vec(),
            Self::Seeded { size, seed } => {
                let mut keyed: Vec<([u8; 32], ConceptId)> = candidates
                    .iter()
                    .map(|id| (sample_key(*seed, *id), *id))
                    .collect();
                keyed.sort();
                keyed.into_iter().take(*size).map(|(_, id)| id).collect()
            }
        };
        selected.sort();
        selected.dedup();
        selected
    }
}

fn sample_key(seed: u64, id: ConceptId) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(id.0.to_le_bytes());
    let mut key = [0u8; 32];
    key.copy_from_slice(&hasher.finalize());
    key
}
