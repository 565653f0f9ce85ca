//! Face embeddings and nearest-neighbour matching.
//!
//! Matching is a linear scan over every enrolled embedding. The closest
//! enrolled vector wins, and only when its distance is strictly below the
//! acceptance threshold.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::employee::EnrolledEmbedding;
use crate::errors::{AppError, AppResult};

/// Fixed-length biometric vector produced by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// Build an embedding, rejecting empty or non-finite vectors.
    pub fn new(values: Vec<f32>) -> AppResult<Self> {
        if values.is_empty() {
            return Err(AppError::validation("embedding is empty"));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AppError::validation("embedding contains non-finite values"));
        }
        Ok(Self(values))
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Require an exact dimension.
    pub fn ensure_dimension(&self, expected: usize) -> AppResult<()> {
        if self.dimension() != expected {
            return Err(AppError::validation(format!(
                "embedding has dimension {}, expected {}",
                self.dimension(),
                expected
            )));
        }
        Ok(())
    }

    /// Euclidean distance, or `None` when the dimensions differ.
    pub fn distance(&self, other: &Embedding) -> Option<f64> {
        if self.dimension() != other.dimension() {
            return None;
        }
        let sum: f64 = self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(&a, &b)| {
                let d = f64::from(a) - f64::from(b);
                d * d
            })
            .sum();
        Some(sum.sqrt())
    }
}

/// Result of matching a probe against the enrolled population.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchOutcome {
    Matched {
        user_id: Uuid,
        distance: f64,
        /// `1 - distance`
        confidence: f64,
    },
    /// Nothing enrolled lies strictly within the threshold.
    NoMatch { nearest_distance: Option<f64> },
    /// Distinct users share the accepted minimum distance.
    Ambiguous { user_ids: Vec<Uuid>, distance: f64 },
}

impl MatchOutcome {
    pub fn matched_user(&self) -> Option<Uuid> {
        match self {
            MatchOutcome::Matched { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }
}

/// Find the enrolled owner nearest to `probe`.
pub fn nearest_match(
    probe: &Embedding,
    enrolled: &[EnrolledEmbedding],
    threshold: f64,
) -> MatchOutcome {
    let mut best: Option<f64> = None;
    let mut owners: Vec<Uuid> = Vec::new();

    for candidate in enrolled {
        let Some(distance) = probe.distance(&candidate.embedding) else {
            continue;
        };
        match best {
            Some(current) if distance > current => {}
            Some(current) if distance == current => {
                if !owners.contains(&candidate.user_id) {
                    owners.push(candidate.user_id);
                }
            }
            _ => {
                best = Some(distance);
                owners.clear();
                owners.push(candidate.user_id);
            }
        }
    }

    let Some(distance) = best else {
        return MatchOutcome::NoMatch {
            nearest_distance: None,
        };
    };

    if distance >= threshold {
        return MatchOutcome::NoMatch {
            nearest_distance: Some(distance),
        };
    }

    if owners.len() > 1 {
        owners.sort();
        return MatchOutcome::Ambiguous {
            user_ids: owners,
            distance,
        };
    }

    MatchOutcome::Matched {
        user_id: owners[0],
        distance,
        confidence: 1.0 - distance,
    }
}
