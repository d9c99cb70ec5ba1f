use serde::{Deserialize, Serialize};

use crate::core::features::{FeatureRow, FeatureVector};
use crate::core::model::{Classifier, ModelError, ModelProvider};
use crate::models::ScoringWeights;

/// How a batch of candidates was scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    Model,
    Heuristic,
}

/// Scores for a batch, index-aligned with the input features
#[derive(Debug, Clone)]
pub struct ScoredBatch {
    pub scores: Vec<f64>,
    pub mode: ScoringMode,
}

/// Rule-based score used when no classifiers are available
///
/// With default weights:
/// score = (
///     2.0 * blood_match +                    # Compatibility dominates
///     1.0 * availability +
///     max(0, (100 - distance_km) / 100) +    # Proximity, zero beyond 100 km
///     0.1 * donation_count                   # Donation history
/// )
#[inline]
pub fn heuristic_score(features: &FeatureVector, weights: &ScoringWeights) -> f64 {
    weights.blood_match * f64::from(features.blood_match)
        + weights.availability * f64::from(features.availability)
        + weights.proximity * proximity_score(features.distance_km, weights.proximity_range_km)
        + weights.donation_count * f64::from(features.donation_count)
}

/// Proximity bonus (0-1), decaying linearly to zero at `range_km`
#[inline]
fn proximity_score(distance_km: f64, range_km: f64) -> f64 {
    if range_km <= 0.0 {
        return 0.0;
    }
    ((range_km - distance_km) / range_km).max(0.0)
}

/// Score every candidate, using the classifier ensemble when available
///
/// Model mode averages the two classifier outputs per row. If either classifier
/// fails on the batch, the whole batch is rescored with the heuristic so that
/// all candidates share one scale.
pub fn score_candidates(
    features: &[FeatureVector],
    models: &ModelProvider,
    weights: &ScoringWeights,
) -> ScoredBatch {
    if let ModelProvider::Ensemble { tree, logistic } = models {
        let rows: Vec<FeatureRow> = features.iter().map(FeatureVector::to_row).collect();

        match ensemble_scores(tree.as_ref(), logistic.as_ref(), &rows) {
            Ok(scores) => {
                return ScoredBatch {
                    scores,
                    mode: ScoringMode::Model,
                }
            }
            Err(e) => {
                tracing::warn!("Model scoring failed, falling back to heuristic: {}", e);
            }
        }
    }

    ScoredBatch {
        scores: features.iter().map(|f| heuristic_score(f, weights)).collect(),
        mode: ScoringMode::Heuristic,
    }
}

fn ensemble_scores(
    tree: &dyn Classifier,
    logistic: &dyn Classifier,
    rows: &[FeatureRow],
) -> Result<Vec<f64>, ModelError> {
    let tree_scores = classifier_scores(tree, rows)?;
    let logistic_scores = classifier_scores(logistic, rows)?;

    Ok(tree_scores
        .iter()
        .zip(logistic_scores.iter())
        .map(|(t, l)| (t + l) / 2.0)
        .collect())
}

/// Positive-class probability per row, or the hard label when the classifier
/// cannot produce probabilities. Output is checked for length and range.
pub fn classifier_scores(model: &dyn Classifier, rows: &[FeatureRow]) -> Result<Vec<f64>, ModelError> {
    let scores = match model.predict_proba(rows) {
        Ok(probs) => probs,
        Err(ModelError::ProbabilityUnsupported(_)) => {
            tracing::debug!("{} has no probability output, using labels", model.name());
            model.predict(rows)?.into_iter().map(f64::from).collect()
        }
        Err(e) => return Err(e),
    };

    if scores.len() != rows.len() {
        return Err(ModelError::OutputLength {
            model: model.name().to_string(),
            expected: rows.len(),
            actual: scores.len(),
        });
    }

    if let Some(bad) = scores.iter().find(|s| !(0.0..=1.0).contains(*s)) {
        return Err(ModelError::InvalidOutput {
            model: model.name().to_string(),
            value: *bad,
        });
    }

    Ok(scores)
}
